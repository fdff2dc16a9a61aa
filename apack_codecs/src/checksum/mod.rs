mod crc32;
mod xxh3;

pub use crc32::Crc32Checksum;
pub use xxh3::Xxh3Checksum;
