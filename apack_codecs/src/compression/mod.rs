mod lz4_codec;
mod none_codec;
mod zstd_codec;

pub use lz4_codec::Lz4Compression;
pub use none_codec::NoneCompression;
pub use zstd_codec::ZstdCompression;
