//! Whole-archive orchestration: file header, optional encryption block,
//! per-entry header + chunk stream, TOC, and trailer.

pub mod reader;
pub mod writer;

pub use reader::{ArchiveReader, EntryInfo, EntryStream, StreamReader};
pub use writer::{ArchiveWriter, StreamWriter};

/// 32-bit name hash used as the TOC lookup key: XXH3-64 of the UTF-8 name,
/// truncated to the low 32 bits.
pub fn name_hash(name: &str) -> u32 {
    xxhash_rust::xxh3::xxh3_64(name.as_bytes()) as u32
}

/// AAD bound to every chunk of an entry when encryption is enabled:
/// `entry_id` (little-endian) followed by the UTF-8 entry name. Reproducible
/// identically by the reader, which has both values from the EntryHeader.
pub fn entry_aad(entry_id: u64, name: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(8 + name.len());
    aad.extend_from_slice(&entry_id.to_le_bytes());
    aad.extend_from_slice(name.as_bytes());
    aad
}
