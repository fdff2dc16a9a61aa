//! Typed, fixed-layout records for the APACK file and stream formats.
//!
//! Byte layouts, magics, and field widths are fixed by the format; see
//! the file and stream layout tables. Each record here owns its own
//! `write_to`/`read_from` using [`crate::byteio`].

mod attribute;
mod chunk_header;
mod encryption_block;
mod entry_header;
mod file_header;
mod stream_trailer;
mod toc_entry;
mod trailer;

pub use attribute::{Attribute, AttributeValue};
pub use chunk_header::{ChunkFlags, ChunkHeader, CHUNK_HEADER_SIZE, CHUNK_MAGIC};
pub use encryption_block::{EncryptionBlock, ENCRYPTION_BLOCK_MAGIC};
pub use entry_header::{EntryFlags, EntryHeader};
pub use file_header::{FileHeader, ModeFlags, ENTRY_COUNT_OFFSET, FILE_HEADER_SIZE, FILE_MAGIC, TRAILER_OFFSET_OFFSET};
pub use stream_trailer::{StreamTrailer, STREAM_TRAILER_SIZE, STREAM_TRAILER_MAGIC};
pub use toc_entry::{TocEntry, TOC_ENTRY_SIZE};
pub use trailer::{Trailer, TRAILER_MAGIC};

/// Nominal default chunk size (256 KiB).
pub const DEFAULT_CHUNK_SIZE: u32 = 256 * 1024;

/// Lower bound on `chunk_size`: small enough to exercise multi-chunk logic
/// in tests without wasting memory, large enough that header overhead
/// (24 bytes) stays negligible.
pub const MIN_CHUNK_SIZE: u32 = 1024;

/// Upper bound on `chunk_size`: bounds per-chunk memory use during
/// compression/encryption scratch buffers.
pub const MAX_CHUNK_SIZE: u32 = 64 * 1024 * 1024;

/// Reserved algorithm ids.
pub mod algorithm_ids {
    pub const COMPRESSION_NONE: u8 = 0;
    pub const COMPRESSION_ZSTD: u8 = 1;
    pub const COMPRESSION_LZ4: u8 = 2;

    pub const ENCRYPTION_NONE: u8 = 0;
    pub const ENCRYPTION_AES_256_GCM: u8 = 1;
    pub const ENCRYPTION_CHACHA20_POLY1305: u8 = 2;

    pub const CHECKSUM_CRC32: u8 = 0;
    pub const CHECKSUM_XXH3_64: u8 = 1;

    pub const KDF_ARGON2ID: u8 = 1;
    pub const KDF_PBKDF2_SHA256: u8 = 2;

    /// Numeric ids below this are reserved for built-in providers.
    pub const USER_EXTENSION_FLOOR: u8 = 128;
}
