//! Archive-level configuration: the knobs an `ArchiveWriter` is built with.
//!
//! This is distinct from the CLI's layered configuration (flags > `apack.toml`
//! > built-in defaults, handled by `apack_cli` with the `config` crate); by
//! the time a `WriterOptions` reaches this crate, all of that layering has
//! already been resolved to concrete values.

use crate::format::{algorithm_ids, DEFAULT_CHUNK_SIZE};

#[derive(Debug, Clone)]
pub struct CompressionConfig {
    pub algorithm_id: u8,
    pub level: i32,
}

#[derive(Debug, Clone)]
pub struct EncryptionConfig {
    pub cipher_id: u8,
    pub kdf_id: u8,
    pub password: Vec<u8>,
    pub kdf_iterations: u32,
    pub kdf_memory_kb: u32,
    pub kdf_parallelism: u32,
}

#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub chunk_size: u32,
    pub checksum_algorithm: u8,
    pub compression: Option<CompressionConfig>,
    pub encryption: Option<EncryptionConfig>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            checksum_algorithm: algorithm_ids::CHECKSUM_CRC32,
            compression: None,
            encryption: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReaderOptions {
    pub password: Option<Vec<u8>>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self { password: None }
    }
}
