use apack_core::error::{ApackError, Result};
use apack_core::format::algorithm_ids;
use apack_core::providers::CompressionProvider;

/// Zstandard block compressor. Each chunk is compressed independently with
/// no shared dictionary, so chunks decode in any order.
pub struct ZstdCompression {
    default_level: i32,
}

impl ZstdCompression {
    pub fn new(default_level: i32) -> Self {
        Self { default_level }
    }
}

impl Default for ZstdCompression {
    fn default() -> Self {
        Self::new(3)
    }
}

impl CompressionProvider for ZstdCompression {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn numeric_id(&self) -> u8 {
        algorithm_ids::COMPRESSION_ZSTD
    }

    fn default_level(&self) -> i32 {
        self.default_level
    }

    fn min_level(&self) -> i32 {
        1
    }

    fn max_level(&self) -> i32 {
        22
    }

    fn compress_block(&self, data: &[u8], level: i32) -> Result<Vec<u8>> {
        zstd::bulk::compress(data, level).map_err(|e| ApackError::integrity(format!("zstd compress failed: {e}")))
    }

    fn decompress_block(&self, data: &[u8], original_size: usize) -> Result<Vec<u8>> {
        zstd::bulk::decompress(data, original_size).map_err(|e| ApackError::integrity(format!("zstd decompress failed: {e}")))
    }

    fn max_compressed_size(&self, n: usize) -> usize {
        zstd::zstd_safe::compress_bound(n)
    }
}
