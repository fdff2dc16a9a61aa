use apack_core::error::Result;
use apack_core::format::algorithm_ids;
use apack_core::providers::CompressionProvider;

/// Identity compressor, registered at id 0 so "no compression configured"
/// and "compression explicitly disabled" are the same on-disk id.
pub struct NoneCompression;

impl CompressionProvider for NoneCompression {
    fn name(&self) -> &'static str {
        "none"
    }

    fn numeric_id(&self) -> u8 {
        algorithm_ids::COMPRESSION_NONE
    }

    fn default_level(&self) -> i32 {
        0
    }

    fn min_level(&self) -> i32 {
        0
    }

    fn max_level(&self) -> i32 {
        0
    }

    fn compress_block(&self, data: &[u8], _level: i32) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress_block(&self, data: &[u8], _original_size: usize) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn max_compressed_size(&self, n: usize) -> usize {
        n
    }
}
