use apack_core::error::{ApackError, Result};
use apack_core::format::algorithm_ids;
use apack_core::providers::CompressionProvider;

/// LZ4 block compressor. Fastest decode of the bundled codecs; `level` is
/// accepted for API symmetry but LZ4's block format has no level knob.
pub struct Lz4Compression;

impl CompressionProvider for Lz4Compression {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn numeric_id(&self) -> u8 {
        algorithm_ids::COMPRESSION_LZ4
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
        Ok(lz4_flex::compress_prepend_size(data))
    }

    fn decompress_block(&self, data: &[u8], _original_size: usize) -> Result<Vec<u8>> {
        lz4_flex::decompress_size_prepended(data).map_err(|e| ApackError::integrity(format!("lz4 decompress failed: {e}")))
    }

    fn max_compressed_size(&self, n: usize) -> usize {
        lz4_flex::block::get_maximum_output_size(n) + 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let codec = Lz4Compression;
        let data = b"the quick brown fox jumps over the lazy dog ".repeat(50);
        let compressed = codec.compress_block(&data, 0).unwrap();
        assert!(compressed.len() < data.len());
        let restored = codec.decompress_block(&compressed, data.len()).unwrap();
        assert_eq!(restored, data);
    }
}
