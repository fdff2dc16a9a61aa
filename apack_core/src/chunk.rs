//! Per-chunk compress-then-encrypt / decrypt-then-decompress pipeline.
//!
//! Stateless except for the resolved providers and key it was built with;
//! every chunk is processed independently.

use std::sync::Arc;

use crate::error::{ApackError, Result};
use crate::format::MAX_CHUNK_SIZE;
use crate::providers::{CompressionProvider, EncryptionProvider};

/// Output of `process_for_write`: the on-disk chunk body plus the flags and
/// sizes that go into its `ChunkHeader`.
pub struct ProcessedChunk {
    pub body: Vec<u8>,
    pub original_size: u32,
    pub stored_size: u32,
    pub compressed: bool,
    pub encrypted: bool,
}

#[derive(Clone)]
pub struct ChunkProcessor {
    compression: Option<(Arc<dyn CompressionProvider>, i32)>,
    encryption: Option<(Arc<dyn EncryptionProvider>, Vec<u8>)>,
}

impl ChunkProcessor {
    pub fn new() -> Self {
        Self {
            compression: None,
            encryption: None,
        }
    }

    pub fn with_compression(mut self, provider: Arc<dyn CompressionProvider>, level: i32) -> Self {
        self.compression = Some((provider, level));
        self
    }

    pub fn with_encryption(mut self, provider: Arc<dyn EncryptionProvider>, key: Vec<u8>) -> Self {
        self.encryption = Some((provider, key));
        self
    }

    pub fn is_compressing(&self) -> bool {
        self.compression.is_some()
    }

    pub fn is_encrypting(&self) -> bool {
        self.encryption.is_some()
    }

    /// Compress (if it shrinks the data) then encrypt (if configured).
    pub fn process_for_write(&self, data: &[u8], aad: Option<&[u8]>) -> Result<ProcessedChunk> {
        let original_size = data.len();

        let (mut body, compressed) = match &self.compression {
            Some((provider, level)) => {
                let candidate = provider.compress_block(data, *level)?;
                if candidate.len() < original_size {
                    (candidate, true)
                } else {
                    (data.to_vec(), false)
                }
            }
            None => (data.to_vec(), false),
        };

        let encrypted = if let Some((provider, key)) = &self.encryption {
            body = provider.encrypt_block(&body, key, aad)?;
            true
        } else {
            false
        };

        Ok(ProcessedChunk {
            stored_size: body.len() as u32,
            body,
            original_size: original_size as u32,
            compressed,
            encrypted,
        })
    }

    /// Reverse of `process_for_write`: decrypt, then decompress, validating
    /// sizes at each step.
    pub fn process_for_read(
        &self,
        body: &[u8],
        original_size: usize,
        compressed: bool,
        encrypted: bool,
        aad: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        if original_size > MAX_CHUNK_SIZE as usize {
            return Err(ApackError::integrity(format!(
                "chunk original_size {original_size} exceeds maximum permitted chunk size {MAX_CHUNK_SIZE}"
            )));
        }

        let mut data = if encrypted {
            let (provider, key) = self
                .encryption
                .as_ref()
                .ok_or_else(|| ApackError::configuration("chunk is encrypted but no encryption key is configured"))?;
            provider.decrypt_block(body, key, aad)?
        } else {
            body.to_vec()
        };

        if compressed {
            let (provider, _level) = self
                .compression
                .as_ref()
                .ok_or_else(|| ApackError::configuration("chunk is compressed but no compression provider is configured"))?;
            let decompressed = provider.decompress_block(&data, original_size)?;
            if decompressed.len() != original_size {
                return Err(ApackError::integrity(format!(
                    "decompression size mismatch: expected {original_size}, got {}",
                    decompressed.len()
                )));
            }
            data = decompressed;
        } else if data.len() != original_size {
            return Err(ApackError::integrity(format!(
                "chunk size mismatch: expected {original_size}, got {}",
                data.len()
            )));
        }

        Ok(data)
    }
}

impl Default for ChunkProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{CompressionProvider, EncryptionProvider};
    use apack_codecs::compression::ZstdCompression;
    use apack_codecs::encryption::Aes256GcmEncryption;

    #[test]
    fn passthrough_roundtrip() {
        let processor = ChunkProcessor::new();
        let data = b"hello world".to_vec();
        let processed = processor.process_for_write(&data, None).unwrap();
        assert!(!processed.compressed);
        assert!(!processed.encrypted);
        assert_eq!(processed.body, data);

        let restored = processor
            .process_for_read(&processed.body, processed.original_size as usize, false, false, None)
            .unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn compression_skipped_when_it_expands() {
        let processor = ChunkProcessor::new().with_compression(Arc::new(ZstdCompression::new(3)), 3);
        // Tiny input: zstd framing overhead exceeds the payload.
        let data = b"a".to_vec();
        let processed = processor.process_for_write(&data, None).unwrap();
        assert!(!processed.compressed);
        assert_eq!(processed.stored_size, processed.original_size);
    }

    #[test]
    fn compression_then_encryption_roundtrip() {
        let key = Aes256GcmEncryption.generate_key();
        let processor = ChunkProcessor::new()
            .with_compression(Arc::new(ZstdCompression::new(3)), 3)
            .with_encryption(Arc::new(Aes256GcmEncryption), key);

        let data = vec![b'x'; 4096];
        let processed = processor.process_for_write(&data, Some(b"aad")).unwrap();
        assert!(processed.encrypted);

        let restored = processor
            .process_for_read(
                &processed.body,
                processed.original_size as usize,
                processed.compressed,
                processed.encrypted,
                Some(b"aad"),
            )
            .unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn wrong_aad_fails_authentication() {
        let key = Aes256GcmEncryption.generate_key();
        let processor = ChunkProcessor::new().with_encryption(Arc::new(Aes256GcmEncryption), key);
        let data = b"secret".to_vec();
        let processed = processor.process_for_write(&data, Some(b"right")).unwrap();

        let err = processor
            .process_for_read(
                &processed.body,
                processed.original_size as usize,
                false,
                true,
                Some(b"wrong"),
            )
            .unwrap_err();
        assert!(matches!(err, ApackError::Authentication));
    }
}
