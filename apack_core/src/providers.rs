//! Trait contracts for the pluggable compression/encryption/checksum/KDF
//! providers and the registries that resolve them by numeric id or name.
//!
//! Concrete implementations (ZSTD, LZ4, AES-256-GCM, ChaCha20-Poly1305,
//! Argon2id, PBKDF2-SHA256, CRC-32, XXH3-64) live in `apack_codecs`; this
//! crate only knows the shape.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ApackError, Result};

/// A stateless, incremental checksum algorithm. The chunk header's
/// `checksum32` field is always 32 bits on disk regardless of the
/// algorithm's native digest width (XXH3-64 is truncated).
pub trait ChecksumProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn numeric_id(&self) -> u8;

    /// One-shot checksum of `data`, truncated/folded to 32 bits.
    fn compute(&self, data: &[u8]) -> u32;

    /// A fresh incremental hasher, for callers that want to feed data in
    /// pieces before finalizing. Checksum hashers are never thread-safe and
    /// must not be shared across chunk reads/writes.
    fn hasher(&self) -> Box<dyn ChecksumHasher>;
}

pub trait ChecksumHasher {
    fn update(&mut self, data: &[u8]);
    fn finalize(&mut self) -> u32;
    fn reset(&mut self);
}

/// A stateless block compressor. Each call is independent: no cross-call
/// dictionary/state is retained, which is what lets chunks be decoded out
/// of order.
pub trait CompressionProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn numeric_id(&self) -> u8;

    fn default_level(&self) -> i32;
    fn min_level(&self) -> i32;
    fn max_level(&self) -> i32;

    fn compress_block(&self, data: &[u8], level: i32) -> Result<Vec<u8>>;

    /// `original_size` is a hint/target the codec may use to pre-size its
    /// output buffer or validate the decoded length.
    fn decompress_block(&self, data: &[u8], original_size: usize) -> Result<Vec<u8>>;

    /// Worst-case compressed size for `n` input bytes (used to size scratch
    /// buffers, not to bound on-disk output).
    fn max_compressed_size(&self, n: usize) -> usize;
}

/// A stateless AEAD cipher. `encrypt_block` always returns
/// `nonce ‖ ciphertext ‖ tag`.
pub trait EncryptionProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn numeric_id(&self) -> u8;

    fn key_size(&self) -> usize;
    fn nonce_size(&self) -> usize;
    fn tag_size(&self) -> usize;

    fn encrypt_block(&self, data: &[u8], key: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>>;
    fn decrypt_block(&self, data: &[u8], key: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>>;

    /// A cryptographically random key of `key_size()` bytes.
    fn generate_key(&self) -> Vec<u8>;
}

/// A password-based key derivation function, used only to derive the KEK
/// that wraps the archive's DEK.
pub trait KdfProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn numeric_id(&self) -> u8;

    #[allow(clippy::too_many_arguments)]
    fn derive(
        &self,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        memory_kb: u32,
        parallelism: u32,
        key_len: usize,
    ) -> Result<Vec<u8>>;
}

/// Generic id/name-keyed lookup table shared by all four provider kinds.
pub struct Registry<T: ?Sized> {
    by_id: HashMap<u8, Arc<T>>,
    by_name: HashMap<String, Arc<T>>,
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self {
            by_id: HashMap::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<T: ?Sized> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl<T: ?Sized> Registry<T> {
    pub fn register_with(&mut self, numeric_id: u8, name: &str, provider: Arc<T>) -> Result<()> {
        if self.by_id.contains_key(&numeric_id) {
            return Err(ApackError::configuration(format!(
                "provider numeric id {numeric_id} already registered"
            )));
        }
        self.by_id.insert(numeric_id, provider.clone());
        self.by_name.insert(name.to_string(), provider);
        Ok(())
    }

    pub fn by_id(&self, id: u8) -> Result<Arc<T>> {
        self.by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| ApackError::configuration(format!("unknown algorithm id {id}")))
    }

    pub fn by_name(&self, name: &str) -> Result<Arc<T>> {
        self.by_name
            .get(name)
            .cloned()
            .ok_or_else(|| ApackError::configuration(format!("unknown algorithm name '{name}'")))
    }
}

pub type CompressionRegistry = Registry<dyn CompressionProvider>;
pub type EncryptionRegistry = Registry<dyn EncryptionProvider>;
pub type ChecksumRegistry = Registry<dyn ChecksumProvider>;
pub type KdfRegistry = Registry<dyn KdfProvider>;

/// The set of registries an archive writer/reader needs. `apack_codecs`
/// provides `register_defaults` to populate one of these with the built-in
/// providers at ids 0-2 (compression), 0-2 (encryption), 0-1 (checksum),
/// 1-2 (kdf).
#[derive(Default)]
pub struct ProviderSet {
    pub compression: CompressionRegistry,
    pub encryption: EncryptionRegistry,
    pub checksum: ChecksumRegistry,
    pub kdf: KdfRegistry,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }
}
