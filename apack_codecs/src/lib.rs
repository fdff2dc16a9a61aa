//! Concrete compression, encryption, checksum, and KDF providers bundled
//! for `apack_core`'s registries.
//!
//! `apack_core` only defines the provider traits and the `Registry` lookup
//! table; this crate supplies the actual algorithms and a convenience
//! [`register_defaults`] that wires all of them into a fresh `ProviderSet`
//! at their reserved numeric ids.

pub mod checksum;
pub mod compression;
pub mod encryption;
pub mod kdf;

use std::sync::Arc;

use apack_core::error::Result;
use apack_core::providers::{ChecksumProvider, CompressionProvider, EncryptionProvider, KdfProvider, ProviderSet};

/// Register every built-in provider at its reserved numeric id (0-127).
/// User extensions register above [`apack_core::format::algorithm_ids::USER_EXTENSION_FLOOR`]
/// directly on the registries after this call.
pub fn register_defaults(providers: &mut ProviderSet) -> Result<()> {
    providers
        .compression
        .register_with(compression::NoneCompression.numeric_id(), "none", Arc::new(compression::NoneCompression))?;
    providers.compression.register_with(
        compression::ZstdCompression::default().numeric_id(),
        "zstd",
        Arc::new(compression::ZstdCompression::default()),
    )?;
    providers
        .compression
        .register_with(compression::Lz4Compression.numeric_id(), "lz4", Arc::new(compression::Lz4Compression))?;

    providers
        .encryption
        .register_with(encryption::NoneEncryption.numeric_id(), "none", Arc::new(encryption::NoneEncryption))?;
    providers.encryption.register_with(
        encryption::Aes256GcmEncryption.numeric_id(),
        "aes-256-gcm",
        Arc::new(encryption::Aes256GcmEncryption),
    )?;
    providers.encryption.register_with(
        encryption::ChaCha20Poly1305Encryption.numeric_id(),
        "chacha20-poly1305",
        Arc::new(encryption::ChaCha20Poly1305Encryption),
    )?;

    providers
        .checksum
        .register_with(checksum::Crc32Checksum.numeric_id(), "crc32", Arc::new(checksum::Crc32Checksum))?;
    providers
        .checksum
        .register_with(checksum::Xxh3Checksum.numeric_id(), "xxh3-64", Arc::new(checksum::Xxh3Checksum))?;

    providers
        .kdf
        .register_with(kdf::Argon2idKdf.numeric_id(), "argon2id", Arc::new(kdf::Argon2idKdf))?;
    providers
        .kdf
        .register_with(kdf::Pbkdf2Sha256Kdf.numeric_id(), "pbkdf2-sha256", Arc::new(kdf::Pbkdf2Sha256Kdf))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_built_in_at_its_reserved_id() {
        let mut providers = ProviderSet::new();
        register_defaults(&mut providers).unwrap();

        assert!(providers.compression.by_id(0).is_ok());
        assert!(providers.compression.by_id(1).is_ok());
        assert!(providers.compression.by_id(2).is_ok());
        assert!(providers.encryption.by_id(0).is_ok());
        assert!(providers.encryption.by_id(1).is_ok());
        assert!(providers.encryption.by_id(2).is_ok());
        assert!(providers.checksum.by_id(0).is_ok());
        assert!(providers.checksum.by_id(1).is_ok());
        assert!(providers.kdf.by_id(1).is_ok());
        assert!(providers.kdf.by_id(2).is_ok());

        assert!(providers.compression.by_name("zstd").is_ok());
        assert!(providers.encryption.by_name("aes-256-gcm").is_ok());
    }
}
