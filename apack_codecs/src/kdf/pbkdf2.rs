use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use apack_core::error::Result;
use apack_core::format::algorithm_ids;
use apack_core::providers::KdfProvider;

/// PBKDF2-HMAC-SHA256, offered alongside Argon2id for environments that
/// standardize on a NIST-approved KDF. `memory_kb`/`parallelism` are
/// accepted but unused: PBKDF2 has no memory-hardness knob.
pub struct Pbkdf2Sha256Kdf;

impl KdfProvider for Pbkdf2Sha256Kdf {
    fn name(&self) -> &'static str {
        "pbkdf2-sha256"
    }

    fn numeric_id(&self) -> u8 {
        algorithm_ids::KDF_PBKDF2_SHA256
    }

    fn derive(&self, password: &[u8], salt: &[u8], iterations: u32, _memory_kb: u32, _parallelism: u32, key_len: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; key_len];
        pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut out);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_requested_length_deterministically() {
        let kdf = Pbkdf2Sha256Kdf;
        let a = kdf.derive(b"password", &[0u8; 16], 10_000, 0, 0, 32).unwrap();
        let b = kdf.derive(b"password", &[0u8; 16], 10_000, 0, 0, 32).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }
}
