use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;

use apack_core::error::{ApackError, Result};
use apack_core::format::algorithm_ids;
use apack_core::providers::EncryptionProvider;

const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;

/// AES-256-GCM. `encrypt_block` always returns `nonce ‖ ciphertext ‖ tag`,
/// with a fresh random nonce per call.
pub struct Aes256GcmEncryption;

impl EncryptionProvider for Aes256GcmEncryption {
    fn name(&self) -> &'static str {
        "aes-256-gcm"
    }

    fn numeric_id(&self) -> u8 {
        algorithm_ids::ENCRYPTION_AES_256_GCM
    }

    fn key_size(&self) -> usize {
        32
    }

    fn nonce_size(&self) -> usize {
        NONCE_SIZE
    }

    fn tag_size(&self) -> usize {
        TAG_SIZE
    }

    fn encrypt_block(&self, data: &[u8], key: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| ApackError::configuration(format!("bad AES-256-GCM key: {e}")))?;
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, Payload { msg: data, aad: aad.unwrap_or(&[]) })
            .map_err(|_| ApackError::Authentication)?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt_block(&self, data: &[u8], key: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>> {
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(ApackError::Authentication);
        }
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| ApackError::Authentication)?;
        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);
        cipher
            .decrypt(nonce, Payload { msg: ciphertext, aad: aad.unwrap_or(&[]) })
            .map_err(|_| ApackError::Authentication)
    }

    fn generate_key(&self) -> Vec<u8> {
        let mut key = vec![0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut key);
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let cipher = Aes256GcmEncryption;
        let key = cipher.generate_key();
        let ciphertext = cipher.encrypt_block(b"secret payload", &key, Some(b"aad")).unwrap();
        let restored = cipher.decrypt_block(&ciphertext, &key, Some(b"aad")).unwrap();
        assert_eq!(restored, b"secret payload");
    }

    #[test]
    fn tampered_ciphertext_rejected() {
        let cipher = Aes256GcmEncryption;
        let key = cipher.generate_key();
        let mut ciphertext = cipher.encrypt_block(b"secret payload", &key, None).unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0xFF;
        assert!(matches!(cipher.decrypt_block(&ciphertext, &key, None), Err(ApackError::Authentication)));
    }
}
