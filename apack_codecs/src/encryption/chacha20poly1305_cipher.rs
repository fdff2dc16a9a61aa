use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::RngCore;

use apack_core::error::{ApackError, Result};
use apack_core::format::algorithm_ids;
use apack_core::providers::EncryptionProvider;

const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;

/// ChaCha20-Poly1305. Same wrap layout as AES-256-GCM: `nonce ‖ ciphertext
/// ‖ tag`, picked when a software-only (no AES-NI) cipher is preferred.
pub struct ChaCha20Poly1305Encryption;

impl EncryptionProvider for ChaCha20Poly1305Encryption {
    fn name(&self) -> &'static str {
        "chacha20-poly1305"
    }

    fn numeric_id(&self) -> u8 {
        algorithm_ids::ENCRYPTION_CHACHA20_POLY1305
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
        let cipher =
            ChaCha20Poly1305::new_from_slice(key).map_err(|e| ApackError::configuration(format!("bad ChaCha20-Poly1305 key: {e}")))?;
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
        let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| ApackError::Authentication)?;
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
        let cipher = ChaCha20Poly1305Encryption;
        let key = cipher.generate_key();
        let ciphertext = cipher.encrypt_block(b"secret payload", &key, Some(b"aad")).unwrap();
        let restored = cipher.decrypt_block(&ciphertext, &key, Some(b"aad")).unwrap();
        assert_eq!(restored, b"secret payload");
    }
}
