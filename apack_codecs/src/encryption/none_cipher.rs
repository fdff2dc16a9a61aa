use apack_core::error::Result;
use apack_core::format::algorithm_ids;
use apack_core::providers::EncryptionProvider;

/// Identity cipher, registered at id 0 for unencrypted archives/entries.
pub struct NoneEncryption;

impl EncryptionProvider for NoneEncryption {
    fn name(&self) -> &'static str {
        "none"
    }

    fn numeric_id(&self) -> u8 {
        algorithm_ids::ENCRYPTION_NONE
    }

    fn key_size(&self) -> usize {
        0
    }

    fn nonce_size(&self) -> usize {
        0
    }

    fn tag_size(&self) -> usize {
        0
    }

    fn encrypt_block(&self, data: &[u8], _key: &[u8], _aad: Option<&[u8]>) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decrypt_block(&self, data: &[u8], _key: &[u8], _aad: Option<&[u8]>) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn generate_key(&self) -> Vec<u8> {
        Vec::new()
    }
}
