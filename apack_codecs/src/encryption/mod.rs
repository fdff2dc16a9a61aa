mod aes_gcm;
mod chacha20poly1305_cipher;
mod none_cipher;

pub use aes_gcm::Aes256GcmEncryption;
pub use chacha20poly1305_cipher::ChaCha20Poly1305Encryption;
pub use none_cipher::NoneEncryption;
