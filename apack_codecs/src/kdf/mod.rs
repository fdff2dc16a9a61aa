mod argon2id;
mod pbkdf2;

pub use argon2id::Argon2idKdf;
pub use pbkdf2::Pbkdf2Sha256Kdf;
