//! Tagged error kinds for the APACK core, per the format's error taxonomy:
//! format, integrity, authentication, configuration, state, and I/O.

use std::fmt;

/// An error produced by the APACK core.
///
/// Variants are deliberately coarse: they mirror the six error *kinds* the
/// format distinguishes, not individual failure sites. `Authentication`
/// never carries detail about which step (KDF, unwrap, AEAD tag) failed, so
/// a caller cannot use error text to distinguish "wrong password" from
/// "corrupted wrapped key."
#[derive(Debug, thiserror::Error)]
pub enum ApackError {
    /// Bad magic, truncated input, unknown required algorithm id, or a size
    /// field outside its permitted range.
    #[error("format error: {0}")]
    Format(String),

    /// Per-chunk checksum mismatch, decompression size mismatch, or a
    /// non-compressed chunk body whose length disagrees with its header.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// AEAD tag verification failed, or the DEK could not be unwrapped.
    /// Never discloses which step failed.
    #[error("authentication failed")]
    Authentication,

    /// Unknown provider name/id at open, unsupported level, or a required
    /// provider (encryption key, compression algorithm) is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Use of a writer/reader after it has logically closed.
    #[error("state error: {0}")]
    State(String),

    /// Underlying read/write/seek failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApackError {
    pub fn format(msg: impl fmt::Display) -> Self {
        ApackError::Format(msg.to_string())
    }

    pub fn integrity(msg: impl fmt::Display) -> Self {
        ApackError::Integrity(msg.to_string())
    }

    pub fn configuration(msg: impl fmt::Display) -> Self {
        ApackError::Configuration(msg.to_string())
    }

    pub fn state(msg: impl fmt::Display) -> Self {
        ApackError::State(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApackError>;
