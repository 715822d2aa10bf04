//! Crypto error types.

use thiserror::Error;

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in the encryption core.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Envelope unwrap or validator check failed. A wrong password and a
    /// tampered envelope are indistinguishable by construction.
    #[error("incorrect password")]
    IncorrectPassword,

    /// AEAD tag verification failed on a content or attachment ciphertext.
    #[error("ciphertext failed authentication (corrupted or tampered)")]
    CorruptedCiphertext,

    /// A persisted record is missing a field or carries undecodable bytes.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),
}
