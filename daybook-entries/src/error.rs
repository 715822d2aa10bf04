//! Entry-layer error types.

use thiserror::Error;
use uuid::Uuid;

pub type EntryResult<T> = Result<T, EntryError>;

#[derive(Debug, Error)]
pub enum EntryError {
    /// AEAD authentication failed for this entry's payload or one of its
    /// attachments. Carries the id so callers can flag the record and keep
    /// rendering its siblings.
    #[error("entry {id} is corrupted or was tampered with")]
    CorruptedEntry { id: Uuid },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] daybook_crypto::CryptoError),
}
