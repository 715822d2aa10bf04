//! Encryption core for Daybook.
//!
//! Implements the zero-knowledge key hierarchy:
//!
//! 1. **Password key**: PBKDF2-HMAC-SHA256 of the user's password and a
//!    per-account salt. Exists only while wrapping or unwrapping the
//!    master key - never stored, never transmitted.
//! 2. **Master key**: 32 random bytes generated once per account,
//!    persisted only inside an AES-256-GCM envelope under the password key.
//! 3. **Entry keys**: HKDF-SHA256 of the master key and a per-entry salt,
//!    derived on demand for a single encrypt/decrypt call.
//!
//! A separate HMAC-derived auth token stands in for the password at login,
//! so the server-visible credential is independent of every decryption key.
//!
//! This architecture allows:
//! - Changing the password without re-encrypting any entries
//! - Verifying a password entirely client-side (validator known plaintext)
//! - Limiting the blast radius of a single entry-key compromise

mod auth;
mod cipher;
mod envelope;
mod error;
mod key;

pub use auth::{AuthToken, derive_auth_token};
pub use cipher::{
    EncryptedData, NONCE_SIZE, TAG_SIZE, decrypt, decrypt_string, encrypt, encrypt_string,
};
pub use envelope::{
    MasterKeyEnvelope, Validator, check_validator, create_validator, open_master_key,
    seal_master_key,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{
    EntryKey, KEY_SIZE, KdfParams, MIN_PBKDF2_ITERATIONS, MasterKey, PBKDF2_ITERATIONS,
    PasswordKey, SALT_SIZE, Salt, derive_entry_key, derive_password_key, generate_master_key,
};
