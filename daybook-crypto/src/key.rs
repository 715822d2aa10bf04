//! Key material and derivation.
//!
//! Three derivation paths fan out from the user's credentials, each with its
//! own domain:
//!
//! - password + account salt -> PBKDF2-HMAC-SHA256 -> [`PasswordKey`]
//! - master key + entry salt -> HKDF-SHA256 -> [`EntryKey`]
//! - password alone -> HMAC purpose tag -> auth token (see [`crate::auth`])
//!
//! The master key itself is random, not derived; it exists so the password
//! can change without re-encrypting entries.

use base64::{Engine, engine::general_purpose::STANDARD};
use hkdf::Hkdf;
use pbkdf2::pbkdf2_hmac;
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::ZeroizeOnDrop;

use crate::error::{CryptoError, CryptoResult};

/// Key length in bytes (256-bit AES-GCM keys throughout).
pub const KEY_SIZE: usize = 32;

/// Salt length in bytes, shared by the account KDF salt and entry salts.
pub const SALT_SIZE: usize = 16;

/// PBKDF2-HMAC-SHA256 iteration count for new accounts.
///
/// Single source of truth. The count is persisted per account so it can be
/// raised later without stranding existing envelopes.
pub const PBKDF2_ITERATIONS: u32 = 600_000;

/// Lowest iteration count accepted from a stored record.
pub const MIN_PBKDF2_ITERATIONS: u32 = 300_000;

/// Domain-separation info string for entry-key derivation.
const ENTRY_KEY_INFO: &[u8] = b"daybook/entry-key/v1";

/// Random public salt. Stored in the clear alongside whatever it salts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Draw a fresh random salt from the OS generator.
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let arr: [u8; SALT_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::MalformedRecord(format!(
                "salt must be {SALT_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

// Salts persist as base64 strings, like every byte field in stored records.
impl Serialize for Salt {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Salt {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)?;
        Salt::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

/// Password-KDF parameters, persisted with the account record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: PBKDF2_ITERATIONS,
        }
    }
}

impl KdfParams {
    /// Rejects iteration counts below the accepted floor.
    pub fn validate(&self) -> CryptoResult<()> {
        if self.iterations < MIN_PBKDF2_ITERATIONS {
            return Err(CryptoError::MalformedRecord(format!(
                "KDF iteration count {} below minimum {MIN_PBKDF2_ITERATIONS}",
                self.iterations
            )));
        }
        Ok(())
    }
}

/// Symmetric wrapping key derived from the password.
///
/// Lives only for the duration of a seal or open operation; zeroized from
/// memory when dropped. Never serialized, never exported.
#[derive(ZeroizeOnDrop)]
pub struct PasswordKey([u8; KEY_SIZE]);

impl PasswordKey {
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for PasswordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Root encryption secret, random per account.
///
/// Held in memory only while a session is unlocked; persisted exclusively
/// inside the master-key envelope. Clones zeroize independently on drop, so
/// an in-flight operation holding a clone stays valid after the session
/// clears its own copy.
#[derive(Clone, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_SIZE]);

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Per-entry cipher key.
///
/// Derived on demand and held only for a single encrypt/decrypt call; it is
/// never cached, so recovering one entry key gains an attacker nothing
/// beyond that entry.
#[derive(ZeroizeOnDrop)]
pub struct EntryKey([u8; KEY_SIZE]);

impl EntryKey {
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derive the password key from a password and the account KDF salt.
///
/// Pure function of its inputs: same password + salt + params always
/// reproduces the same key. Correctness of the password is only ever
/// established later, by the validator check.
pub fn derive_password_key(
    password: &str,
    salt: &Salt,
    params: &KdfParams,
) -> CryptoResult<PasswordKey> {
    if password.is_empty() {
        return Err(CryptoError::KeyDerivation(
            "password must not be empty".to_string(),
        ));
    }
    params.validate()?;

    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        params.iterations,
        &mut key,
    );
    Ok(PasswordKey(key))
}

/// Generate a fresh random master key (account creation only).
pub fn generate_master_key() -> MasterKey {
    let mut bytes = [0u8; KEY_SIZE];
    OsRng.fill_bytes(&mut bytes);
    MasterKey(bytes)
}

/// Derive the AES-GCM key for one entry from the master key and its salt.
///
/// HKDF-SHA256 with a fixed versioned info string; distinct salts yield
/// independent keys under the same master key.
pub fn derive_entry_key(master: &MasterKey, entry_salt: &Salt) -> EntryKey {
    let hk = Hkdf::<Sha256>::new(Some(entry_salt.as_bytes()), master.as_bytes());
    let mut okm = [0u8; KEY_SIZE];
    hk.expand(ENTRY_KEY_INFO, &mut okm)
        .expect("HKDF expand cannot fail for a 32-byte output");
    EntryKey(okm)
}
