//! AES-256-GCM authenticated encryption.
//!
//! Every call draws a fresh random 96-bit nonce; the 16-byte GCM tag is
//! appended to the ciphertext by the cipher (standard construction). Nonce
//! reuse under one key is prevented by never deriving nonces - only drawing
//! them from the OS generator per call.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};
use crate::key::KEY_SIZE;

/// AES-GCM nonce length in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag length in bytes, appended to every ciphertext.
pub const TAG_SIZE: usize = 16;

/// A ciphertext paired with the nonce it was produced under.
///
/// Serializes with base64 string fields - the transport and storage form of
/// every persisted record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    /// Per-call random nonce ("iv" in persisted records).
    #[serde(with = "b64_nonce")]
    pub iv: [u8; NONCE_SIZE],
    /// Ciphertext with the GCM tag appended.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
}

impl EncryptedData {
    /// Total stored size in bytes.
    pub fn len(&self) -> usize {
        NONCE_SIZE + self.ciphertext.len()
    }

    /// True when the ciphertext holds nothing beyond the GCM tag.
    pub fn is_empty(&self) -> bool {
        self.ciphertext.len() <= TAG_SIZE
    }
}

/// Encrypt `plaintext` under a 256-bit key with a fresh random nonce.
pub fn encrypt(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> CryptoResult<EncryptedData> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::Encryption(e.to_string()))?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(EncryptedData {
        iv: nonce.into(),
        ciphertext,
    })
}

/// Decrypt an [`EncryptedData`] produced by [`encrypt`].
///
/// Fails atomically on tag mismatch: no partial plaintext is ever exposed.
pub fn decrypt(key: &[u8; KEY_SIZE], data: &EncryptedData) -> CryptoResult<Vec<u8>> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::Encryption(e.to_string()))?;
    let nonce = Nonce::from_slice(&data.iv);
    cipher
        .decrypt(nonce, data.ciphertext.as_slice())
        .map_err(|_| CryptoError::CorruptedCiphertext)
}

/// Encrypt a UTF-8 string.
pub fn encrypt_string(key: &[u8; KEY_SIZE], plaintext: &str) -> CryptoResult<EncryptedData> {
    encrypt(key, plaintext.as_bytes())
}

/// Decrypt back to a UTF-8 string.
pub fn decrypt_string(key: &[u8; KEY_SIZE], data: &EncryptedData) -> CryptoResult<String> {
    let bytes = decrypt(key, data)?;
    String::from_utf8(bytes)
        .map_err(|_| CryptoError::MalformedRecord("decrypted payload is not valid UTF-8".into()))
}

/// Base64 (de)serialization for variable-length byte fields.
pub(crate) mod b64 {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// Base64 (de)serialization for the fixed-length nonce field.
pub(crate) mod b64_nonce {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::NONCE_SIZE;

    pub fn serialize<S: Serializer>(
        bytes: &[u8; NONCE_SIZE],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[u8; NONCE_SIZE], D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = STANDARD.decode(encoded).map_err(serde::de::Error::custom)?;
        bytes.as_slice().try_into().map_err(|_| {
            serde::de::Error::custom(format!("nonce must be {NONCE_SIZE} bytes"))
        })
    }
}
