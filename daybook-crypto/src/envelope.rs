//! Master-key envelope and the zero-knowledge password validator.
//!
//! The master key is persisted only wrapped under the password-derived key.
//! The validator is a known plaintext encrypted under an entry-style derived
//! key, letting the client answer "is this password correct" without the
//! server ever holding a password-equivalent value. It also catches a
//! server-side swap of the stored envelope: a key unwrapped from a tampered
//! envelope will not decrypt the validator.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::cipher::{EncryptedData, NONCE_SIZE, decrypt, encrypt};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{KEY_SIZE, KdfParams, MasterKey, Salt, derive_entry_key, derive_password_key};

/// Known plaintext the validator must decrypt to under the correct master key.
const VALIDATOR_PLAINTEXT: &[u8] = b"VALID_PASSWORD_CHECK";

/// The wrapped master key as persisted server-side. Opaque without the
/// password: the salt and KDF parameters are public by design.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MasterKeyEnvelope {
    pub kdf_salt: Salt,
    pub kdf: KdfParams,
    pub encrypted: EncryptedData,
}

/// Wrap a master key under a password (account creation).
///
/// Generates a fresh KDF salt; the password key exists only for the duration
/// of this call and is zeroized when it drops.
pub fn seal_master_key(master: &MasterKey, password: &str) -> CryptoResult<MasterKeyEnvelope> {
    let kdf_salt = Salt::random();
    let kdf = KdfParams::default();
    let password_key = derive_password_key(password, &kdf_salt, &kdf)?;
    let encrypted = encrypt(password_key.as_bytes(), master.as_bytes())?;

    Ok(MasterKeyEnvelope {
        kdf_salt,
        kdf,
        encrypted,
    })
}

/// Unwrap the master key (unlock).
///
/// AEAD failure means the password is wrong or the envelope was tampered
/// with; both surface as [`CryptoError::IncorrectPassword`] with no partial
/// plaintext exposed and no key installed.
pub fn open_master_key(envelope: &MasterKeyEnvelope, password: &str) -> CryptoResult<MasterKey> {
    let password_key = derive_password_key(password, &envelope.kdf_salt, &envelope.kdf)?;
    let mut plaintext = decrypt(password_key.as_bytes(), &envelope.encrypted)
        .map_err(|_| CryptoError::IncorrectPassword)?;

    if plaintext.len() != KEY_SIZE {
        plaintext.zeroize();
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: plaintext.len(),
        });
    }

    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&plaintext);
    plaintext.zeroize();
    Ok(MasterKey::from_bytes(bytes))
}

/// Zero-knowledge password-check artifact: a constant encrypted under a key
/// derived from the master key and a dedicated random salt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Validator {
    pub salt: Salt,
    pub encrypted: EncryptedData,
}

/// Create the validator. Computed once at account creation and persisted
/// alongside the envelope.
pub fn create_validator(master: &MasterKey) -> CryptoResult<Validator> {
    let salt = Salt::random();
    let key = derive_entry_key(master, &salt);
    let encrypted = encrypt(key.as_bytes(), VALIDATOR_PLAINTEXT)?;
    Ok(Validator { salt, encrypted })
}

/// Check a freshly unwrapped master key against the stored validator.
///
/// Runs on every unlock. Any AEAD failure or content mismatch is an
/// authoritative wrong-password (or tampered-envelope) signal.
pub fn check_validator(master: &MasterKey, validator: &Validator) -> CryptoResult<()> {
    let key = derive_entry_key(master, &validator.salt);
    let plaintext = decrypt(key.as_bytes(), &validator.encrypted)
        .map_err(|_| CryptoError::IncorrectPassword)?;

    if plaintext != VALIDATOR_PLAINTEXT {
        return Err(CryptoError::IncorrectPassword);
    }
    Ok(())
}

impl Validator {
    /// Colon-joined `salt:iv:ciphertext` form stored in the account record.
    pub fn to_record(&self) -> String {
        format!(
            "{}:{}:{}",
            STANDARD.encode(self.salt.as_bytes()),
            STANDARD.encode(self.encrypted.iv),
            STANDARD.encode(&self.encrypted.ciphertext)
        )
    }

    /// Parse the stored triple. Missing or undecodable fields are malformed
    /// records, not wrong passwords.
    pub fn from_record(record: &str) -> CryptoResult<Self> {
        let mut parts = record.splitn(3, ':');
        let (Some(salt), Some(iv), Some(ciphertext)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(CryptoError::MalformedRecord(
                "validator must be salt:iv:ciphertext".into(),
            ));
        };

        let salt = Salt::from_slice(
            &STANDARD
                .decode(salt)
                .map_err(|e| CryptoError::MalformedRecord(format!("validator salt: {e}")))?,
        )?;
        let iv_bytes = STANDARD
            .decode(iv)
            .map_err(|e| CryptoError::MalformedRecord(format!("validator iv: {e}")))?;
        let iv: [u8; NONCE_SIZE] = iv_bytes.as_slice().try_into().map_err(|_| {
            CryptoError::MalformedRecord(format!("validator iv must be {NONCE_SIZE} bytes"))
        })?;
        let ciphertext = STANDARD
            .decode(ciphertext)
            .map_err(|e| CryptoError::MalformedRecord(format!("validator ciphertext: {e}")))?;

        Ok(Self {
            salt,
            encrypted: EncryptedData { iv, ciphertext },
        })
    }
}
