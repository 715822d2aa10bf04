//! Account and session key lifecycle for Daybook.
//!
//! Owns the only long-lived copy of the master key. A session is locked
//! until [`Session::unlock`] opens the master-key envelope and the validator
//! check passes; an explicit lock, logout, or the idle timeout clears the
//! key again. Ciphering is never available while locked:
//! [`Session::master_key`] is the single gate and returns
//! [`VaultError::MissingKeyMaterial`] instead of silently doing nothing.
//!
//! The persisted [`AccountRecord`] is everything the server stores for an
//! account. None of it decrypts anything without the password.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use daybook_crypto::{
    AuthToken, CryptoError, EncryptedData, KdfParams, MasterKey, MasterKeyEnvelope, NONCE_SIZE,
    Salt, Validator, check_validator, create_validator, derive_auth_token, generate_master_key,
    open_master_key, seal_master_key,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ============================================================================
// Error types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// A cipher operation was attempted while the session is locked.
    #[error("operation requires an unlocked session")]
    MissingKeyMaterial,
    #[error("incorrect password")]
    IncorrectPassword,
    #[error("password too short (min {MIN_PASSWORD_LENGTH} characters)")]
    PasswordTooShort,
    #[error("malformed account record: {0}")]
    MalformedRecord(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("crypto error: {0}")]
    Crypto(CryptoError),
}

impl From<CryptoError> for VaultError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::IncorrectPassword => VaultError::IncorrectPassword,
            CryptoError::MalformedRecord(msg) => VaultError::MalformedRecord(msg),
            other => VaultError::Crypto(other),
        }
    }
}

pub type VaultResult<T> = Result<T, VaultError>;

/// Minimum password length accepted at account creation or password change.
pub const MIN_PASSWORD_LENGTH: usize = 8;

// ============================================================================
// AccountRecord - persisted account shape
// ============================================================================

/// Persisted account record. All byte-valued fields are base64 strings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub kdf_salt: String,
    pub kdf_iterations: u32,
    /// `salt:iv:ciphertext` validator triple.
    pub validator_hash: String,
    pub encrypted_master_key: String,
    #[serde(rename = "masterKeyIV")]
    pub master_key_iv: String,
    /// SHA-256 of the auth token; the server compares this at login and
    /// never sees anything capable of deriving a key.
    pub auth_token_hash: String,
    /// Unix timestamp of account creation.
    pub created_at: i64,
}

impl AccountRecord {
    fn from_parts(envelope: &MasterKeyEnvelope, validator: &Validator, token: &AuthToken) -> Self {
        Self {
            kdf_salt: STANDARD.encode(envelope.kdf_salt.as_bytes()),
            kdf_iterations: envelope.kdf.iterations,
            validator_hash: validator.to_record(),
            encrypted_master_key: STANDARD.encode(&envelope.encrypted.ciphertext),
            master_key_iv: STANDARD.encode(envelope.encrypted.iv),
            auth_token_hash: token.storage_hash(),
            created_at: Utc::now().timestamp(),
        }
    }

    /// Reassemble the typed envelope from the stored base64 fields.
    pub fn envelope(&self) -> VaultResult<MasterKeyEnvelope> {
        let kdf_salt = Salt::from_slice(&decode_field("kdfSalt", &self.kdf_salt)?)?;
        let iv_bytes = decode_field("masterKeyIV", &self.master_key_iv)?;
        let iv: [u8; NONCE_SIZE] = iv_bytes.as_slice().try_into().map_err(|_| {
            VaultError::MalformedRecord(format!("masterKeyIV must be {NONCE_SIZE} bytes"))
        })?;
        let ciphertext = decode_field("encryptedMasterKey", &self.encrypted_master_key)?;

        Ok(MasterKeyEnvelope {
            kdf_salt,
            kdf: KdfParams {
                iterations: self.kdf_iterations,
            },
            encrypted: EncryptedData { iv, ciphertext },
        })
    }

    /// Parse the stored validator triple.
    pub fn validator(&self) -> VaultResult<Validator> {
        Ok(Validator::from_record(&self.validator_hash)?)
    }
}

fn decode_field(name: &str, value: &str) -> VaultResult<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| VaultError::MalformedRecord(format!("{name}: {e}")))
}

// ============================================================================
// Session - master-key lifecycle state machine
// ============================================================================

/// Observable session states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Locked,
    Unlocked,
}

/// Default inactivity interval after which the key is cleared.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Holds the master key for the lifetime of an unlocked session.
///
/// The key slot is the single piece of shared state: read-only once set,
/// replaced wholesale on re-unlock, cleared on lock. Clearing drops the key,
/// which zeroizes the underlying bytes. A clone handed out by
/// [`Session::master_key`] lets an in-flight operation finish after the
/// session locks; no new operation can start once the slot is empty.
pub struct Session {
    key: RwLock<Option<MasterKey>>,
    last_activity: RwLock<Instant>,
    idle_timeout: Duration,
}

impl Session {
    pub fn new() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            key: RwLock::new(None),
            last_activity: RwLock::new(Instant::now()),
            idle_timeout,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.key.read().unwrap().is_some() {
            SessionState::Unlocked
        } else {
            SessionState::Locked
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.state() == SessionState::Unlocked
    }

    /// Create a fresh account from a chosen password.
    ///
    /// Generates the master key, wraps it, creates the validator, and
    /// derives the auth token. The session ends up unlocked. The caller
    /// persists the returned record and sends the token to the
    /// authentication collaborator.
    pub fn create_account(&self, password: &str) -> VaultResult<(AccountRecord, AuthToken)> {
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(VaultError::PasswordTooShort);
        }

        let master = generate_master_key();
        let envelope = seal_master_key(&master, password)?;
        let validator = create_validator(&master)?;
        let token = derive_auth_token(password)?;
        let record = AccountRecord::from_parts(&envelope, &validator, &token);

        self.install_key(master);
        debug!("account created; session unlocked");
        Ok((record, token))
    }

    /// Unlock with a password against the stored account record.
    ///
    /// Envelope unwrap and validator check must both pass before the key is
    /// installed; any failure leaves the session exactly as it was.
    pub fn unlock(&self, account: &AccountRecord, password: &str) -> VaultResult<()> {
        let envelope = account.envelope()?;
        let validator = account.validator()?;

        let master = open_master_key(&envelope, password)?;
        check_validator(&master, &validator)?;

        self.install_key(master);
        debug!("session unlocked");
        Ok(())
    }

    /// Clear the key (explicit lock or logout).
    pub fn lock(&self) {
        let mut slot = self.key.write().unwrap();
        if slot.take().is_some() {
            debug!("session locked");
        }
    }

    /// Clone the master key for one operation, refreshing the idle clock.
    pub fn master_key(&self) -> VaultResult<MasterKey> {
        self.lock_if_idle();
        let key = {
            let slot = self.key.read().unwrap();
            slot.as_ref().ok_or(VaultError::MissingKeyMaterial)?.clone()
        };
        self.touch();
        Ok(key)
    }

    /// Reset the inactivity clock.
    pub fn touch(&self) {
        *self.last_activity.write().unwrap() = Instant::now();
    }

    /// Lock if the inactivity interval has elapsed. Returns true when this
    /// call cleared the key.
    pub fn lock_if_idle(&self) -> bool {
        if !self.is_unlocked() {
            return false;
        }
        if self.last_activity.read().unwrap().elapsed() < self.idle_timeout {
            return false;
        }
        warn!("idle timeout reached; locking session");
        self.lock();
        true
    }

    /// Re-wrap the master key under a new password.
    ///
    /// The master key itself does not change, so entries and the validator
    /// stay valid; only the envelope and auth token are replaced. A wrong
    /// old password fails atomically with no state change.
    pub fn change_password(
        &self,
        account: &AccountRecord,
        old_password: &str,
        new_password: &str,
    ) -> VaultResult<(AccountRecord, AuthToken)> {
        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(VaultError::PasswordTooShort);
        }

        let envelope = account.envelope()?;
        let validator = account.validator()?;
        let master = open_master_key(&envelope, old_password)?;
        check_validator(&master, &validator)?;

        let new_envelope = seal_master_key(&master, new_password)?;
        let token = derive_auth_token(new_password)?;
        let mut record = AccountRecord::from_parts(&new_envelope, &validator, &token);
        record.created_at = account.created_at;

        self.install_key(master);
        debug!("password changed; envelope re-wrapped");
        Ok((record, token))
    }

    fn install_key(&self, master: MasterKey) {
        // A replaced key zeroizes when its slot value drops
        *self.key.write().unwrap() = Some(master);
        self.touch();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Idle watchdog
// ============================================================================

/// Spawn a background task that enforces the idle timeout even when nothing
/// touches the session. The check cadence is a fraction of the timeout.
pub fn spawn_idle_watchdog(session: Arc<Session>) -> tokio::task::JoinHandle<()> {
    let interval = (session.idle_timeout / 4).max(Duration::from_millis(100));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if session.lock_if_idle() {
                debug!("watchdog cleared idle session key");
            }
        }
    })
}

// ============================================================================
// Authentication collaborator
// ============================================================================

/// Server-side login contract.
///
/// Implementations only ever see the auth token and the account record's
/// opaque fields - never the master key, password key, or password.
pub trait Authenticator: Send + Sync {
    /// Register a new account record under its auth-token hash.
    fn register(&self, account: &AccountRecord) -> VaultResult<()>;

    /// Exchange an auth token for an opaque session credential.
    fn login(&self, token: &AuthToken) -> VaultResult<String>;
}

/// In-memory authenticator for tests and local development.
#[derive(Default)]
pub struct MemoryAuthenticator {
    /// Account records keyed by auth-token hash.
    accounts: RwLock<HashMap<String, AccountRecord>>,
    /// Issued credentials mapped back to the auth-token hash.
    sessions: RwLock<HashMap<String, String>>,
    counter: AtomicU64,
}

impl MemoryAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the account record behind an issued credential.
    pub fn account_for(&self, credential: &str) -> Option<AccountRecord> {
        let sessions = self.sessions.read().unwrap();
        let hash = sessions.get(credential)?;
        self.accounts.read().unwrap().get(hash).cloned()
    }
}

impl Authenticator for MemoryAuthenticator {
    fn register(&self, account: &AccountRecord) -> VaultResult<()> {
        self.accounts
            .write()
            .unwrap()
            .insert(account.auth_token_hash.clone(), account.clone());
        Ok(())
    }

    fn login(&self, token: &AuthToken) -> VaultResult<String> {
        let hash = token.storage_hash();
        if !self.accounts.read().unwrap().contains_key(&hash) {
            return Err(VaultError::Auth("unknown credentials".into()));
        }
        let credential = format!("session-{}", self.counter.fetch_add(1, Ordering::Relaxed));
        self.sessions
            .write()
            .unwrap()
            .insert(credential.clone(), hash);
        Ok(credential)
    }
}
