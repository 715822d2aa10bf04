//! Login-token derivation.
//!
//! The server must authenticate a user without ever holding a
//! password-equivalent or key-equivalent value. The token sent in place of
//! the password is an HMAC of a fixed purpose string keyed by the password:
//! stable per password, and on a different derivation path than any
//! decryption key. [`crate::key::derive_password_key`] is PBKDF2 over a
//! per-account salt; this is a salt-free keyed hash of a constant. Neither
//! output is derivable from the other.

use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{CryptoError, CryptoResult};

type HmacSha256 = Hmac<Sha256>;

/// Domain-separation constant hashed into every auth token.
const AUTH_TOKEN_PURPOSE: &[u8] = b"daybook/auth-token/v1";

/// Deterministic login credential derived from the password.
///
/// Safe to transmit: knowing the token does not permit deriving the password
/// key or master key. The server stores only [`AuthToken::storage_hash`].
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken([u8; 32]);

impl AuthToken {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Base64 form sent to the authentication collaborator.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| CryptoError::MalformedRecord(format!("auth token: {e}")))?;
        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::MalformedRecord(format!("auth token must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    /// Hex-encoded SHA-256 of the token - the only form the server persists.
    pub fn storage_hash(&self) -> String {
        Sha256::digest(self.0)
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Derive the auth token for a password.
pub fn derive_auth_token(password: &str) -> CryptoResult<AuthToken> {
    if password.is_empty() {
        return Err(CryptoError::KeyDerivation(
            "password must not be empty".to_string(),
        ));
    }
    let mut mac = HmacSha256::new_from_slice(password.as_bytes())
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    mac.update(AUTH_TOKEN_PURPOSE);
    Ok(AuthToken(mac.finalize().into_bytes().into()))
}
