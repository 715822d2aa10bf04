//! Entry payload record.
//!
//! A fixed-shape record with explicit optional fields, validated before it
//! ever reaches the cipher. Its canonical byte encoding - what actually gets
//! enciphered - is the serde_json serialization in the struct's declared
//! field order, so the same payload always produces the same plaintext
//! bytes.

use serde::{Deserialize, Serialize};

use crate::error::{EntryError, EntryResult};

/// Maximum accepted title length in characters.
pub const TITLE_MAX_CHARS: usize = 512;

/// Maximum accepted mood length in characters.
pub const MOOD_MAX_CHARS: usize = 64;

/// Plaintext journal-entry payload: what gets encrypted, nothing else.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryPayload {
    pub title: String,
    pub content: String,
    pub mood: Option<String>,
}

impl EntryPayload {
    /// Validate before encryption; malformed payloads never reach the cipher.
    pub fn validate(&self) -> EntryResult<()> {
        if self.title.chars().count() > TITLE_MAX_CHARS {
            return Err(EntryError::InvalidPayload(format!(
                "title exceeds {TITLE_MAX_CHARS} characters"
            )));
        }
        if let Some(mood) = &self.mood {
            if mood.is_empty() || mood.chars().count() > MOOD_MAX_CHARS {
                return Err(EntryError::InvalidPayload(format!(
                    "mood must be 1..={MOOD_MAX_CHARS} characters"
                )));
            }
        }
        Ok(())
    }

    /// Canonical byte encoding used for encryption.
    pub fn canonical_bytes(&self) -> EntryResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| EntryError::Serialization(e.to_string()))
    }

    pub(crate) fn from_canonical_bytes(bytes: &[u8]) -> EntryResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| EntryError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> EntryPayload {
        EntryPayload {
            title: "A day".into(),
            content: "Hello, diary.".into(),
            mood: Some("calm".into()),
        }
    }

    #[test]
    fn canonical_bytes_are_deterministic() {
        let p = payload();
        assert_eq!(p.canonical_bytes().unwrap(), p.canonical_bytes().unwrap());
    }

    #[test]
    fn canonical_round_trip() {
        let p = payload();
        let back = EntryPayload::from_canonical_bytes(&p.canonical_bytes().unwrap()).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn missing_mood_is_allowed() {
        let p = EntryPayload {
            title: String::new(),
            content: "no mood today".into(),
            mood: None,
        };
        assert!(p.validate().is_ok());
        let back = EntryPayload::from_canonical_bytes(&p.canonical_bytes().unwrap()).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn unknown_fields_rejected() {
        let raw = br#"{"title":"t","content":"c","mood":null,"injected":"x"}"#;
        assert!(EntryPayload::from_canonical_bytes(raw).is_err());
    }

    #[test]
    fn oversized_title_rejected() {
        let p = EntryPayload {
            title: "x".repeat(TITLE_MAX_CHARS + 1),
            content: String::new(),
            mood: None,
        };
        assert!(matches!(p.validate(), Err(EntryError::InvalidPayload(_))));
    }

    #[test]
    fn empty_mood_rejected() {
        let p = EntryPayload {
            title: "t".into(),
            content: "c".into(),
            mood: Some(String::new()),
        };
        assert!(matches!(p.validate(), Err(EntryError::InvalidPayload(_))));
    }
}
