//! Entry content ciphering.
//!
//! Each entry carries its own random salt; the cipher key is HKDF-derived
//! from the master key and that salt at every read or write, never cached.

use daybook_crypto::{EncryptedData, MasterKey, Salt, decrypt, derive_entry_key, encrypt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attachment::{AttachmentMetadata, encrypt_attachment};
use crate::error::{EntryError, EntryResult};
use crate::payload::EntryPayload;
use crate::store::BlobStore;

/// Encrypted journal entry as persisted: id and salt in the clear, payload
/// and attachment bytes opaque.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEntry {
    pub id: Uuid,
    pub entry_salt: Salt,
    /// Payload ciphertext with its nonce.
    pub payload: EncryptedData,
    pub attachments: Vec<AttachmentMetadata>,
}

/// Encrypt a new entry: fresh id, fresh salt, fresh derived key.
pub fn encrypt_entry(master: &MasterKey, payload: &EntryPayload) -> EntryResult<EncryptedEntry> {
    payload.validate()?;
    let id = Uuid::new_v4();
    let entry_salt = Salt::random();
    let key = derive_entry_key(master, &entry_salt);
    let encrypted = encrypt(key.as_bytes(), &payload.canonical_bytes()?)?;

    Ok(EncryptedEntry {
        id,
        entry_salt,
        payload: encrypted,
        attachments: Vec::new(),
    })
}

/// Re-encrypt an edited payload in place: same id, same salt (the key is
/// shared with the entry's attachments), fresh nonce.
pub fn update_entry(
    master: &MasterKey,
    entry: &mut EncryptedEntry,
    payload: &EntryPayload,
) -> EntryResult<()> {
    payload.validate()?;
    let key = derive_entry_key(master, &entry.entry_salt);
    entry.payload = encrypt(key.as_bytes(), &payload.canonical_bytes()?)?;
    Ok(())
}

/// Decrypt one entry's payload.
///
/// Authentication failure is reported as [`EntryError::CorruptedEntry`]
/// carrying the entry id; the caller decides how to render it.
pub fn decrypt_entry(master: &MasterKey, entry: &EncryptedEntry) -> EntryResult<EntryPayload> {
    let key = derive_entry_key(master, &entry.entry_salt);
    let bytes = decrypt(key.as_bytes(), &entry.payload)
        .map_err(|_| EntryError::CorruptedEntry { id: entry.id })?;
    EntryPayload::from_canonical_bytes(&bytes)
}

/// Encrypt and attach a file to an entry.
pub fn attach_file(
    master: &MasterKey,
    entry: &mut EncryptedEntry,
    bytes: &[u8],
    mime_type: &str,
    store: &dyn BlobStore,
) -> EntryResult<()> {
    let metadata = encrypt_attachment(master, &entry.entry_salt, bytes, mime_type, store)?;
    entry.attachments.push(metadata);
    Ok(())
}

/// Outcome of decrypting one entry in a bulk pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryOutcome {
    Decrypted { id: Uuid, payload: EntryPayload },
    /// Flagged in place so the listing renders instead of crashing.
    Corrupted { id: Uuid },
}

/// Decrypt a batch, isolating corrupted records: one bad entry cannot take
/// down enumeration of the rest.
pub fn decrypt_entries(master: &MasterKey, entries: &[EncryptedEntry]) -> Vec<EntryOutcome> {
    entries
        .iter()
        .map(|entry| match decrypt_entry(master, entry) {
            Ok(payload) => EntryOutcome::Decrypted {
                id: entry.id,
                payload,
            },
            Err(_) => EntryOutcome::Corrupted { id: entry.id },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use daybook_crypto::generate_master_key;

    fn payload(content: &str) -> EntryPayload {
        EntryPayload {
            title: "Test".into(),
            content: content.into(),
            mood: None,
        }
    }

    #[test]
    fn entry_round_trip() {
        let master = generate_master_key();
        let entry = encrypt_entry(&master, &payload("Hello, diary.")).unwrap();
        let decrypted = decrypt_entry(&master, &entry).unwrap();
        assert_eq!(decrypted.content, "Hello, diary.");
    }

    #[test]
    fn same_payload_distinct_entries_distinct_ciphertext() {
        let master = generate_master_key();
        let e1 = encrypt_entry(&master, &payload("same")).unwrap();
        let e2 = encrypt_entry(&master, &payload("same")).unwrap();
        assert_ne!(e1.id, e2.id);
        assert_ne!(e1.entry_salt, e2.entry_salt);
        assert_ne!(e1.payload.ciphertext, e2.payload.ciphertext);
    }

    #[test]
    fn update_keeps_id_and_salt_but_rotates_nonce() {
        let master = generate_master_key();
        let mut entry = encrypt_entry(&master, &payload("v1")).unwrap();
        let (id, salt, iv) = (entry.id, entry.entry_salt.clone(), entry.payload.iv);

        update_entry(&master, &mut entry, &payload("v2")).unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.entry_salt, salt);
        assert_ne!(entry.payload.iv, iv);
        assert_eq!(decrypt_entry(&master, &entry).unwrap().content, "v2");
    }

    #[test]
    fn corrupted_entry_reports_its_id() {
        let master = generate_master_key();
        let mut entry = encrypt_entry(&master, &payload("fragile")).unwrap();
        entry.payload.ciphertext[5] ^= 0x01;

        match decrypt_entry(&master, &entry) {
            Err(EntryError::CorruptedEntry { id }) => assert_eq!(id, entry.id),
            other => panic!("expected CorruptedEntry, got {other:?}"),
        }
    }

    #[test]
    fn bulk_decrypt_isolates_corruption() {
        let master = generate_master_key();
        let good1 = encrypt_entry(&master, &payload("one")).unwrap();
        let mut bad = encrypt_entry(&master, &payload("two")).unwrap();
        let good2 = encrypt_entry(&master, &payload("three")).unwrap();
        bad.payload.ciphertext[0] ^= 0xFF;

        let outcomes = decrypt_entries(&master, &[good1.clone(), bad.clone(), good2.clone()]);
        assert_eq!(outcomes.len(), 3);
        assert!(
            matches!(&outcomes[0], EntryOutcome::Decrypted { id, payload } if *id == good1.id && payload.content == "one")
        );
        assert_eq!(outcomes[1], EntryOutcome::Corrupted { id: bad.id });
        assert!(
            matches!(&outcomes[2], EntryOutcome::Decrypted { id, .. } if *id == good2.id)
        );
    }

    #[test]
    fn invalid_payload_never_reaches_the_cipher() {
        let master = generate_master_key();
        let oversized = EntryPayload {
            title: "x".repeat(crate::payload::TITLE_MAX_CHARS + 1),
            content: String::new(),
            mood: None,
        };
        assert!(matches!(
            encrypt_entry(&master, &oversized),
            Err(EntryError::InvalidPayload(_))
        ));
    }

    #[test]
    fn entry_serde_round_trip() {
        let master = generate_master_key();
        let entry = encrypt_entry(&master, &payload("persist me")).unwrap();

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"entrySalt\""));
        let restored: EncryptedEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(
            decrypt_entry(&master, &restored).unwrap().content,
            "persist me"
        );
    }
}
