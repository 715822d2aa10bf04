//! Attachment ciphering through the blob-storage collaborator.
//!
//! Attachments share the owning entry's derived key; each file gets its own
//! random nonce. Files within an entry are independent - no shared mutable
//! state - so callers may process them in parallel.

use base64::{Engine, engine::general_purpose::STANDARD};
use daybook_crypto::{
    EncryptedData, MasterKey, NONCE_SIZE, Salt, decrypt, derive_entry_key, encrypt,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EntryError, EntryResult};
use crate::store::BlobStore;

/// Attachment metadata persisted on the entry; the ciphertext bytes live
/// behind `storage_ref`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentMetadata {
    /// Base64 nonce for this file.
    pub iv: String,
    pub mime_type: String,
    pub storage_ref: String,
}

/// Decrypted attachment with its recovered content type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecryptedAttachment {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Encrypt attachment bytes under the entry's key and hand the ciphertext to
/// the storage collaborator. Returns the metadata to persist on the entry.
pub fn encrypt_attachment(
    master: &MasterKey,
    entry_salt: &Salt,
    bytes: &[u8],
    mime_type: &str,
    store: &dyn BlobStore,
) -> EntryResult<AttachmentMetadata> {
    let key = derive_entry_key(master, entry_salt);
    let encrypted = encrypt(key.as_bytes(), bytes)?;
    let storage_ref = store.put(&encrypted.ciphertext)?;

    Ok(AttachmentMetadata {
        iv: STANDARD.encode(encrypted.iv),
        mime_type: mime_type.to_string(),
        storage_ref,
    })
}

/// Fetch and decrypt one attachment. `entry_id` labels any corruption error.
pub fn decrypt_attachment(
    master: &MasterKey,
    entry_salt: &Salt,
    entry_id: Uuid,
    metadata: &AttachmentMetadata,
    store: &dyn BlobStore,
) -> EntryResult<DecryptedAttachment> {
    let iv_bytes = STANDARD
        .decode(&metadata.iv)
        .map_err(|e| EntryError::MalformedRecord(format!("attachment iv: {e}")))?;
    let iv: [u8; NONCE_SIZE] = iv_bytes.as_slice().try_into().map_err(|_| {
        EntryError::MalformedRecord(format!("attachment iv must be {NONCE_SIZE} bytes"))
    })?;
    let ciphertext = store.get(&metadata.storage_ref)?;

    let key = derive_entry_key(master, entry_salt);
    let bytes = decrypt(key.as_bytes(), &EncryptedData { iv, ciphertext })
        .map_err(|_| EntryError::CorruptedEntry { id: entry_id })?;

    Ok(DecryptedAttachment {
        bytes,
        mime_type: metadata.mime_type.clone(),
    })
}
