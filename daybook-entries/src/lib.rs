//! Entry and attachment ciphering for Daybook.
//!
//! Journal entries and their attachments are encrypted client-side under
//! per-entry keys derived from the session master key. The storage backend
//! only ever sees ciphertext, salts, and nonces.
//!
//! Corruption of a single stored record is isolated: bulk decryption flags
//! the offending entry by id instead of aborting the listing.

mod attachment;
mod entry;
mod error;
mod payload;
mod store;

pub use attachment::{
    AttachmentMetadata, DecryptedAttachment, decrypt_attachment, encrypt_attachment,
};
pub use entry::{
    EncryptedEntry, EntryOutcome, attach_file, decrypt_entries, decrypt_entry, encrypt_entry,
    update_entry,
};
pub use error::{EntryError, EntryResult};
pub use payload::{EntryPayload, MOOD_MAX_CHARS, TITLE_MAX_CHARS};
pub use store::{BlobStore, MemoryBlobStore};
