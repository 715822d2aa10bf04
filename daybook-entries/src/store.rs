//! Attachment storage collaborator.
//!
//! Ciphertext bytes live outside the entry record (filesystem, object
//! storage); the core only needs opaque put/get against a reference.

use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use crate::error::{EntryError, EntryResult};

/// Opaque blob storage: `put` returns a reference that `get` resolves later.
/// Implementations only ever see ciphertext.
pub trait BlobStore: Send + Sync {
    fn put(&self, bytes: &[u8]) -> EntryResult<String>;
    fn get(&self, storage_ref: &str) -> EntryResult<Vec<u8>>;
}

/// In-memory blob store for tests and local development.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, bytes: &[u8]) -> EntryResult<String> {
        let storage_ref = Uuid::new_v4().to_string();
        self.blobs
            .write()
            .unwrap()
            .insert(storage_ref.clone(), bytes.to_vec());
        Ok(storage_ref)
    }

    fn get(&self, storage_ref: &str) -> EntryResult<Vec<u8>> {
        self.blobs
            .read()
            .unwrap()
            .get(storage_ref)
            .cloned()
            .ok_or_else(|| EntryError::Storage(format!("blob not found: {storage_ref}")))
    }
}
