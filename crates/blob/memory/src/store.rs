use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use galleria_blob::{BlobError, BlobStore, StoredNameGenerator};
use galleria_core::StoredName;

/// Attempts before giving up on finding an unused name.
const MAX_NAME_ATTEMPTS: u32 = 8;

/// In-memory [`BlobStore`] backed by a [`DashMap`].
///
/// Contents are lost when the process exits. Useful for tests and for
/// ephemeral deployments where the metadata store is also in memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<StoredName, Bytes>,
    names: StoredNameGenerator,
}

impl MemoryBlobStore {
    /// Create a new, empty store that prefixes names with `image`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with a custom name prefix.
    pub fn with_field(field: &str) -> Self {
        Self {
            blobs: DashMap::new(),
            names: StoredNameGenerator::new(field),
        }
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: Bytes, extension: Option<&str>) -> Result<StoredName, BlobError> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = self.names.next_name(extension)?;
            // Only insert if vacant: a blob is never overwritten.
            if let Entry::Vacant(vacant) = self.blobs.entry(name.clone()) {
                vacant.insert(data);
                return Ok(name);
            }
        }
        Err(BlobError::NameExhausted {
            attempts: MAX_NAME_ATTEMPTS,
        })
    }

    async fn exists(&self, name: &StoredName) -> Result<bool, BlobError> {
        Ok(self.blobs.contains_key(name))
    }

    async fn get(&self, name: &StoredName) -> Result<Option<Bytes>, BlobError> {
        Ok(self.blobs.get(name).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, name: &StoredName) -> Result<bool, BlobError> {
        Ok(self.blobs.remove(name).is_some())
    }

    async fn list(&self) -> Result<Vec<StoredName>, BlobError> {
        let mut names: Vec<StoredName> = self.blobs.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }
}
