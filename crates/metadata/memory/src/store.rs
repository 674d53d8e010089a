use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use galleria_core::{ImageId, ImageRecord, NewImageRecord, StoredName};
use galleria_metadata::{MetadataError, MetadataStore};

/// In-memory [`MetadataStore`] backed by [`DashMap`]s.
///
/// Ids come from an atomic counter starting at 1, mirroring a `SERIAL`
/// column. A secondary index on stored name enforces uniqueness the same
/// way the SQL backend's `UNIQUE` constraint does.
#[derive(Debug)]
pub struct MemoryMetadataStore {
    records: DashMap<ImageId, ImageRecord>,
    by_stored_name: DashMap<StoredName, ImageId>,
    next_id: AtomicI64,
}

impl Default for MemoryMetadataStore {
    fn default() -> Self {
        Self {
            records: DashMap::new(),
            by_stored_name: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl MemoryMetadataStore {
    /// Create a new, empty in-memory metadata store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn insert(&self, record: NewImageRecord) -> Result<ImageRecord, MetadataError> {
        // Claim the stored name first; the record only becomes visible once
        // the claim succeeded, so a rejected insert leaves nothing behind.
        let id = match self.by_stored_name.entry(record.stored_name.clone()) {
            Entry::Occupied(_) => {
                return Err(MetadataError::DuplicateStoredName(
                    record.stored_name.to_string(),
                ));
            }
            Entry::Vacant(vacant) => {
                let id = ImageId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
                vacant.insert(id);
                id
            }
        };

        let stored = record.with_id(id);
        self.records.insert(id, stored.clone());
        Ok(stored)
    }

    async fn list_all(&self) -> Result<Vec<ImageRecord>, MetadataError> {
        let mut all: Vec<ImageRecord> = self.records.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|r| r.id);
        Ok(all)
    }

    async fn get(&self, id: ImageId) -> Result<Option<ImageRecord>, MetadataError> {
        Ok(self.records.get(&id).map(|e| e.value().clone()))
    }

    async fn update_original_name(
        &self,
        id: ImageId,
        original_name: &str,
    ) -> Result<bool, MetadataError> {
        let Some(mut entry) = self.records.get_mut(&id) else {
            return Ok(false);
        };
        original_name.clone_into(&mut entry.original_name);
        Ok(true)
    }

    async fn delete(&self, id: ImageId) -> Result<Option<ImageRecord>, MetadataError> {
        let Some((_, removed)) = self.records.remove(&id) else {
            return Ok(None);
        };
        self.by_stored_name.remove(&removed.stored_name);
        Ok(Some(removed))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let store = MemoryMetadataStore::new();
        galleria_metadata::testing::run_metadata_store_conformance_tests(&store)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn first_id_is_one() {
        let store = MemoryMetadataStore::new();
        let rec = store
            .insert(NewImageRecord {
                stored_name: StoredName::parse("image-1.png").unwrap(),
                original_name: "a.png".into(),
                mime_type: "image/png".into(),
                size_bytes: 10,
            })
            .await
            .unwrap();
        assert_eq!(rec.id, ImageId::new(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_get_unique_ids() {
        let store = Arc::new(MemoryMetadataStore::new());
        let tasks: Vec<_> = (0..100)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .insert(NewImageRecord {
                            stored_name: StoredName::parse(format!("image-{i}.png")).unwrap(),
                            original_name: format!("{i}.png"),
                            mime_type: "image/png".into(),
                            size_bytes: 1,
                        })
                        .await
                        .unwrap()
                        .id
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for task in tasks {
            ids.insert(task.await.unwrap());
        }
        assert_eq!(ids.len(), 100);
        assert_eq!(store.list_all().await.unwrap().len(), 100);
    }
}
