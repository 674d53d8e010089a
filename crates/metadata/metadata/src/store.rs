use async_trait::async_trait;

use galleria_core::{ImageId, ImageRecord, NewImageRecord};

use crate::error::MetadataError;

/// Durable table of image records.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a record and return it with a freshly assigned id.
    ///
    /// Atomic: either the full record is persisted under a new id, or
    /// nothing is.
    async fn insert(&self, record: NewImageRecord) -> Result<ImageRecord, MetadataError>;

    /// Every record, ordered by ascending id (insertion order).
    ///
    /// Full scan with no pagination.
    async fn list_all(&self) -> Result<Vec<ImageRecord>, MetadataError>;

    /// Fetch a single record.
    async fn get(&self, id: ImageId) -> Result<Option<ImageRecord>, MetadataError>;

    /// Replace a record's original name. Returns `true` if a row matched.
    async fn update_original_name(
        &self,
        id: ImageId,
        original_name: &str,
    ) -> Result<bool, MetadataError>;

    /// Delete a record, returning it if a row matched.
    async fn delete(&self, id: ImageId) -> Result<Option<ImageRecord>, MetadataError>;
}
