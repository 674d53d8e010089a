use async_trait::async_trait;
use bytes::Bytes;

use galleria_core::StoredName;

use crate::error::BlobError;

/// Durable storage for uploaded image bytes.
///
/// Blobs are write-once: `put` always creates a new, uniquely named blob and
/// never overwrites an existing one. Implementations must be safe for
/// concurrent use; two `put` calls racing in the same instant must still
/// yield distinct names.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under a freshly generated name ending in `extension`
    /// (sanitized; dropped if unusable) and return that name.
    async fn put(&self, data: Bytes, extension: Option<&str>) -> Result<StoredName, BlobError>;

    /// Check whether a blob exists.
    async fn exists(&self, name: &StoredName) -> Result<bool, BlobError>;

    /// Read a blob's bytes. Returns `None` if it does not exist.
    async fn get(&self, name: &StoredName) -> Result<Option<Bytes>, BlobError>;

    /// Delete a blob. Returns `true` if the blob existed.
    async fn delete(&self, name: &StoredName) -> Result<bool, BlobError>;

    /// List every stored blob name.
    ///
    /// This is a full scan and is only meant for reconciliation sweeps.
    async fn list(&self) -> Result<Vec<StoredName>, BlobError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_dyn_blob_store(_: &dyn BlobStore) {}
}
