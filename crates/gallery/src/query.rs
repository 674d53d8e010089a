use std::sync::Arc;

use tracing::{debug, info, warn};

use galleria_blob::BlobStore;
use galleria_core::{ImageId, ImageRecord};
use galleria_metadata::MetadataStore;

use crate::error::GalleryError;
use crate::metrics::GalleryMetrics;

/// Result of [`QueryService::delete_by_id`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The row was removed. `blob_removed` reports whether its stored file
    /// was deleted as well.
    Deleted {
        record: ImageRecord,
        blob_removed: bool,
    },
    /// No row has this id.
    NotFound,
}

/// Read, rename and delete access to image records.
///
/// None of these operations notify viewers.
pub struct QueryService {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    metrics: Arc<GalleryMetrics>,
    remove_blob_on_delete: bool,
}

impl QueryService {
    pub(crate) fn new(
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        metrics: Arc<GalleryMetrics>,
        remove_blob_on_delete: bool,
    ) -> Self {
        Self {
            blobs,
            metadata,
            metrics,
            remove_blob_on_delete,
        }
    }

    /// Every record, ordered by id ascending.
    pub async fn list(&self) -> Result<Vec<ImageRecord>, GalleryError> {
        Ok(self.metadata.list_all().await?)
    }

    pub async fn get(&self, id: ImageId) -> Result<Option<ImageRecord>, GalleryError> {
        Ok(self.metadata.get(id).await?)
    }

    /// Replace the display name of a record. Returns `false` if no record
    /// has this id.
    pub async fn rename(&self, id: ImageId, new_name: &str) -> Result<bool, GalleryError> {
        let updated = self.metadata.update_original_name(id, new_name).await?;
        debug!(%id, updated, "rename");
        Ok(updated)
    }

    /// Delete a record and, if configured, its stored blob.
    ///
    /// The row goes first. A blob that cannot be removed afterwards is
    /// logged and left for reconciliation; it never fails the delete.
    pub async fn delete_by_id(&self, id: ImageId) -> Result<DeleteOutcome, GalleryError> {
        let Some(record) = self.metadata.delete(id).await? else {
            self.metrics.increment_deletes_missed();
            return Ok(DeleteOutcome::NotFound);
        };
        self.metrics.increment_deletes();

        let blob_removed = if self.remove_blob_on_delete {
            match self.blobs.delete(&record.stored_name).await {
                Ok(true) => true,
                Ok(false) => {
                    warn!(%id, stored_name = %record.stored_name, "deleted record had no stored blob");
                    false
                }
                Err(e) => {
                    warn!(
                        %id,
                        stored_name = %record.stored_name,
                        error = %e,
                        "blob removal failed; left for reconciliation"
                    );
                    false
                }
            }
        } else {
            false
        };

        info!(%id, stored_name = %record.stored_name, blob_removed, "image deleted");
        Ok(DeleteOutcome::Deleted {
            record,
            blob_removed,
        })
    }
}
