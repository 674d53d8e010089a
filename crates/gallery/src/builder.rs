use std::sync::Arc;

use galleria_blob::BlobStore;
use galleria_metadata::MetadataStore;

use crate::coordinator::UploadCoordinator;
use crate::error::GalleryError;
use crate::gallery::Gallery;
use crate::hub::NotificationHub;
use crate::ledger::UploadLedger;
use crate::metrics::GalleryMetrics;
use crate::query::QueryService;
use crate::reconcile::Reconciler;

/// Fluent builder for constructing a [`Gallery`].
///
/// A [`BlobStore`] and a [`MetadataStore`] must be supplied. Sessions
/// buffer [`NotificationHub::DEFAULT_BUFFER`] events unless configured,
/// and deletes remove the stored blob by default.
pub struct GalleryBuilder {
    blobs: Option<Arc<dyn BlobStore>>,
    metadata: Option<Arc<dyn MetadataStore>>,
    session_buffer: usize,
    remove_blob_on_delete: bool,
}

impl Default for GalleryBuilder {
    fn default() -> Self {
        Self {
            blobs: None,
            metadata: None,
            session_buffer: NotificationHub::DEFAULT_BUFFER,
            remove_blob_on_delete: true,
        }
    }
}

impl GalleryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    #[must_use]
    pub fn metadata_store(mut self, metadata: Arc<dyn MetadataStore>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Events buffered per viewer session before deliveries are skipped.
    #[must_use]
    pub fn session_buffer(mut self, size: usize) -> Self {
        self.session_buffer = size;
        self
    }

    #[must_use]
    pub fn remove_blob_on_delete(mut self, enabled: bool) -> Self {
        self.remove_blob_on_delete = enabled;
        self
    }

    /// Consume the builder and produce a [`Gallery`].
    ///
    /// # Errors
    ///
    /// Returns [`GalleryError::Configuration`] if a store is missing.
    pub fn build(self) -> Result<Gallery, GalleryError> {
        let blobs = self
            .blobs
            .ok_or_else(|| GalleryError::Configuration("blob store is required".into()))?;
        let metadata = self
            .metadata
            .ok_or_else(|| GalleryError::Configuration("metadata store is required".into()))?;

        let hub = NotificationHub::new(self.session_buffer);
        let ledger = UploadLedger::new();
        let metrics = Arc::new(GalleryMetrics::default());

        Ok(Gallery {
            uploads: Arc::new(UploadCoordinator::new(
                Arc::clone(&blobs),
                Arc::clone(&metadata),
                Arc::clone(&hub),
                Arc::clone(&ledger),
                Arc::clone(&metrics),
            )),
            query: QueryService::new(
                Arc::clone(&blobs),
                Arc::clone(&metadata),
                Arc::clone(&metrics),
                self.remove_blob_on_delete,
            ),
            reconciler: Arc::new(Reconciler::new(
                blobs,
                metadata,
                Arc::clone(&ledger),
                Arc::clone(&metrics),
            )),
            hub,
            ledger,
            metrics,
        })
    }
}
