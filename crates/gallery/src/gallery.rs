use std::sync::Arc;

use tracing::info;

use galleria_core::{ImageId, ImageRecord};

use crate::coordinator::{IncomingFile, UploadCoordinator};
use crate::error::{GalleryError, UploadError};
use crate::hub::{NotificationHub, Session};
use crate::ledger::UploadLedger;
use crate::metrics::GalleryMetrics;
use crate::query::{DeleteOutcome, QueryService};
use crate::reconcile::{ReconcileReport, Reconciler};

/// The assembled gallery: uploads, queries, viewer notifications and
/// reconciliation over one blob store and one metadata store.
///
/// Construct with [`GalleryBuilder`](crate::GalleryBuilder). Cheap to share
/// behind an `Arc`; every method takes `&self`.
pub struct Gallery {
    pub(crate) uploads: Arc<UploadCoordinator>,
    pub(crate) query: QueryService,
    pub(crate) hub: Arc<NotificationHub>,
    pub(crate) ledger: Arc<UploadLedger>,
    pub(crate) reconciler: Arc<Reconciler>,
    pub(crate) metrics: Arc<GalleryMetrics>,
}

impl Gallery {
    /// Validate and store an upload, then notify open viewer sessions.
    pub async fn upload(&self, file: IncomingFile) -> Result<ImageRecord, UploadError> {
        self.uploads.submit(file).await
    }

    pub async fn list(&self) -> Result<Vec<ImageRecord>, GalleryError> {
        self.query.list().await
    }

    pub async fn get(&self, id: ImageId) -> Result<Option<ImageRecord>, GalleryError> {
        self.query.get(id).await
    }

    pub async fn rename(&self, id: ImageId, new_name: &str) -> Result<bool, GalleryError> {
        self.query.rename(id, new_name).await
    }

    pub async fn delete(&self, id: ImageId) -> Result<DeleteOutcome, GalleryError> {
        self.query.delete_by_id(id).await
    }

    /// Register a new viewer session.
    pub fn connect(&self) -> Session {
        self.hub.register()
    }

    pub async fn reconcile(&self, dry_run: bool) -> Result<ReconcileReport, GalleryError> {
        self.reconciler.reconcile(dry_run).await
    }

    pub fn hub(&self) -> &Arc<NotificationHub> {
        &self.hub
    }

    pub fn ledger(&self) -> &Arc<UploadLedger> {
        &self.ledger
    }

    pub fn reconciler(&self) -> Arc<Reconciler> {
        Arc::clone(&self.reconciler)
    }

    pub fn metrics(&self) -> &GalleryMetrics {
        &self.metrics
    }

    /// Wait for in-flight uploads to finish. Call during server shutdown.
    pub async fn shutdown(&self) {
        self.uploads.drain().await;
        info!("gallery shutdown complete");
    }
}
