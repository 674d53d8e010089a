use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, info, info_span, warn};

use galleria_blob::BlobStore;
use galleria_core::{GalleryEvent, ImageRecord, NewImageRecord};
use galleria_metadata::MetadataStore;

use crate::error::UploadError;
use crate::hub::NotificationHub;
use crate::ledger::UploadLedger;
use crate::metrics::GalleryMetrics;

/// A file received from a client, not yet validated.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub data: Bytes,
    /// Name the client gave the file. Kept verbatim.
    pub original_name: String,
    /// MIME type the client declared.
    pub mime_type: String,
}

impl IncomingFile {
    pub fn new(
        data: impl Into<Bytes>,
        original_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            original_name: original_name.into(),
            mime_type: mime_type.into(),
        }
    }

    fn extension(&self) -> Option<&str> {
        Path::new(&self.original_name)
            .extension()
            .and_then(|ext| ext.to_str())
    }
}

/// Runs the upload sequence: validate, write the blob, insert the metadata
/// row, then notify viewers.
///
/// Uploads never share mutable state with each other; the only contention
/// points are the blob store's name allocation and the metadata store's id
/// allocation, both of which are safe under concurrency.
pub struct UploadCoordinator {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    hub: Arc<NotificationHub>,
    ledger: Arc<UploadLedger>,
    metrics: Arc<GalleryMetrics>,
    tracker: TaskTracker,
    draining: AtomicBool,
}

impl UploadCoordinator {
    pub(crate) fn new(
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        hub: Arc<NotificationHub>,
        ledger: Arc<UploadLedger>,
        metrics: Arc<GalleryMetrics>,
    ) -> Self {
        Self {
            blobs,
            metadata,
            hub,
            ledger,
            metrics,
            tracker: TaskTracker::new(),
            draining: AtomicBool::new(false),
        }
    }

    /// Run an upload on its own task and wait for the result.
    ///
    /// Once accepted, the upload runs to completion even if the caller stops
    /// waiting (for instance because the client disconnected). Fails with
    /// [`UploadError::Interrupted`] once [`drain`](Self::drain) has begun.
    pub async fn submit(self: &Arc<Self>, file: IncomingFile) -> Result<ImageRecord, UploadError> {
        if self.draining.load(Ordering::Acquire) {
            return Err(UploadError::Interrupted("server is shutting down".into()));
        }
        let this = Arc::clone(self);
        self.tracker
            .spawn(async move { this.handle_upload(file).await })
            .await
            .map_err(|e| UploadError::Interrupted(e.to_string()))?
    }

    /// Run the upload sequence on the current task.
    pub async fn handle_upload(&self, file: IncomingFile) -> Result<ImageRecord, UploadError> {
        let span = info_span!(
            "upload",
            original_name = %file.original_name,
            mime_type = %file.mime_type,
            size = file.data.len(),
        );
        self.run(file).instrument(span).await
    }

    async fn run(&self, file: IncomingFile) -> Result<ImageRecord, UploadError> {
        if let Err(e) = validate(&file) {
            debug!(error = %e, "upload rejected");
            self.metrics.increment_rejected();
            return Err(e);
        }

        let mut intent = self.ledger.begin(&file.original_name).await;

        let stored_name = match self.blobs.put(file.data.clone(), file.extension()).await {
            Ok(name) => name,
            Err(e) => {
                warn!(error = %e, "blob write failed");
                self.metrics.increment_failed();
                return Err(UploadError::StorageWrite(e));
            }
        };
        intent.blob_written(&stored_name);

        let new_record = NewImageRecord {
            stored_name: stored_name.clone(),
            original_name: file.original_name,
            mime_type: file.mime_type,
            size_bytes: file.data.len() as u64,
        };
        let record = match self.metadata.insert(new_record).await {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    stored_name = %stored_name,
                    error = %e,
                    "metadata insert failed; blob left as orphan"
                );
                intent.orphaned(e.to_string());
                self.metrics.increment_failed();
                self.metrics.increment_orphaned();
                return Err(UploadError::MetadataWrite {
                    stored_name,
                    source: e,
                });
            }
        };
        intent.complete();
        self.metrics.increment_accepted();

        let report = self.hub.broadcast(GalleryEvent::ImageUploaded);
        self.metrics.record_broadcast(&report);

        info!(
            id = %record.id,
            stored_name = %record.stored_name,
            notified = report.delivered,
            "upload stored"
        );
        Ok(record)
    }

    /// Stop accepting submitted uploads and wait for running ones to finish.
    pub async fn drain(&self) {
        self.draining.store(true, Ordering::Release);
        self.tracker.close();
        self.tracker.wait().await;
    }
}

fn validate(file: &IncomingFile) -> Result<(), UploadError> {
    if !file.mime_type.starts_with("image/") {
        return Err(UploadError::InvalidFileType {
            mime_type: file.mime_type.clone(),
        });
    }
    if file.data.is_empty() {
        return Err(UploadError::NoFile);
    }
    Ok(())
}
