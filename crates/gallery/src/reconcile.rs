//! Orphan blob reconciliation.
//!
//! A blob is an orphan when no metadata row references it. Orphans appear
//! when a metadata insert fails after the blob write, or when a delete
//! could not remove its blob. The sweep lists the blob store, subtracts
//! every referenced name, and deletes the rest.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use galleria_blob::BlobStore;
use galleria_core::StoredName;
use galleria_metadata::MetadataStore;

use crate::error::GalleryError;
use crate::ledger::UploadLedger;
use crate::metrics::GalleryMetrics;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Blobs found in the store.
    pub scanned: usize,
    /// Blobs referenced by a metadata row.
    pub referenced: usize,
    /// Blobs with no metadata row.
    pub orphans: Vec<StoredName>,
    /// Orphans actually deleted. Always zero on a dry run.
    pub removed: usize,
    /// Orphans whose deletion failed.
    pub failed: usize,
    pub dry_run: bool,
}

pub struct Reconciler {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    ledger: Arc<UploadLedger>,
    metrics: Arc<GalleryMetrics>,
}

impl Reconciler {
    pub(crate) fn new(
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        ledger: Arc<UploadLedger>,
        metrics: Arc<GalleryMetrics>,
    ) -> Self {
        Self {
            blobs,
            metadata,
            ledger,
            metrics,
        }
    }

    /// Find orphan blobs and, unless `dry_run`, delete them.
    ///
    /// Uploads pause while the orphan set is computed, so a blob whose row
    /// is still being inserted is never mistaken for an orphan.
    pub async fn reconcile(&self, dry_run: bool) -> Result<ReconcileReport, GalleryError> {
        let mut report = {
            let _exclusive = self.ledger.quiesce().await;
            let stored = self.blobs.list().await?;
            let referenced: HashSet<StoredName> = self
                .metadata
                .list_all()
                .await?
                .into_iter()
                .map(|r| r.stored_name)
                .collect();

            let scanned = stored.len();
            let orphans: Vec<StoredName> = stored
                .into_iter()
                .filter(|name| !referenced.contains(name))
                .collect();
            ReconcileReport {
                scanned,
                referenced: scanned - orphans.len(),
                orphans,
                dry_run,
                ..ReconcileReport::default()
            }
        };

        if !dry_run {
            for name in &report.orphans {
                match self.blobs.delete(name).await {
                    Ok(_) => {
                        self.ledger.forget_orphan(name);
                        report.removed += 1;
                    }
                    Err(e) => {
                        warn!(stored_name = %name, error = %e, "orphan blob removal failed");
                        report.failed += 1;
                    }
                }
            }
            self.metrics.add_reclaimed(report.removed as u64);
        }

        info!(
            scanned = report.scanned,
            orphans = report.orphans.len(),
            removed = report.removed,
            failed = report.failed,
            dry_run,
            "reconciliation finished"
        );
        Ok(report)
    }
}

/// Runs [`Reconciler::reconcile`] on a fixed interval until shut down.
pub struct ReconcileWorker {
    reconciler: Arc<Reconciler>,
    every: Duration,
    shutdown_rx: mpsc::Receiver<()>,
}

impl ReconcileWorker {
    pub fn new(reconciler: Arc<Reconciler>, every: Duration, shutdown_rx: mpsc::Receiver<()>) -> Self {
        Self {
            reconciler,
            every,
            shutdown_rx,
        }
    }

    /// Run until a shutdown signal arrives or the sender is dropped.
    pub async fn run(mut self) {
        info!(interval_secs = self.every.as_secs(), "reconcile worker started");
        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; sweep one interval after startup.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("reconcile worker received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    match self.reconciler.reconcile(false).await {
                        Ok(report) if report.orphans.is_empty() => debug!("no orphan blobs"),
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "reconciliation failed"),
                    }
                }
            }
        }
    }
}
