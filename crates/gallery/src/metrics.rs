use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::hub::BroadcastReport;

/// Atomic counters tracking gallery activity.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct GalleryMetrics {
    /// Uploads that produced a metadata row.
    pub uploads_accepted: AtomicU64,
    /// Uploads refused for a client fault (wrong type, no file).
    pub uploads_rejected: AtomicU64,
    /// Uploads that failed on storage or metadata.
    pub uploads_failed: AtomicU64,
    /// Blobs left behind by a failed metadata insert.
    pub orphaned_blobs: AtomicU64,
    /// Events pushed to the notification hub.
    pub events_broadcast: AtomicU64,
    /// Individual session deliveries.
    pub deliveries: AtomicU64,
    /// Session deliveries skipped (not open, lagging, or closed).
    pub deliveries_skipped: AtomicU64,
    /// Deletes that removed a row.
    pub deletes: AtomicU64,
    /// Deletes for an id with no row.
    pub deletes_missed: AtomicU64,
    /// Orphan blobs removed by reconciliation.
    pub blobs_reclaimed: AtomicU64,
}

impl GalleryMetrics {
    pub fn increment_accepted(&self) {
        self.uploads_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejected(&self) {
        self.uploads_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed(&self) {
        self.uploads_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_orphaned(&self) {
        self.orphaned_blobs.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold one broadcast's outcome into the counters.
    pub fn record_broadcast(&self, report: &BroadcastReport) {
        self.events_broadcast.fetch_add(1, Ordering::Relaxed);
        self.deliveries
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.deliveries_skipped
            .fetch_add(report.skipped() as u64, Ordering::Relaxed);
    }

    pub fn increment_deletes(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deletes_missed(&self) {
        self.deletes_missed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_reclaimed(&self, n: u64) {
        self.blobs_reclaimed.fetch_add(n, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uploads_accepted: self.uploads_accepted.load(Ordering::Relaxed),
            uploads_rejected: self.uploads_rejected.load(Ordering::Relaxed),
            uploads_failed: self.uploads_failed.load(Ordering::Relaxed),
            orphaned_blobs: self.orphaned_blobs.load(Ordering::Relaxed),
            events_broadcast: self.events_broadcast.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            deliveries_skipped: self.deliveries_skipped.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            deletes_missed: self.deletes_missed.load(Ordering::Relaxed),
            blobs_reclaimed: self.blobs_reclaimed.load(Ordering::Relaxed),
        }
    }
}

/// A plain-data snapshot of [`GalleryMetrics`] at a single point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub uploads_accepted: u64,
    pub uploads_rejected: u64,
    pub uploads_failed: u64,
    pub orphaned_blobs: u64,
    pub events_broadcast: u64,
    pub deliveries: u64,
    pub deliveries_skipped: u64,
    pub deletes: u64,
    pub deletes_missed: u64,
    pub blobs_reclaimed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_metrics_are_zero() {
        assert_eq!(GalleryMetrics::default().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn broadcast_report_is_folded_in() {
        let m = GalleryMetrics::default();
        m.record_broadcast(&BroadcastReport {
            delivered: 3,
            not_open: 1,
            lagged: 1,
            closed: 0,
        });
        let snap = m.snapshot();
        assert_eq!(snap.events_broadcast, 1);
        assert_eq!(snap.deliveries, 3);
        assert_eq!(snap.deliveries_skipped, 2);
    }

    #[test]
    fn counters_increment() {
        let m = GalleryMetrics::default();
        m.increment_accepted();
        m.increment_accepted();
        m.increment_rejected();
        m.increment_failed();
        m.increment_orphaned();
        m.add_reclaimed(4);
        let snap = m.snapshot();
        assert_eq!(snap.uploads_accepted, 2);
        assert_eq!(snap.uploads_rejected, 1);
        assert_eq!(snap.uploads_failed, 1);
        assert_eq!(snap.orphaned_blobs, 1);
        assert_eq!(snap.blobs_reclaimed, 4);
    }
}
