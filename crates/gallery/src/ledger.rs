//! In-memory record of uploads between "blob written" and "row inserted".
//!
//! An upload opens an [`IntentGuard`] before touching the blob store and
//! closes it once the metadata row exists. Intents whose metadata insert
//! failed stay behind as `Orphaned` until a reconciliation sweep removes
//! their blob.
//!
//! The ledger also gates reconciliation: every open intent holds a shared
//! permit, and a sweep takes the exclusive permit while it computes its
//! orphan set, so it never observes a half-finished upload.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{OwnedRwLockReadGuard, RwLock, RwLockWriteGuard};
use tracing::warn;
use uuid::Uuid;

use galleria_core::StoredName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IntentId(Uuid);

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IntentState {
    /// The upload is still running.
    Pending,
    /// The blob was written but its metadata row never was.
    Orphaned { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadIntent {
    pub id: IntentId,
    pub original_name: String,
    /// Set once the blob store accepted the bytes.
    pub stored_name: Option<StoredName>,
    pub state: IntentState,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct UploadLedger {
    intents: DashMap<IntentId, UploadIntent>,
    gate: Arc<RwLock<()>>,
}

impl UploadLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Open an intent for a new upload.
    ///
    /// Waits while a reconciliation sweep is computing its orphan set.
    pub async fn begin(self: &Arc<Self>, original_name: &str) -> IntentGuard {
        let permit = Arc::clone(&self.gate).read_owned().await;
        let id = IntentId(Uuid::now_v7());
        self.intents.insert(
            id,
            UploadIntent {
                id,
                original_name: original_name.to_owned(),
                stored_name: None,
                state: IntentState::Pending,
                started_at: Utc::now(),
            },
        );
        IntentGuard {
            ledger: Arc::clone(self),
            id,
            stored_name: None,
            finished: false,
            _permit: permit,
        }
    }

    /// Block new intents and wait for every open intent to finish.
    pub(crate) async fn quiesce(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().await
    }

    /// Uploads currently between intent and completion.
    pub fn pending_count(&self) -> usize {
        self.intents
            .iter()
            .filter(|e| e.value().state == IntentState::Pending)
            .count()
    }

    /// Intents whose blob was left without a metadata row, oldest first.
    pub fn orphans(&self) -> Vec<UploadIntent> {
        let mut orphans: Vec<UploadIntent> = self
            .intents
            .iter()
            .filter(|e| matches!(e.value().state, IntentState::Orphaned { .. }))
            .map(|e| e.value().clone())
            .collect();
        orphans.sort_by_key(|i| i.started_at);
        orphans
    }

    /// Drop orphan entries for a blob that no longer exists.
    pub fn forget_orphan(&self, stored_name: &StoredName) {
        self.intents.retain(|_, intent| {
            !(matches!(intent.state, IntentState::Orphaned { .. })
                && intent.stored_name.as_ref() == Some(stored_name))
        });
    }

    fn record_blob(&self, id: IntentId, stored_name: &StoredName) {
        if let Some(mut intent) = self.intents.get_mut(&id) {
            intent.stored_name = Some(stored_name.clone());
        }
    }

    fn mark_orphaned(&self, id: IntentId, reason: String) {
        if let Some(mut intent) = self.intents.get_mut(&id) {
            intent.state = IntentState::Orphaned { reason };
        }
    }

    fn remove(&self, id: IntentId) {
        self.intents.remove(&id);
    }
}

/// An open upload intent.
///
/// Call [`complete`](Self::complete) once the metadata row exists, or
/// [`orphaned`](Self::orphaned) when the insert failed after the blob was
/// written. A guard dropped without either is treated as orphaned if a blob
/// was recorded and discarded otherwise.
pub struct IntentGuard {
    ledger: Arc<UploadLedger>,
    id: IntentId,
    stored_name: Option<StoredName>,
    finished: bool,
    _permit: OwnedRwLockReadGuard<()>,
}

impl IntentGuard {
    pub fn id(&self) -> IntentId {
        self.id
    }

    /// Record the name the blob store assigned.
    pub fn blob_written(&mut self, stored_name: &StoredName) {
        self.ledger.record_blob(self.id, stored_name);
        self.stored_name = Some(stored_name.clone());
    }

    pub fn complete(mut self) {
        self.ledger.remove(self.id);
        self.finished = true;
    }

    pub fn orphaned(mut self, reason: impl Into<String>) {
        self.ledger.mark_orphaned(self.id, reason.into());
        self.finished = true;
    }
}

impl Drop for IntentGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        match self.stored_name {
            Some(ref name) => {
                warn!(stored_name = %name, "upload ended before its metadata insert; blob orphaned");
                self.ledger
                    .mark_orphaned(self.id, "upload ended before metadata insert".into());
            }
            None => self.ledger.remove(self.id),
        }
    }
}
