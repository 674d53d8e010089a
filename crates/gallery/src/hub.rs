//! Viewer session registry and event fan-out.
//!
//! Every connected viewer owns a [`Session`]. The hub keeps one bounded
//! channel per session and pushes [`GalleryEvent`]s into it without ever
//! awaiting a slow viewer: a full or closed channel counts as a skipped
//! delivery and the broadcast moves on.

use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use galleria_core::GalleryEvent;

/// Identifier assigned to a session at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Lifecycle of a viewer session. Only `Open` sessions receive events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Connecting,
    Open,
    Closing,
}

impl SessionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Connecting,
            1 => Self::Open,
            _ => Self::Closing,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Connecting => 0,
            Self::Open => 1,
            Self::Closing => 2,
        }
    }
}

/// Outcome of a single broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    /// Sessions that accepted the event.
    pub delivered: usize,
    /// Sessions skipped because they were not yet (or no longer) open.
    pub not_open: usize,
    /// Sessions skipped because their buffer was full.
    pub lagged: usize,
    /// Sessions skipped because the viewer went away mid-broadcast.
    pub closed: usize,
}

impl BroadcastReport {
    /// Total sessions that did not receive the event.
    pub fn skipped(&self) -> usize {
        self.not_open + self.lagged + self.closed
    }
}

struct SessionSlot {
    id: SessionId,
    state: AtomicU8,
    tx: mpsc::Sender<GalleryEvent>,
}

impl SessionSlot {
    fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}

/// Registry of live viewer sessions.
///
/// Registration, removal and broadcast may run concurrently from any task.
/// A broadcast works on a snapshot of the registry taken up front, so
/// sessions joining or leaving during the fan-out never invalidate it.
pub struct NotificationHub {
    sessions: DashMap<SessionId, Arc<SessionSlot>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationHub")
            .field("sessions", &self.sessions.len())
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}

impl NotificationHub {
    /// Default per-session buffer size.
    pub const DEFAULT_BUFFER: usize = 16;

    /// Create a hub whose sessions buffer up to `buffer` undelivered events.
    /// A zero buffer is raised to one.
    pub fn new(buffer: usize) -> Arc<Self> {
        Arc::new(Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        })
    }

    /// Register a new viewer session in the `Connecting` state.
    ///
    /// The returned [`Session`] unregisters itself when dropped.
    pub fn register(self: &Arc<Self>) -> Session {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.buffer);
        let slot = Arc::new(SessionSlot {
            id,
            state: AtomicU8::new(SessionState::Connecting.as_u8()),
            tx,
        });
        self.sessions.insert(id, Arc::clone(&slot));
        debug!(session = %id, "viewer session registered");
        Session {
            slot,
            events: rx,
            hub: Arc::downgrade(self),
        }
    }

    /// Remove a session. Returns `false` if it was already gone.
    pub fn unregister(&self, id: SessionId) -> bool {
        match self.sessions.remove(&id) {
            Some((_, slot)) => {
                slot.set_state(SessionState::Closing);
                debug!(session = %id, "viewer session unregistered");
                true
            }
            None => false,
        }
    }

    /// Number of registered sessions, in any state.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of sessions currently able to receive events.
    pub fn open_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|e| e.value().state() == SessionState::Open)
            .count()
    }

    /// Push `event` to every open session.
    ///
    /// Never blocks and never fails: per-session problems are only counted.
    pub fn broadcast(&self, event: GalleryEvent) -> BroadcastReport {
        let targets = self.snapshot();
        let report = Self::deliver(&targets, event);
        debug!(
            event = %event,
            delivered = report.delivered,
            skipped = report.skipped(),
            "event broadcast"
        );
        report
    }

    fn snapshot(&self) -> Vec<Arc<SessionSlot>> {
        self.sessions.iter().map(|e| Arc::clone(e.value())).collect()
    }

    fn deliver(targets: &[Arc<SessionSlot>], event: GalleryEvent) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for slot in targets {
            if slot.state() != SessionState::Open {
                report.not_open += 1;
                continue;
            }
            match slot.tx.try_send(event) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(session = %slot.id, "viewer lagging, event dropped");
                    report.lagged += 1;
                }
                Err(TrySendError::Closed(_)) => report.closed += 1,
            }
        }
        report
    }
}

/// A registered viewer session.
///
/// Owns the receiving end of the session's event channel. Dropping the
/// session marks it `Closing` and removes it from the hub.
pub struct Session {
    slot: Arc<SessionSlot>,
    events: mpsc::Receiver<GalleryEvent>,
    hub: Weak<NotificationHub>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.slot.id)
            .field("state", &self.slot.state())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.slot.id
    }

    pub fn state(&self) -> SessionState {
        self.slot.state()
    }

    /// Mark the session ready to receive events. Has no effect once the
    /// session is closing.
    pub fn mark_open(&self) {
        let _ = self.slot.state.compare_exchange(
            SessionState::Connecting.as_u8(),
            SessionState::Open.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Stop receiving events. The session stays registered until dropped.
    pub fn close(&self) {
        self.slot.set_state(SessionState::Closing);
    }

    /// Wait for the next event. Returns `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<GalleryEvent> {
        self.events.recv().await
    }

    /// Take the next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<GalleryEvent> {
        self.events.try_recv().ok()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.slot.set_state(SessionState::Closing);
        if let Some(hub) = self.hub.upgrade() {
            hub.unregister(self.slot.id);
        }
    }
}
