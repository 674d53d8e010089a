pub mod builder;
pub mod coordinator;
pub mod error;
pub mod gallery;
pub mod hub;
pub mod ledger;
pub mod metrics;
pub mod query;
pub mod reconcile;

pub use builder::GalleryBuilder;
pub use coordinator::{IncomingFile, UploadCoordinator};
pub use error::{GalleryError, UploadError};
pub use gallery::Gallery;
pub use hub::{BroadcastReport, NotificationHub, Session, SessionId, SessionState};
pub use ledger::{IntentGuard, IntentId, IntentState, UploadIntent, UploadLedger};
pub use metrics::{GalleryMetrics, MetricsSnapshot};
pub use query::{DeleteOutcome, QueryService};
pub use reconcile::{ReconcileReport, ReconcileWorker, Reconciler};
