use thiserror::Error;

use galleria_core::StoredNameError;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// Writing blob bytes failed (disk full, permission denied, ...).
    #[error("blob write failed: {0}")]
    Write(String),

    /// Reading a blob failed for a reason other than absence.
    #[error("blob read failed: {0}")]
    Read(String),

    /// Removing a blob failed for a reason other than absence.
    #[error("blob delete failed: {0}")]
    Delete(String),

    /// Every generated name for a write was already taken.
    #[error("no free stored name after {attempts} attempts")]
    NameExhausted {
        /// Number of names tried.
        attempts: u32,
    },

    /// A generated or supplied name is not a valid stored name.
    #[error("invalid stored name: {0}")]
    InvalidName(#[from] StoredNameError),

    /// A storage backend error occurred.
    #[error("blob storage error: {0}")]
    Backend(String),
}
