use thiserror::Error;

/// Errors from metadata store operations.
///
/// A lookup, update, or delete that matches no row is not an error; those
/// report `None`/`false` through their return values.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("stored name already registered: {0}")]
    DuplicateStoredName(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("backend error: {0}")]
    Backend(String),
}
