use thiserror::Error;

use galleria_blob::BlobError;
use galleria_core::StoredName;
use galleria_metadata::MetadataError;

/// Why an upload was not accepted.
///
/// Client faults (`InvalidFileType`, `NoFile`) are never worth retrying;
/// infrastructure faults may succeed on a later attempt.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The declared MIME type does not start with `image/`.
    #[error("invalid file type {mime_type:?}: only image files are allowed")]
    InvalidFileType { mime_type: String },

    /// No file bytes were supplied.
    #[error("no file uploaded")]
    NoFile,

    /// The blob store rejected the write. Nothing was persisted.
    #[error("storage write failed: {0}")]
    StorageWrite(#[source] BlobError),

    /// The blob was written but the metadata row was not; the blob is now an
    /// orphan awaiting reconciliation.
    #[error("metadata write failed for blob {stored_name}: {source}")]
    MetadataWrite {
        stored_name: StoredName,
        #[source]
        source: MetadataError,
    },

    /// The upload task ended without producing a result.
    #[error("upload task aborted: {0}")]
    Interrupted(String),
}

impl UploadError {
    /// Stable machine-readable kind, used in API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidFileType { .. } => "invalid_file_type",
            Self::NoFile => "no_file",
            Self::StorageWrite(_) => "storage_write",
            Self::MetadataWrite { .. } => "metadata_write",
            Self::Interrupted(_) => "interrupted",
        }
    }

    /// `true` when the request itself was at fault.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Self::InvalidFileType { .. } | Self::NoFile)
    }

    /// `true` when resubmitting the same upload may succeed.
    pub fn is_retryable(&self) -> bool {
        !self.is_client_fault()
    }
}

/// Errors from gallery queries, deletes, and reconciliation.
#[derive(Debug, Error)]
pub enum GalleryError {
    /// The metadata store failed.
    #[error("metadata query failed: {0}")]
    MetadataQuery(#[from] MetadataError),

    /// The blob store failed.
    #[error("blob store error: {0}")]
    Blob(#[from] BlobError),

    /// The gallery was misconfigured (e.g. missing required components).
    #[error("configuration error: {0}")]
    Configuration(String),
}
