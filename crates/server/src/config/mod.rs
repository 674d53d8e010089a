mod gallery;
mod server;
mod storage;
mod telemetry;

#[cfg(test)]
mod tests;

pub use gallery::*;
pub use server::*;
pub use storage::*;
pub use telemetry::*;

use std::path::Path;

use serde::Deserialize;

use crate::error::ServerError;

/// Top-level configuration for the Galleria server, loaded from a TOML file.
///
/// Every section is optional; an empty file yields a gallery listening on
/// `127.0.0.1:5000` that stores blobs under `./uploads` and records in the
/// local PostgreSQL `postgres` database.
#[derive(Debug, Default, Deserialize)]
pub struct GalleriaConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Upload request limits.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Blob store backend.
    #[serde(default)]
    pub blob: BlobConfig,
    /// Metadata store backend.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Viewer notification settings.
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Query and delete behavior.
    #[serde(default)]
    pub gallery: GalleryConfig,
    /// Periodic orphan reconciliation.
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    /// OpenTelemetry distributed tracing configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl GalleriaConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ServerError> {
        toml::from_str(contents).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Load configuration from `path`, or use defaults if the file does not
    /// exist.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        if !path.exists() {
            return Self::from_toml("");
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Whether blobs survive a restart while image records do not.
    ///
    /// After a restart with this pairing every stored blob looks like an
    /// orphan.
    pub fn has_volatile_metadata(&self) -> bool {
        self.metadata.backend == "memory" && self.blob.backend == "filesystem"
    }

    /// Refuse an orphan sweep that would treat every stored blob as an
    /// orphan.
    pub fn ensure_reconcile_safe(&self) -> Result<(), ServerError> {
        if self.has_volatile_metadata() {
            return Err(ServerError::Config(format!(
                "refusing to reconcile: blobs in '{}' are durable but the memory metadata \
                 store is not, so every stored blob would be deleted",
                self.blob.dir
            )));
        }
        Ok(())
    }
}
