use std::path::PathBuf;
use std::sync::Arc;

use galleria_blob::BlobStore;
use galleria_blob_fs::FsBlobStore;
use galleria_blob_memory::MemoryBlobStore;

use crate::config::BlobConfig;
use crate::error::ServerError;

/// A constructed blob store, plus its root directory when the bytes live on
/// disk and can be served directly.
pub struct BlobBackend {
    pub store: Arc<dyn BlobStore>,
    pub root: Option<PathBuf>,
}

/// Construct a [`BlobStore`] from configuration.
///
/// `field` is the name prefix for generated stored names (the upload's
/// multipart field name).
pub async fn create_blob_store(config: &BlobConfig, field: &str) -> Result<BlobBackend, ServerError> {
    match config.backend.as_str() {
        "filesystem" => {
            let store = FsBlobStore::open(&config.dir, field)
                .await
                .map_err(|e| ServerError::Config(format!("blob directory {}: {e}", config.dir)))?;
            let root = store.root().to_path_buf();
            Ok(BlobBackend {
                store: Arc::new(store),
                root: Some(root),
            })
        }
        "memory" => Ok(BlobBackend {
            store: Arc::new(MemoryBlobStore::with_field(field)),
            root: None,
        }),
        other => Err(ServerError::Config(format!(
            "unsupported blob backend: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn filesystem_backend_exposes_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = BlobConfig {
            backend: "filesystem".into(),
            dir: dir.path().join("uploads").display().to_string(),
        };
        let backend = create_blob_store(&config, "image").await.unwrap();
        assert_eq!(backend.root.as_deref(), Some(dir.path().join("uploads").as_path()));
        assert!(dir.path().join("uploads").is_dir());
    }

    #[tokio::test]
    async fn memory_backend_has_no_root() {
        let config = BlobConfig {
            backend: "memory".into(),
            ..BlobConfig::default()
        };
        let backend = create_blob_store(&config, "image").await.unwrap();
        assert!(backend.root.is_none());
        assert!(backend.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_backend_is_rejected() {
        let config = BlobConfig {
            backend: "s3".into(),
            ..BlobConfig::default()
        };
        let err = create_blob_store(&config, "image").await.err().unwrap();
        assert!(matches!(err, ServerError::Config(msg) if msg.contains("s3")));
    }
}
