//! Gallery assembly shared by `serve` and the one-shot subcommands.

use std::sync::Arc;

use tracing::{info, warn};

use galleria_gallery::{Gallery, GalleryBuilder, ReconcileReport};

use crate::blob_factory::{BlobBackend, create_blob_store};
use crate::config::GalleriaConfig;
use crate::error::ServerError;
use crate::metadata_factory::create_metadata_store;

/// Construct the configured stores and a [`Gallery`] over them.
pub async fn build_gallery(config: &GalleriaConfig) -> Result<(Gallery, BlobBackend), ServerError> {
    let blobs = create_blob_store(&config.blob, &config.upload.field_name).await?;
    let metadata = create_metadata_store(&config.metadata).await?;
    info!(
        blob_backend = %config.blob.backend,
        metadata_backend = %config.metadata.backend,
        "storage initialized"
    );

    let gallery = GalleryBuilder::new()
        .blob_store(Arc::clone(&blobs.store))
        .metadata_store(metadata)
        .session_buffer(config.notify.session_buffer)
        .remove_blob_on_delete(config.gallery.remove_blob_on_delete)
        .build()?;
    Ok((gallery, blobs))
}

/// Run the metadata store's migrations.
pub async fn migrate(config: &GalleriaConfig) -> Result<(), ServerError> {
    info!(backend = %config.metadata.backend, "running metadata migrations...");
    let _store = create_metadata_store(&config.metadata).await?;
    info!(backend = %config.metadata.backend, "metadata migrations complete");
    Ok(())
}

/// One orphan sweep over the configured stores.
///
/// Fails without touching any blob when the metadata store cannot describe
/// the stored blobs.
pub async fn reconcile_once(
    config: &GalleriaConfig,
    dry_run: bool,
) -> Result<ReconcileReport, ServerError> {
    config.ensure_reconcile_safe()?;
    if config.blob.backend == "memory" {
        warn!("the memory blob store starts empty; there is nothing to reconcile");
    }
    let (gallery, _blobs) = build_gallery(config).await?;
    Ok(gallery.reconcile(dry_run).await?)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use galleria_blob::BlobStore;
    use galleria_blob_fs::FsBlobStore;

    use super::*;

    fn config_for(dir: &std::path::Path, metadata_backend: &str) -> GalleriaConfig {
        let mut config = GalleriaConfig::default();
        config.blob.backend = "filesystem".into();
        config.blob.dir = dir.display().to_string();
        config.metadata.backend = metadata_backend.into();
        config
    }

    #[tokio::test]
    async fn reconcile_refuses_durable_blobs_with_memory_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path(), "image").await.unwrap();
        for _ in 0..3 {
            store.put(Bytes::from_static(b"png"), Some("png")).await.unwrap();
        }

        let config = config_for(dir.path(), "memory");
        for dry_run in [true, false] {
            let err = reconcile_once(&config, dry_run).await.unwrap_err();
            assert!(matches!(err, ServerError::Config(_)));
        }

        assert_eq!(store.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn reconcile_over_memory_stores_is_empty() {
        let mut config = GalleriaConfig::default();
        config.blob.backend = "memory".into();
        config.metadata.backend = "memory".into();

        let report = reconcile_once(&config, false).await.unwrap();
        assert_eq!(report.scanned, 0);
        assert!(report.orphans.is_empty());
    }

    #[tokio::test]
    async fn build_gallery_uses_configured_stores() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path(), "memory");

        let (gallery, blobs) = build_gallery(&config).await.unwrap();
        assert_eq!(blobs.root.as_deref(), Some(dir.path()));
        assert!(gallery.list().await.unwrap().is_empty());
    }
}
