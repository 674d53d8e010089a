use std::sync::Arc;

use galleria_metadata::MetadataStore;
use galleria_metadata_memory::MemoryMetadataStore;
#[cfg(feature = "postgres")]
use galleria_metadata_postgres::{PostgresConfig, PostgresMetadataStore};

use crate::config::MetadataConfig;
use crate::error::ServerError;

/// Construct a [`MetadataStore`] from configuration.
///
/// SQL backends run their migrations as part of construction.
pub async fn create_metadata_store(
    config: &MetadataConfig,
) -> Result<Arc<dyn MetadataStore>, ServerError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryMetadataStore::new())),
        #[cfg(feature = "postgres")]
        "postgres" => create_postgres(config).await,
        other => Err(ServerError::Config(format!(
            "unsupported metadata backend: {other} (is the feature enabled?)"
        ))),
    }
}

#[cfg(feature = "postgres")]
async fn create_postgres(config: &MetadataConfig) -> Result<Arc<dyn MetadataStore>, ServerError> {
    let url = config.url.as_deref().ok_or_else(|| {
        ServerError::Config("postgres backend requires 'url' in [metadata]".into())
    })?;
    let pg_config = PostgresConfig {
        url: url.to_owned(),
        pool_size: config.pool_size,
        schema: config.schema.clone(),
        table_prefix: config.table_prefix.clone(),
        ssl_mode: config.ssl_mode.clone(),
        ssl_root_cert: config.ssl_root_cert.clone(),
    };
    let store = PostgresMetadataStore::new(pg_config)
        .await
        .map_err(|e| ServerError::Config(format!("postgres metadata store: {e}")))?;
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend() {
        let config = MetadataConfig {
            backend: "memory".into(),
            ..MetadataConfig::default()
        };
        let store = create_metadata_store(&config).await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_backend_is_rejected() {
        let config = MetadataConfig {
            backend: "mongo".into(),
            ..MetadataConfig::default()
        };
        let err = create_metadata_store(&config).await.err().unwrap();
        assert!(matches!(err, ServerError::Config(msg) if msg.contains("mongo")));
    }

    #[cfg(feature = "postgres")]
    #[tokio::test]
    async fn postgres_requires_url() {
        let config = MetadataConfig {
            backend: "postgres".into(),
            url: None,
            ..MetadataConfig::default()
        };
        let err = create_metadata_store(&config).await.err().unwrap();
        assert!(matches!(err, ServerError::Config(msg) if msg.contains("url")));
    }
}
