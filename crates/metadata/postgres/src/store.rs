use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use galleria_core::{ImageId, ImageRecord, NewImageRecord, StoredName};
use galleria_metadata::{MetadataError, MetadataStore};

use crate::config::PostgresConfig;
use crate::migrations;

/// Raw row shape: `(id, filename, originalname, mimetype, size)`.
type ImageRow = (i64, String, String, String, i64);

/// Build `PgConnectOptions` from a [`PostgresConfig`], applying SSL settings
/// when configured.
fn build_connect_options(
    config: &PostgresConfig,
) -> Result<sqlx::postgres::PgConnectOptions, MetadataError> {
    let mut options: sqlx::postgres::PgConnectOptions = config
        .url
        .parse()
        .map_err(|e: sqlx::Error| MetadataError::Connection(e.to_string()))?;

    if let Some(ref mode) = config.ssl_mode {
        let ssl_mode = match mode.as_str() {
            "disable" => sqlx::postgres::PgSslMode::Disable,
            "prefer" => sqlx::postgres::PgSslMode::Prefer,
            "require" => sqlx::postgres::PgSslMode::Require,
            "verify-ca" => sqlx::postgres::PgSslMode::VerifyCa,
            "verify-full" => sqlx::postgres::PgSslMode::VerifyFull,
            other => {
                return Err(MetadataError::Connection(format!(
                    "unknown ssl_mode: {other}"
                )));
            }
        };
        options = options.ssl_mode(ssl_mode);
    }

    if let Some(ref path) = config.ssl_root_cert {
        options = options.ssl_root_cert(path);
    }

    Ok(options)
}

fn row_to_record((id, filename, originalname, mimetype, size): ImageRow) -> Result<ImageRecord, MetadataError> {
    let stored_name = StoredName::parse(filename)
        .map_err(|e| MetadataError::Corrupt(format!("image {id}: {e}")))?;
    let size_bytes = u64::try_from(size)
        .map_err(|_| MetadataError::Corrupt(format!("image {id}: negative size {size}")))?;
    Ok(ImageRecord {
        id: ImageId::new(id),
        stored_name,
        original_name: originalname,
        mime_type: mimetype,
        size_bytes,
    })
}

fn map_write_error(e: sqlx::Error, stored_name: &StoredName) -> MetadataError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            MetadataError::DuplicateStoredName(stored_name.to_string())
        }
        other => MetadataError::Backend(other.to_string()),
    }
}

/// PostgreSQL-backed implementation of [`MetadataStore`].
///
/// Ids come from a `BIGSERIAL` column. Insert and delete are single
/// statements with `RETURNING`, so each is atomic on its own.
pub struct PostgresMetadataStore {
    pool: PgPool,
    config: Arc<PostgresConfig>,
}

impl PostgresMetadataStore {
    /// Connect to `PostgreSQL`, create the pool, and run migrations.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Connection`] if pool creation fails, or
    /// [`MetadataError::Backend`] if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, MetadataError> {
        let connect_options = build_connect_options(&config)?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect_with(connect_options)
            .await
            .map_err(|e| MetadataError::Connection(e.to_string()))?;

        Self::from_pool(pool, config).await
    }

    /// Create a store from an existing pool. Runs migrations on creation.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Backend`] if migrations fail.
    pub async fn from_pool(pool: PgPool, config: PostgresConfig) -> Result<Self, MetadataError> {
        migrations::run_migrations(&pool, &config)
            .await
            .map_err(|e| MetadataError::Backend(e.to_string()))?;

        Ok(Self {
            pool,
            config: Arc::new(config),
        })
    }
}

#[async_trait]
impl MetadataStore for PostgresMetadataStore {
    async fn insert(&self, record: NewImageRecord) -> Result<ImageRecord, MetadataError> {
        let table = self.config.images_table();
        let size = i64::try_from(record.size_bytes).map_err(|_| {
            MetadataError::Corrupt(format!("size {} out of range", record.size_bytes))
        })?;

        let query = format!(
            "INSERT INTO {table} (filename, originalname, mimetype, size) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, filename, originalname, mimetype, size"
        );

        let row: ImageRow = sqlx::query_as(&query)
            .bind(record.stored_name.as_str())
            .bind(&record.original_name)
            .bind(&record.mime_type)
            .bind(size)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, &record.stored_name))?;

        row_to_record(row)
    }

    async fn list_all(&self) -> Result<Vec<ImageRecord>, MetadataError> {
        let table = self.config.images_table();
        let query =
            format!("SELECT id, filename, originalname, mimetype, size FROM {table} ORDER BY id");

        let rows: Vec<ImageRow> = sqlx::query_as(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MetadataError::Backend(e.to_string()))?;

        rows.into_iter().map(row_to_record).collect()
    }

    async fn get(&self, id: ImageId) -> Result<Option<ImageRecord>, MetadataError> {
        let table = self.config.images_table();
        let query = format!(
            "SELECT id, filename, originalname, mimetype, size FROM {table} WHERE id = $1"
        );

        let row: Option<ImageRow> = sqlx::query_as(&query)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MetadataError::Backend(e.to_string()))?;

        row.map(row_to_record).transpose()
    }

    async fn update_original_name(
        &self,
        id: ImageId,
        original_name: &str,
    ) -> Result<bool, MetadataError> {
        let table = self.config.images_table();
        let query = format!("UPDATE {table} SET originalname = $1 WHERE id = $2");

        let result = sqlx::query(&query)
            .bind(original_name)
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| MetadataError::Backend(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: ImageId) -> Result<Option<ImageRecord>, MetadataError> {
        let table = self.config.images_table();
        let query = format!(
            "DELETE FROM {table} WHERE id = $1 \
             RETURNING id, filename, originalname, mimetype, size"
        );

        let row: Option<ImageRow> = sqlx::query_as(&query)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MetadataError::Backend(e.to_string()))?;

        row.map(row_to_record).transpose()
    }
}
