use sqlx::PgPool;

use crate::config::PostgresConfig;

/// Create the images table if it does not exist.
///
/// # Errors
///
/// Returns a [`sqlx::Error`] if the DDL statement fails.
pub async fn run_migrations(pool: &PgPool, config: &PostgresConfig) -> Result<(), sqlx::Error> {
    let images_table = config.images_table();

    let create_images = format!(
        "CREATE TABLE IF NOT EXISTS {images_table} (
            id BIGSERIAL PRIMARY KEY,
            filename TEXT NOT NULL UNIQUE,
            originalname TEXT NOT NULL,
            mimetype TEXT NOT NULL,
            size BIGINT NOT NULL CHECK (size >= 0)
        )"
    );

    sqlx::query(&create_images).execute(pool).await?;
    tracing::debug!(table = %images_table, "images table ready");
    Ok(())
}
