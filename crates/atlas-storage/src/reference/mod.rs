mod models;
pub mod repository;

// Expose seed data for tests and local tooling
pub mod test_data;

pub use repository::SqliteReferenceRepository;

use crate::error::{Result, StorageError};
use crate::version::{get_schema_version, is_compatible};
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::str::FromStr;

const EXPECTED_REFERENCE_VERSION: &str = "1.0.0";

/// Open the reference database in read-only mode (no migrations).
///
/// Production callers use this: reference data is shipped, never written by
/// the core.
pub async fn open_reference_db_readonly(db_path: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(db_path)?
        .create_if_missing(false)
        .read_only(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options).await?;

    let db_version = get_schema_version(&pool)
        .await
        .unwrap_or_else(|_| "unknown".to_string());

    tracing::info!("Reference DB opened (read-only): schema v{}", db_version);

    Ok(pool)
}

/// Initialize the reference database (runs migrations, creates if missing).
pub async fn init_reference_db(db_path: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(db_path)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options).await?;

    sqlx::migrate!("./migrations_reference").run(&pool).await?;

    let db_version = get_schema_version(&pool).await?;

    if !is_compatible(&db_version, EXPECTED_REFERENCE_VERSION) {
        return Err(StorageError::IncompatibleSchema {
            db_version,
            app_version: EXPECTED_REFERENCE_VERSION.to_string(),
            message: "Reference database schema is incompatible with this app version".to_string(),
        });
    }

    tracing::info!(
        "Reference DB initialized: schema v{}, expected v{}",
        db_version,
        EXPECTED_REFERENCE_VERSION
    );

    Ok(pool)
}

/// Initialize the reference database with sample catalog data.
pub async fn init_test_reference_db(db_path: &str) -> Result<SqlitePool> {
    let pool = init_reference_db(db_path).await?;
    test_data::seed_sample_data(&pool).await?;
    Ok(pool)
}
