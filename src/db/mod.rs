//! Database layer
//!
//! Local SQLite storage for the tenant directory (organizations and
//! memberships) and for tenant-scoped business records. All access to
//! tenant-scoped tables goes through [`scoped::Scoped`]; the directory
//! tables are the one documented exception.

pub mod directory;
pub mod scoped;

use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

pub use directory::TenantDirectory;
pub use scoped::{Scoped, TenantRecord};

use crate::config::DatabaseConfig;

/// Database connection pool type
pub type DbPool = Pool<Sqlite>;

/// Initialize the database connection pool
///
/// Foreign keys are enabled so that organization deletion cascades to all
/// tenant-scoped records.
pub async fn init_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .context("Invalid database URL")?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}

/// Check database connectivity (used by the readiness probe)
pub async fn check_health(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .context("Database health check failed")?;
    Ok(())
}

/// Decode a TEXT column holding a UUID
pub(crate) fn decode_uuid(value: &str, column: &str) -> Result<Uuid, sqlx::Error> {
    Uuid::parse_str(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Decode a TEXT column holding an RFC3339 timestamp
pub(crate) fn decode_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
}

/// Decode a TEXT column holding a string-enum value
pub(crate) fn decode_enum<T: FromStr<Err = String>>(
    value: &str,
    column: &str,
) -> Result<T, sqlx::Error> {
    value.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: e.into(),
    })
}
