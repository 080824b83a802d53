//! Registry store handle
//!
//! Owns the SQLite pool for one run. The store is assumed to be exclusively
//! owned by the running process; isolation comes from SQLite transactions.

use super::init::{create_person_table, drop_person_table};
use super::persons::count_persons;
use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Handle on the persisted registry
#[derive(Clone)]
pub struct RegistryStore {
    pool: SqlitePool,
}

impl RegistryStore {
    /// Open (creating if needed) the registry file and ensure the Person table
    pub async fn open(db_path: &Path) -> Result<Self> {
        let newly_created = !db_path.exists();

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::StoreUnavailable(format!(
                        "cannot create directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_millis(5000));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .map_err(|e| Error::StoreUnavailable(format!("{}: {}", db_path.display(), e)))?;

        if newly_created {
            info!("Initialized new registry: {}", db_path.display());
        } else {
            info!("Opened existing registry: {}", db_path.display());
        }

        Self::from_pool(pool).await
    }

    /// Open a private in-memory registry (tests, dry runs)
    pub async fn open_in_memory() -> Result<Self> {
        // One connection: every sqlite::memory: connection is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| Error::StoreUnavailable(format!("in-memory store: {}", e)))?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the Person table if needed
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let mut conn = pool.acquire().await.map_err(unavailable)?;
        create_person_table(&mut conn).await?;
        drop(conn);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a write transaction
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool.begin().await.map_err(unavailable)
    }

    /// Commit a transaction, reporting failure as `StoreUnavailable`
    pub async fn commit(tx: Transaction<'static, Sqlite>) -> Result<()> {
        tx.commit().await.map_err(unavailable)
    }

    /// Number of persisted persons
    pub async fn person_count(&self) -> Result<i64> {
        let mut conn = self.pool.acquire().await.map_err(unavailable)?;
        count_persons(&mut conn).await
    }

    /// Drop and recreate an empty Person table
    pub async fn reset(&self) -> Result<()> {
        let mut tx = self.begin().await?;
        drop_person_table(&mut tx).await?;
        create_person_table(&mut tx).await?;
        Self::commit(tx).await?;
        info!("Person table reset");
        Ok(())
    }

    /// Reclaim free pages after large deletes
    pub async fn vacuum(&self) -> Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the pool, waiting for connections to finish
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn unavailable(e: sqlx::Error) -> Error {
    Error::StoreUnavailable(e.to_string())
}
