//! `SQLite` connection pool setup and migration runner.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::error::StorageError;
use crate::metrics_store::SqliteMetricsStore;

/// How long a writer waits for a lock held by another instance task.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connections kept by the pool. Every instance task writes through it.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// Configuration for the `SQLite` storage adapter.
#[derive(Debug, Clone)]
pub struct Config {
    /// `SQLite` connection URL (e.g. `sqlite:motiontrigger.db` or `sqlite::memory:`).
    pub database_url: String,
    pub busy_timeout: Duration,
    pub max_connections: u32,
}

impl Config {
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Open the database and bring its schema up to date.
    ///
    /// File databases are created when missing and switched to WAL so a
    /// reader never blocks the instance that is saving its metrics.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the URL is invalid, the connection fails
    /// or a migration cannot be applied.
    pub async fn build(self) -> Result<Database, StorageError> {
        let open = |source| StorageError::Open {
            url: self.database_url.clone(),
            source,
        };
        let mut options = SqliteConnectOptions::from_str(&self.database_url)
            .map_err(open)?
            .create_if_missing(true)
            .busy_timeout(self.busy_timeout);
        if !is_memory(&self.database_url) {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(self.max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(open)?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Database { pool })
    }
}

fn is_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Holds the `SQLite` connection pool.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Borrow the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Metrics store sharing this database's pool.
    #[must_use]
    pub fn metrics_store(&self) -> SqliteMetricsStore {
        SqliteMetricsStore::new(self.pool.clone())
    }

    /// Wait for pending writes and close every connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
