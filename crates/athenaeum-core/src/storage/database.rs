//! SQLite database operations
//!
//! Provides connection pool management, database initialization and the
//! unit-of-work boundary every mutating library operation runs inside.

use crate::error::{Error, Result, StoreError};
use crate::storage::migrations;
use anyhow::Context;
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Default maximum connections in the pool
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Database configuration options
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Whether to run migrations automatically
    pub auto_migrate: bool,
    /// Journal mode (default: WAL)
    pub journal_mode: SqliteJournalMode,
    /// Synchronous mode (default: NORMAL)
    pub synchronous: SqliteSynchronous,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            auto_migrate: true,
            journal_mode: SqliteJournalMode::Wal,
            synchronous: SqliteSynchronous::Normal,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database config with the specified path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create a config for an in-memory database (useful for testing)
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            ..Default::default()
        }
    }

    /// Set the maximum number of connections
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Disable automatic migrations
    pub fn no_migrate(mut self) -> Self {
        self.auto_migrate = false;
        self
    }

    fn is_memory(&self) -> bool {
        self.path.to_string_lossy() == ":memory:"
    }
}

/// Get the default database path
pub fn default_database_path() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("athenaeum").join("library.db")
    } else {
        PathBuf::from("library.db")
    }
}

/// Database connection pool wrapper
///
/// Opened once at startup and handed by reference to every operation.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    config: DatabaseConfig,
}

impl Database {
    /// Create a new database connection with the given configuration
    pub async fn new(config: DatabaseConfig) -> anyhow::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !config.is_memory() && !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {:?}", parent)
                })?;
            }
        }

        let connection_str = if config.is_memory() {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", config.path.display())
        };

        let connect_options = SqliteConnectOptions::from_str(&connection_str)?
            .journal_mode(config.journal_mode)
            .synchronous(config.synchronous)
            .foreign_keys(true)
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
        if config.is_memory() {
            // The database lives only as long as its single connection
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .with_context(|| format!("Failed to connect to database: {:?}", config.path))?;

        let db = Self {
            pool,
            config: config.clone(),
        };

        if config.auto_migrate {
            db.migrate().await?;
        }

        Ok(db)
    }

    /// Open the database at `path`, creating and migrating it if needed
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        Self::new(DatabaseConfig::with_path(path)).await
    }

    /// Create an in-memory database (useful for testing)
    pub async fn in_memory() -> anyhow::Result<Self> {
        Self::new(DatabaseConfig::in_memory()).await
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the database configuration
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Run database migrations
    pub async fn migrate(&self) -> anyhow::Result<()> {
        migrations::run_migrations(&self.pool)
            .await
            .context("Failed to run database migrations")
    }

    /// Check migration status
    pub async fn migration_status(&self) -> anyhow::Result<migrations::MigrationStatus> {
        migrations::migration_status(&self.pool)
            .await
            .context("Failed to check migration status")
    }

    /// Check if database is healthy
    pub async fn health_check(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }

    /// Start a unit of work. Dropping it without `commit` rolls it back.
    pub async fn begin(&self) -> std::result::Result<UnitOfWork, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(UnitOfWork { tx })
    }

    /// Run `work` atomically: commit on `Ok`, roll back on `Err`
    pub async fn run_in_transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut UnitOfWork) -> Result<T>,
    {
        let mut uow = self.begin().await?;
        match work(&mut uow).await {
            Ok(value) => {
                uow.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = uow.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed after aborted unit of work");
                    return Err(Error::Store(rollback_err));
                }
                debug!(code = err.code(), "Unit of work rolled back");
                Err(err)
            }
        }
    }

    /// Close the database connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.config.path
    }
}

/// An open transaction against the library store
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    /// Connection to run typed queries on within this unit of work
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Execute a statement and return the number of rows it touched
    pub async fn execute<'q>(
        &mut self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> std::result::Result<u64, StoreError> {
        let done = query.execute(&mut *self.tx).await?;
        Ok(done.rows_affected())
    }

    /// Execute an INSERT and return the new row id
    pub async fn insert<'q>(
        &mut self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> std::result::Result<i64, StoreError> {
        let done = query.execute(&mut *self.tx).await?;
        Ok(done.last_insert_rowid())
    }

    pub async fn commit(self) -> std::result::Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> std::result::Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::in_memory().await.expect("Failed to create in-memory database");

        db.health_check().await.expect("Health check failed");

        let status = db.migration_status().await.expect("Failed to get migration status");
        assert!(!status.needs_migration);
    }

    #[tokio::test]
    async fn test_database_config_builder() {
        let config = DatabaseConfig::with_path("/tmp/library.db")
            .max_connections(10)
            .no_migrate();

        assert_eq!(config.path, PathBuf::from("/tmp/library.db"));
        assert_eq!(config.max_connections, 10);
        assert!(!config.auto_migrate);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let db = Database::in_memory().await.expect("Failed to create database");

        let result: (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .expect("Failed to check foreign_keys pragma");

        assert_eq!(result.0, 1, "Foreign keys should be enabled");
    }

    #[tokio::test]
    async fn test_file_database_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("library.db");

        let db = Database::open(&path).await.expect("Failed to open file database");
        db.health_check().await.unwrap();
        db.close().await;

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_run_in_transaction_commits_on_ok() {
        let db = Database::in_memory().await.unwrap();

        let id = db
            .run_in_transaction(async |uow| {
                let id = uow
                    .insert(sqlx::query("INSERT INTO members (status) VALUES (?)").bind("Active"))
                    .await?;
                Ok(id)
            })
            .await
            .unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM members WHERE member_id = ?")
            .bind(id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_run_in_transaction_rolls_back_on_err() {
        let db = Database::in_memory().await.unwrap();

        let result: Result<()> = db
            .run_in_transaction(async |uow| {
                uow.execute(sqlx::query("INSERT INTO members (status) VALUES (?)").bind("Active"))
                    .await?;
                Err(Error::InvalidInput("abort".to_string()))
            })
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM members")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0, "Insert should have been rolled back");
    }

    #[tokio::test]
    async fn test_check_violation_is_typed() {
        let db = Database::in_memory().await.unwrap();
        let mut uow = db.begin().await.unwrap();

        let err = uow
            .execute(sqlx::query("INSERT INTO members (status) VALUES (?)").bind("Suspended"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CheckViolation(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_unit_of_work_dropped_rolls_back() {
        let db = Database::in_memory().await.unwrap();
        {
            let mut uow = db.begin().await.unwrap();
            uow.execute(sqlx::query("INSERT INTO members (status) VALUES ('Active')"))
                .await
                .unwrap();
        }

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM members")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
