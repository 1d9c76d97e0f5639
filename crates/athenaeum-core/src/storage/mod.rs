//! Storage layer - SQLite store adapter
//!
//! # Architecture
//!
//! - `database`: Connection pool management and the unit-of-work boundary
//! - `migrations`: Schema versioning and automatic migration
//! - `introspection`: Read-only table enumeration for the admin dump
//!
//! # Usage
//!
//! ```ignore
//! use athenaeum_core::storage::Database;
//!
//! let db = Database::in_memory().await?;
//! let id = db
//!     .run_in_transaction(async |uow| {
//!         Ok(uow.insert(sqlx::query("INSERT INTO members (status) VALUES ('Active')")).await?)
//!     })
//!     .await?;
//! ```

pub mod database;
pub mod introspection;
pub mod migrations;

pub use database::{Database, DatabaseConfig, UnitOfWork, default_database_path};
pub use introspection::{TableDump, DUMP_ROW_LIMIT};
pub use migrations::{migration_status, run_migrations, MigrationStatus, CURRENT_VERSION};
