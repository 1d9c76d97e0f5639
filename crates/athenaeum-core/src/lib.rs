//! Athenaeum Core Library
//!
//! This crate provides the core functionality for Athenaeum, including:
//! - Commands (circulation, donations, events, fines, help desk)
//! - Access control for the admin secret
//! - Storage (SQLite store adapter, migrations, admin introspection)
//! - Configuration persisted as TOML
//!
//! Every mutating command is one atomic unit of work against the store and
//! reports either a value or an [`Error`]; front ends convert that into an
//! [`Outcome`] to decide whether to re-prompt or shut down.

pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod security;
pub mod storage;

pub use error::{Error, ErrorKind, Outcome, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorKind, Outcome, Result};
    pub use crate::security::AccessControl;
    pub use crate::storage::Database;
}
