//! Admin access control
//!
//! The admin secret is hashed once at startup and only the hash is kept.

pub mod access;

pub use access::{
    ADMIN_CODE_ENV, AccessControl, AdminSecret, Authentication, DEFAULT_MAX_ATTEMPTS, SecretOrigin,
    SecretPrompt, SecretSource,
};
