//! Error types for Athenaeum
//!
//! Domain operations report caller-correctable problems as input errors and
//! escalate anything the store could not explain as fatal. Presentation code
//! only ever sees [`Outcome`], never a raw `sqlx::Error`.

use serde::Serialize;
use sqlx::error::ErrorKind as DbErrorKind;
use thiserror::Error;

/// Result type alias using Athenaeum's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the store, stripped of backend specifics
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("check constraint violated: {0}")]
    CheckViolation(String),

    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("expected row was not found")]
    NotFound,

    #[error(transparent)]
    Other(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    DbErrorKind::UniqueViolation => StoreError::UniqueViolation(message),
                    DbErrorKind::CheckViolation => StoreError::CheckViolation(message),
                    DbErrorKind::ForeignKeyViolation => StoreError::ForeignKeyViolation(message),
                    _ => StoreError::Other(sqlx::Error::Database(db_err)),
                }
            }
            other => StoreError::Other(other),
        }
    }
}

/// How the caller is expected to react to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Return to the menu; nothing was changed
    Input,
    /// Wrong or missing admin credentials; treated like an input error
    Auth,
    /// The store is in an unknown state; close it and terminate
    Fatal,
}

/// Athenaeum error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Member errors (E001-E099)
    #[error("Member with ID {0} not found")]
    MemberNotFound(i64),

    #[error("Member {member_id} is inactive and cannot {action}")]
    MemberInactive { member_id: i64, action: &'static str },

    #[error("Member {member_id} has an outstanding fine of ${amount:.2} and cannot borrow items until it is paid")]
    OutstandingFine { member_id: i64, amount: f64 },

    // Circulation errors (E100-E199)
    #[error("Item with ID {0} not found")]
    ItemNotFound(i64),

    #[error("Item {0} is reference-only and cannot be borrowed")]
    ItemReferenceOnly(i64),

    #[error("Item {0} is already borrowed by another member")]
    ItemAlreadyBorrowed(i64),

    #[error("Borrowing ID {0} not found or item already returned")]
    BorrowingNotOpen(i64),

    #[error("An item with ISBN {isbn} already exists: '{existing_title}'")]
    DuplicateIsbn { isbn: String, existing_title: String },

    // Event errors (E200-E299)
    #[error("Event with ID {0} not found")]
    EventNotFound(i64),

    #[error("Sorry, event '{name}' is already at full capacity ({capacity} attendees)")]
    EventFull { name: String, capacity: i64 },

    #[error("Event '{0}' has already occurred")]
    EventInPast(String),

    #[error("You are already registered for event '{0}'")]
    AlreadyRegistered(String),

    #[error("You are not registered for event '{0}'")]
    NotRegistered(String),

    #[error("You are already volunteering for event {0}")]
    AlreadyVolunteering(i64),

    #[error("Attendance for event '{0}' is out of step with its registrations")]
    AttendanceOutOfStep(String),

    // Help desk errors (E300-E399)
    #[error("No librarian is currently available. Please try again later.")]
    NoLibrarianAvailable,

    // Access errors (E400-E499)
    #[error("Admin authorization is required to process a payment")]
    AdminAuthorizationRequired,

    #[error("Admin authentication failed: {0}")]
    AuthenticationFailed(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    Config(String),

    // Store errors (E900-E999)
    #[error("Database error: {0}")]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Store(StoreError::from(err))
    }
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::MemberNotFound(_) => "E001",
            Self::MemberInactive { .. } => "E002",
            Self::OutstandingFine { .. } => "E003",
            Self::ItemNotFound(_) => "E100",
            Self::ItemReferenceOnly(_) => "E101",
            Self::ItemAlreadyBorrowed(_) => "E102",
            Self::BorrowingNotOpen(_) => "E103",
            Self::DuplicateIsbn { .. } => "E104",
            Self::EventNotFound(_) => "E200",
            Self::EventFull { .. } => "E201",
            Self::EventInPast(_) => "E202",
            Self::AlreadyRegistered(_) => "E203",
            Self::NotRegistered(_) => "E204",
            Self::AlreadyVolunteering(_) => "E205",
            Self::AttendanceOutOfStep(_) => "E206",
            Self::NoLibrarianAvailable => "E300",
            Self::AdminAuthorizationRequired => "E400",
            Self::AuthenticationFailed(_) => "E401",
            Self::Config(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Store(_) => "E900",
        }
    }

    /// Classify this error for the presentation layer
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(_) | Self::Config(_) => ErrorKind::Fatal,
            Self::AdminAuthorizationRequired | Self::AuthenticationFailed(_) => ErrorKind::Auth,
            _ => ErrorKind::Input,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::OutstandingFine { member_id, .. } => {
                Some(format!("athenaeum pay-fine --member {}", member_id))
            }
            Self::ItemNotFound(_) => Some("athenaeum find-item <title>".to_string()),
            Self::EventNotFound(_) => Some("athenaeum find-event <name>".to_string()),
            Self::NotRegistered(_) => Some("athenaeum registrations --member <id>".to_string()),
            Self::AttendanceOutOfStep(_) => Some("athenaeum admin check-attendance".to_string()),
            Self::AdminAuthorizationRequired | Self::AuthenticationFailed(_) => {
                Some("Set ATHENAEUM_ADMIN_CODE and retry".to_string())
            }
            _ => None,
        }
    }
}

/// Result of a domain operation as seen by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Success(T),
    InputError(String),
    Fatal(String),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Outcome::Fatal(_))
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) if err.is_fatal() => Outcome::Fatal(err.to_string()),
            Err(err) => Outcome::InputError(err.to_string()),
        }
    }
}
