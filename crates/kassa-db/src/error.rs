//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├──► repositories return it as-is                                │
//! │       │                                                                 │
//! │       └──► checkout wraps it: CheckoutError::Commit { retryable }      │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │            Web tier shows user_message(), logs Display                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use kassa_core::{CheckoutError, ValidationError};
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - ID doesn't exist
    /// - UPDATE/DELETE matched no row
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate category name
    /// - Duplicate product barcode
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Product references a non-existent category
    /// - Deleting a row that is still referenced (RESTRICT)
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative stock, negative price, ...).
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// Delete refused because other rows still depend on the entity.
    #[error("{entity} {id} is still referenced by {dependents} row(s)")]
    InUse {
        entity: String,
        id: String,
        dependents: i64,
    },

    /// The database is locked by another writer (SQLITE_BUSY / SQLITE_LOCKED).
    ///
    /// ## When This Occurs
    /// - Another checkout holds the write lock longer than `busy_timeout`
    #[error("Database busy: {0}")]
    Busy(String),

    /// An operation exceeded its time budget.
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    ///
    /// ## When This Occurs
    /// - Invalid SQL in migration
    /// - Migration version conflict
    /// - Schema incompatibility
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A stored JSON payload could not be read or written.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Input rejected before reaching the database.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates an InUse error.
    pub fn in_use(entity: impl Into<String>, id: impl Into<String>, dependents: i64) -> Self {
        DbError::InUse {
            entity: entity.into(),
            id: id.into(),
            dependents,
        }
    }

    /// Whether the same operation may succeed if simply retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DbError::Busy(_) | DbError::Timeout(_) | DbError::PoolExhausted
        )
    }
}

// SQLite primary result codes (extended codes share the low byte).
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;
const SQLITE_CONSTRAINT: i64 = 19;

// Extended constraint codes.
const SQLITE_CONSTRAINT_CHECK: i64 = 275;
const SQLITE_CONSTRAINT_FOREIGNKEY: i64 = 787;
const SQLITE_CONSTRAINT_PRIMARYKEY: i64 = 1555;
const SQLITE_CONSTRAINT_UNIQUE: i64 = 2067;

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → by SQLite result code, then message
///     BUSY / LOCKED (5, 6, 261, 517, ...) → DbError::Busy
///     CONSTRAINT_UNIQUE / PRIMARYKEY      → DbError::UniqueViolation
///     CONSTRAINT_FOREIGNKEY               → DbError::ForeignKeyViolation
///     CONSTRAINT_CHECK                    → DbError::CheckViolation
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();
                let code = db_err
                    .code()
                    .and_then(|c| c.parse::<i64>().ok())
                    .unwrap_or(0);
                let primary = code & 0xff;

                if primary == SQLITE_BUSY
                    || primary == SQLITE_LOCKED
                    || msg.contains("database is locked")
                {
                    DbError::Busy(msg)
                } else if code == SQLITE_CONSTRAINT_UNIQUE
                    || code == SQLITE_CONSTRAINT_PRIMARYKEY
                    || msg.contains("UNIQUE constraint failed")
                {
                    // "UNIQUE constraint failed: <table>.<column>"
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if code == SQLITE_CONSTRAINT_FOREIGNKEY
                    || msg.contains("FOREIGN KEY constraint failed")
                {
                    DbError::ForeignKeyViolation { message: msg }
                } else if code == SQLITE_CONSTRAINT_CHECK
                    || msg.contains("CHECK constraint failed")
                {
                    DbError::CheckViolation { message: msg }
                } else if primary == SQLITE_CONSTRAINT {
                    DbError::QueryFailed(format!("constraint failed: {msg}"))
                } else {
                    DbError::QueryFailed(msg)
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Storage failures during checkout surface as `Commit` errors.
///
/// The reason keeps the storage detail for logs; the user-facing message
/// comes from `CheckoutError::user_message`, which never includes it.
impl From<DbError> for CheckoutError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Validation(e) => CheckoutError::Validation(e),
            other => CheckoutError::Commit {
                retryable: other.is_retryable(),
                reason: other.to_string(),
            },
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================
