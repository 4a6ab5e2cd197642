//! Error types for ledger and engine operations

use lockstep_core::LockstepError;
use thiserror::Error;

/// Errors raised while talking to the database or applying scripts
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Validation or filesystem error from resolution; nothing was executed
    #[error(transparent)]
    Core(#[from] LockstepError),

    /// Backend failure outside of script execution (connecting, ledger reads and writes)
    #[error("Database error: {0}")]
    Database(String),

    /// A script's SQL failed. Scripts listed in `completed` ran before it and
    /// stay applied (or reversed).
    #[error("Failed to execute {file_name}: {message}")]
    ScriptExecution {
        file_name: String,
        message: String,
        completed: Vec<String>,
    },

    /// A script's SQL ran but the ledger could not be updated to match, so
    /// the database and the ledger now disagree about `file_name`.
    #[error("Executed {file_name} but failed to update the ledger: {message}")]
    LedgerWrite {
        file_name: String,
        message: String,
        completed: Vec<String>,
    },

    /// The ledger already holds this version
    #[error("Version {0} is already recorded as applied")]
    DuplicateVersion(String),
}

impl MigrateError {
    /// True when the run stopped after changing the database.
    pub fn is_partial(&self) -> bool {
        match self {
            MigrateError::ScriptExecution { completed, .. } => !completed.is_empty(),
            MigrateError::LedgerWrite { .. } => true,
            _ => false,
        }
    }

    /// Scripts that ran before the failure and stay in effect
    pub fn completed(&self) -> &[String] {
        match self {
            MigrateError::ScriptExecution { completed, .. } | MigrateError::LedgerWrite { completed, .. } => completed,
            _ => &[],
        }
    }
}

// Convert from sqlx errors
impl From<sqlx::Error> for MigrateError {
    fn from(err: sqlx::Error) -> Self {
        MigrateError::Database(err.to_string())
    }
}

/// Result type alias for ledger and engine operations
pub type MigrateResult<T> = Result<T, MigrateError>;
