use thiserror::Error;

/// Persistence layer errors.
///
/// These never cross the facade: the persistent sink reports them on the
/// console and degrades to an empty or zero result.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Table name is not a plain SQL identifier
    #[error("invalid log table name: {0:?}")]
    InvalidTable(String),

    /// Write hit a table that does not exist (after the one re-creation attempt)
    #[error("log table {0} does not exist")]
    MissingTable(String),

    /// No store attached while persistence was requested
    #[error("log database not set")]
    NotConfigured,

    #[error("log database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Short machine-friendly name, used in tracing fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTable(_) => "invalid_table",
            Self::MissingTable(_) => "missing_table",
            Self::NotConfigured => "not_configured",
            Self::Database(_) => "database",
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
