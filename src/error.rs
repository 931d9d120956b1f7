// Error types for the catalog: storage, provider, validation, and synchronization.

use thiserror::Error;

/// Storage failure other than "not found" (a miss is `Ok(None)`).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique-key collision on insert. Callers treat this as "already present".
    #[error("row already exists")]
    Conflict,

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        let unique = e
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if unique {
            StoreError::Conflict
        } else {
            StoreError::Database(e)
        }
    }
}

/// Any failure talking to the external provider. Transport errors, timeouts,
/// non-2xx statuses and undecodable bodies all collapse into one outcome.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// The client could not be set up (bad base URL, TLS backend failure).
    #[error("invalid provider configuration: {0}")]
    Config(String),
}

/// A provider creature payload that is missing required data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing stat '{stat}' for pokemon '{creature}'")]
    MissingStat { creature: String, stat: &'static str },

    #[error("missing type for pokemon '{creature}'")]
    MissingType { creature: String },
}

/// Outcome of a failed synchronization. Scoped to one identifier.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("pokemon not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Fetch(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("synchronization of {0} timed out")]
    TimedOut(String),
}

impl SyncError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::InvalidIdentifier(_) => "invalid_identifier",
            SyncError::NotFound(_) => "not_found",
            SyncError::Validation(_) => "validation",
            SyncError::Fetch(_) => "fetch",
            SyncError::Store(_) => "store",
            SyncError::TimedOut(_) => "timeout",
        }
    }
}
