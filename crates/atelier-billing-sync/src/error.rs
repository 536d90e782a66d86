//! Error taxonomy for the reconciliation engine.
//!
//! Only `SyncError` variants terminate a run. Everything a single item
//! can trip over (ambiguous identity, a failed write) is captured at
//! the item boundary and surfaced through the run report instead.

use thiserror::Error;

use atelier_provider::ProviderError;

/// Run-fatal errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or unusable credentials/connection info. Pre-flight;
    /// no network call has been made when this is raised.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The provider could not serve a subscription page, so the
    /// snapshot being reconciled is incomplete.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The run report could not be serialized or persisted.
    #[error("report error: {0}")]
    Report(String),
}

/// Result type for internal store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the identity and subscription stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An account already exists for the email (create conflict).
    /// This is a signal, not a failure: the resolver falls back to the
    /// bounded directory search when it sees this.
    #[error("an account already exists for {email}")]
    AlreadyExists { email: String },

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_message_names_email() {
        let err = StoreError::AlreadyExists {
            email: "a@x.com".to_string(),
        };
        assert_eq!(err.to_string(), "an account already exists for a@x.com");
    }

    #[test]
    fn test_provider_error_converts() {
        let err: SyncError = ProviderError::unavailable("page fetch failed").into();
        assert!(matches!(err, SyncError::Provider(_)));
    }
}
