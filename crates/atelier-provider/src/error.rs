//! Provider gateway error types.
//!
//! A failed page fetch means the external source of truth is
//! unreachable, so `Unavailable` is fatal to a reconciliation run.
//! A missing customer is a per-item condition and maps to `CustomerNotFound`.

use thiserror::Error;

/// Result type for provider gateway operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Error that can occur while talking to the payment provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider API could not be reached or returned a server error.
    #[error("provider unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Request was rejected by the provider (bad credentials).
    #[error("provider authentication failed")]
    AuthenticationFailed,

    /// The requested customer does not exist.
    #[error("customer not found: {customer_id}")]
    CustomerNotFound { customer_id: String },

    /// The provider returned a body the gateway could not decode.
    #[error("invalid provider response: {message}")]
    InvalidResponse { message: String },

    /// Gateway was constructed with an unusable configuration.
    #[error("invalid gateway configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl ProviderError {
    /// Build an `Unavailable` error from a transport failure.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Build an `Unavailable` error that keeps the underlying cause.
    pub fn unavailable_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Unavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this error invalidates the whole run rather than one item.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::AuthenticationFailed | Self::InvalidConfiguration { .. }
        )
    }
}
