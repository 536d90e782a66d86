//! Environment-derived configuration.
//!
//! Credential checks happen here, before any network call: a missing
//! key is a configuration error, never a mid-run surprise.

use std::env;

use crate::error::{CliError, CliResult};

/// Default provider API endpoint.
const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.stripe.com";

/// Runtime configuration for the sync job.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Payment-provider secret key.
    pub provider_api_key: String,
    /// Postgres connection string for the identity/subscription store.
    pub database_url: String,
    /// Provider API base URL (overridable for test environments).
    pub provider_base_url: String,
}

impl AppConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> CliResult<Self> {
        Ok(Self {
            provider_api_key: required("PROVIDER_API_KEY")?,
            database_url: required("DATABASE_URL")?,
            provider_base_url: env::var("PROVIDER_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_PROVIDER_BASE_URL.to_string()),
        })
    }
}

fn required(name: &str) -> CliResult<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(CliError::Config(format!(
            "{name} is not set; it is required to run the sync"
        ))),
    }
}
