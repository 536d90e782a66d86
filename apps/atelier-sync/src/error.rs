//! CLI error types and exit codes.

use thiserror::Error;

/// Exit codes:
/// - 0: run completed (individual item errors do not change this)
/// - 1: run-fatal failure (provider unreachable, store unreachable)
/// - 2: configuration error (missing credentials, bad flags)
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store connection failed: {0}")]
    Store(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Report error: {0}")]
    Report(String),
}

impl CliError {
    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Store(_) | Self::Provider(_) | Self::Report(_) => 1,
        }
    }

    /// Print the error to stderr.
    pub fn print(&self) {
        eprintln!("error: {self}");
    }
}
