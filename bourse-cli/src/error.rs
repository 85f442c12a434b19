//! CLI error types.

use bourse_domain::{CredentialError, DomainError};
use bourse_exec::ExecError;
use thiserror::Error;

/// CLI-level errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Execution error
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    /// Credential error
    #[error("Credential error: {0}")]
    Credentials(#[from] CredentialError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Nothing held in the asset to sell
    #[error("No open position on {0}")]
    NoPosition(String),

    /// Output could not be written
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
