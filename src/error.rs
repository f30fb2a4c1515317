//! Error types for the migration runner.
//!
//! Remote failures reported by the service are not errors here: they come back
//! as a [`MigrationOutcome`](crate::models::MigrationOutcome) so the CLI decides
//! how to present them. These variants cover everything that stops a run
//! before an outcome exists.

use std::path::PathBuf;

use crate::config::ConfigError;

/// Runner-level errors.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Configuration missing, placeholder, or malformed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// SQL file missing or unreadable
    #[error("Cannot read SQL file {}: {source}", .path.display())]
    Payload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Name not present in the migration catalog
    #[error("Unknown migration '{0}'. Run `migrate-rpc list` to see available migrations.")]
    UnknownMigration(String),

    /// Request could not be sent or its response could not be read
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// A later step failed to send after earlier steps were applied
    #[error("Stopped at {step} with {applied} of {total} steps already applied: {source}")]
    Interrupted {
        step: String,
        applied: usize,
        total: usize,
        #[source]
        source: Box<MigrateError>,
    },

    /// Console output could not be written
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl MigrateError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) => crate::models::exit_codes::CONFIG,
            MigrateError::Payload { .. } => crate::models::exit_codes::PAYLOAD,
            MigrateError::UnknownMigration(_)
            | MigrateError::Transport { .. }
            | MigrateError::Interrupted { .. }
            | MigrateError::Output(_) => crate::models::exit_codes::REMOTE,
        }
    }
}

/// Convenience type alias for Results with MigrateError.
pub type MigrateResult<T> = Result<T, MigrateError>;

impl From<reqwest::Error> for MigrateError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        let message = if err.is_timeout() {
            "timed out".to_string()
        } else if err.is_connect() {
            format!("connection failed ({})", err)
        } else {
            err.to_string()
        };
        MigrateError::Transport { url, message }
    }
}
