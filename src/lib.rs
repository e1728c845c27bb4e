//! Snapshot-Courier: a daily JSON snapshot daemon
//!
//! This crate fetches a remote JSON resource once a day with a bounded retry
//! budget, stores each successful response as a timestamped artifact, and
//! optionally mails the artifact to a Bcc distribution list.

pub mod config;
pub mod fetcher;
pub mod notify;
pub mod persist;
pub mod scheduler;

use thiserror::Error;

/// Main error type for Snapshot-Courier operations
#[derive(Debug, Error)]
pub enum CourierError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Notify error: {0}")]
    Notify(#[from] notify::NotifyError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required environment variable {0} is not set")]
    MissingKey(&'static str),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to load env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
}

/// Result type alias for Snapshot-Courier operations
pub type Result<T> = std::result::Result<T, CourierError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{load_config, Config};
pub use fetcher::{fetch_with_retry, HttpSource, JsonSource, Payload};
pub use notify::{Notifier, SmtpNotifier};
pub use persist::{Artifact, ArtifactStore};
pub use scheduler::{CycleReport, Pipeline, Scheduler};
