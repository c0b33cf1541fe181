//! Core error types for SiteScribe.
//!
//! This module defines the central error type shared by the scraper crates.
//! Browser transport failures and per-page scrape failures have their own
//! enums in the crates that produce them.

use crate::types::SessionStatus;
use thiserror::Error;

/// Central error type for SiteScribe core operations.
#[derive(Error, Debug)]
pub enum ScribeError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A session tried to move between two states that are not connected
    #[error("invalid session transition from {from} to {to}")]
    InvalidTransition {
        /// State the session was in
        from: SessionStatus,
        /// State that was requested
        to: SessionStatus,
    },

    /// Validation errors (invalid input, constraints)
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// I/O error reading config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `ScribeError`.
pub type Result<T> = std::result::Result<T, ScribeError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
