//! Error types and result aliases for peerbump operations.
//!
//! Provides a unified error type that covers all possible error conditions
//! across the workspace with actionable error messages.

use thiserror::Error;

/// Unified error type for all peerbump operations
#[derive(Error, Debug)]
pub enum BumpError {
    // Config errors
    #[error("Failed to parse peerbump.toml: {message} at line {line}, column {column}")]
    TomlParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Failed to parse package.json: {message}")]
    JsonParse { message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Registry errors
    #[error("Package '{name}' not found in registry")]
    PackageNotFound { name: String },

    #[error("Version {version} of '{name}' not found in registry")]
    VersionNotFound { name: String, version: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    // Resolution errors
    #[error("Invalid version '{input}' for {package}")]
    InvalidVersion { package: String, input: String },

    #[error("{count} conflict(s) could not be resolved")]
    UnresolvedConflicts { count: usize },

    #[error("Suggestion oracle failed: {message}")]
    Suggestion { message: String },

    #[error("Resolution was cancelled")]
    Cancelled,

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for peerbump operations
pub type BumpResult<T> = Result<T, BumpError>;

impl BumpError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BumpError::Network { .. } | BumpError::Io { .. })
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            BumpError::PackageNotFound { .. } => {
                Some("Check the package name spelling or the configured registry URL")
            },
            BumpError::VersionNotFound { .. } => {
                Some("Run 'npm view <package> versions' to list published versions")
            },
            BumpError::Network { .. } => Some("Check your internet connection and try again"),
            BumpError::PermissionDenied { .. } => {
                Some("Set a registry token in peerbump.toml or PEERBUMP_TOKEN")
            },
            BumpError::InvalidVersion { .. } => {
                Some("Use a semantic version or range such as 2.1.0 or ^2.1.0")
            },
            BumpError::UnresolvedConflicts { .. } => {
                Some("Review the tips above, or pick target versions the peer ranges accept")
            },
            _ => None,
        }
    }
}
