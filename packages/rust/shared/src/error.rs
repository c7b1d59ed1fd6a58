//! Error types for the knowledge-base pipeline.
//!
//! Library crates use [`KbError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum KbError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A stage's required input file does not exist.
    #[error("missing {what} at {path:?}. {hint}")]
    MissingInput {
        what: &'static str,
        path: PathBuf,
        hint: &'static str,
    },

    /// Network/HTTP setup error (per-page fetch failures never surface as errors).
    #[error("network error: {0}")]
    Network(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Persisted JSON that does not match the expected schema.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, KbError>;

impl KbError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// A required stage input is absent.
    pub fn missing_input(
        what: &'static str,
        path: impl Into<PathBuf>,
        hint: &'static str,
    ) -> Self {
        Self::MissingInput {
            what,
            path: path.into(),
            hint,
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
