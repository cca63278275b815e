//! Error types for vanbuilder.
//!
//! Library crates use [`VanBuilderError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Two conditions from the pipeline's failure model are deliberately *not*
//! variants here: a field extractor that finds nothing returns `None`, and a
//! duplicate that the merge policy declines to overwrite is a decision, not
//! an error.

use std::path::PathBuf;

/// Top-level error type for all vanbuilder operations.
#[derive(Debug, thiserror::Error)]
pub enum VanBuilderError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A page or contact sub-page could not be loaded (unreachable, timeout, non-2xx).
    #[error("navigation error: {0}")]
    Navigation(String),

    /// The primary geocoding service failed or answered with an error status.
    #[error("geocode error: {0}")]
    Geocode(String),

    /// The CSP policy store could not be read or amended.
    #[error("csp remediation error: {0}")]
    CspRemediation(String),

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Malformed batch input.
    #[error("input error: {message}")]
    Input { message: String },

    /// HTML, JSON, or policy file parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, VanBuilderError>;

impl VanBuilderError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a navigation error from any displayable message.
    pub fn navigation(msg: impl Into<String>) -> Self {
        Self::Navigation(msg.into())
    }

    /// Create an input error from any displayable message.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short, stable label for the error class, used in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Navigation(_) => "navigation",
            Self::Geocode(_) => "geocode",
            Self::CspRemediation(_) => "csp",
            Self::Storage(_) => "storage",
            Self::Input { .. } => "input",
            Self::Parse { .. } => "parse",
            Self::Io { .. } => "io",
            Self::Validation { .. } => "validation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = VanBuilderError::config("missing database path");
        assert_eq!(err.to_string(), "config error: missing database path");

        let err = VanBuilderError::navigation("https://example-van.test/: HTTP 503");
        assert!(err.to_string().starts_with("navigation error:"));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn error_kind_labels() {
        assert_eq!(VanBuilderError::Storage("locked".into()).kind(), "storage");
        assert_eq!(VanBuilderError::navigation("timeout").kind(), "navigation");
        assert_eq!(
            VanBuilderError::CspRemediation("read-only".into()).kind(),
            "csp"
        );
    }
}
