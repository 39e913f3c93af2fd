//! Error types for deckbuilder.
//!
//! Library crates use [`DeckBuilderError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all deckbuilder operations.
///
/// Every variant aborts the current build: there is no partial output.
#[derive(Debug, thiserror::Error)]
pub enum DeckBuilderError {
    /// A required path (content root, template) does not exist.
    #[error("not found: {path:?}")]
    NotFound { path: PathBuf },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A content entry has no numeric sort key and the policy rejects it.
    #[error("malformed name: {name:?} has no numeric sort key")]
    MalformedName { name: String },

    /// Markdown, front matter, or typography transform failure.
    #[error("render error: {message}")]
    Render { message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Page template substitution error.
    #[error("template error: {message}")]
    Template { message: String },

    /// Filesystem watcher error.
    #[error("watch error: {0}")]
    Watch(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DeckBuilderError>;

impl DeckBuilderError {
    /// Create a not-found error for a path.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a render error from any displayable message.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a template error from any displayable message.
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DeckBuilderError::config("unknown policy");
        assert_eq!(err.to_string(), "config error: unknown policy");

        let err = DeckBuilderError::MalformedName {
            name: "intro".into(),
        };
        assert!(err.to_string().contains("\"intro\""));

        let err = DeckBuilderError::not_found("/no/such/path");
        assert!(err.to_string().contains("/no/such/path"));
    }

    #[test]
    fn io_error_keeps_path() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = DeckBuilderError::io("/slides/1-title.md", source);
        let msg = err.to_string();
        assert!(msg.contains("1-title.md"));
        assert!(msg.contains("denied"));
    }
}
