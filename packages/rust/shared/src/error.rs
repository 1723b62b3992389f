//! Error types for the horoscope pipeline.
//!
//! Library crates use [`HoroscopeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum HoroscopeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The source data directory does not exist.
    #[error("data directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    /// An explicitly requested source file does not exist.
    #[error("source file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// The data directory contains no file with an accepted extension.
    #[error("no {extensions} files in {}", dir.display())]
    NoSourceFiles { dir: PathBuf, extensions: String },

    /// A single source file could not be opened or parsed.
    #[error("failed to read {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    /// The prompt template references a field the record shape does not provide.
    #[error("template substitution error: {message}")]
    TemplateSubstitution { message: String },

    /// Text generation failed for a single request.
    #[error("generation error: {0}")]
    Generation(String),

    /// Checkpoint serialization failed.
    #[error("checkpoint error at {}: {message}", path.display())]
    Checkpoint { path: PathBuf, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HoroscopeError>;

impl HoroscopeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a per-file read error.
    pub fn read(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Read {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a template substitution error.
    pub fn template(msg: impl Into<String>) -> Self {
        Self::TemplateSubstitution {
            message: msg.into(),
        }
    }

    /// Create a checkpoint error for the given output path.
    pub fn checkpoint(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Checkpoint {
            path: path.into(),
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
