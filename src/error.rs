//! Error types for fskit.
//!
//! A single crate-level error enum (`FsError`) covers every fallible
//! operation. Variants carry enough context (paths, pattern text, operation
//! names) to produce useful messages without wrapping.
//!
//! Cleanup-time failures are deliberately *not* represented here: run
//! disposal swallows and logs them so teardown can never mask the value or
//! error the owning scope was about to return.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors produced by fskit operations.
#[derive(Debug, Error)]
pub enum FsError {
    /// The root of a search or listing does not exist.
    #[error("path not found: {path}")]
    PathNotFound { path: PathBuf },

    /// A glob pattern could not be compiled.
    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The requested capability is declared but not implemented by this
    /// backend (e.g. visibility on local disk).
    #[error("operation not supported: {operation}")]
    Unsupported { operation: &'static str },

    /// An underlying filesystem call failed.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for fskit operations.
pub type FsResult<T> = Result<T, FsError>;

impl FsError {
    /// Wrap an IO error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FsError::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a path-not-found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        FsError::PathNotFound { path: path.into() }
    }

    /// Create an invalid-pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        FsError::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported-operation error.
    pub fn unsupported(operation: &'static str) -> Self {
        FsError::Unsupported { operation }
    }

    /// The path this error refers to, when it has one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            FsError::PathNotFound { path } | FsError::Io { path, .. } => Some(path),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
