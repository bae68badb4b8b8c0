//! Error types for the memoization cache

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Error type for cache operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// I/O error during cache operations
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(diskmemo::cache::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "write", "create_dir_all")
        operation: String,
    },

    /// Binding-time configuration error
    #[error("Cache configuration error: {message}")]
    #[diagnostic(
        code(diskmemo::cache::config),
        help("Pass an existing directory as cache_dir or configure DISKMEMO_CACHE_DIR")
    )]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// A stored entry exists but cannot be decoded
    #[error("Corrupt cache entry {}: {message}", path.display())]
    #[diagnostic(
        code(diskmemo::cache::corrupt_entry),
        help("Delete the entry file to force recomputation")
    )]
    CorruptEntry {
        /// Path of the unreadable entry
        path: Box<Path>,
        /// Decoder error message
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(code(diskmemo::cache::serialization))]
    Serialization {
        /// Error message describing the serialization issue
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }

    /// Create a corrupt entry error
    #[must_use]
    pub fn corrupt_entry(path: impl AsRef<Path>, msg: impl Into<String>) -> Self {
        Self::CorruptEntry {
            path: path.as_ref().into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Whether this error reports an unreadable stored entry
    #[must_use]
    pub const fn is_corrupt_entry(&self) -> bool {
        matches!(self, Self::CorruptEntry { .. })
    }
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, Error>;
