//! Cache error types.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur in the cache system.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache file is not a JSON object of cache entries.
    #[error(
        "error while reading cache from {}: {message}\n\
         Please delete the cache (and the images) and rerun the program.",
        .path.display()
    )]
    Format { path: PathBuf, message: String },

    /// The cache file was written by an incompatible format revision.
    #[error(
        "Cache in {} has version {found}, expected {expected}.\n\
         Please delete the cache (and the images) and rerun the program.",
        .path.display()
    )]
    VersionMismatch {
        path: PathBuf,
        found: String,
        expected: String,
    },

    /// A request violates the cache policy, e.g. an absolute image path.
    #[error("Policy violation: {0}")]
    Policy(String),

    /// The formula is not cached, its image vanished, or the math mode differs.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A required argument was empty.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// Creates a format error for the cache file at `path`.
    pub fn format(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Format {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Creates a version mismatch error.
    pub fn version_mismatch(
        path: impl AsRef<Path>,
        found: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::VersionMismatch {
            path: path.as_ref().to_path_buf(),
            found: found.into(),
            expected: expected.into(),
        }
    }

    /// Creates a policy error.
    pub fn policy(message: impl Into<String>) -> Self {
        Self::Policy(message.into())
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Returns true for the routine "needs rendering" signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if the cache file could not be used at all.
    ///
    /// Only raised while opening; the caller may discard the old cache.
    pub fn is_incompatible(&self) -> bool {
        matches!(self, Self::Format { .. } | Self::VersionMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_mismatch_message() {
        let err = CacheError::version_mismatch("gladtex.cache", "1.0", "2.0");
        let message = err.to_string();

        assert!(message.contains("has version 1.0, expected 2.0"));
        assert!(message.contains("Please delete the cache"));
        assert!(err.is_incompatible());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_format_message_names_path() {
        let err = CacheError::format("out/gladtex.cache", "Decoded JSON is not an object");
        let message = err.to_string();

        assert!(message.contains("out/gladtex.cache"));
        assert!(message.contains("Decoded JSON is not an object"));
        assert!(err.is_incompatible());
    }

    #[test]
    fn test_kinds_are_distinguishable() {
        assert!(CacheError::not_found("x").is_not_found());
        assert!(!CacheError::policy("absolute path").is_not_found());
        assert!(!CacheError::policy("absolute path").is_incompatible());
        assert!(!CacheError::invalid_input("empty").is_incompatible());

        let io = CacheError::from(std::io::Error::other("disk full"));
        assert!(matches!(io, CacheError::Io(_)));
        assert!(!io.is_not_found());
    }
}
