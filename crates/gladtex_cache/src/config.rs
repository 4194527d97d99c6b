//! Cache configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::CacheError;

/// File name of the cache when none is configured.
pub const DEFAULT_CACHE_FILE: &str = "gladtex.cache";

/// Options used to open a [`FormulaCache`](crate::FormulaCache).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheOptions {
    /// Backing JSON file.
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Whether an unreadable or outdated cache file is reported as an error.
    ///
    /// When `false`, such a file is deleted together with all `eqn*` images
    /// next to it and an empty cache is used instead.
    #[serde(default = "default_keep_incompatible_cache")]
    pub keep_incompatible_cache: bool,
}

fn default_path() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_FILE)
}

fn default_keep_incompatible_cache() -> bool {
    true
}

impl CacheOptions {
    /// Creates options for the cache file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Sets whether incompatible cache files are kept (and reported).
    pub fn keep_incompatible_cache(mut self, keep: bool) -> Self {
        self.keep_incompatible_cache = keep;
        self
    }

    /// Parses options from a JSON object.
    pub fn from_json(json: &str) -> Result<Self, CacheError> {
        serde_json::from_str(json)
            .map_err(|e| CacheError::invalid_input(format!("Failed to parse cache options: {}", e)))
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            path: default_path(),
            keep_incompatible_cache: default_keep_incompatible_cache(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_default_options() {
        let options = CacheOptions::default();
        assert_eq!(options.path, PathBuf::from("gladtex.cache"));
        assert!(options.keep_incompatible_cache);
    }

    #[test]
    fn test_builder() {
        let options = CacheOptions::new("build/formulas.cache").keep_incompatible_cache(false);
        assert_eq!(options.path, PathBuf::from("build/formulas.cache"));
        assert!(!options.keep_incompatible_cache);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let options = CacheOptions::from_json(r#"{ "path": "out/cache.json" }"#).unwrap();
        assert_eq!(options, CacheOptions::new("out/cache.json"));

        let options = CacheOptions::from_json("{}").unwrap();
        assert_eq!(options, CacheOptions::default());
    }

    #[rstest]
    #[case::unknown_property(r#"{ "pathh": "x" }"#)]
    #[case::type_mismatch(r#"{ "keep_incompatible_cache": "yes" }"#)]
    #[case::not_an_object("[]")]
    fn test_from_json_errors(#[case] json: &str) {
        let err = CacheOptions::from_json(json).unwrap_err();
        assert!(
            err.to_string().contains("Failed to parse cache options"),
            "unexpected error: {}",
            err
        );
    }
}
