//! Formula cache backed by a JSON file.

use std::collections::{BTreeMap, HashMap};
use std::collections::hash_map;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{CacheEntry, CacheError, CacheOptions, Position, normalize_formula};

/// Revision of the on-disk format. Files stamped differently are rejected.
pub const FORMAT_VERSION: &str = "2.0";

/// Reserved key holding the format revision in the cache file.
pub const VERSION_KEY: &str = "GladTeX__cache__version";

/// File name prefix of rendered images, used when discarding an old cache.
pub const IMAGE_PREFIX: &str = "eqn";

/// Maps normalized formulas to the images rendered for them.
///
/// The cache is loaded when opened and only written back by [`save`](Self::save).
/// Lookups evict entries whose image no longer exists, so even [`get`](Self::get)
/// takes `&mut self`. Callers sharing one cache between threads must wrap it
/// in a lock.
#[derive(Debug)]
pub struct FormulaCache {
    /// Backing JSON file.
    path: PathBuf,
    /// In-memory entries keyed by normalized formula.
    entries: HashMap<String, CacheEntry>,
}

impl FormulaCache {
    /// Opens the cache stored at `path`.
    ///
    /// A missing file yields an empty cache. If the file cannot be decoded or
    /// carries another format version, the error is returned when
    /// `keep_incompatible_cache` is set. Otherwise the file and every file
    /// starting with [`IMAGE_PREFIX`] in the same directory are deleted, and an
    /// empty cache is returned.
    pub fn open(
        path: impl Into<PathBuf>,
        keep_incompatible_cache: bool,
    ) -> Result<Self, CacheError> {
        let mut cache = Self {
            path: path.into(),
            entries: HashMap::new(),
        };

        match cache.load() {
            Ok(()) => Ok(cache),
            Err(e) if e.is_incompatible() && !keep_incompatible_cache => {
                warn!("Discarding incompatible cache: {}", e);
                cache.discard()?;
                Ok(cache)
            }
            Err(e) => Err(e),
        }
    }

    /// Opens a cache as described by `options`.
    pub fn with_options(options: &CacheOptions) -> Result<Self, CacheError> {
        Self::open(options.path.clone(), options.keep_incompatible_cache)
    }

    /// Returns the backing file of this cache.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of cached formulas.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over normalized formulas and their entries.
    ///
    /// Entries are returned as stored; their images are not checked.
    pub fn iter(&self) -> hash_map::Iter<'_, String, CacheEntry> {
        self.entries.iter()
    }

    /// Adds a rendered formula, replacing any entry with the same normalized key.
    ///
    /// # Arguments
    ///
    /// * `formula` - Formula source, normalized before use as key
    /// * `position` - Geometry reported by the renderer
    /// * `image_path` - Relative path of the rendered image; `\` becomes `/`
    /// * `display_math` - Whether the formula was rendered as display math
    ///
    /// # Errors
    ///
    /// * [`CacheError::InvalidInput`] if any argument is empty, or the formula
    ///   is empty once normalized
    /// * [`CacheError::Policy`] if `image_path` is absolute
    /// * [`CacheError::NotFound`] if the image exists neither at `image_path`
    ///   nor under its file name next to the cache file
    pub fn add(
        &mut self,
        formula: &str,
        position: Position,
        image_path: &str,
        display_math: bool,
    ) -> Result<(), CacheError> {
        if formula.is_empty() || position.is_empty() || image_path.is_empty() {
            return Err(CacheError::invalid_input(
                "the supplied arguments may not be empty",
            ));
        }
        if is_absolute(image_path) {
            return Err(CacheError::policy(format!(
                "the image path may not be absolute: {}",
                image_path
            )));
        }

        let image_path = image_path.replace('\\', "/");
        if !self.image_exists_when_added(&image_path) {
            return Err(CacheError::not_found(format!(
                "cannot add {} to the cache: doesn't exist",
                image_path
            )));
        }

        let key = normalize_formula(formula);
        if key.is_empty() {
            return Err(CacheError::invalid_input(format!(
                "the formula {:?} is empty once normalized",
                formula
            )));
        }
        if key == VERSION_KEY {
            return Err(CacheError::policy(format!(
                "{} is reserved for the format version",
                VERSION_KEY
            )));
        }

        debug!("Caching {:?} -> {}", key, image_path);
        self.entries
            .insert(key, CacheEntry::new(position, image_path, display_math));
        Ok(())
    }

    /// Removes a formula from the cache and returns its entry.
    ///
    /// The image file is left alone.
    pub fn remove(&mut self, formula: &str) -> Result<CacheEntry, CacheError> {
        let key = normalize_formula(formula);
        self.entries
            .remove(&key)
            .ok_or_else(|| CacheError::not_found(format!("key {} not in cache", key)))
    }

    /// Looks up a formula rendered in the given math mode.
    ///
    /// An entry whose image no longer exists is evicted and reported as not
    /// found. An entry rendered in the other mode is kept but not returned.
    pub fn get(&mut self, formula: &str, display_math: bool) -> Result<&CacheEntry, CacheError> {
        let key = normalize_formula(formula);

        let (stale, same_mode) = match self.entries.get(&key) {
            Some(entry) => (
                !self.image_exists(&entry.image_path),
                entry.display_math == display_math,
            ),
            None => return Err(CacheError::not_found(key)),
        };

        if stale {
            debug!("Evicting {:?}: image is gone", key);
            self.entries.remove(&key);
            return Err(CacheError::not_found(key));
        }
        if !same_mode {
            return Err(CacheError::not_found(key));
        }

        self.entries
            .get(&key)
            .ok_or_else(|| CacheError::not_found(key.clone()))
    }

    /// Checks whether [`get`](Self::get) would succeed.
    pub fn contains(&mut self, formula: &str, display_math: bool) -> bool {
        self.get(formula, display_math).is_ok()
    }

    /// Writes the cache to its backing file, replacing the previous content.
    pub fn save(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut object = BTreeMap::new();
        object.insert(
            VERSION_KEY.to_string(),
            Value::String(FORMAT_VERSION.to_string()),
        );
        for (formula, entry) in &self.entries {
            let value = serde_json::to_value(entry).map_err(std::io::Error::from)?;
            object.insert(formula.clone(), value);
        }

        let json = serde_json::to_string(&object).map_err(std::io::Error::from)?;
        fs::write(&self.path, json)?;

        info!(
            "Saved {} cache entries to {}",
            self.entries.len(),
            self.path.display()
        );

        Ok(())
    }

    /// Loads entries from the backing file, if it exists.
    fn load(&mut self) -> Result<(), CacheError> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cache file found at {}", self.path.display());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        self.entries = decode(&self.path, &content)?;
        info!(
            "Loaded {} cache entries from {}",
            self.entries.len(),
            self.path.display()
        );

        Ok(())
    }

    /// Deletes the backing file and all images next to it, leaving the cache empty.
    fn discard(&mut self) -> Result<(), CacheError> {
        self.entries.clear();

        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        for dir_entry in fs::read_dir(self.directory())? {
            let dir_entry = dir_entry?;
            if !dir_entry
                .file_name()
                .to_string_lossy()
                .starts_with(IMAGE_PREFIX)
            {
                continue;
            }
            let file = dir_entry.path();
            if file.is_file() {
                warn!("Removing outdated image {}", file.display());
                fs::remove_file(&file)?;
            }
        }

        Ok(())
    }

    /// Directory containing the backing file.
    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Checks a stored image path, relative to the working directory or to the
    /// cache file's directory.
    fn image_exists(&self, image_path: &str) -> bool {
        let stored = Path::new(image_path);
        stored.exists() || self.directory().join(stored).exists()
    }

    /// Checks an image handed to [`add`](Self::add).
    ///
    /// The working directory of the renderer may differ from the cache's, so
    /// the bare file name is also tried next to the cache file.
    fn image_exists_when_added(&self, image_path: &str) -> bool {
        let given = Path::new(image_path);
        if self.image_exists(image_path) {
            return true;
        }
        given
            .file_name()
            .is_some_and(|name| self.directory().join(name).exists())
    }
}

/// Decodes the content of a cache file.
fn decode(path: &Path, content: &[u8]) -> Result<HashMap<String, CacheEntry>, CacheError> {
    let value: Value =
        serde_json::from_slice(content).map_err(|e| CacheError::format(path, e.to_string()))?;
    let Value::Object(mut object) = value else {
        return Err(CacheError::format(path, "Decoded JSON is not an object."));
    };

    match object.remove(VERSION_KEY) {
        // unstamped files are taken to be current
        None => {}
        Some(version) if is_unset(&version) => {}
        Some(Value::String(version)) if version == FORMAT_VERSION => {}
        Some(Value::String(version)) => {
            return Err(CacheError::version_mismatch(path, version, FORMAT_VERSION));
        }
        Some(other) => {
            return Err(CacheError::version_mismatch(
                path,
                other.to_string(),
                FORMAT_VERSION,
            ));
        }
    }

    object
        .into_iter()
        .map(|(formula, value)| {
            serde_json::from_value::<CacheEntry>(value)
                .map(|entry| (formula.clone(), entry))
                .map_err(|e| CacheError::format(path, format!("invalid entry {:?}: {}", formula, e)))
        })
        .collect()
}

/// Returns true for version stamps that count as missing: null, false, zero,
/// and empty strings, arrays or objects.
fn is_unset(version: &Value) -> bool {
    match version {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

/// Returns true for paths that are absolute on any platform.
fn is_absolute(image_path: &str) -> bool {
    if Path::new(image_path).is_absolute() || image_path.starts_with(['/', '\\']) {
        return true;
    }
    // Windows drive prefix, e.g. `C:\` or `C:/`
    let bytes = image_path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
