//! JSON-backed, insertion-ordered record store.
//!
//! Every `persist` rewrites the whole snapshot through a temporary file, so the
//! file on disk is always a complete JSON array even if a run is killed.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{HarvestError, Result};

/// Identity used for duplicate checks.
pub trait CacheKey {
    fn cache_key(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct JsonCache<T> {
    path: PathBuf,
    items: Vec<T>,
    keys: HashSet<String>,
}

impl<T> JsonCache<T>
where
    T: Serialize + DeserializeOwned + CacheKey,
{
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            items: Vec::new(),
            keys: HashSet::new(),
        }
    }

    /// Load the cache at `path`.
    ///
    /// A missing, empty or unparseable file yields an empty cache; an
    /// unparseable one is moved aside to `<file>.corrupt` first. Valid JSON
    /// that is not an array of records is an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let mut cache = Self::empty(path);
        let path = cache.path.clone();

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No cache file, starting empty");
                return Ok(cache);
            }
            Err(e) => return Err(HarvestError::io(&path, e)),
        };
        if content.trim().is_empty() {
            warn!(path = %path.display(), "Cache file is empty, starting empty");
            return Ok(cache);
        }

        let value: Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                let aside = corrupt_path(&path);
                warn!(
                    path = %path.display(),
                    moved_to = %aside.display(),
                    error = %e,
                    "Cache file is not valid JSON, starting empty"
                );
                fs::rename(&path, &aside).map_err(|e| HarvestError::io(&path, e))?;
                return Ok(cache);
            }
        };

        if !value.is_array() {
            return Err(HarvestError::MalformedCache {
                path,
                reason: "top-level value is not an array".to_string(),
            });
        }
        let items: Vec<T> =
            serde_json::from_value(value).map_err(|e| HarvestError::MalformedCache {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        for item in items {
            cache.append(item);
        }
        info!(path = %path.display(), records = cache.len(), "Loaded cache");
        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn exists(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Append without a uniqueness check; callers dedupe with `exists` first.
    pub fn append(&mut self, item: T) {
        self.keys.insert(item.cache_key().to_string());
        self.items.push(item);
    }

    pub fn persist(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| HarvestError::io(dir, e))?;
        }
        let mut json = serde_json::to_string_pretty(&self.items)?;
        json.push('\n');

        let tmp = sibling_path(&self.path, "tmp");
        fs::write(&tmp, json).map_err(|e| HarvestError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| HarvestError::io(&self.path, e))?;
        debug!(path = %self.path.display(), records = self.items.len(), "Persisted cache");
        Ok(())
    }
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{suffix}"));
    PathBuf::from(name)
}

pub fn corrupt_path(path: &Path) -> PathBuf {
    sibling_path(path, "corrupt")
}
