use std::path::{Path, PathBuf};
use std::sync::Mutex;

use json_patch::Patch;
use serde_json::Value;

use crate::{
    document::{default_template, validate},
    error::Result,
};

/// Owns the on-disk `seele.json` file and its in-memory cache. Single-writer
/// by convention: callers sharing one `ProfileStore` get mutual exclusion
/// for free via the internal mutex held across load-modify-save.
pub struct ProfileStore {
    path: PathBuf,
    cache: Mutex<Option<Value>>,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    /// Lazily load the document: first call reads disk (or falls back to the
    /// bundled template if the file doesn't exist yet); subsequent calls
    /// return the cache.
    pub fn load(&self) -> Result<Value> {
        let mut cache = self.cache.lock().unwrap();
        if let Some(doc) = cache.as_ref() {
            return Ok(doc.clone());
        }
        let doc = if self.path.exists() {
            let text = std::fs::read_to_string(&self.path)?;
            serde_json::from_str(&text)?
        } else {
            default_template()
        };
        *cache = Some(doc.clone());
        Ok(doc)
    }

    /// Apply an RFC 6902 JSON Patch to the cached document. On success,
    /// writes the updated document to disk and returns `true`. On any
    /// application or I/O failure, the cache is left untouched and `false`
    /// is returned — a failed patch never leaves a partially mutated cache.
    pub fn apply_patch(&self, patch: &Patch) -> Result<bool> {
        let mut cache = self.cache.lock().unwrap();
        let current = match cache.as_ref() {
            Some(doc) => doc.clone(),
            None => {
                drop(cache);
                self.load()?;
                cache = self.cache.lock().unwrap();
                cache.as_ref().unwrap().clone()
            }
        };

        let mut candidate = current;
        if json_patch::patch(&mut candidate, patch).is_err() {
            return Ok(false);
        }
        if validate(&candidate).is_err() {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let pretty = serde_json::to_string_pretty(&candidate)?;
        std::fs::write(&self.path, pretty)?;

        *cache = Some(candidate);
        Ok(true)
    }

    /// Replace the on-disk file wholesale (the full-profile-regeneration
    /// fallback) and invalidate/update the cache.
    pub fn replace(&self, document: Value) -> Result<()> {
        validate(&document).map_err(|e| e)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let pretty = serde_json::to_string_pretty(&document)?;
        std::fs::write(&self.path, pretty)?;
        *self.cache.lock().unwrap() = Some(document);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_falls_back_to_template_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("seele.json"));
        let doc = store.load().unwrap();
        assert!(doc.get("bot").is_some());
    }

    #[test]
    fn apply_patch_persists_and_updates_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("seele.json"));
        store.load().unwrap();

        let patch: Patch = serde_json::from_value(json!([
            { "op": "replace", "path": "/bot/name", "value": "Seele" }
        ]))
        .unwrap();

        assert!(store.apply_patch(&patch).unwrap());
        let doc = store.load().unwrap();
        assert_eq!(doc["bot"]["name"], "Seele");

        let persisted: Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(persisted["bot"]["name"], "Seele");
    }

    #[test]
    fn failed_patch_leaves_cache_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("seele.json"));
        store.load().unwrap();

        let bad_patch: Patch = serde_json::from_value(json!([
            { "op": "replace", "path": "/nonexistent/deep/path", "value": 1 }
        ]))
        .unwrap();

        assert!(!store.apply_patch(&bad_patch).unwrap());
        let doc = store.load().unwrap();
        assert_eq!(doc["bot"]["name"], "");
    }
}
