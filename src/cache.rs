use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{Result, TutorialError};

/// Persistent prompt → response cache backing the LLM gateway.
///
/// Keys are the full, already-interpolated prompt strings; lookups are exact
/// string matches with no normalization, so prompts that differ by a single
/// character are distinct entries.
///
/// The store is a single JSON object file. It is loaded lazily before every
/// lookup and updated with read-merge-write: load the latest entries, add the
/// new pair, persist. Concurrent writers can race, but entries are
/// content-addressed by prompt text, so a lost write only re-adds an
/// identical pair on the next miss.
#[derive(Debug, Clone)]
pub struct PromptCache {
    path: PathBuf,
}

impl PromptCache {
    /// Open a cache backed by `path`. The file is not created until the first
    /// insert; a missing file behaves as an empty cache.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the stored response for `prompt`, reloading the store first.
    pub fn get(&self, prompt: &str) -> Option<String> {
        self.load_entries().remove(prompt)
    }

    /// Merge `(prompt, response)` into the store and persist it.
    pub fn insert(&self, prompt: &str, response: &str) -> Result<()> {
        let mut entries = self.load_entries();
        entries.insert(prompt.to_string(), response.to_string());

        let serialized = serde_json::to_string(&entries)
            .map_err(|e| TutorialError::InvalidConfig(format!("cache serialization: {e}")))?;
        std::fs::write(&self.path, serialized)
            .map_err(|e| TutorialError::io(self.path.display().to_string(), e))?;
        Ok(())
    }

    /// Number of entries currently persisted.
    pub fn len(&self) -> usize {
        self.load_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load the store from disk. Missing file → empty. A torn or unreadable
    /// file degrades to empty with a warning rather than failing the call.
    fn load_entries(&self) -> HashMap<String, String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read prompt cache, starting empty");
                return HashMap::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt prompt cache, starting empty");
                HashMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let cache = PromptCache::open(dir.path().join("cache.json"));
        assert!(cache.get("anything").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_then_get() {
        let dir = tempdir().unwrap();
        let cache = PromptCache::open(dir.path().join("cache.json"));
        cache.insert("prompt a", "response a").unwrap();
        assert_eq!(cache.get("prompt a").as_deref(), Some("response a"));
        assert!(cache.get("prompt b").is_none());
    }

    #[test]
    fn lookup_is_exact_match() {
        let dir = tempdir().unwrap();
        let cache = PromptCache::open(dir.path().join("cache.json"));
        cache.insert("prompt", "response").unwrap();
        assert!(cache.get("prompt ").is_none());
        assert!(cache.get("Prompt").is_none());
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        PromptCache::open(&path).insert("p", "r").unwrap();

        // Simulated process restart: a fresh handle on the same file.
        let reopened = PromptCache::open(&path);
        assert_eq!(reopened.get("p").as_deref(), Some("r"));
    }

    #[test]
    fn merge_preserves_existing_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache = PromptCache::open(&path);
        cache.insert("first", "1").unwrap();

        // A second handle merges rather than clobbers.
        let other = PromptCache::open(&path);
        other.insert("second", "2").unwrap();

        assert_eq!(cache.get("first").as_deref(), Some("1"));
        assert_eq!(cache.get("second").as_deref(), Some("2"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn corrupt_file_degrades_to_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{ not json").unwrap();

        let cache = PromptCache::open(&path);
        assert!(cache.get("p").is_none());

        // Inserting over a corrupt file recovers it.
        cache.insert("p", "r").unwrap();
        assert_eq!(cache.get("p").as_deref(), Some("r"));
    }

    #[test]
    fn overwrite_is_last_writer_wins() {
        let dir = tempdir().unwrap();
        let cache = PromptCache::open(dir.path().join("cache.json"));
        cache.insert("p", "old").unwrap();
        cache.insert("p", "new").unwrap();
        assert_eq!(cache.get("p").as_deref(), Some("new"));
        assert_eq!(cache.len(), 1);
    }
}
