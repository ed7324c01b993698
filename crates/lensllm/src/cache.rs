// File-backed prompt/answer cache

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CACHE_FILE: &str = "llm_cache.json";

/// Envelope written to disk
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    /// Answers keyed by the BLAKE3 hex digest of the prompt
    entries: HashMap<String, String>,
}

/// Answer cache keyed by prompt hash, persisted as one JSON file.
///
/// Without a directory the cache lives in memory only.
#[derive(Debug, Default)]
pub struct PromptCache {
    path: Option<PathBuf>,
    entries: HashMap<String, String>,
}

impl PromptCache {
    /// In-memory cache.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load `<dir>/llm_cache.json`. Missing or corrupted files start empty.
    pub fn open(dir: &Path) -> Self {
        let path = dir.join(CACHE_FILE);
        let entries = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<CacheFile>(&bytes) {
                Ok(file) => file.entries,
                Err(e) => {
                    // Corrupted cache degrades to a miss on every prompt.
                    warn!("Ignoring corrupted LLM cache {}: {}", path.display(), e);
                    if let Err(e) = fs::remove_file(&path) {
                        warn!("Could not remove LLM cache {}: {}", path.display(), e);
                    }
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        debug!("Loaded {} cached LLM answers", entries.len());
        Self {
            path: Some(path),
            entries,
        }
    }

    /// Cache key for a prompt.
    pub fn key(prompt: &str) -> String {
        blake3::hash(prompt.as_bytes()).to_hex().to_string()
    }

    /// Cached answer for `prompt`.
    pub fn get(&self, prompt: &str) -> Option<&str> {
        self.entries.get(&Self::key(prompt)).map(String::as_str)
    }

    /// Store an answer and persist the cache.
    pub fn insert(&mut self, prompt: &str, answer: String) -> io::Result<()> {
        self.entries.insert(Self::key(prompt), answer);
        self.persist()
    }

    /// Number of cached answers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No cached answers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = CacheFile {
            entries: self.entries.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&file).map_err(io::Error::from)?;
        fs::write(path, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn answers_survive_reopen() {
        let dir = tempdir().expect("tempdir");
        let mut cache = PromptCache::open(dir.path());
        assert!(cache.is_empty());
        cache
            .insert("summarize main.rs", "entry point".to_string())
            .expect("persist");

        let reopened = PromptCache::open(dir.path());
        assert_eq!(reopened.get("summarize main.rs"), Some("entry point"));
        assert_eq!(reopened.get("other prompt"), None);
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn corrupted_file_is_treated_as_empty() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(CACHE_FILE);
        fs::write(&path, b"{invalid json").expect("write corrupted cache");

        let cache = PromptCache::open(dir.path());
        assert!(cache.is_empty());
        assert!(!path.exists(), "corrupted cache file should be removed");
    }

    #[test]
    fn corrupted_cache_is_rewritten_on_next_insert() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join(CACHE_FILE), b"[1, 2").expect("write corrupted cache");

        let mut cache = PromptCache::open(dir.path());
        cache
            .insert("summarize lib.rs", "library root".to_string())
            .expect("persist");

        let reopened = PromptCache::open(dir.path());
        assert_eq!(reopened.get("summarize lib.rs"), Some("library root"));
    }

    #[test]
    fn keys_are_stable_hex_digests() {
        let key = PromptCache::key("abc");
        assert_eq!(key.len(), 64);
        assert_eq!(key, PromptCache::key("abc"));
        assert_ne!(key, PromptCache::key("abd"));
    }

    #[test]
    fn in_memory_cache_never_touches_disk() {
        let mut cache = PromptCache::in_memory();
        cache.insert("p", "a".to_string()).expect("insert");
        assert_eq!(cache.get("p"), Some("a"));
    }
}
