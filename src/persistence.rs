// src/persistence.rs
//
// Minimal key-value progress store. The cursor is persisted as two
// string-encoded integers so any KV backend a host app provides can
// round-trip it.

use directories::ProjectDirs;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

pub const PROGRESS_CHAPTER_KEY: &str = "progress_chapter";
pub const PROGRESS_VERSE_KEY: &str = "progress_verse";

/// The minimal contract the engine needs from external storage.
pub trait ProgressStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, String>;
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
}

// A shared handle to a store is itself a store, so hosts can keep reading
// the same store the engine writes.
impl<S: ProgressStore + ?Sized> ProgressStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        (**self).set(key, value)
    }
}

/// Read the persisted cursor. Missing or malformed values yield None so the
/// navigator degrades to the start position instead of failing.
pub fn load_cursor(store: &dyn ProgressStore) -> Option<(u32, u32)> {
    let chapter = store.get(PROGRESS_CHAPTER_KEY).ok().flatten()?;
    let verse = store.get(PROGRESS_VERSE_KEY).ok().flatten()?;
    match (chapter.trim().parse::<u32>(), verse.trim().parse::<u32>()) {
        (Ok(c), Ok(v)) => Some((c, v)),
        _ => {
            log::warn!(
                "[Persistence] Stored cursor '{}':'{}' is not numeric, ignoring",
                chapter,
                verse
            );
            None
        }
    }
}

/// Write the cursor after a successful advance.
pub fn save_cursor(store: &dyn ProgressStore, chapter: u32, verse: u32) -> Result<(), String> {
    store.set(PROGRESS_CHAPTER_KEY, &chapter.to_string())?;
    store.set(PROGRESS_VERSE_KEY, &verse.to_string())?;
    log::debug!("[Persistence] Saved cursor {}:{}", chapter, verse);
    Ok(())
}

/// File-backed store: one JSON object in the platform config directory,
/// cached in memory and replaced atomically on every write.
pub struct JsonFileStore {
    path: PathBuf,
    cache: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        let cache = match fs::read_to_string(&path) {
            Ok(data) if data.trim().is_empty() => HashMap::new(),
            Ok(data) => match serde_json::from_str(&data) {
                Ok(map) => map,
                Err(e) => {
                    log::warn!(
                        "[Persistence] Failed to parse store file '{}': {}. Starting empty.",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(ref e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                log::warn!(
                    "[Persistence] Failed to read store file '{}': {}. Starting empty.",
                    path.display(),
                    e
                );
                HashMap::new()
            }
        };
        log::info!(
            "[Persistence] Loaded {} entries from {}",
            cache.len(),
            path.display()
        );
        Self {
            path,
            cache: Mutex::new(cache),
        }
    }

    /// Store under the standard per-user config directory.
    pub fn open_default() -> Result<Self, String> {
        let proj_dirs = ProjectDirs::from("com", "murattil", "Murattil")
            .ok_or_else(|| "Could not determine project directories".to_string())?;
        let config_dir = proj_dirs.config_dir();
        if !config_dir.exists() {
            fs::create_dir_all(config_dir)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }
        Ok(Self::new(config_dir.join("progress.json")))
    }

    fn write_to_disk(&self, cache: &HashMap<String, String>) -> Result<(), String> {
        let parent_dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent_dir)
            .map_err(|e| format!("Failed to create store directory: {}", e))?;

        let data = serde_json::to_string_pretty(cache)
            .map_err(|e| format!("Failed to serialize store: {}", e))?;

        // Write to a temp file in the same directory, then swap it in, so a
        // crash mid-write cannot truncate the store.
        let temp_file = NamedTempFile::new_in(parent_dir)
            .map_err(|e| format!("Failed to create temp store file: {}", e))?;
        fs::write(temp_file.path(), data)
            .map_err(|e| format!("Failed to write store: {}", e))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| format!("Failed to replace store file: {}", e))?;
        Ok(())
    }
}

impl ProgressStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        let cache = self
            .cache
            .lock()
            .map_err(|e| format!("Failed to lock store cache: {}", e))?;
        Ok(cache.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|e| format!("Failed to lock store cache: {}", e))?;
        cache.insert(key.to_string(), value.to_string());
        self.write_to_disk(&cache)
    }
}

/// In-memory store for tests and embedding hosts that bring their own
/// persistence.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| format!("Failed to lock store: {}", e))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| format!("Failed to lock store: {}", e))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        save_cursor(&store, 2, 5).unwrap();
        assert_eq!(load_cursor(&store), Some((2, 5)));
    }

    #[test]
    fn test_load_cursor_missing_is_none() {
        let store = MemoryStore::new();
        assert_eq!(load_cursor(&store), None);
    }

    #[test]
    fn test_load_cursor_malformed_is_none() {
        let store = MemoryStore::new();
        store.set(PROGRESS_CHAPTER_KEY, "not-a-number").unwrap();
        store.set(PROGRESS_VERSE_KEY, "3").unwrap();
        assert_eq!(load_cursor(&store), None);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");

        let store = JsonFileStore::new(path.clone());
        save_cursor(&store, 114, 6).unwrap();

        // A fresh store instance reads what the first one wrote.
        let reopened = JsonFileStore::new(path);
        assert_eq!(load_cursor(&reopened), Some((114, 6)));
    }

    #[test]
    fn test_file_store_corrupt_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(path);
        assert_eq!(load_cursor(&store), None);
        // And stays usable for writes.
        save_cursor(&store, 1, 2).unwrap();
        assert_eq!(load_cursor(&store), Some((1, 2)));
    }
}
