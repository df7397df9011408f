//! Persistence of per-book settings, progress and the last-opened book.
//!
//! Records are JSON strings in a flat key-value store (browser local
//! storage, a file, an in-memory map). All keys share a prefix:
//!
//! - `{prefix}:settings:{book_id}` and `{prefix}:progress:{book_id}`
//! - `{prefix}:lastOpened`, a pointer to the most recent book
//! - `{prefix}:lastBookCache`, a copy of that book for instant resume
//!
//! Reads are lenient: a malformed record reads as absent. Writes that fail
//! leave a one-shot status message for the UI.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::book::{Book, BookId, TocEntry};
use crate::error::{ReaderError, StoreError};
use crate::progress::Progress;
use crate::settings::{cascade, Settings};

/// Key prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "mu-reader";

/// Flat string store backing [`BookStorage`].
pub trait KeyValueStore {
    /// Read a value. Missing keys and unreadable backends both yield `None`.
    fn load(&self, key: &str) -> Option<String>;

    /// Write a value.
    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a value. Stores that cannot delete ignore the request.
    fn remove(&mut self, _key: &str) {}
}

/// In-memory store with an optional byte quota.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    /// Unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects writes once keys plus values exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            quota: Some(bytes),
        }
    }

    /// Bytes currently used by keys and values.
    pub fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Some(quota) = self.quota {
            let replaced = self.entries.get(key).map_or(0, |v| key.len() + v.len());
            let next = self.used_bytes() - replaced + key.len() + value.len();
            if next > quota {
                return Err(StoreError::QuotaExceeded);
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastOpened {
    book_id: BookId,
    #[serde(default)]
    saved_at: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedBook {
    book_id: BookId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    html: String,
    #[serde(default)]
    toc: Vec<TocEntry>,
    checksum: u32,
    #[serde(default)]
    cached_at: u64,
}

/// Book restored from the last-opened cache together with its saved state.
#[derive(Clone, Debug, PartialEq)]
pub struct ResumedBook {
    /// Cached book content.
    pub book: Book,
    /// Saved progress, or the default when none was stored.
    pub progress: Progress,
    /// Raw saved settings layer, if any.
    pub saved_settings: Option<Value>,
}

/// Typed access to the persisted reader records.
pub struct BookStorage<S: KeyValueStore> {
    store: S,
    prefix: String,
    status: Option<String>,
}

impl<S: KeyValueStore> BookStorage<S> {
    /// Storage under the default prefix.
    pub fn new(store: S) -> Self {
        Self::with_prefix(store, DEFAULT_PREFIX)
    }

    /// Storage under a custom prefix.
    pub fn with_prefix(store: S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            status: None,
        }
    }

    /// Backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable backing store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Key of a book's saved settings.
    pub fn settings_key(&self, id: &BookId) -> String {
        format!("{}:settings:{}", self.prefix, id)
    }

    /// Key of a book's saved progress.
    pub fn progress_key(&self, id: &BookId) -> String {
        format!("{}:progress:{}", self.prefix, id)
    }

    /// Key of the last-opened pointer.
    pub fn last_opened_key(&self) -> String {
        format!("{}:lastOpened", self.prefix)
    }

    /// Key of the cached last-opened book.
    pub fn last_book_cache_key(&self) -> String {
        format!("{}:lastBookCache", self.prefix)
    }

    /// Status message left by the most recent failed write. Cleared on read.
    pub fn take_status_message(&mut self) -> Option<String> {
        self.status.take()
    }

    // -- settings -------------------------------------------------------------------

    /// Raw saved settings layer for a book.
    pub fn load_settings(&self, id: &BookId) -> Option<Value> {
        let value = self.load_json(&self.settings_key(id))?;
        value.is_object().then_some(value)
    }

    /// Effective settings for a book: defaults, then the book's own, then saved.
    pub fn settings_for(&self, book: &Book, defaults: &Settings) -> Settings {
        let saved = self.load_settings(&book.id());
        cascade(defaults, book.settings.as_ref(), saved.as_ref())
    }

    /// Persist settings for a book. `now` is Unix seconds.
    pub fn save_settings(&mut self, id: &BookId, settings: &Settings, now: u64) -> Result<(), ReaderError> {
        let record = stamped(settings.to_value(), "updatedAt", now);
        let key = self.settings_key(id);
        self.write("settings", &key, &record)
    }

    // -- progress -------------------------------------------------------------------

    /// Saved progress for a book.
    pub fn load_progress(&self, id: &BookId) -> Option<Progress> {
        let value = self.load_json(&self.progress_key(id))?;
        value.is_object().then(|| Progress::from_value(&value))
    }

    /// Progress to open a book at: saved, else shipped with the book, else the start.
    pub fn progress_for(&self, book: &Book) -> Progress {
        self.load_progress(&book.id())
            .or_else(|| book.progress.as_ref().map(Progress::from_value))
            .unwrap_or_default()
    }

    /// Persist progress for a book. `now` is Unix seconds.
    pub fn save_progress(&mut self, id: &BookId, progress: &Progress, now: u64) -> Result<(), ReaderError> {
        let record = stamped(serde_json::to_value(progress)?, "updatedAt", now);
        let key = self.progress_key(id);
        self.write("progress", &key, &record)
    }

    // -- last opened ----------------------------------------------------------------

    /// Remember `book` as the last-opened book and cache its content.
    pub fn persist_last_opened(&mut self, book: &Book, now: u64) -> Result<(), ReaderError> {
        let book_id = book.id();
        let pointer = serde_json::to_value(LastOpened {
            book_id: book_id.clone(),
            saved_at: now,
        })?;
        let key = self.last_opened_key();
        self.write("last opened book", &key, &pointer)?;

        let cache = serde_json::to_value(CachedBook {
            book_id,
            title: book.title.clone(),
            html: book.html.clone(),
            toc: book.toc.clone(),
            checksum: crc32fast::hash(book.html.as_bytes()),
            cached_at: now,
        })?;
        let key = self.last_book_cache_key();
        self.write("book cache", &key, &cache)
    }

    /// Reopen the last-opened book from its cache.
    ///
    /// `Ok(None)` when nothing was opened yet or the cache belongs to another
    /// book. A cache whose content fails its checksum is an error.
    pub fn resume_last_book(&self) -> Result<Option<ResumedBook>, ReaderError> {
        let Some(raw) = self.store.load(&self.last_opened_key()) else {
            return Ok(None);
        };
        let pointer: LastOpened = match serde_json::from_str(&raw) {
            Ok(pointer) => pointer,
            Err(err) => {
                log::warn!("[STORE] Ignoring unreadable last-opened pointer: {}", err);
                return Ok(None);
            }
        };
        let Some(raw) = self.store.load(&self.last_book_cache_key()) else {
            log::debug!("[STORE] No cached copy of {}", pointer.book_id);
            return Ok(None);
        };
        let cached: CachedBook = match serde_json::from_str(&raw) {
            Ok(cached) => cached,
            Err(err) => {
                log::warn!("[STORE] Ignoring unreadable book cache: {}", err);
                return Ok(None);
            }
        };
        if cached.book_id != pointer.book_id {
            log::debug!(
                "[STORE] Cache holds {} but last opened was {}",
                cached.book_id,
                pointer.book_id
            );
            return Ok(None);
        }
        let actual = crc32fast::hash(cached.html.as_bytes());
        if actual != cached.checksum {
            return Err(ReaderError::CacheCorrupt {
                expected: cached.checksum,
                actual,
            });
        }
        let book = Book::new(cached.title, cached.html, cached.toc);
        let progress = self.load_progress(&pointer.book_id).unwrap_or_default();
        let saved_settings = self.load_settings(&pointer.book_id);
        Ok(Some(ResumedBook {
            book,
            progress,
            saved_settings,
        }))
    }

    /// Forget the last-opened book.
    pub fn clear_last_opened(&mut self) {
        let pointer = self.last_opened_key();
        let cache = self.last_book_cache_key();
        self.store.remove(&pointer);
        self.store.remove(&cache);
    }

    fn load_json(&self, key: &str) -> Option<Value> {
        let raw = self.store.load(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("[STORE] Ignoring unreadable record {}: {}", key, err);
                None
            }
        }
    }

    fn write(&mut self, what: &str, key: &str, value: &Value) -> Result<(), ReaderError> {
        let encoded = serde_json::to_string(value)?;
        if let Err(err) = self.store.save(key, &encoded) {
            log::warn!("[STORE] Failed to write {} ({} bytes): {}", key, encoded.len(), err);
            self.status = Some(match &err {
                StoreError::QuotaExceeded => format!("failed to save {} (storage may be full)", what),
                other => format!("failed to save {} ({})", what, other),
            });
            return Err(err.into());
        }
        Ok(())
    }
}

fn stamped(value: Value, field: &str, now: u64) -> Value {
    let mut map = match value {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    map.insert(field.to_string(), Value::from(now));
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::DisplayMode;
    use serde_json::json;

    fn book() -> Book {
        Book::new(
            "Notes",
            r#"<section class="chapter" id="c1">hi</section>"#,
            vec![TocEntry {
                title: "One".into(),
                chapter_id: "c1".into(),
            }],
        )
    }

    #[test]
    fn test_key_space() {
        let storage = BookStorage::new(MemoryStore::new());
        let id = BookId::from_raw("Notes::1::45");
        assert_eq!(storage.settings_key(&id), "mu-reader:settings:Notes::1::45");
        assert_eq!(storage.progress_key(&id), "mu-reader:progress:Notes::1::45");
        assert_eq!(storage.last_opened_key(), "mu-reader:lastOpened");
        let storage = BookStorage::with_prefix(MemoryStore::new(), "x");
        assert_eq!(storage.last_book_cache_key(), "x:lastBookCache");
    }

    #[test]
    fn test_progress_round_trip_with_timestamp() {
        let mut storage = BookStorage::new(MemoryStore::new());
        let id = book().id();
        let progress = Progress {
            chapter_id: Some("c1".into()),
            scroll_left: 1600.0,
            scroll_top: 0.0,
            page_index: Some(2),
        };
        storage.save_progress(&id, &progress, 1_700_000_000).unwrap();
        assert_eq!(storage.load_progress(&id), Some(progress));

        let raw = storage.store().load(&storage.progress_key(&id)).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["updatedAt"], json!(1_700_000_000u64));
    }

    #[test]
    fn test_malformed_records_read_as_absent() {
        let mut store = MemoryStore::new();
        let id = book().id();
        store.save("mu-reader:progress:Notes::1::45", "{not json").unwrap();
        store.save(&format!("mu-reader:settings:{}", id), "[1,2]").unwrap();
        let storage = BookStorage::new(store);
        assert_eq!(storage.load_progress(&BookId::from_raw("Notes::1::45")), None);
        assert_eq!(storage.load_settings(&id), None);
    }

    #[test]
    fn test_settings_for_layers_saved_over_book() {
        let mut storage = BookStorage::new(MemoryStore::new());
        let mut b = book();
        b.settings = Some(json!({ "displayMode": "scrollx", "fontSize": 120 }));
        let key = storage.settings_key(&b.id());
        storage
            .store_mut()
            .save(&key, r#"{"displayMode":"scroll-y"}"#)
            .unwrap();
        let settings = storage.settings_for(&b, &Settings::default());
        assert_eq!(settings.display_mode, DisplayMode::ScrollY);
        assert_eq!(settings.font_size, 120.0);
    }

    #[test]
    fn test_progress_for_falls_back_to_book() {
        let storage = BookStorage::new(MemoryStore::new());
        let mut b = book();
        assert_eq!(storage.progress_for(&b), Progress::default());
        b.progress = Some(json!({ "scrollLeft": 300 }));
        assert_eq!(storage.progress_for(&b).scroll_left, 300.0);
    }

    #[test]
    fn test_quota_failure_sets_one_shot_status() {
        let mut storage = BookStorage::new(MemoryStore::with_quota(64));
        let id = book().id();
        let err = storage
            .save_progress(&id, &Progress::default(), 1)
            .unwrap_err();
        assert_eq!(err, ReaderError::Storage(StoreError::QuotaExceeded));
        assert_eq!(
            storage.take_status_message().as_deref(),
            Some("failed to save progress (storage may be full)")
        );
        assert_eq!(storage.take_status_message(), None);
    }

    #[test]
    fn test_resume_last_book() {
        let mut storage = BookStorage::new(MemoryStore::new());
        assert_eq!(storage.resume_last_book().unwrap(), None);

        let b = book();
        storage.persist_last_opened(&b, 10).unwrap();
        let progress = Progress {
            page_index: Some(4),
            ..Progress::default()
        };
        storage.save_progress(&b.id(), &progress, 11).unwrap();

        let resumed = storage.resume_last_book().unwrap().unwrap();
        assert_eq!(resumed.book.id(), b.id());
        assert_eq!(resumed.book.toc, b.toc);
        assert_eq!(resumed.progress.page_index, Some(4));
        assert_eq!(resumed.saved_settings, None);

        storage.clear_last_opened();
        assert_eq!(storage.resume_last_book().unwrap(), None);
    }

    #[test]
    fn test_resume_detects_corrupt_cache() {
        let mut storage = BookStorage::new(MemoryStore::new());
        let b = book();
        storage.persist_last_opened(&b, 10).unwrap();
        let key = storage.last_book_cache_key();
        let raw = storage.store().load(&key).unwrap();
        let tampered = raw.replace("hi", "ho");
        storage.store_mut().save(&key, &tampered).unwrap();
        assert!(matches!(
            storage.resume_last_book(),
            Err(ReaderError::CacheCorrupt { .. })
        ));
    }

    #[test]
    fn test_malformed_cache_reads_as_absent() {
        let mut storage = BookStorage::new(MemoryStore::new());
        storage.persist_last_opened(&book(), 10).unwrap();
        let key = storage.last_book_cache_key();
        storage.store_mut().save(&key, "{\"bookId\": 7").unwrap();
        assert_eq!(storage.resume_last_book().unwrap(), None);
    }
}
