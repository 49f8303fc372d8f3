//! Persistent prompt/response cache with parameter-composite keys.
//!
//! Persists to `<cache_dir>/<kind>_cache.json` as a JSON array of objects.
//! Every entry must carry all of its kind's key fields; a file that breaks
//! this anywhere is discarded as a whole and rewritten as `[]`. Lookups scan
//! in insertion order and the last matching entry wins. Every mutation is
//! written straight through to disk.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use super::entry::{CacheEntry, CacheParams};
use super::kind::CacheKind;
use super::storage::{CacheStorage, JsonFileStorage};
use crate::error::{DocgenError, Result};

/// Why a persisted cache was thrown away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    /// File contents were not JSON.
    Malformed(String),
    /// Top-level value was not an array.
    NotAList,
    /// Element at this index was not an object.
    NonMappingEntry(usize),
    /// Element at this index lacked a key field.
    MissingField { index: usize, field: String },
}

/// Response cache for one [`CacheKind`].
pub struct ResponseCache<S = JsonFileStorage> {
    kind: CacheKind,
    key_fields: Vec<String>,
    search_keys: Vec<String>,
    storage: S,
    entries: Vec<CacheEntry>,
}

impl ResponseCache<JsonFileStorage> {
    /// Open (or create) the cache for `kind` inside `cache_dir`.
    pub fn open(kind: CacheKind, cache_dir: impl AsRef<Path>) -> Result<Self> {
        let path = cache_dir.as_ref().join(kind.file_name());
        Self::with_storage(kind, JsonFileStorage::new(path))
    }
}

impl<S: CacheStorage> ResponseCache<S> {
    /// Build a cache over an arbitrary storage backend and load it.
    pub fn with_storage(kind: CacheKind, storage: S) -> Result<Self> {
        kind.validate()?;
        let mut cache = Self {
            key_fields: kind.key_fields(),
            search_keys: kind.search_keys(),
            kind,
            storage,
            entries: Vec::new(),
        };
        cache.entries = cache.load()?;
        Ok(cache)
    }

    /// The kind this cache stores.
    pub fn kind(&self) -> &CacheKind {
        &self.kind
    }

    /// Fields every entry carries.
    pub fn key_fields(&self) -> &[String] {
        &self.key_fields
    }

    /// Fields compared on lookup.
    pub fn search_keys(&self) -> &[String] {
        &self.search_keys
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        self.storage.location()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read the persisted cache.
    ///
    /// A missing file is created empty. Corrupt contents are logged, the file
    /// is rewritten as `[]` and an empty list is returned. Only filesystem
    /// errors are returned as `Err`.
    pub fn load(&self) -> Result<Vec<CacheEntry>> {
        if !self.storage.exists() {
            debug!(
                path = %self.path().display(),
                "Cache file not found, creating new cache file"
            );
            self.persist(&[])?;
            return Ok(Vec::new());
        }

        let data = self.storage.read()?;
        // Invalid UTF-8 surfaces here as a parse error.
        let entries = match serde_json::from_slice::<Value>(&data) {
            Ok(raw) => self.validate(raw)?,
            Err(e) => {
                self.discard(Invalidation::Malformed(e.to_string()))?;
                Vec::new()
            }
        };
        debug!(entries = entries.len(), "Cache loaded");
        Ok(entries)
    }

    /// Re-read the persisted cache into memory.
    pub fn reload(&mut self) -> Result<()> {
        self.entries = self.load()?;
        Ok(())
    }

    /// Check the shape of a parsed cache file.
    ///
    /// Any problem empties the whole cache and rewrites the file; there is
    /// no per-entry pruning.
    pub fn validate(&self, raw: Value) -> Result<Vec<CacheEntry>> {
        match self.check_shape(raw) {
            Ok(entries) => Ok(entries),
            Err(reason) => {
                self.discard(reason)?;
                Ok(Vec::new())
            }
        }
    }

    fn check_shape(&self, raw: Value) -> std::result::Result<Vec<CacheEntry>, Invalidation> {
        let Value::Array(items) = raw else {
            return Err(Invalidation::NotAList);
        };

        let mut maps = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match item {
                Value::Object(map) => maps.push(map),
                _ => return Err(Invalidation::NonMappingEntry(index)),
            }
        }

        for (index, map) in maps.iter().enumerate() {
            if let Some(field) = self.key_fields.iter().find(|f| !map.contains_key(f.as_str())) {
                return Err(Invalidation::MissingField {
                    index,
                    field: field.clone(),
                });
            }
        }

        Ok(maps.into_iter().map(CacheEntry::new).collect())
    }

    fn discard(&self, reason: Invalidation) -> Result<()> {
        error!(
            path = %self.path().display(),
            reason = %reason,
            "Cache file is invalid, resetting cache"
        );
        self.persist(&[])
    }

    /// Look up a cached response.
    ///
    /// Returns the `response` of the last entry whose search-key fields all
    /// equal those in `params`, or `None` on a miss. A stored empty string is
    /// a hit.
    pub fn check_cache(&self, params: &CacheParams) -> Option<Value> {
        match self.find(params) {
            Some(hit) => {
                debug!(cache = %self.kind, "Cache hit");
                Some(hit.response().cloned().unwrap_or(Value::Null))
            }
            None => {
                debug!(cache = %self.kind, "Cache miss");
                None
            }
        }
    }

    /// The entry [`check_cache`](Self::check_cache) would answer from.
    pub fn find(&self, params: &CacheParams) -> Option<&CacheEntry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.matches(&self.search_keys, params))
    }

    /// Append an entry built from `params` and write the cache to disk.
    ///
    /// Only the kind's key fields are taken from `params`; any that are
    /// absent are stored as `null`. `cache_type` and `timestamp` are always
    /// overwritten. Duplicates are not collapsed.
    pub fn add_entry(&mut self, params: &CacheParams) -> Result<()> {
        self.add_entry_at(params, Utc::now())
    }

    /// [`add_entry`](Self::add_entry) with an explicit creation time.
    pub fn add_entry_at(&mut self, params: &CacheParams, created_at: DateTime<Utc>) -> Result<()> {
        let mut fields = Map::new();
        for field in &self.key_fields {
            let value = params.get(field).cloned().unwrap_or(Value::Null);
            fields.insert(field.clone(), value);
        }
        let mut entry = CacheEntry::new(fields);
        entry.insert("cache_type", Value::String(self.kind.name().to_string()));
        entry.insert(
            "timestamp",
            Value::String(created_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );

        self.entries.push(entry);
        self.write()
    }

    /// Drop entries older than `max_age_days` and persist. Returns the number
    /// removed.
    pub fn clean_cache(&mut self, max_age_days: u32) -> Result<usize> {
        self.clean_cache_as_of(max_age_days, Utc::now())
    }

    /// [`clean_cache`](Self::clean_cache) measured from `now`.
    ///
    /// Entries stamped at or after the cutoff survive; entries without a
    /// parseable timestamp are always removed.
    pub fn clean_cache_as_of(&mut self, max_age_days: u32, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - Duration::days(i64::from(max_age_days));
        debug!(
            days = max_age_days,
            cutoff = %cutoff.to_rfc3339(),
            "Cleaning cache"
        );

        let before = self.entries.len();
        self.entries
            .retain(|entry| entry.created_at().is_some_and(|ts| ts >= cutoff));
        let removed = before - self.entries.len();

        self.write()?;
        info!(removed, remaining = self.entries.len(), "Cleaned cache");
        Ok(removed)
    }

    /// Delete the backing file and start over with an empty cache.
    pub fn reset(&mut self) -> Result<()> {
        if self.storage.remove()? {
            info!(path = %self.path().display(), "Cache cleared");
        } else {
            info!(path = %self.path().display(), "No cache file to clear");
        }
        self.reload()
    }

    /// Serialize the in-memory cache to the backing file.
    pub fn write(&self) -> Result<()> {
        self.persist(&self.entries)?;
        debug!(
            path = %self.path().display(),
            entries = self.entries.len(),
            "Cache written"
        );
        Ok(())
    }

    fn persist(&self, entries: &[CacheEntry]) -> Result<()> {
        let data = serde_json::to_string_pretty(entries).map_err(|e| {
            error!(path = %self.path().display(), error = %e, "Failed to encode cache");
            DocgenError::Serialization(e.to_string())
        })?;
        self.storage.write(&data)
    }

    /// Aggregate statistics about the cache.
    pub fn stats(&self) -> CacheStats {
        let stamps = self.entries.iter().filter_map(CacheEntry::created_at);
        let (oldest, newest) = stamps.fold(
            (None::<DateTime<Utc>>, None::<DateTime<Utc>>),
            |(lo, hi), ts| {
                (
                    Some(lo.map_or(ts, |lo| lo.min(ts))),
                    Some(hi.map_or(ts, |hi| hi.max(ts))),
                )
            },
        );
        CacheStats {
            kind: self.kind.name(),
            path: self.path().to_path_buf(),
            total_entries: self.entries.len(),
            oldest,
            newest,
        }
    }
}

impl std::fmt::Display for Invalidation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "malformed JSON: {}", e),
            Self::NotAList => f.write_str("top-level value is not a list"),
            Self::NonMappingEntry(i) => write!(f, "entry {} is not an object", i),
            Self::MissingField { index, field } => {
                write!(f, "entry {} is missing required field '{}'", index, field)
            }
        }
    }
}

/// Aggregate cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub kind: &'static str,
    pub path: PathBuf,
    /// Number of entries currently in the cache.
    pub total_entries: usize,
    /// Earliest parseable entry timestamp.
    pub oldest: Option<DateTime<Utc>>,
    /// Latest parseable entry timestamp.
    pub newest: Option<DateTime<Utc>>,
}
