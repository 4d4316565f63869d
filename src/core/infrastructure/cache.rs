use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::core::query::key::{Invalidation, QueryKey};
use crate::error::{CacheError, Result};

#[derive(Serialize, Deserialize, Clone, Debug)]
struct CacheEntry {
    data: Value,
    cached_at: u64,
    access_count: u32,
    last_accessed: u64,
    /// Set when an invalidation landed while this result was being fetched.
    stale: bool,
}

#[derive(Serialize, Deserialize)]
struct PersistedEntry {
    key: QueryKey,
    entry: CacheEntry,
}

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    /// The user whose session filled the cache.
    #[serde(default)]
    owner: Option<String>,
    entries: Vec<PersistedEntry>,
    total_requests: u64,
    cache_hits: u64,
    last_cleanup: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_requests: u64,
    pub cache_hits: u64,
    pub hit_rate_percent: f64,
    pub last_cleanup: u64,
}

/// Query results keyed by [`QueryKey`].
///
/// Entries live until invalidated, until they are older than `max_age`
/// (zero disables expiry), or until LRU cleanup evicts them once the cache
/// grows past `max_entries`.
pub struct QueryCache {
    entries: HashMap<QueryKey, CacheEntry>,
    total_requests: u64,
    cache_hits: u64,
    last_cleanup: u64,
    max_age: Duration,
    max_entries: usize,
}

impl QueryCache {
    pub fn new(max_age: Duration, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            total_requests: 0,
            cache_hits: 0,
            last_cleanup: current_timestamp(),
            max_age,
            max_entries: max_entries.max(1),
        }
    }

    /// Load a persisted index; a missing or unreadable index starts empty, and
    /// so does one saved under a different user.
    pub fn load(index_path: &Path, max_age: Duration, max_entries: usize, owner: Option<&str>) -> Result<Self> {
        let mut cache = Self::new(max_age, max_entries);
        if !index_path.exists() {
            return Ok(cache);
        }

        let content = fs::read_to_string(index_path).map_err(CacheError::Io)?;
        match serde_json::from_str::<PersistedIndex>(&content) {
            Ok(index) if index.owner.as_deref() != owner => {
                info!(
                    "Discarding cache index {} saved for another user",
                    index_path.display()
                );
            }
            Ok(index) => {
                cache.total_requests = index.total_requests;
                cache.cache_hits = index.cache_hits;
                cache.last_cleanup = index.last_cleanup;
                cache.entries = index
                    .entries
                    .into_iter()
                    .map(|persisted| (persisted.key, persisted.entry))
                    .collect();
                cache.evict_expired();
                debug!("Loaded {} cached queries from {}", cache.entries.len(), index_path.display());
            }
            Err(e) => warn!("Ignoring unreadable cache index {}: {}", index_path.display(), e),
        }
        Ok(cache)
    }

    fn is_expired(&self, entry: &CacheEntry, now: u64) -> bool {
        !self.max_age.is_zero() && now.saturating_sub(entry.cached_at) > self.max_age.as_secs()
    }

    /// Counted lookup: records a request and, on a fresh entry, a hit.
    pub fn get(&mut self, key: &QueryKey) -> Option<Value> {
        self.total_requests += 1;
        let value = self.lookup(key);
        if value.is_some() {
            self.cache_hits += 1;
            debug!("Cache hit for {}", key);
        } else {
            debug!("Cache miss for {}", key);
        }
        value
    }

    /// Uncounted lookup of a fresh entry.
    pub fn peek(&self, key: &QueryKey) -> Option<&Value> {
        let now = current_timestamp();
        self.entries
            .get(key)
            .filter(|entry| !entry.stale && !self.is_expired(entry, now))
            .map(|entry| &entry.data)
    }

    /// Count a hit for a request that was already counted by [`get`](Self::get).
    pub fn record_hit(&mut self) {
        self.cache_hits += 1;
    }

    fn lookup(&mut self, key: &QueryKey) -> Option<Value> {
        let now = current_timestamp();
        let expired = match self.entries.get(key) {
            Some(entry) => entry.stale || self.is_expired(entry, now),
            None => return None,
        };
        if expired {
            debug!("Cache entry stale or expired for {}", key);
            self.entries.remove(key);
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        entry.access_count += 1;
        entry.last_accessed = now;
        Some(entry.data.clone())
    }

    pub fn put(&mut self, key: QueryKey, data: Value, stale: bool) {
        let now = current_timestamp();
        debug!("Caching {}{}", key, if stale { " (stale)" } else { "" });
        self.entries.insert(
            key,
            CacheEntry {
                data,
                cached_at: now,
                access_count: 0,
                last_accessed: now,
                stale,
            },
        );

        if self.entries.len() > self.max_entries {
            self.cleanup_old_entries();
        }
    }

    /// Drop every entry the target matches; returns how many went.
    pub fn invalidate(&mut self, target: &Invalidation) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !target.matches(key));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("Invalidated {} cached queries for {:?}", removed, target);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_requests = 0;
        self.cache_hits = 0;
        self.last_cleanup = current_timestamp();
        info!("Query cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn stats(&self) -> CacheStats {
        let hit_rate = if self.total_requests > 0 {
            (self.cache_hits as f64 / self.total_requests as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            total_entries: self.entries.len(),
            total_requests: self.total_requests,
            cache_hits: self.cache_hits,
            hit_rate_percent: hit_rate,
            last_cleanup: self.last_cleanup,
        }
    }

    fn evict_expired(&mut self) {
        let now = current_timestamp();
        let max_age = self.max_age;
        self.entries.retain(|_, entry| {
            !entry.stale && (max_age.is_zero() || now.saturating_sub(entry.cached_at) <= max_age.as_secs())
        });
    }

    /// Remove expired entries, then least recently used ones above the cap.
    pub fn cleanup_old_entries(&mut self) {
        let before_count = self.entries.len();
        self.evict_expired();
        let after_cleanup_count = self.entries.len();

        if self.entries.len() > self.max_entries {
            let mut by_access: Vec<(QueryKey, u64)> = self
                .entries
                .iter()
                .map(|(key, entry)| (key.clone(), entry.last_accessed))
                .collect();
            by_access.sort_by_key(|(_, last_accessed)| *last_accessed);

            let to_remove = self.entries.len() - self.max_entries;
            for (key, _) in by_access.into_iter().take(to_remove) {
                self.entries.remove(&key);
            }
        }

        self.last_cleanup = current_timestamp();
        info!(
            "Query cache cleanup: {} -> {} -> {} entries",
            before_count,
            after_cleanup_count,
            self.entries.len()
        );
    }

    /// Persist the index atomically (write to a temp file, then rename).
    pub fn save_index(&self, index_path: &Path, owner: Option<&str>) -> Result<()> {
        let index = PersistedIndex {
            owner: owner.map(str::to_string),
            entries: self
                .entries
                .iter()
                .filter(|(_, entry)| !entry.stale)
                .map(|(key, entry)| PersistedEntry { key: key.clone(), entry: entry.clone() })
                .collect(),
            total_requests: self.total_requests,
            cache_hits: self.cache_hits,
            last_cleanup: self.last_cleanup,
        };
        let content = serde_json::to_string_pretty(&index).map_err(CacheError::Serialization)?;

        if let Some(parent) = index_path.parent() {
            fs::create_dir_all(parent).map_err(CacheError::Io)?;
        }
        let tmp_path = index_path.with_extension("json.tmp");
        fs::write(&tmp_path, &content).map_err(CacheError::Io)?;
        fs::rename(&tmp_path, index_path).map_err(CacheError::Io)?;
        debug!("Saved {} cached queries to {}", index.entries.len(), index_path.display());
        Ok(())
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}
