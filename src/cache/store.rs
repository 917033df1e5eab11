//! Disk-backed storage for provider responses

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::CacheKey;
use crate::clock::Clock;

/// Name of the statistics record inside a cache directory
pub const STATS_FILE: &str = "stats.json";

const SECONDS_PER_DAY: u64 = 86_400;

/// A cached provider response with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// When this entry was written
    pub stored_at: DateTime<Utc>,
    /// Operation that produced the payload
    pub operation: String,
    /// Raw provider response, never interpreted by the cache
    pub payload: Value,
}

impl CacheEntry {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.stored_at
    }

    /// An entry is honored while its age is at most `ttl`
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) > ttl
    }
}

/// Cumulative hit/miss counters, persisted in `stats.json`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Responses fetched from the provider and stored
    pub calls_made: u64,
    /// Lookups answered from the cache
    pub calls_saved: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.calls_made + self.calls_saved;
        if total == 0 {
            0.0
        } else {
            (self.calls_saved as f64 / total as f64) * 100.0
        }
    }

    pub fn summary(&self) -> CacheSummary {
        CacheSummary {
            api_calls_made: self.calls_made,
            api_calls_saved: self.calls_saved,
            cache_hit_rate: format!("{:.1}%", self.hit_rate()),
        }
    }
}

/// Report form of [`CacheStats`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSummary {
    pub api_calls_made: u64,
    pub api_calls_saved: u64,
    pub cache_hit_rate: String,
}

/// Content-addressed, TTL-bound response store.
///
/// One JSON file per key lives in `dir`, next to the statistics record.
pub struct CacheStore {
    dir: PathBuf,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    stats: Mutex<CacheStats>,
}

impl CacheStore {
    /// Open (creating if needed) a cache directory
    pub fn open(dir: impl Into<PathBuf>, ttl: std::time::Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;

        let ttl = Duration::from_std(ttl).context("Cache TTL out of range")?;
        let stats = load_stats(&dir.join(STATS_FILE));

        Ok(Self {
            dir,
            ttl,
            clock,
            stats: Mutex::new(stats),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the payload stored for `(operation, params)` if it is still fresh.
    ///
    /// Expired entries are deleted on the spot. Unreadable or malformed
    /// entries count as misses.
    pub fn lookup(&self, operation: &str, params: &Value) -> Result<Option<Value>> {
        let key = CacheKey::derive(operation, params);
        let path = self.entry_path(&key);

        if !path.exists() {
            return Ok(None);
        }

        let entry = match read_entry(&path) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Ignoring unreadable cache entry {}: {:#}", key, e);
                return Ok(None);
            }
        };

        let now = self.clock.now().with_timezone(&Utc);
        if entry.is_expired(now, self.ttl) {
            tracing::debug!("Cache entry {} for {} expired", key, operation);
            remove_if_present(&path)?;
            let stats = *self.lock_stats();
            self.persist_stats(&stats)?;
            return Ok(None);
        }

        let stats = {
            let mut stats = self.lock_stats();
            stats.calls_saved += 1;
            *stats
        };
        self.persist_stats(&stats)?;

        Ok(Some(entry.payload))
    }

    /// Write `payload` for `(operation, params)`, replacing any previous entry
    pub fn store(&self, operation: &str, params: &Value, payload: &Value) -> Result<()> {
        let key = CacheKey::derive(operation, params);
        let entry = CacheEntry {
            stored_at: self.clock.now().with_timezone(&Utc),
            operation: operation.to_string(),
            payload: payload.clone(),
        };

        let content = serde_json::to_string(&entry)?;
        std::fs::write(self.entry_path(&key), content)
            .with_context(|| format!("Failed to write cache entry {}", key))?;

        let stats = {
            let mut stats = self.lock_stats();
            stats.calls_made += 1;
            *stats
        };
        self.persist_stats(&stats)
    }

    pub fn stats(&self) -> CacheStats {
        *self.lock_stats()
    }

    /// Delete every entry, keeping the statistics record. Returns the number removed.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for path in self.entry_files()? {
            remove_if_present(&path)?;
            removed += 1;
        }
        tracing::info!("Cleared {} cache entries from {}", removed, self.dir.display());
        Ok(removed)
    }

    /// Delete entries older than `max_age_days`. Malformed entries are left alone.
    pub fn clear_older_than(&self, max_age_days: u64) -> Result<usize> {
        let max_age = max_age_days
            .checked_mul(SECONDS_PER_DAY)
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds);
        let Some(max_age) = max_age else {
            tracing::debug!("No cache entry can be older than {} days", max_age_days);
            return Ok(0);
        };
        let now = self.clock.now().with_timezone(&Utc);
        let mut removed = 0;

        for path in self.entry_files()? {
            let Ok(entry) = read_entry(&path) else {
                continue;
            };
            if entry.age(now) > max_age && remove_if_present(&path).is_ok() {
                removed += 1;
            }
        }

        tracing::info!(
            "Removed {} cache entries older than {} days from {}",
            removed,
            max_age_days,
            self.dir.display()
        );
        Ok(removed)
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let read_dir = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list cache directory {}", self.dir.display()))?;

        for dir_entry in read_dir {
            let path = dir_entry?.path();
            let is_json = path.extension().map(|ext| ext == "json").unwrap_or(false);
            let is_stats = path.file_name().map(|name| name == STATS_FILE).unwrap_or(false);
            if is_json && !is_stats && path.is_file() {
                files.push(path);
            }
        }

        Ok(files)
    }

    fn lock_stats(&self) -> MutexGuard<'_, CacheStats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist_stats(&self, stats: &CacheStats) -> Result<()> {
        let content = serde_json::to_string_pretty(stats)?;
        std::fs::write(self.dir.join(STATS_FILE), content).context("Failed to write cache statistics")
    }
}

fn read_entry(path: &Path) -> Result<CacheEntry> {
    let content = std::fs::read_to_string(path).context("Failed to read cache entry")?;
    serde_json::from_str(&content).context("Failed to parse cache entry")
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

fn load_stats(path: &Path) -> CacheStats {
    let Ok(content) = std::fs::read_to_string(path) else {
        return CacheStats::default();
    };
    match serde_json::from_str(&content) {
        Ok(stats) => stats,
        Err(e) => {
            tracing::warn!("Resetting unreadable cache statistics {}: {}", path.display(), e);
            CacheStats::default()
        }
    }
}
