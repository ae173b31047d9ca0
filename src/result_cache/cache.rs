//! Per-pipeline result cache

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::clock::{Clock, SystemClock};
use super::policy::{CachePolicy, EntryState};
use crate::errors::{MapError, MapResult};
use crate::fingerprint::Fingerprint;
use crate::observability::{event_enabled, log_event_with_fields, Event, MetricsRegistry};

struct CacheEntry<V> {
    value: Arc<V>,
    created: Instant,
    created_at: DateTime<Utc>,
    /// Served hits; the populating execution is not counted
    hits: AtomicU64,
}

/// Passive cache statistics; they never influence caching
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Stale entries removed or replaced
    pub evictions: u64,
    /// Inserts skipped because the cache was full
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct StatCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    skipped: AtomicU64,
}

/// Read-only view of one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub created_at: DateTime<Utc>,
    pub hits: u64,
    pub state: EntryState,
}

/// Results keyed by parameter fingerprint, governed by one policy.
///
/// Operations on a single key are linearizable. Concurrent misses on the
/// same key may both execute and insert; the last insert wins.
pub struct ResultCache<V> {
    entries: RwLock<HashMap<Fingerprint, Arc<CacheEntry<V>>>>,
    policy: CachePolicy,
    max_entries: Option<usize>,
    clock: Arc<dyn Clock>,
    stats: StatCounters,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl<V: Send + Sync> ResultCache<V> {
    /// Unbounded cache on the system clock
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            policy,
            max_entries: None,
            clock: Arc::new(SystemClock),
            stats: StatCounters::default(),
            metrics: None,
        }
    }

    /// Bound the number of entries; new keys are skipped while every slot is fresh
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Age entries with the given clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Mirror statistics into shared metrics
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Look up a fresh result.
    ///
    /// A hit increments the entry's counter. Stale entries are left in
    /// place for the caller's insert or for [`purge_stale`](Self::purge_stale).
    pub fn get(&self, key: &Fingerprint) -> MapResult<Option<Arc<V>>> {
        let entry = {
            let entries = self
                .entries
                .read()
                .map_err(|_| MapError::poisoned("result cache"))?;
            entries.get(key).cloned()
        };

        let served = entry.and_then(|entry| self.try_serve(&entry).then(|| Arc::clone(&entry.value)));

        if served.is_some() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            if let Some(m) = &self.metrics {
                m.increment_result_cache_hits();
            }
            if event_enabled(Event::ResultCacheHit) {
                log_event_with_fields(Event::ResultCacheHit, &[("key", &key.short())]);
            }
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            if let Some(m) = &self.metrics {
                m.increment_result_cache_misses();
            }
            if event_enabled(Event::ResultCacheMiss) {
                log_event_with_fields(Event::ResultCacheMiss, &[("key", &key.short())]);
            }
        }
        Ok(served)
    }

    /// Count a hit if the entry is still fresh
    fn try_serve(&self, entry: &CacheEntry<V>) -> bool {
        let age = self.clock.now().saturating_duration_since(entry.created);
        if let CachePolicy::TimeSpan(_) = self.policy {
            if !self.policy.state(age, 0).is_fresh() {
                return false;
            }
        }
        match self.policy.hit_limit() {
            Some(limit) => entry
                .hits
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |h| (h < limit).then_some(h + 1))
                .is_ok(),
            None => {
                entry.hits.fetch_add(1, Ordering::Relaxed);
                true
            }
        }
    }

    fn state_of(&self, entry: &CacheEntry<V>) -> EntryState {
        let age = self.clock.now().saturating_duration_since(entry.created);
        self.policy.state(age, entry.hits.load(Ordering::Acquire))
    }

    /// Store a freshly produced result.
    ///
    /// Replaces any existing entry for the key. A new key arriving at a full
    /// cache first reclaims the slots of expired and exhausted entries.
    /// Returns false when the key is new and every slot holds a fresh entry.
    pub fn insert(&self, key: Fingerprint, value: Arc<V>) -> MapResult<bool> {
        let entry = Arc::new(CacheEntry {
            value,
            created: self.clock.now(),
            created_at: Utc::now(),
            hits: AtomicU64::new(0),
        });

        let mut entries = self
            .entries
            .write()
            .map_err(|_| MapError::poisoned("result cache"))?;

        let mut reclaimed = 0;
        if let Some(max) = self.max_entries {
            if entries.len() >= max && !entries.contains_key(&key) {
                let before = entries.len();
                entries.retain(|_, entry| self.state_of(entry).is_fresh());
                reclaimed = before - entries.len();
            }
            if entries.len() >= max && !entries.contains_key(&key) {
                drop(entries);
                self.record_purge(reclaimed);
                self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                if let Some(m) = &self.metrics {
                    m.increment_result_cache_skipped();
                }
                log_event_with_fields(
                    Event::ResultCacheFull,
                    &[("key", &key.short()), ("max_entries", &max.to_string())],
                );
                return Ok(false);
            }
        }

        let replaced = entries.insert(key, entry);
        drop(entries);
        self.record_purge(reclaimed);

        if let Some(old) = replaced {
            let state = self.state_of(&old);
            if !state.is_fresh() {
                self.record_evictions(1);
                log_event_with_fields(
                    Event::ResultCacheEvicted,
                    &[("key", &key.short()), ("state", state_name(state))],
                );
            }
        }
        Ok(true)
    }

    /// Remove one entry regardless of state
    pub fn evict(&self, key: &Fingerprint) -> MapResult<bool> {
        let removed = self
            .entries
            .write()
            .map_err(|_| MapError::poisoned("result cache"))?
            .remove(key)
            .is_some();
        if removed {
            self.record_evictions(1);
            log_event_with_fields(Event::ResultCacheEvicted, &[("key", &key.short()), ("state", "evicted")]);
        }
        Ok(removed)
    }

    /// Remove every expired or exhausted entry; returns how many were removed
    pub fn purge_stale(&self) -> MapResult<usize> {
        let removed = {
            let mut entries = self
                .entries
                .write()
                .map_err(|_| MapError::poisoned("result cache"))?;
            let before = entries.len();
            entries.retain(|_, entry| self.state_of(entry).is_fresh());
            before - entries.len()
        };
        self.record_purge(removed);
        Ok(removed)
    }

    fn record_purge(&self, removed: usize) {
        if removed > 0 {
            self.record_evictions(removed as u64);
            log_event_with_fields(
                Event::ResultCacheEvicted,
                &[("count", &removed.to_string()), ("state", "stale")],
            );
        }
    }

    fn record_evictions(&self, count: u64) {
        self.stats.evictions.fetch_add(count, Ordering::Relaxed);
        if let Some(m) = &self.metrics {
            m.add_result_cache_evictions(count);
        }
    }

    /// Drop every entry
    pub fn clear(&self) -> MapResult<()> {
        self.entries
            .write()
            .map_err(|_| MapError::poisoned("result cache"))?
            .clear();
        Ok(())
    }

    /// Number of entries, fresh or stale
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            skipped: self.stats.skipped.load(Ordering::Relaxed),
        }
    }

    /// Creation time, served hits and current state of an entry
    pub fn entry_info(&self, key: &Fingerprint) -> Option<EntryInfo> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;
        Some(EntryInfo {
            created_at: entry.created_at,
            hits: entry.hits.load(Ordering::Acquire),
            state: self.state_of(entry),
        })
    }
}

fn state_name(state: EntryState) -> &'static str {
    match state {
        EntryState::Fresh => "fresh",
        EntryState::Expired => "expired",
        EntryState::Exhausted => "exhausted",
    }
}

impl<V> fmt::Debug for ResultCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("policy", &self.policy)
            .field("max_entries", &self.max_entries)
            .finish()
    }
}
