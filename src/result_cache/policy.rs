//! Eviction policies

use std::time::Duration;

use serde::Serialize;

/// How long a cached result stays servable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Served until explicitly evicted or flushed
    #[default]
    Permanent,
    /// Expires once its age is strictly greater than the interval
    TimeSpan(Duration),
    /// Served for `n` hits after population; the next lookup misses
    RepeatedRequestLimit(u32),
}

/// Lifecycle state of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    Fresh,
    Expired,
    Exhausted,
}

impl EntryState {
    /// Whether a lookup may still be served
    pub fn is_fresh(&self) -> bool {
        matches!(self, EntryState::Fresh)
    }
}

impl CachePolicy {
    /// State of an entry of the given age and hit count
    pub fn state(&self, age: Duration, hits: u64) -> EntryState {
        match *self {
            CachePolicy::Permanent => EntryState::Fresh,
            CachePolicy::TimeSpan(interval) if age > interval => EntryState::Expired,
            CachePolicy::TimeSpan(_) => EntryState::Fresh,
            CachePolicy::RepeatedRequestLimit(limit) if hits >= u64::from(limit) => EntryState::Exhausted,
            CachePolicy::RepeatedRequestLimit(_) => EntryState::Fresh,
        }
    }

    /// Hit budget, if the policy has one
    pub(crate) fn hit_limit(&self) -> Option<u64> {
        match *self {
            CachePolicy::RepeatedRequestLimit(limit) => Some(u64::from(limit)),
            _ => None,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            CachePolicy::Permanent => "permanent",
            CachePolicy::TimeSpan(_) => "time_span",
            CachePolicy::RepeatedRequestLimit(_) => "repeated_request_limit",
        }
    }
}
