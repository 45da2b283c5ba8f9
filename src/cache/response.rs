//! In-memory response cache with TTL expiry and approximate lookup.
//!
//! [`ResponseCache`] maps a request [`CacheKey`] to the
//! [`GenerationResponse`] obtained for it. It sits in the
//! [`GemgateClient`](crate::GemgateClient) in front of the rate governor: a
//! hit never consumes rate budget or a queue slot.
//!
//! # Capacity
//!
//! When the number of stored entries reaches `max_entries`, the
//! `evict_count` oldest entries (by insertion order, not by access) are
//! dropped before a new key is inserted.
//!
//! # Approximate lookup
//!
//! [`ResponseCache::find_similar`] scans all live entries in insertion order
//! and returns the first whose prompt fragment is more similar than the
//! threshold to the candidate prompt. The scan is linear, which is fine at
//! the cache sizes used here (≈100 entries).

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::key::{CacheKey, prompt_prefix};
use super::similarity::similarity;
use crate::telemetry;
use crate::types::GenerationResponse;

/// Configuration for the response cache.
///
/// ```rust
/// # use gemgate::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(200)
///     .ttl(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of stored entries. Default: 100.
    pub max_entries: usize,
    /// Entries dropped at once when the cache is full. Default: 20.
    pub evict_count: usize,
    /// Time-to-live for text responses. Default: 5 minutes.
    pub ttl: Duration,
    /// Time-to-live for responses to image requests. Default: 2 minutes.
    pub image_ttl: Duration,
    /// Number of prompt characters that go into a key. Default: 100.
    pub prefix_len: usize,
    /// Minimum similarity for an approximate hit. Default: 0.85.
    pub similarity_threshold: f64,
    /// Whether the facade attempts approximate lookups at all. Default: true.
    pub fuzzy_matching: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            evict_count: 20,
            ttl: Duration::from_secs(5 * 60),
            image_ttl: Duration::from_secs(2 * 60),
            prefix_len: 100,
            similarity_threshold: 0.85,
            fuzzy_matching: true,
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of stored entries.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Set how many of the oldest entries are evicted when full.
    pub fn evict_count(mut self, n: usize) -> Self {
        self.evict_count = n;
        self
    }

    /// Set the time-to-live for text responses.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the time-to-live for image responses.
    pub fn image_ttl(mut self, ttl: Duration) -> Self {
        self.image_ttl = ttl;
        self
    }

    /// Set the prompt prefix length used for keys.
    pub fn prefix_len(mut self, len: usize) -> Self {
        self.prefix_len = len;
        self
    }

    /// Set the approximate-match threshold.
    pub fn similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Enable or disable approximate matching in the facade.
    pub fn fuzzy_matching(mut self, enabled: bool) -> Self {
        self.fuzzy_matching = enabled;
        self
    }
}

/// Counters describing cache effectiveness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub similar_hits: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.similar_hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits + self.similar_hits) as f64 / total as f64
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    key: CacheKey,
    value: GenerationResponse,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order, oldest first.
    order: VecDeque<String>,
    stats: CacheStats,
}

impl Inner {
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        Some(entry)
    }
}

/// In-memory response cache. See the module docs for eviction and lookup rules.
#[derive(Debug)]
pub struct ResponseCache {
    config: CacheConfig,
    inner: Mutex<Inner>,
}

impl ResponseCache {
    /// Create an empty cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            config: config.clone(),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a live entry.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<GenerationResponse> {
        let now = Instant::now();
        let mut inner = self.lock();

        let expired = match inner.entries.get(key.as_str()) {
            Some(entry) if !entry.is_expired(now) => {
                let value = entry.value.clone();
                inner.stats.hits += 1;
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "kind" => "exact").increment(1);
                return Some(value);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.remove(key.as_str());
            inner.stats.expirations += 1;
            debug!(key = %key, "cache entry expired");
        }
        inner.stats.misses += 1;
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
        None
    }

    /// Insert a response with the default (text) TTL.
    pub fn insert(&self, key: &CacheKey, value: GenerationResponse) {
        self.insert_with_ttl(key, value, self.config.ttl);
    }

    /// Insert a response with an explicit TTL.
    ///
    /// Overwriting an existing key moves it to the back of the eviction order.
    /// A cache configured with `max_entries == 0` stores nothing.
    pub fn insert_with_ttl(&self, key: &CacheKey, value: GenerationResponse, ttl: Duration) {
        if self.config.max_entries == 0 {
            return;
        }
        let now = Instant::now();
        let mut inner = self.lock();

        let replaced = inner.remove(key.as_str()).is_some();
        if !replaced && inner.entries.len() >= self.config.max_entries {
            let count = self.config.evict_count.max(1).min(inner.order.len());
            for _ in 0..count {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.entries.remove(&oldest);
                }
            }
            inner.stats.evictions += count as u64;
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(count as u64);
            debug!(evicted = count, "cache full, evicted oldest entries");
        }

        inner.order.push_back(key.as_str().to_string());
        inner.entries.insert(
            key.as_str().to_string(),
            CacheEntry {
                key: key.clone(),
                value,
                expires_at: now + ttl,
            },
        );
    }

    /// Approximate lookup over all live entries.
    ///
    /// Returns the first entry (insertion order) whose prompt fragment has a
    /// similarity strictly greater than `threshold` with `prompt`.
    pub fn find_similar(&self, prompt: &str, threshold: f64) -> Option<GenerationResponse> {
        self.find_similar_where(prompt, threshold, |_| true)
    }

    /// Like [`find_similar`](Self::find_similar), restricted to entries whose
    /// key satisfies `predicate`.
    pub fn find_similar_where<P>(
        &self,
        prompt: &str,
        threshold: f64,
        predicate: P,
    ) -> Option<GenerationResponse>
    where
        P: Fn(&CacheKey) -> bool,
    {
        let now = Instant::now();
        let candidate = prompt_prefix(prompt, self.config.prefix_len);
        let mut inner = self.lock();
        Self::purge_locked(&mut inner, now);

        let found = inner.order.iter().find_map(|k| {
            let entry = inner.entries.get(k)?;
            if !predicate(&entry.key) {
                return None;
            }
            (similarity(&candidate, entry.key.fragment()) > threshold)
                .then(|| entry.value.clone())
        });

        if found.is_some() {
            inner.stats.similar_hits += 1;
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "kind" => "similar").increment(1);
        }
        found
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut inner = self.lock();
        Self::purge_locked(&mut inner, Instant::now())
    }

    fn purge_locked(inner: &mut Inner, now: Instant) -> usize {
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            inner.remove(key);
        }
        inner.stats.expirations += expired.len() as u64;
        expired.len()
    }

    /// Number of stored entries, including ones not yet purged after expiry.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict all entries. Statistics are kept.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerateOptions, GenerateRequest};

    fn key(prompt: &str) -> CacheKey {
        CacheKey::for_request(&GenerateRequest::text(prompt, GenerateOptions::default()), 100)
    }

    fn response(text: &str) -> GenerationResponse {
        GenerationResponse {
            text: text.into(),
            ..Default::default()
        }
    }

    #[test]
    fn overwrite_moves_key_to_back() {
        let cache = ResponseCache::new(&CacheConfig::new().max_entries(2).evict_count(1));
        cache.insert(&key("a"), response("a1"));
        cache.insert(&key("b"), response("b"));
        cache.insert(&key("a"), response("a2"));
        // Full: "b" is now oldest.
        cache.insert(&key("c"), response("c"));

        assert!(cache.get(&key("b")).is_none());
        assert_eq!(cache.get(&key("a")).unwrap().text, "a2");
        assert_eq!(cache.get(&key("c")).unwrap().text, "c");
    }

    #[test]
    fn zero_evict_count_still_makes_room() {
        let cache = ResponseCache::new(&CacheConfig::new().max_entries(1).evict_count(0));
        cache.insert(&key("a"), response("a"));
        cache.insert(&key("b"), response("b"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn hit_ratio_counts_similar_hits() {
        let stats = CacheStats {
            hits: 1,
            similar_hits: 1,
            misses: 2,
            ..Default::default()
        };
        assert_eq!(stats.hit_ratio(), 0.5);
        assert_eq!(CacheStats::default().hit_ratio(), 0.0);
    }
}
