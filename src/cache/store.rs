//! In-memory keyed store of the last successful payload per resource.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Age past which `stats()` counts an entry as expired, regardless of the
/// cache time it was requested with.
pub const STATS_EXPIRY_THRESHOLD: Duration = Duration::from_secs(30 * 60);

/// The last successful fetch for one key.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub key: String,
  pub payload: Value,
  /// Monotonic time of the fetch, used for every freshness decision
  pub fetched_at: Instant,
  /// Wall-clock time of the fetch, for display
  pub stored_at: DateTime<Utc>,
  /// Age after which the payload is stale
  pub stale_after: Duration,
}

impl CacheEntry {
  fn fetched_now(key: &str, payload: Value, stale_time: Duration) -> Self {
    Self {
      key: key.to_string(),
      payload,
      fetched_at: Instant::now(),
      stored_at: Utc::now(),
      stale_after: stale_time,
    }
  }

  fn age(&self, now: Instant) -> Duration {
    now.saturating_duration_since(self.fetched_at)
  }

  fn is_stale_at(&self, now: Instant) -> bool {
    self.age(now) > self.stale_after
  }
}

/// Result of checking a key against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
  /// Nothing cached for the key
  Miss,
  /// Cached and younger than its stale window
  Fresh,
  /// Cached, past its stale window, not yet expired
  Stale,
  /// Cached but older than the cache time; the entry has been removed
  Expired,
}

/// Counts reported by `CacheStore::stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
  pub total_entries: usize,
  pub stale_entries: usize,
  pub expired_entries: usize,
}

/// Per-key sequence bookkeeping for network fetches.
#[derive(Debug, Default, Clone, Copy)]
struct Sequence {
  issued: u64,
  accepted: u64,
}

#[derive(Debug, Default)]
struct Inner {
  entries: HashMap<String, CacheEntry>,
  sequences: HashMap<String, Sequence>,
}

/// Shared cache store.
///
/// Cloning is cheap and every clone sees the same entries. Construct one per
/// application (or per test) and hand clones to whatever needs it.
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
  inner: Arc<Mutex<Inner>>,
}

impl CacheStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    // The map is never left half-updated, so a poisoned lock is still usable.
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Get the entry for `key`, if any. Does not check expiry.
  pub fn get(&self, key: &str) -> Option<CacheEntry> {
    self.lock().entries.get(key).cloned()
  }

  /// Store `payload` as the latest result for `key`, fetched now.
  pub fn put(&self, key: &str, payload: Value, stale_time: Duration) {
    self
      .lock()
      .entries
      .insert(key.to_string(), CacheEntry::fetched_now(key, payload, stale_time));
  }

  /// Classify `key` at `now`. An expired entry is deleted.
  pub fn classify(&self, key: &str, cache_time: Duration, now: Instant) -> Freshness {
    self.lookup(key, cache_time, now).0
  }

  /// Classify `key` and return the servable entry in one step.
  ///
  /// The entry is returned only for `Fresh` and `Stale`.
  pub fn lookup(
    &self,
    key: &str,
    cache_time: Duration,
    now: Instant,
  ) -> (Freshness, Option<CacheEntry>) {
    let mut inner = self.lock();

    let Some(entry) = inner.entries.get(key) else {
      return (Freshness::Miss, None);
    };

    if entry.age(now) > cache_time {
      debug!(key, age_ms = entry.age(now).as_millis() as u64, "cache entry expired");
      inner.entries.remove(key);
      return (Freshness::Expired, None);
    }

    let freshness = if entry.is_stale_at(now) {
      Freshness::Stale
    } else {
      Freshness::Fresh
    };
    (freshness, Some(entry.clone()))
  }

  pub fn delete(&self, key: &str) {
    self.lock().entries.remove(key);
  }

  /// Remove every entry.
  pub fn clear(&self) {
    self.lock().entries.clear();
  }

  pub fn len(&self) -> usize {
    self.lock().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn keys(&self) -> Vec<String> {
    let mut keys: Vec<String> = self.lock().entries.keys().cloned().collect();
    keys.sort();
    keys
  }

  pub fn stats(&self) -> CacheStats {
    self.stats_at(Instant::now())
  }

  /// Entry counts as of `now`. Staleness uses each entry's own window; expiry
  /// uses the fixed `STATS_EXPIRY_THRESHOLD`.
  pub fn stats_at(&self, now: Instant) -> CacheStats {
    let inner = self.lock();
    let entries = inner.entries.values();

    let mut stats = CacheStats {
      total_entries: inner.entries.len(),
      stale_entries: 0,
      expired_entries: 0,
    };
    for entry in entries {
      if entry.is_stale_at(now) {
        stats.stale_entries += 1;
      }
      if entry.age(now) > STATS_EXPIRY_THRESHOLD {
        stats.expired_entries += 1;
      }
    }
    stats
  }

  /// Start a network fetch sequence for `key`, returning its sequence number.
  pub fn begin_fetch(&self, key: &str) -> u64 {
    let mut inner = self.lock();
    let seq = inner.sequences.entry(key.to_string()).or_default();
    seq.issued += 1;
    seq.issued
  }

  /// Write the result of fetch sequence `seq`, unless the result of a newer
  /// sequence is still stored. Returns whether the write happened.
  ///
  /// Once a newer entry has been deleted or cleared there is nothing left to
  /// protect, so an older result in flight repopulates the key.
  pub fn commit(&self, key: &str, seq: u64, payload: Value, stale_time: Duration) -> bool {
    let mut inner = self.lock();
    let accepted = inner.sequences.get(key).map_or(0, |sequence| sequence.accepted);
    if seq < accepted && inner.entries.contains_key(key) {
      debug!(key, seq, accepted, "discarding superseded fetch result");
      return false;
    }

    let sequence = inner.sequences.entry(key.to_string()).or_default();
    sequence.accepted = sequence.accepted.max(seq);
    inner
      .entries
      .insert(key.to_string(), CacheEntry::fetched_now(key, payload, stale_time));
    true
  }

  /// Whether a sequence newer than `seq` has already been accepted for `key`.
  pub fn is_superseded(&self, key: &str, seq: u64) -> bool {
    self
      .lock()
      .sequences
      .get(key)
      .is_some_and(|sequence| sequence.accepted > seq)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  const STALE: Duration = Duration::from_millis(1000);
  const CACHE: Duration = Duration::from_millis(5000);

  fn fetched_at(store: &CacheStore, key: &str) -> Instant {
    store.get(key).expect("entry present").fetched_at
  }

  #[test]
  fn test_never_fetched_key_is_miss() {
    let store = CacheStore::new();
    assert_eq!(store.classify("/x", CACHE, Instant::now()), Freshness::Miss);
    assert!(store.get("/x").is_none());
  }

  #[test]
  fn test_classify_fresh_within_stale_window() {
    let store = CacheStore::new();
    store.put("/x", json!({"v": 1}), STALE);
    let t0 = fetched_at(&store, "/x");

    assert_eq!(store.classify("/x", CACHE, t0), Freshness::Fresh);
    assert_eq!(store.classify("/x", CACHE, t0 + STALE), Freshness::Fresh);
  }

  #[test]
  fn test_classify_stale_between_windows() {
    let store = CacheStore::new();
    store.put("/x", json!({"v": 1}), STALE);
    let t0 = fetched_at(&store, "/x");

    assert_eq!(
      store.classify("/x", CACHE, t0 + Duration::from_millis(1500)),
      Freshness::Stale
    );
    assert_eq!(store.classify("/x", CACHE, t0 + CACHE), Freshness::Stale);
    assert!(store.get("/x").is_some());
  }

  #[test]
  fn test_classify_expired_removes_entry() {
    let store = CacheStore::new();
    store.put("/x", json!({"v": 1}), STALE);
    let t0 = fetched_at(&store, "/x");

    assert_eq!(
      store.classify("/x", CACHE, t0 + Duration::from_millis(6000)),
      Freshness::Expired
    );
    assert!(store.get("/x").is_none());
    assert_eq!(
      store.classify("/x", CACHE, t0 + Duration::from_millis(6000)),
      Freshness::Miss
    );
  }

  #[test]
  fn test_lookup_returns_entry_only_when_servable() {
    let store = CacheStore::new();
    store.put("/x", json!([1, 2, 3]), STALE);
    let t0 = fetched_at(&store, "/x");

    let (freshness, entry) = store.lookup("/x", CACHE, t0 + Duration::from_millis(10));
    assert_eq!(freshness, Freshness::Fresh);
    assert_eq!(entry.map(|e| e.payload), Some(json!([1, 2, 3])));

    let (freshness, entry) = store.lookup("/x", CACHE, t0 + Duration::from_secs(60));
    assert_eq!(freshness, Freshness::Expired);
    assert!(entry.is_none());
  }

  #[test]
  fn test_stale_uses_entry_window_not_callers() {
    let store = CacheStore::new();
    store.put("/short", json!(1), Duration::from_millis(10));
    store.put("/long", json!(2), Duration::from_secs(10));
    let now = fetched_at(&store, "/long") + Duration::from_millis(500);

    assert_eq!(store.classify("/short", CACHE, now), Freshness::Stale);
    assert_eq!(store.classify("/long", CACHE, now), Freshness::Fresh);
  }

  #[test]
  fn test_put_overwrites() {
    let store = CacheStore::new();
    store.put("/x", json!({"v": 1}), STALE);
    store.put("/x", json!({"v": 2}), STALE);
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("/x").unwrap().payload, json!({"v": 2}));
  }

  #[test]
  fn test_delete_and_clear() {
    let store = CacheStore::new();
    store.put("/a", json!(1), STALE);
    store.put("/b", json!(2), STALE);
    store.put("/c", json!(3), STALE);

    store.delete("/a");
    assert_eq!(store.keys(), vec!["/b".to_string(), "/c".to_string()]);
    assert_eq!(store.classify("/a", CACHE, Instant::now()), Freshness::Miss);

    store.clear();
    assert!(store.is_empty());
  }

  #[test]
  fn test_stats_counts_stale_and_thirty_minute_old_entries() {
    let store = CacheStore::new();
    store.put("/fresh", json!(1), Duration::from_secs(3600));
    store.put("/stale", json!(2), Duration::from_secs(1));
    let base = fetched_at(&store, "/stale");

    let stats = store.stats_at(base + Duration::from_secs(60));
    assert_eq!(
      stats,
      CacheStats {
        total_entries: 2,
        stale_entries: 1,
        expired_entries: 0,
      }
    );

    let stats = store.stats_at(base + Duration::from_secs(31 * 60));
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.stale_entries, 1);
    assert_eq!(stats.expired_entries, 2);
  }

  #[test]
  fn test_commit_discards_superseded_sequence() {
    let store = CacheStore::new();
    let older = store.begin_fetch("/x");
    let newer = store.begin_fetch("/x");
    assert!(newer > older);

    assert!(store.commit("/x", newer, json!("new"), STALE));
    assert!(!store.commit("/x", older, json!("old"), STALE));
    assert_eq!(store.get("/x").unwrap().payload, json!("new"));
    assert!(store.is_superseded("/x", older));
    assert!(!store.is_superseded("/x", newer));
  }

  #[test]
  fn test_commit_in_order_accepts_both() {
    let store = CacheStore::new();
    let first = store.begin_fetch("/x");
    let second = store.begin_fetch("/x");

    assert!(store.commit("/x", first, json!(1), STALE));
    assert!(store.commit("/x", second, json!(2), STALE));
    assert_eq!(store.get("/x").unwrap().payload, json!(2));
  }

  #[test]
  fn test_older_result_repopulates_cleared_key() {
    let store = CacheStore::new();
    let older = store.begin_fetch("/x");
    let newer = store.begin_fetch("/x");
    assert!(store.commit("/x", newer, json!(2), STALE));

    store.clear();
    assert!(store.commit("/x", older, json!(1), STALE));
    assert_eq!(store.get("/x").unwrap().payload, json!(1));

    // The newer sequence is still the one on record
    assert!(store.is_superseded("/x", older));
    let next = store.begin_fetch("/x");
    assert!(next > newer);
  }

  #[test]
  fn test_deleting_another_key_keeps_newer_entry_protected() {
    let store = CacheStore::new();
    let older = store.begin_fetch("/x");
    let newer = store.begin_fetch("/x");
    assert!(store.commit("/x", newer, json!(2), STALE));

    store.delete("/other");
    assert!(!store.commit("/x", older, json!(1), STALE));
    assert_eq!(store.get("/x").unwrap().payload, json!(2));
  }
}
