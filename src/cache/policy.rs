//! Per-request fetch policy.

use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// How long cached data is served without revalidation by default.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);
/// How long an entry may be served at all before it is dropped.
pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_RETRY_COUNT: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Staleness, expiry and retry settings for a single request.
///
/// Durations are read from config as integer milliseconds. `stale_time <= cache_time`
/// is expected but not enforced: with an inverted pair, entries are served as stale
/// right up until they expire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchPolicy {
  /// Age after which cached data is stale but still servable
  #[serde(deserialize_with = "deserialize_millis")]
  pub stale_time: Duration,
  /// Age after which an entry is purged instead of served
  #[serde(deserialize_with = "deserialize_millis")]
  pub cache_time: Duration,
  /// Maximum attempts, including the first
  pub retry_count: u32,
  /// Base backoff unit; the wait before retry `n` is `retry_delay * n`
  #[serde(deserialize_with = "deserialize_millis")]
  pub retry_delay: Duration,
}

impl Default for FetchPolicy {
  fn default() -> Self {
    Self {
      stale_time: DEFAULT_STALE_TIME,
      cache_time: DEFAULT_CACHE_TIME,
      retry_count: DEFAULT_RETRY_COUNT,
      retry_delay: DEFAULT_RETRY_DELAY,
    }
  }
}

impl FetchPolicy {
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  pub fn with_cache_time(mut self, cache_time: Duration) -> Self {
    self.cache_time = cache_time;
    self
  }

  pub fn with_retry_count(mut self, retry_count: u32) -> Self {
    self.retry_count = retry_count;
    self
  }

  pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
    self.retry_delay = retry_delay;
    self
  }

  /// Number of attempts actually made. A zero retry count still makes one attempt.
  pub fn max_attempts(&self) -> u32 {
    self.retry_count.max(1)
  }

  /// Backoff before the attempt following failed attempt number `attempt` (1-based).
  pub fn backoff(&self, attempt: u32) -> Duration {
    self.retry_delay.saturating_mul(attempt)
  }
}

pub(crate) fn deserialize_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
  D: Deserializer<'de>,
{
  let ms = u64::deserialize(deserializer)?;
  Ok(Duration::from_millis(ms))
}
