//! Decides, per request, whether to serve from cache, serve stale and
//! revalidate, or fetch from the network with bounded retry.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::client::Fetcher;
use super::error::FetchError;
use crate::cache::{CacheStore, FetchPolicy, Freshness};
use crate::query::StateUpdate;

/// Sending half of a subscription's update channel.
///
/// When the receiving subscription goes away, the channel closes and any
/// fetch or backoff still running for it stops.
pub type Publisher = mpsc::UnboundedSender<StateUpdate>;

/// Shown when a failed fetch carries no message of its own.
const FALLBACK_ERROR_MESSAGE: &str = "Failed to fetch data";

/// Fetch orchestrator shared by every subscription of an application.
#[derive(Clone)]
pub struct Orchestrator {
  store: CacheStore,
  fetcher: Arc<dyn Fetcher>,
}

impl Orchestrator {
  pub fn new(store: CacheStore, fetcher: Arc<dyn Fetcher>) -> Self {
    Self { store, fetcher }
  }

  pub fn store(&self) -> &CacheStore {
    &self.store
  }

  /// Run one request for `key`.
  ///
  /// Cache hits are published before this returns. Network work is spawned
  /// onto the runtime and reports through `publisher` as it progresses.
  /// With `force_refresh` the cache is not consulted at all.
  pub fn request(&self, key: &str, policy: &FetchPolicy, force_refresh: bool, publisher: &Publisher) {
    if !force_refresh {
      let (freshness, entry) = self.store.lookup(key, policy.cache_time, Instant::now());

      if let Some(entry) = entry {
        let is_stale = freshness == Freshness::Stale;
        debug!(key, is_stale, "serving cached data");
        let _ = publisher.send(StateUpdate::Cached {
          data: entry.payload,
          is_stale,
          last_updated: entry.stored_at,
        });

        if is_stale {
          self.revalidate(key, policy, publisher);
        }
        return;
      }

      debug!(key, ?freshness, "no servable cache entry");
    }

    let _ = publisher.send(StateUpdate::Loading);
    let seq = self.store.begin_fetch(key);
    tokio::spawn(
      self
        .clone()
        .fetch_with_retry(key.to_string(), policy.clone(), seq, publisher.clone()),
    );
  }

  /// Refresh stale data in the background. The caller already has the cached
  /// payload, so loading is only announced once the task is running.
  fn revalidate(&self, key: &str, policy: &FetchPolicy, publisher: &Publisher) {
    debug!(key, "revalidating stale entry");
    let seq = self.store.begin_fetch(key);
    let this = self.clone();
    let key = key.to_string();
    let policy = policy.clone();
    let publisher = publisher.clone();

    tokio::spawn(async move {
      let _ = publisher.send(StateUpdate::Loading);
      this.fetch_with_retry(key, policy, seq, publisher).await;
    });
  }

  async fn fetch_with_retry(self, key: String, policy: FetchPolicy, seq: u64, publisher: Publisher) {
    let max_attempts = policy.max_attempts();
    let mut attempts = 0;

    loop {
      let outcome = tokio::select! {
        _ = publisher.closed() => {
          debug!(key = %key, seq, "subscriber detached, abandoning fetch");
          return;
        }
        outcome = self.fetcher.fetch(&key) => outcome,
      };

      match outcome {
        Ok(payload) => {
          if !self.store.commit(&key, seq, payload.clone(), policy.stale_time) {
            // A newer run's entry is stored; settle on it. If it vanished
            // since the commit, this run's payload is the latest known.
            if !self.publish_accepted(&key, &publisher) {
              let _ = publisher.send(StateUpdate::Fetched {
                data: payload,
                last_updated: Utc::now(),
              });
            }
            return;
          }
          info!(key = %key, attempts = attempts + 1, "fetched");
          let _ = publisher.send(StateUpdate::Fetched {
            data: payload,
            last_updated: Utc::now(),
          });
          return;
        }
        Err(err) => {
          attempts += 1;

          if attempts >= max_attempts {
            // Show what a newer run stored, but still report this run's failure
            if self.store.is_superseded(&key, seq) {
              self.publish_accepted(&key, &publisher);
            }
            warn!(key = %key, attempts, error = %err, "fetch failed, giving up");
            let _ = publisher.send(StateUpdate::Failed {
              error: error_message(&err),
            });
            return;
          }

          let delay = policy.backoff(attempts);
          debug!(
            key = %key,
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "fetch failed, retrying"
          );

          tokio::select! {
            _ = publisher.closed() => {
              debug!(key = %key, seq, "subscriber detached during backoff");
              return;
            }
            _ = tokio::time::sleep(delay) => {}
          }
        }
      }
    }
  }
}

impl Orchestrator {
  /// Publish the entry a newer run stored. Returns false if there is none.
  fn publish_accepted(&self, key: &str, publisher: &Publisher) -> bool {
    let Some(entry) = self.store.get(key) else {
      return false;
    };
    let _ = publisher.send(StateUpdate::Cached {
      data: entry.payload,
      is_stale: false,
      last_updated: entry.stored_at,
    });
    true
  }
}

/// Subscriber-facing text for a failed fetch; never empty.
fn error_message(err: &FetchError) -> String {
  let message = err.to_string();
  if message.trim().is_empty() {
    FALLBACK_ERROR_MESSAGE.to_string()
  } else {
    message
  }
}

impl std::fmt::Debug for Orchestrator {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Orchestrator")
      .field("store", &self.store)
      .finish_non_exhaustive()
  }
}
