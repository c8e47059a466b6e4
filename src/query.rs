//! Subscription surface over the fetch orchestrator.
//!
//! Inspired by TanStack Query, a `Subscription` binds one resource key and
//! fetch policy to a live `RequestState` that a view can render.
//!
//! # Example
//!
//! ```ignore
//! let mut sub = Subscription::new(orchestrator.clone(), "/api/user/dashboard", policy);
//!
//! // In event loop tick
//! if sub.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! let state = sub.state();
//! if state.loading { render_spinner() }
//! if let Some(data) = &state.data { render_data(data) }
//! if let Some(e) = &state.error { render_error(e) }
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::cache::FetchPolicy;
use crate::fetch::{Orchestrator, Publisher};

/// What a subscriber sees of one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestState {
  pub data: Option<Value>,
  pub loading: bool,
  pub error: Option<String>,
  pub is_stale: bool,
  pub last_updated: Option<DateTime<Utc>>,
}

impl Default for RequestState {
  fn default() -> Self {
    Self {
      data: None,
      loading: true,
      error: None,
      is_stale: false,
      last_updated: None,
    }
  }
}

/// A change published by the orchestrator to one subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
  /// Served from the cache
  Cached {
    data: Value,
    is_stale: bool,
    last_updated: DateTime<Utc>,
  },
  /// A network fetch started
  Loading,
  /// A network fetch succeeded
  Fetched {
    data: Value,
    last_updated: DateTime<Utc>,
  },
  /// All attempts failed; carries the last attempt's message
  Failed { error: String },
}

impl RequestState {
  pub fn apply(&mut self, update: StateUpdate) {
    match update {
      StateUpdate::Cached {
        data,
        is_stale,
        last_updated,
      } => {
        self.data = Some(data);
        self.loading = false;
        self.error = None;
        self.is_stale = is_stale;
        self.last_updated = Some(last_updated);
      }
      StateUpdate::Loading => {
        self.loading = true;
        self.error = None;
      }
      StateUpdate::Fetched { data, last_updated } => {
        *self = RequestState {
          data: Some(data),
          loading: false,
          error: None,
          is_stale: false,
          last_updated: Some(last_updated),
        };
      }
      StateUpdate::Failed { error } => {
        // Previous data stays as it was
        self.loading = false;
        self.error = Some(error);
      }
    }
  }
}

/// A live subscription to one `(key, policy)` pair.
///
/// Dropping the subscription detaches it: updates still in flight are
/// discarded, and pending fetches and retry delays stop early.
pub struct Subscription {
  orchestrator: Orchestrator,
  key: String,
  policy: FetchPolicy,
  state: RequestState,
  publisher: Publisher,
  receiver: mpsc::UnboundedReceiver<StateUpdate>,
}

impl Subscription {
  /// Subscribe and run the first request immediately. A cache hit is
  /// already reflected in `state()` when this returns.
  ///
  /// Must be called from within a tokio runtime.
  pub fn new(orchestrator: Orchestrator, key: impl Into<String>, policy: FetchPolicy) -> Self {
    let (publisher, receiver) = mpsc::unbounded_channel();
    let mut subscription = Self {
      orchestrator,
      key: key.into(),
      policy,
      state: RequestState::default(),
      publisher,
      receiver,
    };
    subscription.run(false);
    subscription
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  pub fn policy(&self) -> &FetchPolicy {
    &self.policy
  }

  pub fn state(&self) -> &RequestState {
    &self.state
  }

  pub fn data(&self) -> Option<&Value> {
    self.state.data.as_ref()
  }

  pub fn is_loading(&self) -> bool {
    self.state.loading
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error.as_deref()
  }

  pub fn is_stale(&self) -> bool {
    self.state.is_stale
  }

  /// Point the subscription at another key. A no-op if the key is unchanged.
  pub fn set_key(&mut self, key: impl Into<String>) {
    let key = key.into();
    if key != self.key {
      self.key = key;
      self.resubscribe();
    }
  }

  /// Change the fetch policy. A no-op if the policy is unchanged.
  pub fn set_policy(&mut self, policy: FetchPolicy) {
    if policy != self.policy {
      self.policy = policy;
      self.resubscribe();
    }
  }

  /// Fetch from the network, ignoring the cache.
  ///
  /// Each call starts its own fetch sequence; concurrent refreshes are not
  /// merged.
  pub fn refresh(&mut self) {
    self.run(true);
  }

  /// Drop the cached entry for this key and forget the local data.
  /// Fetches already in flight are not cancelled and may repopulate it.
  pub fn clear_cache(&mut self) {
    self.orchestrator.store().delete(&self.key);
    self.state.data = None;
    self.state.last_updated = None;
  }

  /// Apply pending updates without blocking.
  ///
  /// Returns `true` if the state changed. Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok(update) = self.receiver.try_recv() {
      self.state.apply(update);
      changed = true;
    }
    changed
  }

  /// Wait for the next update, then apply it and anything else pending.
  pub async fn changed(&mut self) {
    // The subscription holds a sender itself, so the channel never closes here
    if let Some(update) = self.receiver.recv().await {
      self.state.apply(update);
      self.poll();
    }
  }

  /// Wait until no fetch is being awaited.
  pub async fn settled(&mut self) -> &RequestState {
    self.poll();
    while self.state.loading {
      self.changed().await;
    }
    &self.state
  }

  fn run(&mut self, force_refresh: bool) {
    self
      .orchestrator
      .request(&self.key, &self.policy, force_refresh, &self.publisher);
    self.poll();
  }

  /// Start over on a fresh channel, detaching everything still running for
  /// the previous key or policy.
  fn resubscribe(&mut self) {
    let (publisher, receiver) = mpsc::unbounded_channel();
    self.publisher = publisher;
    self.receiver = receiver;
    self.run(false);
  }
}

impl std::fmt::Debug for Subscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("key", &self.key)
      .field("policy", &self.policy)
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}
