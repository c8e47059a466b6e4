//! Scripted fetcher for tests.

use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::client::Fetcher;
use super::error::FetchError;

/// Replays a fixed list of outcomes, one per call, and counts calls.
/// Once the script runs out every call fails.
pub struct ScriptedFetcher {
  responses: Mutex<VecDeque<Result<Value, String>>>,
  calls: AtomicUsize,
  latency: Duration,
}

impl ScriptedFetcher {
  pub fn new<I>(responses: I) -> Arc<Self>
  where
    I: IntoIterator<Item = Result<Value, &'static str>>,
  {
    Self::with_latency(responses, Duration::ZERO)
  }

  /// Like `new`, but each call sleeps for `latency` before resolving.
  pub fn with_latency<I>(responses: I, latency: Duration) -> Arc<Self>
  where
    I: IntoIterator<Item = Result<Value, &'static str>>,
  {
    Arc::new(Self {
      responses: Mutex::new(
        responses
          .into_iter()
          .map(|r| r.map_err(String::from))
          .collect(),
      ),
      calls: AtomicUsize::new(0),
      latency,
    })
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl Fetcher for ScriptedFetcher {
  fn fetch<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<Value, FetchError>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let next = self
      .responses
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or_else(|| Err("no scripted response left".to_string()));
    let latency = self.latency;

    Box::pin(async move {
      if !latency.is_zero() {
        tokio::time::sleep(latency).await;
      }
      next.map_err(FetchError::Other)
    })
  }
}
