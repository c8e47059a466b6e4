use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::error::FetchError;
use crate::config::ApiConfig;

/// Network boundary: performs one fetch attempt for a resource key.
///
/// Implementations make exactly one request per call and do no retrying of
/// their own; retry and backoff belong to the orchestrator.
pub trait Fetcher: Send + Sync + 'static {
  fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Value, FetchError>>;
}

/// HTTP fetcher: one GET per attempt, JSON body.
#[derive(Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
  base_url: Url,
  token: Option<String>,
}

impl HttpFetcher {
  pub fn new(config: &ApiConfig, token: Option<String>) -> Result<Self> {
    let base_url = Url::parse(&config.base_url)
      .map_err(|e| eyre!("Invalid base URL {}: {}", config.base_url, e))?;

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      base_url,
      token,
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Resolve a key against the base URL. Absolute keys are used as-is.
  pub fn resolve(&self, key: &str) -> Result<Url, FetchError> {
    self.base_url.join(key).map_err(|source| FetchError::InvalidKey {
      key: key.to_string(),
      source,
    })
  }

  /// Build the GET request for `key`, asking for JSON and bypassing
  /// intermediary caches.
  pub fn build_request(&self, key: &str) -> Result<reqwest::Request, FetchError> {
    let url = self.resolve(key)?;

    let mut builder = self
      .client
      .get(url)
      .header(ACCEPT, "application/json")
      .header(CACHE_CONTROL, "no-cache");
    if let Some(token) = &self.token {
      builder = builder.bearer_auth(token);
    }

    Ok(builder.build()?)
  }

  async fn get_json(&self, key: &str) -> Result<Value, FetchError> {
    let request = self.build_request(key)?;
    let response = self.client.execute(request).await?;

    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
      return Err(FetchError::from_status(
        status,
        &String::from_utf8_lossy(&body),
      ));
    }

    // 204 and friends
    if body.iter().all(u8::is_ascii_whitespace) {
      return Ok(Value::Null);
    }

    Ok(serde_json::from_slice(&body)?)
  }
}

impl Fetcher for HttpFetcher {
  fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Value, FetchError>> {
    Box::pin(self.get_json(key))
  }
}
