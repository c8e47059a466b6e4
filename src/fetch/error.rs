use thiserror::Error;

/// Maximum length for error response bodies kept on a `FetchError`
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// A single failed fetch attempt.
///
/// The `Display` text is what a subscriber sees in `RequestState::error`
/// once retries are exhausted.
#[derive(Error, Debug)]
pub enum FetchError {
  #[error("Request failed with status code {status}")]
  Status { status: u16, body: String },

  #[error("Network error: {0}")]
  Network(#[from] reqwest::Error),

  #[error("Invalid JSON response: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("Invalid resource key '{key}': {source}")]
  InvalidKey {
    key: String,
    #[source]
    source: url::ParseError,
  },

  #[error("{0}")]
  Other(String),
}

impl FetchError {
  pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
    FetchError::Status {
      status: status.as_u16(),
      body: truncate_body(body),
    }
  }
}

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
  if body.chars().count() <= MAX_ERROR_BODY_LENGTH {
    return body.to_string();
  }
  let kept: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
  format!("{}... (truncated, {} total bytes)", kept, body.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_message_is_stable() {
    let err = FetchError::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "oops");
    assert_eq!(err.to_string(), "Request failed with status code 500");
    match err {
      FetchError::Status { status, body } => {
        assert_eq!(status, 500);
        assert_eq!(body, "oops");
      }
      other => panic!("unexpected error: {:?}", other),
    }
  }

  #[test]
  fn test_long_bodies_are_truncated() {
    let body = "é".repeat(600);
    let truncated = truncate_body(&body);
    assert!(truncated.starts_with(&"é".repeat(MAX_ERROR_BODY_LENGTH)));
    assert!(truncated.ends_with("(truncated, 1200 total bytes)"));
  }

  #[test]
  fn test_other_message_is_verbatim() {
    let err = FetchError::Other("timeout of 5000ms exceeded".to_string());
    assert_eq!(err.to_string(), "timeout of 5000ms exceeded");
  }
}
