use chrono::{DateTime, Utc};
use ratatui::prelude::Color;

use crate::query::RequestState;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Short status label and color for a request
pub fn freshness_label(state: &RequestState) -> (&'static str, Color) {
  if state.loading {
    ("LOADING", Color::Yellow)
  } else if state.error.is_some() {
    ("ERROR", Color::Red)
  } else if state.data.is_none() {
    ("EMPTY", Color::DarkGray)
  } else if state.is_stale {
    ("STALE", Color::Magenta)
  } else {
    ("FRESH", Color::Green)
  }
}

/// Human-readable age of `at` relative to `now`
pub fn format_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let seconds = (now - at).num_seconds();
  if seconds < 5 {
    // Includes clock skew
    "just now".to_string()
  } else if seconds < 60 {
    format!("{}s ago", seconds)
  } else if seconds < 3600 {
    format!("{}m ago", seconds / 60)
  } else {
    format!("{}h ago", seconds / 3600)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;
  use serde_json::json;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("ééééé", 4), "é...");
  }

  #[test]
  fn test_freshness_label_priority() {
    let mut state = RequestState::default();
    assert_eq!(freshness_label(&state).0, "LOADING");

    state.loading = false;
    assert_eq!(freshness_label(&state).0, "EMPTY");

    state.data = Some(json!(1));
    assert_eq!(freshness_label(&state), ("FRESH", Color::Green));

    state.is_stale = true;
    assert_eq!(freshness_label(&state).0, "STALE");

    state.error = Some("boom".to_string());
    assert_eq!(freshness_label(&state), ("ERROR", Color::Red));
  }

  #[test]
  fn test_format_age() {
    let now = Utc::now();
    assert_eq!(format_age(now, now), "just now");
    assert_eq!(format_age(now + Duration::seconds(30), now), "just now");
    assert_eq!(format_age(now - Duration::seconds(42), now), "42s ago");
    assert_eq!(format_age(now - Duration::minutes(7), now), "7m ago");
    assert_eq!(format_age(now - Duration::hours(3), now), "3h ago");
  }
}
