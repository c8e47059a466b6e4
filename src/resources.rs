//! Preset resources with their own staleness windows.

use std::time::Duration;
use url::form_urlencoded;

use crate::cache::FetchPolicy;
use crate::fetch::Orchestrator;
use crate::query::Subscription;

/// Optional filters for the trader product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilters {
  pub category: Option<String>,
  pub status: Option<String>,
}

/// A known API resource.
///
/// The ids identify whose data is shown; the API resolves the actual
/// account from the caller's credentials, so they do not appear in the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
  /// A user's dashboard summary
  Dashboard { user_id: String },
  /// A trader's product listing
  TraderProducts {
    trader_id: String,
    filters: ProductFilters,
  },
  /// A trader's sales analytics
  Analytics { trader_id: String },
}

impl Resource {
  /// Cache key (and request path) for this resource.
  pub fn key(&self) -> String {
    match self {
      Self::Dashboard { .. } => "/api/user/dashboard".to_string(),
      Self::TraderProducts { filters, .. } => {
        let mut params = form_urlencoded::Serializer::new(String::new());
        if let Some(category) = filters.category.as_deref().filter(|c| !c.is_empty()) {
          params.append_pair("category", category);
        }
        if let Some(status) = filters.status.as_deref().filter(|s| !s.is_empty()) {
          params.append_pair("status", status);
        }
        let query = params.finish();

        if query.is_empty() {
          "/api/trader/products".to_string()
        } else {
          format!("/api/trader/products?{}", query)
        }
      }
      Self::Analytics { .. } => "/api/trader/analytics".to_string(),
    }
  }

  /// `(stale_time, cache_time)` for this resource.
  fn windows(&self) -> (Duration, Duration) {
    const MINUTE: u64 = 60;
    let (stale, cache) = match self {
      Self::Dashboard { .. } => (2, 10),
      Self::TraderProducts { .. } => (5, 15),
      Self::Analytics { .. } => (10, 30),
    };
    (
      Duration::from_secs(stale * MINUTE),
      Duration::from_secs(cache * MINUTE),
    )
  }

  /// The resource's windows applied over `base`; retry settings come from `base`.
  pub fn policy(&self, base: &FetchPolicy) -> FetchPolicy {
    let (stale_time, cache_time) = self.windows();
    base
      .clone()
      .with_stale_time(stale_time)
      .with_cache_time(cache_time)
  }

  pub fn description(&self) -> String {
    match self {
      Self::Dashboard { user_id } => format!("dashboard for user {}", user_id),
      Self::TraderProducts { trader_id, filters } => {
        let mut description = format!("products for trader {}", trader_id);
        if let Some(category) = &filters.category {
          description.push_str(&format!(" in {}", category));
        }
        if let Some(status) = &filters.status {
          description.push_str(&format!(" ({})", status));
        }
        description
      }
      Self::Analytics { trader_id } => format!("analytics for trader {}", trader_id),
    }
  }

  pub fn subscribe(&self, orchestrator: Orchestrator, base: &FetchPolicy) -> Subscription {
    Subscription::new(orchestrator, self.key(), self.policy(base))
  }
}
