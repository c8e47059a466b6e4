use clap::{Args as ClapArgs, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use fetchcache::app::App;
use fetchcache::config::Config;
use fetchcache::{
  CacheStore, FetchPolicy, HttpFetcher, Orchestrator, ProductFilters, RequestState, Resource,
  Subscription,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "fetchcache")]
#[command(about = "Fetch JSON resources through a stale-while-revalidate cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/fetchcache/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Fetch keys through one shared cache and print each settled state as JSON
  Fetch {
    /// Resource keys, absolute URLs or paths relative to the base URL
    #[arg(required = true)]
    keys: Vec<String>,

    #[command(flatten)]
    policy: PolicyArgs,

    /// Print cache statistics after fetching
    #[arg(long)]
    stats: bool,
  },
  /// Fetch a user's dashboard
  Dashboard {
    #[arg(long)]
    user: String,

    #[command(flatten)]
    retry: RetryArgs,
  },
  /// Fetch a trader's product listing
  Products {
    #[arg(long)]
    trader: String,

    #[arg(long)]
    category: Option<String>,

    #[arg(long)]
    status: Option<String>,

    #[command(flatten)]
    retry: RetryArgs,
  },
  /// Fetch a trader's analytics
  Analytics {
    #[arg(long)]
    trader: String,

    #[command(flatten)]
    retry: RetryArgs,
  },
  /// Watch one key in a live terminal view
  Watch {
    key: String,

    #[command(flatten)]
    policy: PolicyArgs,
  },
}

/// Overrides for the configured fetch policy
#[derive(ClapArgs, Debug, Default)]
struct PolicyArgs {
  /// Milliseconds before cached data is considered stale
  #[arg(long, value_name = "MS")]
  stale_time: Option<u64>,

  /// Milliseconds before cached data expires
  #[arg(long, value_name = "MS")]
  cache_time: Option<u64>,

  #[command(flatten)]
  retry: RetryArgs,
}

/// Retry overrides. Presets fix their own staleness windows, so they only take these.
#[derive(ClapArgs, Debug, Default)]
struct RetryArgs {
  /// Maximum attempts per fetch, including the first
  #[arg(long, value_name = "N")]
  retry_count: Option<u32>,

  /// Base retry delay in milliseconds; attempt n waits n times this
  #[arg(long, value_name = "MS")]
  retry_delay: Option<u64>,
}

impl PolicyArgs {
  fn apply(&self, mut policy: FetchPolicy) -> FetchPolicy {
    if let Some(ms) = self.stale_time {
      policy.stale_time = Duration::from_millis(ms);
    }
    if let Some(ms) = self.cache_time {
      policy.cache_time = Duration::from_millis(ms);
    }
    self.retry.apply(policy)
  }
}

impl RetryArgs {
  fn apply(&self, mut policy: FetchPolicy) -> FetchPolicy {
    if let Some(count) = self.retry_count {
      policy.retry_count = count;
    }
    if let Some(ms) = self.retry_delay {
      policy.retry_delay = Duration::from_millis(ms);
    }
    policy
  }
}

/// One line of `fetch` output
#[derive(Serialize)]
struct Report<'a> {
  key: &'a str,
  #[serde(flatten)]
  state: &'a RequestState,
}

/// Initialize the tracing subscriber.
///
/// RUST_LOG wins over the configured level. While the watch view owns the
/// terminal, logs go to a daily file instead of stderr.
fn init_tracing(config: &Config, to_file: bool) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(config.log.level.as_deref().unwrap_or("warn")))
    .map_err(|e| eyre!("Invalid log level: {}", e))?;

  if !to_file {
    tracing_subscriber::registry()
      .with(fmt::layer().with_writer(std::io::stderr))
      .with(filter)
      .init();
    return Ok(None);
  }

  let dir = config.log_directory()?;
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let (writer, guard) =
    tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, "fetchcache.log"));
  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .with(filter)
    .init();

  Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = init_tracing(&config, matches!(args.command, Command::Watch { .. }))?;

  let fetcher = HttpFetcher::new(&config.api, Config::get_api_token())?;
  let orchestrator = Orchestrator::new(CacheStore::new(), Arc::new(fetcher));

  match args.command {
    Command::Fetch {
      keys,
      policy,
      stats,
    } => {
      let policy = policy.apply(config.cache.clone());
      let mut failures = 0;
      for key in &keys {
        // One at a time, so repeated keys are served from the cache
        let subscription = Subscription::new(orchestrator.clone(), key.as_str(), policy.clone());
        if !report(subscription).await? {
          failures += 1;
        }
      }

      if stats {
        let stats = orchestrator.store().stats();
        println!("{}", serde_json::to_string_pretty(&stats)?);
      }

      if failures > 0 {
        return Err(eyre!("{} of {} requests failed", failures, keys.len()));
      }
      Ok(())
    }
    Command::Dashboard { user, retry } => {
      let resource = Resource::Dashboard { user_id: user };
      fetch_resource(orchestrator, &config, resource, &retry).await
    }
    Command::Products {
      trader,
      category,
      status,
      retry,
    } => {
      let resource = Resource::TraderProducts {
        trader_id: trader,
        filters: ProductFilters { category, status },
      };
      fetch_resource(orchestrator, &config, resource, &retry).await
    }
    Command::Analytics { trader, retry } => {
      let resource = Resource::Analytics { trader_id: trader };
      fetch_resource(orchestrator, &config, resource, &retry).await
    }
    Command::Watch { key, policy } => {
      let config = Config {
        cache: policy.apply(config.cache.clone()),
        ..config
      };
      let mut app = App::new(&config, orchestrator, key);
      app.run().await
    }
  }
}

async fn fetch_resource(
  orchestrator: Orchestrator,
  config: &Config,
  resource: Resource,
  retry: &RetryArgs,
) -> Result<()> {
  info!(resource = %resource.description(), "fetching preset");
  let subscription = resource.subscribe(orchestrator, &retry.apply(config.cache.clone()));
  let key = subscription.key().to_string();

  if !report(subscription).await? {
    return Err(eyre!("Request for {} failed", key));
  }
  Ok(())
}

/// Wait for `subscription` to settle and print its state as JSON.
/// Returns whether the request succeeded.
async fn report(mut subscription: Subscription) -> Result<bool> {
  let state = subscription.settled().await.clone();
  let report = Report {
    key: subscription.key(),
    state: &state,
  };
  println!("{}", serde_json::to_string_pretty(&report)?);
  Ok(state.error.is_none())
}
