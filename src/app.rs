use crate::cache::CacheStats;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::fetch::Orchestrator;
use crate::query::{RequestState, Subscription};
use crate::ui;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::info;

/// Live terminal view of one subscription.
pub struct App {
  subscription: Subscription,
  orchestrator: Orchestrator,
  base_url: String,
  tick_rate: Duration,
  should_quit: bool,
}

impl App {
  /// Subscribe to `key` and build the view. Must be called inside a runtime.
  pub fn new(config: &Config, orchestrator: Orchestrator, key: String) -> Self {
    let subscription = Subscription::new(orchestrator.clone(), key, config.cache.clone());

    Self {
      subscription,
      orchestrator,
      base_url: config.api.base_url.clone(),
      tick_rate: config.watch.tick_rate,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(self.tick_rate);
    info!(key = self.subscription.key(), "watching");

    // Main loop
    let result = loop {
      if let Err(e) = terminal.draw(|frame| ui::draw(frame, self)) {
        break Err(e.into());
      }

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => {
          self.subscription.poll();
        }
        None => break Ok(()),
      }

      if self.should_quit {
        break Ok(());
      }
    };

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  fn handle_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
      }
      KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
      KeyCode::Char('r') => {
        info!(key = self.subscription.key(), "manual refresh");
        self.subscription.refresh();
      }
      KeyCode::Char('c') => {
        info!(key = self.subscription.key(), "clearing cache entry");
        self.subscription.clear_cache();
      }
      _ => {}
    }
  }

  // Accessors for UI rendering
  pub fn key(&self) -> &str {
    self.subscription.key()
  }

  pub fn state(&self) -> &RequestState {
    self.subscription.state()
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  pub fn stats(&self) -> CacheStats {
    self.orchestrator.store().stats()
  }

  pub fn should_quit(&self) -> bool {
    self.should_quit
  }
}
