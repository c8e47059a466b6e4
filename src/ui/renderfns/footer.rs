use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use super::utils::{format_age, freshness_label};
use crate::cache::CacheStats;
use crate::query::RequestState;
use chrono::Utc;

/// Draw the footer bar with request status and cache stats
pub fn draw_footer(frame: &mut Frame, area: Rect, state: &RequestState, stats: &CacheStats) {
  let (label, color) = freshness_label(state);
  let updated = state
    .last_updated
    .map(|at| format_age(at, Utc::now()))
    .unwrap_or_else(|| "never".to_string());

  let line = Line::from(vec![
    Span::raw(" "),
    Span::styled(label, Style::default().fg(color).bold()),
    Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
    Span::styled("updated ", Style::default().fg(Color::DarkGray)),
    Span::raw(updated),
    Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
    Span::raw(format!(
      "{} cached, {} stale, {} past 30m",
      stats.total_entries, stats.stale_entries, stats.expired_entries
    )),
  ]);

  let paragraph = Paragraph::new(line).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}
