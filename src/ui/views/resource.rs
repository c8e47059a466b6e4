use crate::query::RequestState;
use crate::ui::renderfns::truncate;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Maximum length of an error shown in the block title
const MAX_TITLE_ERROR_LEN: usize = 60;

/// Draw the body of the watch view: the current payload, plus any error
pub fn draw_resource(frame: &mut Frame, area: Rect, key: &str, state: &RequestState) {
  let title = match (&state.error, state.loading) {
    (_, true) => format!(" {} (loading...) ", key),
    (Some(e), false) => format!(" {} (error: {}) ", key, truncate(e, MAX_TITLE_ERROR_LEN)),
    (None, false) if state.is_stale => format!(" {} (stale) ", key),
    (None, false) => format!(" {} ", key),
  };

  let border_color = if state.error.is_some() {
    Color::Red
  } else {
    Color::Blue
  };

  let block = Block::default()
    .title(title)
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(border_color));

  let inner = block.inner(area);
  frame.render_widget(block, area);

  let paragraph = Paragraph::new(body_lines(state)).wrap(Wrap { trim: false });
  frame.render_widget(paragraph, inner);
}

/// Lines for the body. Previous data stays visible under an error.
fn body_lines(state: &RequestState) -> Vec<Line<'static>> {
  let mut lines = Vec::new();

  if let Some(error) = &state.error {
    lines.push(Line::styled(
      format!("Error: {}", error),
      Style::default().fg(Color::Red),
    ));
    lines.push(Line::styled(
      "Press 'r' to retry.",
      Style::default().fg(Color::DarkGray),
    ));
    lines.push(Line::raw(""));
  }

  match &state.data {
    Some(data) => {
      let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
      lines.extend(pretty.lines().map(|l| Line::raw(l.to_string())));
    }
    None if state.loading => {
      lines.push(Line::styled(
        "Loading...",
        Style::default().fg(Color::DarkGray),
      ));
    }
    None => {
      lines.push(Line::styled(
        "No data. Press 'r' to fetch.",
        Style::default().fg(Color::DarkGray),
      ));
    }
  }

  lines
}
