//! Operational counters shown on the debug line when --debug is set.

use crossterm::event::KeyCode;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Paragraph, Widget},
};

#[derive(Debug, Default)]
pub struct DebugState {
    pub enabled: bool,
    pub num_events: u64,
    pub num_frames: u64,
    pub num_requests: u64,
    pub num_stale: u64,
    pub last_key: Option<KeyCode>,
}

impl DebugState {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn on_key(&mut self, code: KeyCode) {
        self.last_key = Some(code);
    }
}

impl Widget for &DebugState {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let key = self
            .last_key
            .map(|k| format!("{:?}", k))
            .unwrap_or_else(|| "-".to_string());
        let text = format!(
            "events: {}  frames: {}  requests: {}  stale: {}  key: {}",
            self.num_events, self.num_frames, self.num_requests, self.num_stale, key
        );
        Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .render(area, buf);
    }
}
