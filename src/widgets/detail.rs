//! Detail popup for the highlighted record: the full source attribute
//! map, grouped into labeled sections, anchored near the click.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

use crate::config::Theme;
use crate::correlate::HighlightedRecord;

/// Attribute groups in display order. Keys missing from a record are
/// omitted; a group with no present keys is dropped entirely.
const FIELD_GROUPS: [(&str, &[&str]); 6] = [
    (
        "Pump Configuration",
        &[
            "PumpType",
            "Stages",
            "Pump_Detail_Impeller_Dia_1st_Stage",
            "Pump_Detail_MOC",
        ],
    ),
    (
        "Test Information",
        &["TestNo", "Test_Type_ID", "Testpoint", "Speed"],
    ),
    (
        "Performance",
        &[
            "Flow",
            "Total_Head",
            "Pump_Efficiency",
            "Pump_Input",
            "Pump_Output",
        ],
    ),
    (
        "Pressure",
        &["Suction_Pr", "hs", "Discharge_Pr", "hd", "Vel_Head"],
    ),
    (
        "Electrical",
        &[
            "voltage",
            "P_Current",
            "CT_ratio",
            "Power_Reading",
            "Motor_Input",
            "Motor_Efficiency",
        ],
    ),
    ("Metadata", &["MNP_So_No", "User_ID", "Recent_updated"]),
];

const POPUP_WIDTH: u16 = 44;
const POPUP_MAX_HEIGHT: u16 = 24;

#[derive(Debug, Default)]
pub struct DetailModal {
    pub active: bool,
    /// Cell the popup anchors near (usually the click position).
    pub anchor: (u16, u16),
    pub scroll: u16,
}

impl DetailModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, anchor: (u16, u16)) {
        self.active = true;
        self.anchor = anchor;
        self.scroll = 0;
    }

    pub fn close(&mut self) {
        self.active = false;
        self.scroll = 0;
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.scroll = self.scroll.saturating_add(1);
    }
}

fn format_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// The popup's content lines for a record. Exposed for tests.
pub fn detail_lines<'a>(record: &HighlightedRecord, theme: &Theme) -> Vec<Line<'a>> {
    let label_style = Style::default().fg(theme.get("text_secondary"));
    let value_style = Style::default().fg(theme.get("text_primary"));
    let group_style = Style::default()
        .fg(theme.get("table_header"))
        .add_modifier(Modifier::BOLD);

    let mut lines = Vec::new();
    for (group, keys) in FIELD_GROUPS {
        let present: Vec<(&str, String)> = keys
            .iter()
            .filter_map(|key| {
                record
                    .raw
                    .get(*key)
                    .and_then(format_value)
                    .map(|v| (*key, v))
            })
            .collect();
        if present.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::from(Span::styled(group.to_string(), group_style)));
        for (key, value) in present {
            lines.push(Line::from(vec![
                Span::styled(format!("{}: ", key), label_style),
                Span::styled(value, value_style),
            ]));
        }
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            format!(
                "Point {}: flow {:.2}, head {:.2}, eff {:.1}",
                record.index + 1,
                record.flow,
                record.head,
                record.efficiency
            ),
            value_style,
        )));
    }
    lines
}

/// Position the popup near the anchor, flipped and clamped so it stays
/// inside `screen`.
pub fn popup_rect(anchor: (u16, u16), content_height: u16, screen: Rect) -> Rect {
    let width = POPUP_WIDTH.min(screen.width);
    let height = (content_height + 2).min(POPUP_MAX_HEIGHT).min(screen.height);

    let mut x = anchor.0.saturating_add(2);
    if x + width > screen.x + screen.width {
        x = anchor.0.saturating_sub(width + 1).max(screen.x);
    }
    let mut y = anchor.1;
    if y + height > screen.y + screen.height {
        y = (screen.y + screen.height).saturating_sub(height);
    }
    x = x.min((screen.x + screen.width).saturating_sub(width));
    Rect {
        x,
        y,
        width,
        height,
    }
}

/// Render the popup over whatever is beneath it.
pub fn render_detail(
    screen: Rect,
    buf: &mut Buffer,
    modal: &mut DetailModal,
    record: &HighlightedRecord,
    theme: &Theme,
) {
    let lines = detail_lines(record, theme);
    let area = popup_rect(modal.anchor, lines.len() as u16, screen);

    Clear.render(area, buf);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.get("modal_border")))
        .title(format!(" Point {} ", record.index + 1));

    let visible = area.height.saturating_sub(2);
    let max_scroll = (lines.len() as u16).saturating_sub(visible);
    modal.scroll = modal.scroll.min(max_scroll);

    Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(theme.get("background")))
        .scroll((modal.scroll, 0))
        .render(area, buf);
}
