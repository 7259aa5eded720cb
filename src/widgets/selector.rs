//! Selection sidebar: the three cascading option lists plus the rated
//! speed editor (free-form input, common-speed chips, min/avg/max line).

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, StatefulWidget, Widget},
};

use crate::config::Theme;
use crate::selection::SelectionState;
use crate::Focus;

/// Where a mouse click inside the sidebar landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorHit {
    PumpItem(usize),
    StageItem(usize),
    TestTypeItem(usize),
    SpeedInput,
    Chip(usize),
}

#[derive(Debug, Default, Clone, Copy)]
struct SelectorAreas {
    pump_list: Rect,
    stage_list: Rect,
    test_type_list: Rect,
    speed_input: Rect,
    chips: Rect,
    chip_widths: [u16; 8],
    chip_count: usize,
}

/// UI state for the sidebar. Selection semantics live in
/// `SelectionState`; this only tracks highlights, the speed input
/// buffer, and the rects recorded during the last render.
#[derive(Debug, Default)]
pub struct SelectorState {
    pub pump_list: ListState,
    pub stage_list: ListState,
    pub test_type_list: ListState,
    /// Speed input buffer. Parsed and committed on Enter.
    pub speed_input: String,
    pub chip_index: usize,
    areas: SelectorAreas,
}

impl SelectorState {
    pub fn new() -> Self {
        Self::default()
    }

    fn list_for(&mut self, focus: Focus) -> Option<&mut ListState> {
        match focus {
            Focus::PumpList => Some(&mut self.pump_list),
            Focus::StageList => Some(&mut self.stage_list),
            Focus::TestTypeList => Some(&mut self.test_type_list),
            _ => None,
        }
    }

    pub fn list_up(&mut self, focus: Focus) {
        if let Some(state) = self.list_for(focus) {
            let current = state.selected().unwrap_or(0);
            state.select(Some(current.saturating_sub(1)));
        }
    }

    pub fn list_down(&mut self, focus: Focus, len: usize) {
        if len == 0 {
            return;
        }
        if let Some(state) = self.list_for(focus) {
            let next = match state.selected() {
                Some(current) => (current + 1).min(len - 1),
                None => 0,
            };
            state.select(Some(next));
        }
    }

    /// The option the focused list currently highlights.
    pub fn highlighted<'a>(&mut self, focus: Focus, options: &'a [String]) -> Option<&'a str> {
        let index = self.list_for(focus)?.selected()?;
        options.get(index).map(String::as_str)
    }

    /// Re-point a list highlight after its options were replaced, so it
    /// tracks the committed selection (or the top of the new list).
    pub fn sync_highlights(&mut self, selection: &SelectionState) {
        sync_one(&mut self.pump_list, selection.pumps(), selection.pump());
        sync_one(&mut self.stage_list, selection.stages(), selection.stage());
        sync_one(
            &mut self.test_type_list,
            selection.test_types(),
            selection.test_type(),
        );
    }

    pub fn push_speed_char(&mut self, c: char) {
        if c.is_ascii_digit() || c == '.' {
            self.speed_input.push(c);
        }
    }

    pub fn backspace_speed(&mut self) {
        self.speed_input.pop();
    }

    /// Parse and clear the input buffer. None when empty or not a number.
    pub fn take_speed(&mut self) -> Option<f64> {
        let text = std::mem::take(&mut self.speed_input);
        text.trim().parse::<f64>().ok()
    }

    pub fn chip_left(&mut self) {
        self.chip_index = self.chip_index.saturating_sub(1);
    }

    pub fn chip_right(&mut self, count: usize) {
        if count > 0 {
            self.chip_index = (self.chip_index + 1).min(count - 1);
        }
    }

    pub fn chip_value(&self, selection: &SelectionState) -> Option<f64> {
        selection
            .speed_stats()?
            .common_speeds
            .get(self.chip_index)
            .copied()
    }

    /// Map a click position to a sidebar element, using the rects from
    /// the last render.
    pub fn hit(&self, x: u16, y: u16) -> Option<SelectorHit> {
        let pos = Position { x, y };
        let areas = &self.areas;
        for (rect, hit) in [
            (areas.pump_list, SelectorHit::PumpItem(0)),
            (areas.stage_list, SelectorHit::StageItem(0)),
            (areas.test_type_list, SelectorHit::TestTypeItem(0)),
        ] {
            if rect.contains(pos) {
                let row = (y - rect.y) as usize;
                return Some(match hit {
                    SelectorHit::PumpItem(_) => SelectorHit::PumpItem(row),
                    SelectorHit::StageItem(_) => SelectorHit::StageItem(row),
                    _ => SelectorHit::TestTypeItem(row),
                });
            }
        }
        if areas.speed_input.contains(pos) {
            return Some(SelectorHit::SpeedInput);
        }
        if areas.chips.contains(pos) {
            let mut cursor = areas.chips.x;
            for i in 0..areas.chip_count {
                let w = areas.chip_widths[i];
                if x >= cursor && x < cursor + w {
                    return Some(SelectorHit::Chip(i));
                }
                cursor += w + 1;
            }
        }
        None
    }
}

fn sync_one(state: &mut ListState, options: &[String], selected: Option<&str>) {
    if options.is_empty() {
        state.select(None);
        return;
    }
    let index = selected
        .and_then(|value| options.iter().position(|o| o == value))
        .unwrap_or(0);
    state.select(Some(index));
}

/// Render the sidebar into `area`. Records element rects on the state
/// for mouse hit-testing.
pub fn render_selector(
    area: Rect,
    buf: &mut Buffer,
    state: &mut SelectorState,
    selection: &SelectionState,
    theme: &Theme,
    focus: Focus,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(4),    // Pump list
            Constraint::Min(4),    // Stage list
            Constraint::Min(4),    // Test type list
            Constraint::Length(7), // Speed editor
        ])
        .split(area);

    state.areas.pump_list = render_option_list(
        rows[0],
        buf,
        " Pump Type ",
        selection.pumps(),
        selection.pump(),
        &mut state.pump_list,
        theme,
        focus == Focus::PumpList,
    );
    state.areas.stage_list = render_option_list(
        rows[1],
        buf,
        " Stage ",
        selection.stages(),
        selection.stage(),
        &mut state.stage_list,
        theme,
        focus == Focus::StageList,
    );
    state.areas.test_type_list = render_option_list(
        rows[2],
        buf,
        " Test Type ",
        selection.test_types(),
        selection.test_type(),
        &mut state.test_type_list,
        theme,
        focus == Focus::TestTypeList,
    );

    render_speed_editor(rows[3], buf, state, selection, theme, focus);
}

#[allow(clippy::too_many_arguments)]
fn render_option_list(
    area: Rect,
    buf: &mut Buffer,
    title: &str,
    options: &[String],
    selected: Option<&str>,
    list_state: &mut ListState,
    theme: &Theme,
    focused: bool,
) -> Rect {
    let border = if focused {
        theme.get("sidebar_border_active")
    } else {
        theme.get("sidebar_border")
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title);
    let inner = block.inner(area);
    block.render(area, buf);

    if options.is_empty() {
        Paragraph::new("—")
            .style(Style::default().fg(theme.get("dimmed")))
            .render(inner, buf);
        return inner;
    }

    let items: Vec<ListItem> = options
        .iter()
        .map(|name| {
            let committed = selected == Some(name.as_str());
            let marker = if committed { "● " } else { "  " };
            let style = if committed {
                Style::default().fg(theme.get("table_selected"))
            } else {
                Style::default().fg(theme.get("text_secondary"))
            };
            ListItem::new(Line::from(Span::styled(
                format!("{}{}", marker, name),
                style,
            )))
        })
        .collect();
    let list = List::new(items).highlight_style(
        Style::default()
            .fg(theme.get("text_primary"))
            .add_modifier(Modifier::BOLD),
    );
    StatefulWidget::render(list, inner, buf, list_state);
    inner
}

fn render_speed_editor(
    area: Rect,
    buf: &mut Buffer,
    state: &mut SelectorState,
    selection: &SelectionState,
    theme: &Theme,
    focus: Focus,
) {
    let focused = focus == Focus::SpeedInput || focus == Focus::SpeedChips;
    let border = if focused {
        theme.get("sidebar_border_active")
    } else {
        theme.get("sidebar_border")
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(" Rated Speed (RPM) ");
    let inner = block.inner(area);
    block.render(area, buf);

    let lines = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Input
            Constraint::Length(1), // min/avg/max
            Constraint::Length(1), // Chips
        ])
        .split(inner);

    // Input row: current value, with the edit buffer overlaid while typing
    let input_text = if state.speed_input.is_empty() {
        format!("{}", selection.rated_speed())
    } else {
        format!("{}▏", state.speed_input)
    };
    let input_style = if focus == Focus::SpeedInput {
        Style::default().fg(theme.get("text_primary"))
    } else {
        Style::default().fg(theme.get("text_secondary"))
    };
    Paragraph::new(input_text).style(input_style).render(lines[0], buf);
    state.areas.speed_input = lines[0];

    // Stats row
    let stats_text = match selection.speed_stats() {
        Some(stats) => format!(
            "min {:.0}  avg {:.0}  max {:.0}",
            stats.min_speed, stats.avg_speed, stats.max_speed
        ),
        None => String::new(),
    };
    Paragraph::new(stats_text)
        .style(Style::default().fg(theme.get("dimmed")))
        .render(lines[1], buf);

    // Common-speed chips
    state.areas.chips = lines[2];
    state.areas.chip_count = 0;
    if let Some(stats) = selection.speed_stats() {
        let mut x = lines[2].x;
        for (i, speed) in stats.common_speeds.iter().take(8).enumerate() {
            let label = format!("{:.0}", speed);
            let w = label.chars().count() as u16;
            if x + w > lines[2].x + lines[2].width {
                break;
            }
            let picked = focus == Focus::SpeedChips && i == state.chip_index;
            let style = if picked {
                Style::default()
                    .fg(theme.get("background"))
                    .bg(theme.get("chart_highlight"))
            } else {
                Style::default().fg(theme.get("text_secondary"))
            };
            let rect = Rect {
                x,
                y: lines[2].y,
                width: w,
                height: 1,
            };
            Paragraph::new(Span::styled(label, style)).render(rect, buf);
            state.areas.chip_widths[i] = w;
            state.areas.chip_count = i + 1;
            x += w + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn list_navigation_clamps_to_bounds() {
        let mut state = SelectorState::new();
        state.pump_list.select(Some(0));
        state.list_up(Focus::PumpList);
        assert_eq!(state.pump_list.selected(), Some(0));
        state.list_down(Focus::PumpList, 3);
        state.list_down(Focus::PumpList, 3);
        state.list_down(Focus::PumpList, 3);
        assert_eq!(state.pump_list.selected(), Some(2));
        state.list_down(Focus::PumpList, 0);
        assert_eq!(state.pump_list.selected(), Some(2));
    }

    #[test]
    fn highlight_tracks_committed_selection_after_refresh() {
        let mut state = SelectorState::new();
        let mut sel = SelectionState::new(3000.0);
        sel.set_pump_options(ids(&["P1", "P2", "P3"]));
        sel.set_pump("P2");
        state.sync_highlights(&sel);
        assert_eq!(state.pump_list.selected(), Some(1));
        // Empty descendant lists clear their highlight
        assert_eq!(state.stage_list.selected(), None);
    }

    #[test]
    fn speed_input_accepts_numeric_only() {
        let mut state = SelectorState::new();
        for c in "2x9.5y0".chars() {
            state.push_speed_char(c);
        }
        assert_eq!(state.speed_input, "29.50");
        assert_eq!(state.take_speed(), Some(29.5));
        assert!(state.speed_input.is_empty());
        assert_eq!(state.take_speed(), None);
    }

    #[test]
    fn chip_navigation_clamps() {
        let mut state = SelectorState::new();
        state.chip_left();
        assert_eq!(state.chip_index, 0);
        state.chip_right(3);
        state.chip_right(3);
        state.chip_right(3);
        assert_eq!(state.chip_index, 2);
        state.chip_right(0);
        assert_eq!(state.chip_index, 2);
    }
}
