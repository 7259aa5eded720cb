//! Tabular view of the active dataset, one row per record in dataset
//! order. The cursor row is the same index the chart and detail popup
//! correlate on.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Cell, Row, StatefulWidget, Table, TableState, Widget},
};

use crate::config::Theme;
use crate::dataset::CurveDataset;

const COLUMNS: [&str; 5] = ["Flow", "Head", "Eff %", "Power", "Imp Dia"];

#[derive(Debug, Default)]
pub struct RecordTableState {
    pub table: TableState,
    /// Rect of the data rows from the last render, for click mapping.
    rows_area: Rect,
}

impl RecordTableState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<usize> {
        self.table.selected()
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.table.select(index);
        if index.is_none() {
            *self.table.offset_mut() = 0;
        }
    }

    pub fn up(&mut self) {
        if let Some(current) = self.table.selected() {
            self.table.select(Some(current.saturating_sub(1)));
        }
    }

    pub fn down(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let next = match self.table.selected() {
            Some(current) => (current + 1).min(len - 1),
            None => 0,
        };
        self.table.select(Some(next));
    }

    /// Dataset index of the row under a click, accounting for scroll
    /// offset. None for clicks outside the data rows or past the end.
    pub fn row_at(&self, x: u16, y: u16, len: usize) -> Option<usize> {
        let area = self.rows_area;
        if x < area.x || x >= area.x + area.width || y < area.y || y >= area.y + area.height {
            return None;
        }
        let index = self.table.offset() + (y - area.y) as usize;
        (index < len).then_some(index)
    }
}

/// Render the record table. `highlighted` marks the correlated row even
/// when the table itself is not focused.
pub fn render_record_table(
    area: Rect,
    buf: &mut Buffer,
    state: &mut RecordTableState,
    dataset: &CurveDataset,
    highlighted: Option<usize>,
    theme: &Theme,
    focused: bool,
) {
    let border = if focused {
        theme.get("sidebar_border_active")
    } else {
        theme.get("sidebar_border")
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(format!(" Test Points ({}) ", dataset.len()));
    let inner = block.inner(area);
    block.render(area, buf);

    let header = Row::new(COLUMNS.iter().map(|c| Cell::from(*c))).style(
        Style::default()
            .fg(theme.get("table_header"))
            .bg(theme.get("table_header_bg")),
    );

    let rows: Vec<Row> = dataset
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let dia = record
                .impeller_dia
                .map(|d| format!("{:.0}", d))
                .unwrap_or_else(|| "—".to_string());
            let row = Row::new(vec![
                Cell::from(format!("{:.2}", record.flow)),
                Cell::from(format!("{:.2}", record.head)),
                Cell::from(format!("{:.1}", record.efficiency)),
                Cell::from(format!("{:.2}", record.power)),
                Cell::from(dia),
            ]);
            if highlighted == Some(index) {
                row.style(
                    Style::default()
                        .fg(theme.get("table_highlight"))
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                row.style(Style::default().fg(theme.get("text_secondary")))
            }
        })
        .collect();

    let widths = [
        Constraint::Length(9),
        Constraint::Length(9),
        Constraint::Length(7),
        Constraint::Length(9),
        Constraint::Length(8),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .row_highlight_style(
            Style::default()
                .fg(theme.get("table_selected"))
                .add_modifier(Modifier::REVERSED),
        );

    StatefulWidget::render(table, inner, buf, &mut state.table);

    // Data rows start one line below the header
    state.rows_area = Rect {
        x: inner.x,
        y: inner.y + 1,
        width: inner.width,
        height: inner.height.saturating_sub(1),
    };
}
