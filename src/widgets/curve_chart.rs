//! Flow/head curve chart: efficiency-banded scatter marks over a line,
//! with a highlight overlay for the picked record and click-to-record
//! hit testing.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    symbols,
    text::Span,
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget},
};

use crate::config::Theme;
use crate::dataset::CurveDataset;

const EFFICIENCY_BANDS: usize = 5;

/// One chart mark, carrying the dataset index it was built from. The
/// index is the correlation key for clicks; the coordinates are only
/// for drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveMark {
    pub x: f64,
    pub y: f64,
    pub index: usize,
    pub efficiency: f64,
}

/// Build the marks for a dataset, one per record, paired with its index.
pub fn marks(dataset: &CurveDataset) -> Vec<CurveMark> {
    dataset
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| CurveMark {
            x: record.flow,
            y: record.head,
            index,
            efficiency: record.efficiency,
        })
        .collect()
}

/// Geometry of the last render, kept for mouse hit testing. The plot
/// rect excludes the axis label gutters, so a cell maps linearly onto
/// the data bounds.
#[derive(Debug, Default, Clone)]
pub struct CurveChartState {
    plot: Rect,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    marks: Vec<CurveMark>,
}

impl CurveChartState {
    /// Map a click to the nearest mark within a small cell tolerance.
    pub fn hit_test(&self, column: u16, row: u16) -> Option<&CurveMark> {
        if self.plot.width == 0 || self.plot.height == 0 || self.marks.is_empty() {
            return None;
        }
        if column < self.plot.x
            || column >= self.plot.x + self.plot.width
            || row < self.plot.y
            || row >= self.plot.y + self.plot.height
        {
            return None;
        }

        let x_span = self.x_bounds[1] - self.x_bounds[0];
        let y_span = self.y_bounds[1] - self.y_bounds[0];
        if x_span <= 0.0 || y_span <= 0.0 {
            return None;
        }

        // Cell position of each mark, same mapping the chart uses
        let to_cell = |mark: &CurveMark| {
            let cx = (mark.x - self.x_bounds[0]) / x_span * (self.plot.width - 1) as f64;
            let cy = (1.0 - (mark.y - self.y_bounds[0]) / y_span) * (self.plot.height - 1) as f64;
            (self.plot.x as f64 + cx, self.plot.y as f64 + cy)
        };

        let mut best: Option<(&CurveMark, f64)> = None;
        for mark in &self.marks {
            let (cx, cy) = to_cell(mark);
            let dx = cx - column as f64;
            let dy = cy - row as f64;
            let dist = dx * dx + dy * dy;
            if best.map(|(_, d)| dist < d).unwrap_or(true) {
                best = Some((mark, dist));
            }
        }
        // 2-cell radius; clicks in empty chart space select nothing
        best.filter(|(_, dist)| *dist <= 4.0).map(|(mark, _)| mark)
    }
}

/// Which efficiency band a mark falls into, 0..EFFICIENCY_BANDS.
fn band(efficiency: f64, range: [f64; 2]) -> usize {
    let span = range[1] - range[0];
    if span <= 0.0 {
        return 0;
    }
    let t = ((efficiency - range[0]) / span).clamp(0.0, 1.0);
    ((t * EFFICIENCY_BANDS as f64) as usize).min(EFFICIENCY_BANDS - 1)
}

/// Render the curve for `dataset` into `area`, updating `state` for hit
/// testing. `highlighted` is the dataset index of the picked record.
pub fn render_curve_chart(
    area: Rect,
    buf: &mut Buffer,
    state: &mut CurveChartState,
    dataset: &CurveDataset,
    highlighted: Option<usize>,
    theme: &Theme,
) {
    let Some((x_bounds, y_bounds)) = padded_bounds(dataset) else {
        state.plot = Rect::default();
        state.marks.clear();
        Paragraph::new("No data points for this selection")
            .style(Style::default().fg(theme.get("text_secondary")))
            .centered()
            .render(area, buf);
        return;
    };
    let eff_range = dataset.efficiency_range().unwrap_or([0.0, 0.0]);

    state.marks = marks(dataset);
    state.x_bounds = x_bounds;
    state.y_bounds = y_bounds;

    let line_points: Vec<(f64, f64)> = state.marks.iter().map(|m| (m.x, m.y)).collect();

    // One scatter dataset per efficiency band so marks get band colors
    let mut band_points: Vec<Vec<(f64, f64)>> = vec![Vec::new(); EFFICIENCY_BANDS];
    for mark in &state.marks {
        band_points[band(mark.efficiency, eff_range)].push((mark.x, mark.y));
    }

    let highlight_point: Vec<(f64, f64)> = highlighted
        .and_then(|index| state.marks.iter().find(|m| m.index == index))
        .map(|m| vec![(m.x, m.y)])
        .unwrap_or_default();

    let band_colors = [
        "chart_eff_1",
        "chart_eff_2",
        "chart_eff_3",
        "chart_eff_4",
        "chart_eff_5",
    ];

    let mut datasets = vec![Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(theme.get("chart_line")))
        .data(&line_points)];
    for (points, color_key) in band_points.iter().zip(band_colors) {
        if points.is_empty() {
            continue;
        }
        datasets.push(
            Dataset::default()
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(theme.get(color_key)))
                .data(points),
        );
    }
    if !highlight_point.is_empty() {
        datasets.push(
            Dataset::default()
                .marker(symbols::Marker::Block)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(theme.get("chart_highlight")))
                .data(&highlight_point),
        );
    }

    let axis_style = Style::default().fg(theme.get("text_primary"));
    let x_labels = axis_labels(x_bounds, axis_style);
    let y_labels = axis_labels(y_bounds, axis_style);
    // Widest y label plus a space is the gutter the chart reserves
    let y_gutter = y_labels
        .iter()
        .map(|s| s.content.chars().count() as u16)
        .max()
        .unwrap_or(0)
        + 1;

    let x_axis = Axis::default()
        .title("Flow")
        .bounds(x_bounds)
        .style(axis_style)
        .labels(x_labels);
    let y_axis = Axis::default()
        .title("Head")
        .bounds(y_bounds)
        .style(axis_style)
        .labels(y_labels);

    Chart::new(datasets)
        .x_axis(x_axis)
        .y_axis(y_axis)
        .render(area, buf);

    // Plot rect for hit testing: chart area minus the y-label gutter on
    // the left and the x-axis row at the bottom
    state.plot = Rect {
        x: area.x + y_gutter,
        y: area.y,
        width: area.width.saturating_sub(y_gutter),
        height: area.height.saturating_sub(2),
    };
}

fn axis_labels(bounds: [f64; 2], style: Style) -> Vec<Span<'static>> {
    vec![
        Span::styled(format_axis_label(bounds[0]), style),
        Span::styled(format_axis_label((bounds[0] + bounds[1]) / 2.0), style),
        Span::styled(format_axis_label(bounds[1]), style),
    ]
}

fn format_axis_label(v: f64) -> String {
    if v.abs() >= 1e6 || (v.abs() < 1e-2 && v != 0.0) {
        format!("{:.2e}", v)
    } else {
        format!("{:.1}", v)
    }
}

/// Data bounds with a 5% margin so edge marks do not sit on the axes.
/// Degenerate spans get a fixed margin instead.
fn padded_bounds(dataset: &CurveDataset) -> Option<([f64; 2], [f64; 2])> {
    let (x, y) = dataset.bounds()?;
    Some((pad(x), pad(y)))
}

fn pad(bounds: [f64; 2]) -> [f64; 2] {
    let span = bounds[1] - bounds[0];
    let margin = if span > 0.0 { span * 0.05 } else { 0.5 };
    [bounds[0] - margin, bounds[1] + margin]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CurvePoint, CurveResponse};

    fn dataset(points: &[(f64, f64, f64)]) -> CurveDataset {
        CurveDataset::from_response(CurveResponse {
            pump_type: "P1".to_string(),
            stage: "S1".to_string(),
            test_type: "T1".to_string(),
            rated_speed: 2950.0,
            data_points: points
                .iter()
                .map(|&(flow, head, efficiency)| CurvePoint {
                    flow,
                    head,
                    efficiency,
                    power: 0.0,
                    impeller_dia: None,
                    all_data: Default::default(),
                })
                .collect(),
        })
    }

    #[test]
    fn marks_pair_each_record_with_its_index() {
        let ds = dataset(&[(10.0, 50.0, 55.0), (20.0, 40.0, 65.0), (15.0, 45.0, 60.0)]);
        let marks = marks(&ds);
        assert_eq!(marks.len(), 3);
        for (i, mark) in marks.iter().enumerate() {
            assert_eq!(mark.index, i);
            let record = ds.get(i).unwrap();
            assert_eq!(mark.x, record.flow);
            assert_eq!(mark.y, record.head);
        }
    }

    #[test]
    fn banding_spans_the_efficiency_range() {
        assert_eq!(band(50.0, [50.0, 70.0]), 0);
        assert_eq!(band(70.0, [50.0, 70.0]), EFFICIENCY_BANDS - 1);
        assert_eq!(band(60.0, [50.0, 70.0]), 2);
        // Flat range collapses to the first band
        assert_eq!(band(60.0, [60.0, 60.0]), 0);
    }

    #[test]
    fn hit_test_finds_nearest_mark_index() {
        let ds = dataset(&[(0.0, 0.0, 50.0), (10.0, 10.0, 60.0)]);
        let state = CurveChartState {
            plot: Rect::new(0, 0, 21, 11),
            x_bounds: [0.0, 10.0],
            y_bounds: [0.0, 10.0],
            marks: marks(&ds),
        };
        // Mark 0 at data (0,0) renders bottom-left, mark 1 top-right
        assert_eq!(state.hit_test(0, 10).map(|m| m.index), Some(0));
        assert_eq!(state.hit_test(20, 0).map(|m| m.index), Some(1));
        // Center of the plot is farther than the tolerance from both
        assert!(state.hit_test(10, 5).is_none());
    }

    #[test]
    fn hit_test_outside_plot_is_none() {
        let ds = dataset(&[(0.0, 0.0, 50.0)]);
        let state = CurveChartState {
            plot: Rect::new(5, 5, 10, 10),
            x_bounds: [0.0, 1.0],
            y_bounds: [0.0, 1.0],
            marks: marks(&ds),
        };
        assert!(state.hit_test(0, 0).is_none());
        assert!(state.hit_test(50, 50).is_none());
    }
}
