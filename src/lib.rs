//! pumptui: a terminal explorer for pump performance test curves.
//!
//! The application is a single event loop fed by an mpsc channel.
//! Terminal input and completed catalog lookups both arrive as
//! `AppEvent`s; `App::event` processes one event at a time and may
//! return a follow-up event to feed back into the channel. Catalog
//! lookups run on worker threads (see `fetch`) so the loop never
//! blocks on the network.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod correlate;
pub mod dataset;
pub mod fetch;
pub mod resolver;
pub mod selection;
pub mod widgets;

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, Borders, Paragraph, Widget},
};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use catalog::{CatalogReply, CatalogRequest, PumpCatalog};
pub use config::{AppConfig, ConfigManager, Theme};
use correlate::PointCorrelator;
use dataset::CurveDataset;
use fetch::{Fetcher, RequestTracker};
use resolver::{Advisory, ErrorScope, ReplyAction};
use selection::SelectionState;
use widgets::controls::Controls;
use widgets::curve_chart::{render_curve_chart, CurveChartState};
use widgets::debug::DebugState;
use widgets::detail::{render_detail, DetailModal};
use widgets::record_table::{render_record_table, RecordTableState};
use widgets::selector::{render_selector, SelectorHit, SelectorState};

pub const APP_NAME: &str = "pumptui";

const SIDEBAR_WIDTH: u16 = 34;

pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
    /// Kick off the initial pumps enumeration.
    Connect,
    /// A catalog lookup completed on a worker thread.
    Catalog(CatalogReply),
    Exit,
    Crash(String),
}

impl std::fmt::Debug for AppEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppEvent::Key(k) => write!(f, "Key({:?})", k.code),
            AppEvent::Mouse(_) => write!(f, "Mouse"),
            AppEvent::Resize(c, r) => write!(f, "Resize({}, {})", c, r),
            AppEvent::Connect => write!(f, "Connect"),
            AppEvent::Catalog(reply) => write!(f, "Catalog({:?})", reply.request),
            AppEvent::Exit => write!(f, "Exit"),
            AppEvent::Crash(msg) => write!(f, "Crash({})", msg),
        }
    }
}

/// Which pane keyboard input is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    PumpList,
    StageList,
    TestTypeList,
    SpeedInput,
    SpeedChips,
    RecordTable,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::PumpList => Focus::StageList,
            Focus::StageList => Focus::TestTypeList,
            Focus::TestTypeList => Focus::SpeedInput,
            Focus::SpeedInput => Focus::SpeedChips,
            Focus::SpeedChips => Focus::RecordTable,
            Focus::RecordTable => Focus::PumpList,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::PumpList => Focus::RecordTable,
            Focus::StageList => Focus::PumpList,
            Focus::TestTypeList => Focus::StageList,
            Focus::SpeedInput => Focus::TestTypeList,
            Focus::SpeedChips => Focus::SpeedInput,
            Focus::RecordTable => Focus::SpeedChips,
        }
    }
}

/// Session options resolved from CLI args and config, with CLI args
/// taking precedence.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub url: String,
    pub fallback_speed: f64,
    pub timeout_secs: u64,
    pub debug: bool,
}

impl SessionOptions {
    pub fn from_args_and_config(args: &cli::Args, config: &AppConfig) -> Self {
        Self {
            url: args.url.clone().unwrap_or_else(|| config.service.url.clone()),
            fallback_speed: args.speed.unwrap_or(config.speed.fallback_rpm),
            timeout_secs: args.timeout.unwrap_or(config.service.timeout_secs),
            debug: args.debug,
        }
    }
}

pub struct App {
    events: Sender<AppEvent>,
    fetcher: Fetcher,
    tracker: RequestTracker,
    selection: SelectionState,
    dataset: Option<CurveDataset>,
    correlator: PointCorrelator,
    advisory: Option<Advisory>,
    focus: Focus,
    selector: SelectorState,
    chart: CurveChartState,
    table: RecordTableState,
    detail: DetailModal,
    debug: DebugState,
    theme: Theme,
    /// Full terminal area from the last render, for keyboard-opened
    /// popups that need an anchor.
    screen: Rect,
}

impl App {
    pub fn new(
        events: Sender<AppEvent>,
        catalog: Arc<dyn PumpCatalog>,
        config: &AppConfig,
        options: &SessionOptions,
    ) -> Result<Self> {
        let theme = Theme::from_config(&config.theme)?;
        Ok(Self {
            fetcher: Fetcher::new(catalog, events.clone()),
            events,
            tracker: RequestTracker::new(),
            selection: SelectionState::new(options.fallback_speed),
            dataset: None,
            correlator: PointCorrelator::new(),
            advisory: None,
            focus: Focus::PumpList,
            selector: SelectorState::new(),
            chart: CurveChartState::default(),
            table: RecordTableState::new(),
            detail: DetailModal::new(),
            debug: DebugState::new(options.debug),
            theme,
            screen: Rect::default(),
        })
    }

    pub fn send_event(&mut self, event: AppEvent) -> Result<()> {
        self.events.send(event)?;
        Ok(())
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn dataset(&self) -> Option<&CurveDataset> {
        self.dataset.as_ref()
    }

    pub fn highlighted_index(&self) -> Option<usize> {
        self.correlator.highlighted_index()
    }

    pub fn advisory(&self) -> Option<&Advisory> {
        self.advisory.as_ref()
    }

    pub fn detail_open(&self) -> bool {
        self.detail.active
    }

    pub fn loading(&self) -> bool {
        self.tracker.loading()
    }

    /// Process one event. The returned event, if any, is fed back into
    /// the channel by the caller.
    pub fn event(&mut self, event: &AppEvent) -> Option<AppEvent> {
        self.debug.num_events += 1;
        match event {
            AppEvent::Key(key) => self.key(key),
            AppEvent::Mouse(mouse) => self.mouse(mouse),
            AppEvent::Resize(_, _) => None,
            AppEvent::Connect => {
                self.issue(CatalogRequest::Pumps);
                None
            }
            AppEvent::Catalog(reply) => self.catalog_reply(reply.clone()),
            AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn key(&mut self, key: &KeyEvent) -> Option<AppEvent> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        self.debug.on_key(key.code);

        // The popup captures input while open
        if self.detail.active {
            match key.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => self.dismiss_detail(),
                KeyCode::Up => self.detail.scroll_up(),
                KeyCode::Down => self.detail.scroll_down(),
                _ => {}
            }
            return None;
        }

        match key.code {
            KeyCode::Char('q') if self.focus != Focus::SpeedInput => {
                return Some(AppEvent::Exit);
            }
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return None;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.prev();
                return None;
            }
            KeyCode::Char('r') if self.focus != Focus::SpeedInput => {
                self.focus = Focus::SpeedInput;
                return None;
            }
            _ => {}
        }

        match self.focus {
            Focus::PumpList | Focus::StageList | Focus::TestTypeList => match key.code {
                KeyCode::Up => self.selector.list_up(self.focus),
                KeyCode::Down => {
                    let len = self.focused_options().len();
                    self.selector.list_down(self.focus, len);
                }
                KeyCode::Enter => self.commit_focused_list(),
                _ => {}
            },
            Focus::SpeedInput => match key.code {
                KeyCode::Char(c) => self.selector.push_speed_char(c),
                KeyCode::Backspace => self.selector.backspace_speed(),
                KeyCode::Esc => self.selector.speed_input.clear(),
                KeyCode::Enter => {
                    if let Some(speed) = self.selector.take_speed() {
                        let plan = resolver::set_rated_speed(&mut self.selection, speed);
                        self.apply_plan(plan);
                    }
                }
                _ => {}
            },
            Focus::SpeedChips => match key.code {
                KeyCode::Left => self.selector.chip_left(),
                KeyCode::Right => {
                    let count = self
                        .selection
                        .speed_stats()
                        .map(|s| s.common_speeds.len())
                        .unwrap_or(0);
                    self.selector.chip_right(count);
                }
                KeyCode::Enter => {
                    if let Some(speed) = self.selector.chip_value(&self.selection) {
                        let plan = resolver::set_rated_speed(&mut self.selection, speed);
                        self.apply_plan(plan);
                    }
                }
                _ => {}
            },
            Focus::RecordTable => match key.code {
                KeyCode::Up => {
                    self.table.up();
                    self.correlate_table_cursor();
                }
                KeyCode::Down => {
                    let len = self.dataset.as_ref().map(|d| d.len()).unwrap_or(0);
                    self.table.down(len);
                    self.correlate_table_cursor();
                }
                KeyCode::Enter => {
                    if self.correlator.highlighted().is_some() {
                        let anchor = (self.screen.width / 2, self.screen.height / 3);
                        self.detail.open(anchor);
                    }
                }
                _ => {}
            },
        }
        None
    }

    fn mouse(&mut self, mouse: &MouseEvent) -> Option<AppEvent> {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.detail.active {
                    self.dismiss_detail();
                    return None;
                }
                self.click(mouse.column, mouse.row);
            }
            MouseEventKind::ScrollUp if self.detail.active => self.detail.scroll_up(),
            MouseEventKind::ScrollDown if self.detail.active => self.detail.scroll_down(),
            _ => {}
        }
        None
    }

    fn click(&mut self, column: u16, row: u16) {
        if let Some(hit) = self.selector.hit(column, row) {
            match hit {
                SelectorHit::PumpItem(r) => {
                    self.focus = Focus::PumpList;
                    let index = self.selector.pump_list.offset() + r;
                    if let Some(pump) = self.selection.pumps().get(index).cloned() {
                        let plan = resolver::select_pump(&mut self.selection, &pump);
                        self.apply_plan(plan);
                    }
                }
                SelectorHit::StageItem(r) => {
                    self.focus = Focus::StageList;
                    let index = self.selector.stage_list.offset() + r;
                    if let Some(stage) = self.selection.stages().get(index).cloned() {
                        let plan = resolver::select_stage(&mut self.selection, &stage);
                        self.apply_plan(plan);
                    }
                }
                SelectorHit::TestTypeItem(r) => {
                    self.focus = Focus::TestTypeList;
                    let index = self.selector.test_type_list.offset() + r;
                    if let Some(tt) = self.selection.test_types().get(index).cloned() {
                        let plan = resolver::select_test_type(&mut self.selection, &tt);
                        self.apply_plan(plan);
                    }
                }
                SelectorHit::SpeedInput => self.focus = Focus::SpeedInput,
                SelectorHit::Chip(i) => {
                    self.focus = Focus::SpeedChips;
                    self.selector.chip_index = i;
                    if let Some(speed) = self.selector.chip_value(&self.selection) {
                        let plan = resolver::set_rated_speed(&mut self.selection, speed);
                        self.apply_plan(plan);
                    }
                }
            }
            return;
        }

        // Chart mark click: the mark's paired index is the correlation key
        if let Some(mark) = self.chart.hit_test(column, row).copied() {
            if self
                .correlator
                .select_from_mark(self.dataset.as_ref(), (mark.x, mark.y), mark.index)
            {
                self.table.select(Some(mark.index));
                self.detail.open((column, row));
            }
            return;
        }

        let len = self.dataset.as_ref().map(|d| d.len()).unwrap_or(0);
        if let Some(index) = self.table.row_at(column, row, len) {
            self.focus = Focus::RecordTable;
            if self.correlator.select_by_index(self.dataset.as_ref(), index) {
                self.table.select(Some(index));
            }
        }
    }

    fn focused_options(&self) -> &[String] {
        match self.focus {
            Focus::PumpList => self.selection.pumps(),
            Focus::StageList => self.selection.stages(),
            Focus::TestTypeList => self.selection.test_types(),
            _ => &[],
        }
    }

    fn commit_focused_list(&mut self) {
        let value = match self.focus {
            Focus::PumpList => self
                .selector
                .highlighted(Focus::PumpList, self.selection.pumps())
                .map(str::to_string),
            Focus::StageList => self
                .selector
                .highlighted(Focus::StageList, self.selection.stages())
                .map(str::to_string),
            Focus::TestTypeList => self
                .selector
                .highlighted(Focus::TestTypeList, self.selection.test_types())
                .map(str::to_string),
            _ => None,
        };
        let Some(value) = value else {
            return;
        };
        let plan = match self.focus {
            Focus::PumpList => resolver::select_pump(&mut self.selection, &value),
            Focus::StageList => resolver::select_stage(&mut self.selection, &value),
            Focus::TestTypeList => resolver::select_test_type(&mut self.selection, &value),
            _ => return,
        };
        self.apply_plan(plan);
    }

    fn apply_plan(&mut self, plan: resolver::Plan) {
        if plan.clear_dataset {
            self.dataset = None;
            self.correlator.clear();
            self.detail.close();
            self.table.select(None);
        }
        if !plan.requests.is_empty() {
            self.advisory = None;
        }
        for request in plan.requests {
            self.issue(request);
        }
        self.selector.sync_highlights(&self.selection);
    }

    fn issue(&mut self, request: CatalogRequest) {
        self.debug.num_requests += 1;
        self.tracker.issued(&request);
        self.fetcher.dispatch(request);
    }

    fn catalog_reply(&mut self, reply: CatalogReply) -> Option<AppEvent> {
        // The in-flight count tracks arrivals, stale or not
        self.tracker.arrived(&reply.request);
        if !resolver::is_current(&reply.request, &self.selection) {
            self.debug.num_stale += 1;
            return None;
        }

        match resolver::apply_reply(&mut self.selection, reply) {
            ReplyAction::ReplaceDataset(response) => self.replace_dataset(response),
            ReplyAction::Dispatch(requests) => {
                for request in requests {
                    self.issue(request);
                }
            }
            ReplyAction::Surface(advisory) => {
                // A failed curve fetch never leaves a dataset on screen
                if advisory.scope == ErrorScope::Curve {
                    self.dataset = None;
                    self.correlator.clear();
                    self.detail.close();
                    self.table.select(None);
                }
                self.advisory = Some(advisory);
            }
            ReplyAction::Settled => {}
        }
        self.selector.sync_highlights(&self.selection);
        None
    }

    /// Wholesale dataset replacement. Indices from the old dataset die
    /// with it, so everything keyed on them is reset.
    fn replace_dataset(&mut self, response: catalog::CurveResponse) {
        let dataset = CurveDataset::from_response(response);
        self.correlator.clear();
        self.detail.close();
        self.table
            .select(if dataset.is_empty() { None } else { Some(0) });
        if self
            .advisory
            .as_ref()
            .is_some_and(|a| a.scope == ErrorScope::Curve)
        {
            self.advisory = None;
        }
        self.dataset = Some(dataset);
    }

    /// Dismissal clears the highlight along with the popup; the
    /// dataset and selection are untouched.
    fn dismiss_detail(&mut self) {
        self.detail.close();
        self.correlator.clear();
    }

    fn correlate_table_cursor(&mut self) {
        if let Some(index) = self.table.selected() {
            self.correlator.select_by_index(self.dataset.as_ref(), index);
        }
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.debug.num_frames += 1;
        self.screen = area;

        Block::default()
            .style(Style::default().bg(self.theme.get("background")))
            .render(area, buf);

        let mut constraints = vec![];
        if self.advisory.is_some() {
            constraints.push(Constraint::Length(1));
        }
        constraints.push(Constraint::Fill(1));
        constraints.push(Constraint::Length(1)); // Controls
        if self.debug.enabled {
            constraints.push(Constraint::Length(1));
        }
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let mut idx = 0;
        if let Some(advisory) = &self.advisory {
            Paragraph::new(advisory.message.as_str())
                .style(
                    Style::default()
                        .fg(self.theme.get("background"))
                        .bg(self.theme.get("error")),
                )
                .render(layout[idx], buf);
            idx += 1;
        }
        let main_area = layout[idx];
        let controls_area = layout[idx + 1];

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Fill(1)])
            .split(main_area);

        render_selector(
            columns[0],
            buf,
            &mut self.selector,
            &self.selection,
            &self.theme,
            self.focus,
        );

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Fill(2), Constraint::Fill(1)])
            .split(columns[1]);

        // Header line: the resolved tuple, plus the loading indicator
        let header = match &self.dataset {
            Some(dataset) if self.tracker.loading() => format!("{}  (updating…)", dataset.title()),
            Some(dataset) => dataset.title(),
            None if self.tracker.loading() => "Loading curve data…".to_string(),
            None => String::new(),
        };
        Paragraph::new(header)
            .style(
                Style::default()
                    .fg(self.theme.get("table_header"))
                    .bg(self.theme.get("controls_bg")),
            )
            .render(right[0], buf);

        match &self.dataset {
            Some(dataset) => {
                render_curve_chart(
                    right[1],
                    buf,
                    &mut self.chart,
                    dataset,
                    self.correlator.highlighted_index(),
                    &self.theme,
                );
                render_record_table(
                    right[2],
                    buf,
                    &mut self.table,
                    dataset,
                    self.correlator.highlighted_index(),
                    &self.theme,
                    self.focus == Focus::RecordTable,
                );
            }
            None => {
                self.chart = CurveChartState::default();
                let message = if self.tracker.loading() {
                    "Loading…"
                } else {
                    "Select a pump, stage, and test type to view a curve"
                };
                Paragraph::new(message)
                    .style(Style::default().fg(self.theme.get("text_secondary")))
                    .centered()
                    .render(right[1], buf);
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.get("sidebar_border")))
                    .title(" Test Points ")
                    .render(right[2], buf);
            }
        }

        Controls::new()
            .with_point_count(self.dataset.as_ref().map(|d| d.len()))
            .with_loading(self.tracker.loading())
            .render(controls_area, buf);

        if self.debug.enabled {
            self.debug.render(layout[idx + 2], buf);
        }

        // Popup renders last so it sits above everything else
        if self.detail.active {
            if let Some(record) = self.correlator.highlighted() {
                let record = record.clone();
                render_detail(area, buf, &mut self.detail, &record, &self.theme);
            }
        }
    }
}
