//! Terminal User Interface module using Ratatui.
//!
//! Two views over one dataset: the metrics browser (category and time-range
//! selectors driving a two-column grid of line charts) and the anomaly view,
//! which classifies a CSV with the stored models and shows the results table.

use std::io::{self, Stdout};
use std::path::Path;
use std::time::Duration;

use chrono::DateTime;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Cell, Chart, Clear, Dataset, GraphType, Paragraph, Row, Scrollbar,
        ScrollbarOrientation, ScrollbarState, Table, TableState, Tabs, Wrap,
    },
    Frame, Terminal,
};
use tracing::debug;

use crate::config::Config;
use crate::dashboard::{ChartColumn, ChartSpec, MetricsDashboard, TimeRange};
use crate::error::Result;
use crate::ml::predict::{predict_csv, PredictionReport};
use crate::ml::store::ModelStore;

/// Terminal type alias for convenience.
type Term = Terminal<CrosstermBackend<Stdout>>;

const SERIES_COLORS: [Color; 4] = [Color::Cyan, Color::Yellow, Color::Magenta, Color::Green];

/// Top-level views, switched with Tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Metrics,
    Anomaly,
}

impl View {
    const TITLES: [&'static str; 2] = ["Metrics", "Anomaly Detection"];

    fn index(self) -> usize {
        match self {
            Self::Metrics => 0,
            Self::Anomaly => 1,
        }
    }

    fn next(self) -> Self {
        match self {
            Self::Metrics => Self::Anomaly,
            Self::Anomaly => Self::Metrics,
        }
    }
}

/// Whether keystrokes go to the path input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// One-line feedback shown under the path input.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Status {
    message: String,
    is_error: bool,
}

/// UI state and configuration.
pub struct App {
    dashboard: MetricsDashboard,
    store: ModelStore,
    timestamp_column: String,
    ground_truth_column: String,
    time_format: String,
    view: View,
    /// Index into the taxonomy's categories.
    category: usize,
    /// Range start and end, as indices into the dashboard's time stops.
    start: usize,
    end: usize,
    /// Charts for the current selection, rebuilt on every change.
    charts: Vec<ChartSpec>,
    /// Problem with the current charts, shown above them.
    chart_warning: Option<String>,
    range_rows: usize,
    show_help: bool,
    running: bool,
    input: String,
    input_mode: InputMode,
    results: Option<PredictionReport>,
    /// Table selection state.
    table_state: TableState,
    /// Scrollbar state.
    scroll_state: ScrollbarState,
    status: Option<Status>,
}

impl App {
    pub fn new(dashboard: MetricsDashboard, store: ModelStore, config: &Config) -> Self {
        let end = dashboard.time_stops().len().saturating_sub(1);
        let mut app = Self {
            dashboard,
            store,
            timestamp_column: config.data.timestamp_column.clone(),
            ground_truth_column: config.prediction.ground_truth_column.clone(),
            time_format: config.dashboard.time_format.clone(),
            view: View::Metrics,
            category: 0,
            start: 0,
            end,
            charts: Vec::new(),
            chart_warning: None,
            range_rows: 0,
            show_help: false,
            running: true,
            input: String::new(),
            input_mode: InputMode::Normal,
            results: None,
            table_state: TableState::default(),
            scroll_state: ScrollbarState::default(),
            status: None,
        };
        app.refresh();
        app
    }

    /// Handles keyboard input.
    pub fn handle_key(&mut self, key: KeyCode) {
        if self.input_mode == InputMode::Editing {
            self.handle_editing_key(key);
            return;
        }

        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('?') => self.show_help = !self.show_help,
            KeyCode::Tab => self.view = self.view.next(),
            _ => match self.view {
                View::Metrics => self.handle_metrics_key(key),
                View::Anomaly => self.handle_anomaly_key(key),
            },
        }
    }

    fn handle_metrics_key(&mut self, key: KeyCode) {
        let categories = self.dashboard.taxonomy().categories.len();
        let last = self.dashboard.time_stops().len().saturating_sub(1);

        match key {
            KeyCode::Right | KeyCode::Char('l') if categories > 0 => {
                self.category = (self.category + 1) % categories;
            }
            KeyCode::Left | KeyCode::Char('h') if categories > 0 => {
                self.category = (self.category + categories - 1) % categories;
            }
            KeyCode::Char('[') => self.start = self.start.saturating_sub(1),
            KeyCode::Char(']') => self.start = (self.start + 1).min(self.end),
            KeyCode::Char('{') => self.end = self.end.saturating_sub(1).max(self.start),
            KeyCode::Char('}') => self.end = (self.end + 1).min(last),
            KeyCode::Char('r') => {
                self.start = 0;
                self.end = last;
            }
            _ => return,
        }
        self.refresh();
    }

    fn handle_anomaly_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('i') | KeyCode::Char('/') => self.input_mode = InputMode::Editing,
            KeyCode::Enter => self.run_prediction(),
            KeyCode::Down | KeyCode::Char('j') => self.next_row(),
            KeyCode::Up | KeyCode::Char('k') => self.prev_row(),
            KeyCode::Home => self.select_row(0),
            KeyCode::End => self.select_row(usize::MAX),
            _ => {}
        }
    }

    fn handle_editing_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                self.run_prediction();
            }
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }

    /// Classifies the CSV named in the input box. Failures land in the status line.
    fn run_prediction(&mut self) {
        let path = self.input.trim();
        if path.is_empty() {
            self.set_status("Enter the path of a CSV file to classify", true);
            return;
        }

        match predict_csv(
            Path::new(path),
            &self.store,
            &self.timestamp_column,
            &self.ground_truth_column,
        ) {
            Ok(report) => {
                let message = format!(
                    "Classified {} rows, {} with full agreement",
                    report.rows,
                    report.agreement()
                );
                self.scroll_state = ScrollbarState::new(report.rows);
                self.table_state = TableState::default();
                if report.rows > 0 {
                    self.table_state.select(Some(0));
                }
                self.results = Some(report);
                self.set_status(&message, false);
            }
            Err(e) => {
                debug!("Prediction failed: {:#}", e);
                self.set_status(&format!("{:#}", e), true);
            }
        }
    }

    fn set_status(&mut self, message: &str, is_error: bool) {
        self.status = Some(Status {
            message: message.to_string(),
            is_error,
        });
    }

    fn result_rows(&self) -> usize {
        self.results.as_ref().map_or(0, |r| r.rows)
    }

    fn next_row(&mut self) {
        let i = self.table_state.selected().map_or(0, |i| i + 1);
        self.select_row(i);
    }

    fn prev_row(&mut self) {
        let i = self.table_state.selected().map_or(0, |i| i.saturating_sub(1));
        self.select_row(i);
    }

    fn select_row(&mut self, i: usize) {
        let len = self.result_rows();
        if len == 0 {
            return;
        }
        let i = i.min(len - 1);
        self.table_state.select(Some(i));
        self.scroll_state = self.scroll_state.position(i);
    }

    fn category_name(&self) -> Option<String> {
        self.dashboard
            .taxonomy()
            .categories
            .get(self.category)
            .map(|c| c.name.clone())
    }

    /// The selected time range, or `None` for an empty dataset.
    pub fn range(&self) -> Option<TimeRange> {
        let stops = self.dashboard.time_stops();
        Some(TimeRange::new(*stops.get(self.start)?, *stops.get(self.end)?))
    }

    fn refresh(&mut self) {
        self.charts.clear();
        self.chart_warning = None;
        self.range_rows = 0;

        let (Some(range), Some(category)) = (self.range(), self.category_name()) else {
            return;
        };

        match self.dashboard.charts(&category, &range) {
            Ok(charts) => self.charts = charts,
            Err(e) => self.chart_warning = Some(format!("{:#}", e)),
        }
        let skipped = self.dashboard.unplottable(&category);
        if !skipped.is_empty() && self.chart_warning.is_none() {
            self.chart_warning = Some(format!("Not numeric, not plotted: {}", skipped.join(", ")));
        }
        self.range_rows = self
            .dashboard
            .filtered(&range)
            .map(|t| t.num_rows())
            .unwrap_or(0);
    }

    fn format_time(&self, secs: f64) -> String {
        DateTime::from_timestamp(secs as i64, 0)
            .map(|dt| dt.naive_utc().format(&self.time_format).to_string())
            .unwrap_or_default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Initializes the terminal for TUI rendering.
pub fn init_terminal() -> Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
pub fn restore_terminal(terminal: &mut Term) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Main UI rendering function.
pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // View
            Constraint::Length(2), // Footer
        ])
        .split(frame.area());

    render_header(frame, chunks[0], app);
    match app.view {
        View::Metrics => render_metrics(frame, chunks[1], app),
        View::Anomaly => render_anomaly(frame, chunks[1], app),
    }
    render_footer(frame, chunks[2], app);

    if app.show_help {
        render_help_overlay(frame);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let tabs = Tabs::new(View::TITLES.to_vec())
        .select(app.view.index())
        .highlight_style(Style::default().fg(Color::Yellow).bold())
        .block(
            Block::default()
                .title(Span::styled(
                    " NETMETRICS ",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );

    frame.render_widget(tabs, area);
}

fn render_metrics(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Selectors
            Constraint::Length(1), // Status
            Constraint::Min(6),    // Charts
        ])
        .split(area);

    let selectors = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    let categories = Tabs::new(app.dashboard.taxonomy().category_names())
        .select(app.category)
        .highlight_style(Style::default().fg(Color::Yellow).bold())
        .block(
            Block::default()
                .title(" Category ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        );
    frame.render_widget(categories, selectors[0]);

    let range_text = match app.range() {
        Some(range) => format!(
            "{} -> {}  ({} of {} rows{})",
            range.start.format(&app.time_format),
            range.end.format(&app.time_format),
            app.range_rows,
            app.dashboard.table().num_rows(),
            if Some(range) == app.dashboard.full_range() {
                ", full range"
            } else {
                ""
            }
        ),
        None => "No data".to_string(),
    };
    let range = Paragraph::new(range_text).block(
        Block::default()
            .title(" Time Range ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );
    frame.render_widget(range, selectors[1]);

    let status = match &app.chart_warning {
        Some(warning) => Paragraph::new(format!(" {}", warning)).style(Style::default().fg(Color::Red)),
        None => Paragraph::new(" [ ] move start, { } move end, r resets the range")
            .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(status, chunks[1]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);

    for (side, area) in [ChartColumn::Left, ChartColumn::Right].into_iter().zip(columns.iter()) {
        let charts: Vec<&ChartSpec> = app.charts.iter().filter(|c| c.column == side).collect();
        if charts.is_empty() {
            continue;
        }

        let slots = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Ratio(1, charts.len() as u32); charts.len()])
            .split(*area);

        for (chart, slot) in charts.into_iter().zip(slots.iter()) {
            render_chart(frame, *slot, app, chart);
        }
    }
}

fn render_chart(frame: &mut Frame, area: Rect, app: &App, chart: &ChartSpec) {
    let block = Block::default()
        .title(format!(" {} ", chart.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));

    let Some(([x0, x1], [y0, y1])) = chart.bounds() else {
        let empty = Paragraph::new("No data")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    };
    let (x1, y1) = (widen(x0, x1), widen(y0, y1));

    let datasets = chart
        .series
        .iter()
        .enumerate()
        .map(|(i, series)| {
            Dataset::default()
                .name(series.label.clone())
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(SERIES_COLORS[i % SERIES_COLORS.len()]))
                .data(&series.points)
        })
        .collect();

    let widget = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([x0, x1])
                .labels(vec![app.format_time(x0), app.format_time(x1)]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([y0, y1])
                .labels(vec![format_value(y0), format_value(y1)]),
        );

    frame.render_widget(widget, area);
}

/// Keeps a degenerate axis from collapsing to zero width.
fn widen(lo: f64, hi: f64) -> f64 {
    if hi > lo {
        hi
    } else {
        lo + 1.0
    }
}

fn render_anomaly(frame: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Path input
            Constraint::Length(1), // Status
            Constraint::Min(5),    // Results
        ])
        .split(area);

    let editing = app.input_mode == InputMode::Editing;
    let input = Paragraph::new(app.input.as_str())
        .style(if editing {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        })
        .block(
            Block::default()
                .title(" CSV file to classify ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::Blue })),
        );
    frame.render_widget(input, chunks[0]);
    if editing {
        frame.set_cursor_position((
            chunks[0].x + app.input.chars().count() as u16 + 1,
            chunks[0].y + 1,
        ));
    }

    let status = match &app.status {
        Some(status) => Paragraph::new(format!(" {}", status.message)).style(
            Style::default().fg(if status.is_error { Color::Red } else { Color::Green }),
        ),
        None => Paragraph::new(" Press i to enter a path, Enter to classify")
            .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(status, chunks[1]);

    render_results_table(frame, chunks[2], app);
}

fn render_results_table(frame: &mut Frame, area: Rect, app: &mut App) {
    let block = Block::default()
        .title(" Predictions ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));

    let Some(report) = &app.results else {
        frame.render_widget(block, area);
        return;
    };

    let headers = report.headers();
    let header = Row::new(
        std::iter::once("#".to_string())
            .chain(headers.iter().cloned())
            .map(|h| Cell::from(h).style(Style::default().fg(Color::Yellow).bold())),
    )
    .height(1)
    .bottom_margin(1);

    let rows: Vec<Row> = (0..report.rows)
        .map(|i| {
            let cells = report.row(i);
            let disagree = report.predictions.len() > 1
                && cells[..report.predictions.len()].windows(2).any(|w| w[0] != w[1]);
            let style = if disagree {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };

            Row::new(
                std::iter::once(Cell::from(i.to_string()))
                    .chain(cells.into_iter().map(|c| Cell::from(c.to_string()))),
            )
            .style(style)
        })
        .collect();

    let widths: Vec<Constraint> = std::iter::once(Constraint::Length(6))
        .chain(headers.iter().map(|_| Constraint::Min(12)))
        .collect();

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");

    frame.render_stateful_widget(table, area, &mut app.table_state);

    frame.render_stateful_widget(
        Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓")),
        area.inner(Margin {
            vertical: 1,
            horizontal: 0,
        }),
        &mut app.scroll_state,
    );
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let mut spans = vec![
        key(" q"),
        Span::raw(": Quit  "),
        key("Tab"),
        Span::raw(": View  "),
    ];
    match (app.view, app.input_mode) {
        (View::Metrics, _) => spans.extend([
            key("←/→"),
            Span::raw(": Category  "),
            key("[ ]"),
            Span::raw(": Start  "),
            key("{ }"),
            Span::raw(": End  "),
            key("r"),
            Span::raw(": Reset  "),
        ]),
        (View::Anomaly, InputMode::Normal) => spans.extend([
            key("i"),
            Span::raw(": Edit path  "),
            key("Enter"),
            Span::raw(": Classify  "),
            key("↑/↓"),
            Span::raw(": Scroll  "),
        ]),
        (View::Anomaly, InputMode::Editing) => {
            spans = vec![
                key(" Enter"),
                Span::raw(": Classify  "),
                key("Esc"),
                Span::raw(": Stop editing  "),
            ]
        }
    }
    spans.extend([key("?"), Span::raw(": Help")]);

    let footer = Paragraph::new(Line::from(spans))
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::TOP));

    frame.render_widget(footer, area);
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect(60, 60, frame.area());

    let entry = |keys: &'static str, text: &'static str| {
        Line::from(vec![
            Span::styled(format!("{:<11}", keys), Style::default().fg(Color::Yellow)),
            Span::raw(text),
        ])
    };

    let help_text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().bold().fg(Color::Cyan),
        )),
        Line::from(""),
        entry("q / Esc", "Quit application"),
        entry("Tab", "Switch between metrics and anomaly detection"),
        entry("?", "Toggle this help"),
        Line::from(""),
        Line::from(Span::styled("Metrics", Style::default().bold().fg(Color::Cyan))),
        entry("← / →", "Previous / next category"),
        entry("[ / ]", "Move range start back / forward"),
        entry("{ / }", "Move range end back / forward"),
        entry("r", "Reset to the full time range"),
        Line::from(""),
        Line::from(Span::styled(
            "Anomaly Detection",
            Style::default().bold().fg(Color::Cyan),
        )),
        entry("i / /", "Edit the CSV path"),
        entry("Enter", "Classify the file with every stored model"),
        entry("↑ / ↓", "Scroll results"),
        entry("Home / End", "Jump to first / last row"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(Clear, area);
    frame.render_widget(help, area);
}

/// Helper to create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Format an axis value compactly.
fn format_value(v: f64) -> String {
    let abs = v.abs();
    if abs >= 1e9 {
        format!("{:.1}G", v / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", v / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", v / 1e3)
    } else {
        format!("{:.0}", v)
    }
}

fn event_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App, tick_rate: Duration) -> Result<()> {
    while app.is_running() {
        terminal.draw(|f| render(f, app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }
    }
    Ok(())
}

/// Main UI event loop. The terminal is restored even when the loop fails.
pub fn run_ui(mut app: App, tick_rate: Duration) -> Result<()> {
    let mut terminal = init_terminal()?;
    let result = event_loop(&mut terminal, &mut app, tick_rate);
    restore_terminal(&mut terminal)?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::fixtures;
    use crate::ml::training::train_csv;
    use crate::standardize::ColumnMap;
    use crate::table::DataTable;
    use crate::taxonomy::MetricTaxonomy;
    use ratatui::backend::TestBackend;

    const RAW: &str = "\
timestamp,ifInOctets11,ifOutOctets11,tcpInSegs
2024-03-01 12:00:00,100,50,1
2024-03-01 12:05:00,200,75,2
2024-03-01 12:10:00,300,80,3
";

    fn app_with_store(store: ModelStore) -> App {
        app_from(RAW, store)
    }

    fn app_from(raw: &str, store: ModelStore) -> App {
        let config = Config::default();
        let mut table = DataTable::from_reader(raw.as_bytes(), Some("timestamp")).unwrap();
        config.column_map.standardize(&mut table);
        let dashboard = MetricsDashboard::new(
            table,
            "timestamp",
            MetricTaxonomy::snmp(),
            ColumnMap::snmp(),
        )
        .unwrap();
        App::new(dashboard, store, &config)
    }

    fn app() -> App {
        app_with_store(ModelStore::new("does-not-exist"))
    }

    fn press(app: &mut App, keys: &str) {
        for c in keys.chars() {
            app.handle_key(KeyCode::Char(c));
        }
    }

    #[test]
    fn test_defaults_to_first_category_and_full_range() {
        let app = app();
        assert_eq!(app.category_name().as_deref(), Some("Network"));
        assert_eq!(app.range(), app.dashboard.full_range());
        assert_eq!(app.charts.len(), 4);
        assert_eq!(app.range_rows, 3);
    }

    #[test]
    fn test_category_navigation_wraps() {
        let mut app = app();
        app.handle_key(KeyCode::Right);
        assert_eq!(app.category_name().as_deref(), Some("TCP"));
        assert_eq!(app.charts.len(), 5);

        app.handle_key(KeyCode::Left);
        app.handle_key(KeyCode::Left);
        assert_eq!(app.category_name().as_deref(), Some("ICMP"));
    }

    #[test]
    fn test_range_keys() {
        let mut app = app();
        press(&mut app, "]");
        assert_eq!((app.start, app.end), (1, 2));
        assert_eq!(app.range_rows, 2);

        // start never passes end
        press(&mut app, "]]]");
        assert_eq!((app.start, app.end), (2, 2));

        press(&mut app, "{");
        assert_eq!((app.start, app.end), (2, 2));

        press(&mut app, "[[{");
        assert_eq!((app.start, app.end), (0, 1));
        assert_eq!(app.charts[0].series[0].points.len(), 2);

        press(&mut app, "r");
        assert_eq!((app.start, app.end), (0, 2));
    }

    #[test]
    fn test_quit_and_help() {
        let mut app = app();
        press(&mut app, "?");
        assert!(app.show_help);
        app.handle_key(KeyCode::Esc);
        assert!(!app.is_running());
    }

    #[test]
    fn test_editing_captures_keys() {
        let mut app = app();
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.view, View::Anomaly);

        press(&mut app, "iq.csv");
        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.input, "q.csv");
        assert!(app.is_running());

        app.handle_key(KeyCode::Backspace);
        assert_eq!(app.input, "q.cs");

        app.handle_key(KeyCode::Esc);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.is_running());
    }

    #[test]
    fn test_prediction_failure_goes_to_status() {
        let mut app = app();
        app.handle_key(KeyCode::Tab);
        app.handle_key(KeyCode::Enter);
        assert!(app.status.as_ref().unwrap().is_error);

        press(&mut app, "/missing.csv");
        app.handle_key(KeyCode::Enter);

        let status = app.status.clone().unwrap();
        assert!(status.is_error);
        assert!(status.message.contains("missing.csv"));
        assert!(app.results.is_none());
        assert!(app.is_running());
    }

    #[test]
    fn test_prediction_fills_results() {
        let dir = tempfile::tempdir().unwrap();
        let train_path = dir.path().join("train.csv");
        std::fs::write(&train_path, fixtures::telemetry_csv(10, "class")).unwrap();
        let store = ModelStore::new(dir.path().join("ml_models"));
        train_csv(&train_path, "timestamp", &Config::default().training, &store).unwrap();

        let centers_path = dir.path().join("centers.csv");
        std::fs::write(&centers_path, fixtures::center_csv(true)).unwrap();

        let mut app = app_with_store(store);
        app.handle_key(KeyCode::Tab);
        press(&mut app, "i");
        press(&mut app, centers_path.to_str().unwrap());
        app.handle_key(KeyCode::Enter);

        assert!(!app.status.as_ref().unwrap().is_error);
        assert_eq!(app.result_rows(), 3);
        assert_eq!(app.table_state.selected(), Some(0));

        app.handle_key(KeyCode::End);
        assert_eq!(app.table_state.selected(), Some(2));
        app.handle_key(KeyCode::Down);
        assert_eq!(app.table_state.selected(), Some(2));
        app.handle_key(KeyCode::Up);
        assert_eq!(app.table_state.selected(), Some(1));

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        let screen: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("RandomForest"));
        assert!(screen.contains("NaiveBayes"));
    }

    #[test]
    fn test_text_metric_warning_in_metrics_view() {
        let raw = "\
timestamp,ifInOctets11,ifOutOctets11,ifInDiscards11
2024-03-01 12:00:00,100,50,n/a
2024-03-01 12:05:00,200,75,n/a
";
        let mut app = app_from(raw, ModelStore::new("does-not-exist"));
        assert_eq!(app.charts.len(), 4);
        assert_eq!(app.charts[0].title, "RxBytes, TxBytes");
        assert_eq!(
            app.chart_warning.as_deref(),
            Some("Not numeric, not plotted: RxDiscards")
        );

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        let screen: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("Not numeric, not plotted: RxDiscards"));

        // TCP has no text columns
        press(&mut app, "l");
        assert_eq!(app.category_name().as_deref(), Some("TCP"));
        assert!(app.chart_warning.is_none());
    }

    #[test]
    fn test_render_both_views() {
        let mut app = app();
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();

        terminal.draw(|f| render(f, &mut app)).unwrap();
        app.handle_key(KeyCode::Tab);
        press(&mut app, "?");
        terminal.draw(|f| render(f, &mut app)).unwrap();
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(512.0), "512");
        assert_eq!(format_value(1500.0), "1.5K");
        assert_eq!(format_value(2_500_000.0), "2.5M");
    }
}
