use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use resource_allocation::{
    AllocationDialog, AllocationStore, Notification, NotificationSink, Severity, StockStatus,
};
use std::io;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    ResourceList,
    Quantity,
}

pub struct App {
    pub dialog: AllocationDialog,
    pub messages: Vec<Notification>,
    pub state: TableState,
    pub focus: Focus,
    pub quantity_input: String,
    pub added_count: usize,
    pub should_quit: bool,
}

impl App {
    pub fn new(project_id: &str) -> Self {
        Self {
            dialog: AllocationDialog::new(project_id),
            messages: Vec::new(),
            state: TableState::default(),
            focus: Focus::ResourceList,
            quantity_input: String::new(),
            added_count: 0,
            should_quit: false,
        }
    }

    /// (Re)load the resource list and keep the highlight in range.
    pub fn refresh<S: AllocationStore + ?Sized>(&mut self, store: &mut S) {
        self.dialog.load(store, &mut self.messages);

        let len = self.dialog.available_resources().len();
        let selected = match self.state.selected() {
            _ if len == 0 => None,
            Some(i) if i < len => Some(i),
            _ => Some(0),
        };
        self.state.select(selected);
    }

    pub fn last_message(&self) -> Option<&Notification> {
        self.messages.last()
    }

    pub fn next(&mut self) {
        let len = self.dialog.available_resources().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.dialog.available_resources().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    /// Select the highlighted resource. Quantity resets to 1 in the same step.
    pub fn select_highlighted(&mut self) {
        let id = match self
            .state
            .selected()
            .and_then(|i| self.dialog.available_resources().get(i))
        {
            Some(r) => r.id().to_string(),
            None => return,
        };

        match self.dialog.select_resource(&id) {
            Ok(()) => {
                self.quantity_input = format_quantity(self.dialog.quantity());
                self.focus = Focus::Quantity;
            }
            Err(err) => self
                .messages
                .notify(Notification::error(err.title(), &err.to_string())),
        }
    }

    fn edit_quantity(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => self.quantity_input.push(c),
            KeyCode::Backspace => {
                self.quantity_input.pop();
            }
            _ => return,
        }

        // Unparseable input is kept as-is and fails validation on submit
        let quantity = self.quantity_input.parse::<f64>().unwrap_or(f64::NAN);
        self.dialog.set_quantity(quantity);
    }

    pub fn submit<S: AllocationStore + ?Sized>(&mut self, store: &mut S) {
        let mut added = false;
        let result = self
            .dialog
            .submit(store, &mut self.messages, || added = true);

        if added {
            if let Ok(allocation) = result {
                info!(allocation_id = %allocation.id, "allocation added from dialog");
            }
            self.added_count += 1;
            self.dialog.clear_selection();
            self.quantity_input.clear();
            self.focus = Focus::ResourceList;
            self.refresh(store);
        }
    }

    pub fn close(&mut self) {
        let mut closed = false;
        self.dialog.close(|| closed = true);
        self.should_quit = closed;
    }

    /// Apply one key press.
    pub fn handle_key<S: AllocationStore + ?Sized>(&mut self, key: KeyCode, store: &mut S) {
        match (self.focus, key) {
            (_, KeyCode::Esc) => self.close(),
            (Focus::ResourceList, KeyCode::Char('q')) => self.close(),
            (_, KeyCode::Tab) => {
                self.focus = match self.focus {
                    Focus::ResourceList => Focus::Quantity,
                    Focus::Quantity => Focus::ResourceList,
                };
            }
            (Focus::ResourceList, KeyCode::Down | KeyCode::Char('j')) => self.next(),
            (Focus::ResourceList, KeyCode::Up | KeyCode::Char('k')) => self.previous(),
            (Focus::ResourceList, KeyCode::Enter) => self.select_highlighted(),
            (Focus::ResourceList, KeyCode::Char('r')) => self.refresh(store),
            (Focus::Quantity, KeyCode::Enter) => {
                if !self.dialog.is_submitting() {
                    self.submit(store);
                }
            }
            (Focus::Quantity, other) => self.edit_quantity(other),
            _ => {}
        }
    }
}

fn format_quantity(quantity: f64) -> String {
    format!("{}", quantity)
}

pub fn run_ui<S: AllocationStore + ?Sized>(app: &mut App, store: &mut S) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app, store);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: ratatui::backend::Backend, S: AllocationStore + ?Sized>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    store: &mut S,
) -> Result<()> {
    app.refresh(store);

    while !app.should_quit {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                app.handle_key(key.code, store);
            }
        }
    }

    Ok(())
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Resource list
            Constraint::Length(5), // Allocation form
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_table(f, chunks[1], app);
    render_form(f, chunks[2], app);
    render_status_bar(f, chunks[3], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            "Add Resource to Project",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Project: {}", app.dialog.project_id()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Available: {}", app.dialog.available_resources().len()),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Added: {}", app.added_count),
            Style::default().fg(Color::Cyan),
        ),
    ];

    if app.dialog.is_loading() {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled("Loading...", Style::default().fg(Color::DarkGray)));
    }

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn status_color(status: StockStatus) -> Color {
    match status {
        StockStatus::Available => Color::Green,
        StockStatus::LowStock => Color::Yellow,
        StockStatus::OutOfStock => Color::Red,
    }
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Name", "Type", "Available", "Unit", "Status", "Kind"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let selected_id = app.dialog.selected_id().map(str::to_string);

    let rows = app.dialog.available_resources().iter().map(|r| {
        let marker = if selected_id.as_deref() == Some(r.id()) { "✓ " } else { "  " };
        let color = status_color(r.status);

        let cells = vec![
            Cell::from(format!("{}{}", marker, truncate(r.name(), 28))),
            Cell::from(truncate(&r.resource.resource_type, 14)),
            Cell::from(format!("{}", r.available)).style(Style::default().fg(color)),
            Cell::from(r.resource.unit.clone()),
            Cell::from(r.status.as_str()).style(Style::default().fg(color)),
            Cell::from(r.resource.kind_label()),
        ];

        Row::new(cells).height(1)
    });

    let border = if app.focus == Focus::ResourceList { Color::Yellow } else { Color::White };

    let table = Table::new(
        rows,
        [
            Constraint::Length(32),
            Constraint::Length(16),
            Constraint::Length(12),
            Constraint::Length(8),
            Constraint::Length(14),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(" Resources "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let resource_line = match app.dialog.selected_resource() {
        Some(r) => Line::from(vec![
            Span::styled("  Resource: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(r.name().to_string()),
            Span::styled(
                format!("  (max {} {})", app.dialog.max_quantity(), r.resource.unit),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        None => Line::from(vec![
            Span::styled("  Resource: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled("none selected (Enter on a row)", Style::default().fg(Color::DarkGray)),
        ]),
    };

    let quantity_style = match app.dialog.validate_input() {
        Ok(()) => Style::default().fg(Color::Green),
        Err(_) => Style::default().fg(Color::Red),
    };

    let mut quantity_spans = vec![
        Span::styled("  Quantity: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(app.quantity_input.clone(), quantity_style),
    ];
    if app.focus == Focus::Quantity {
        quantity_spans.push(Span::styled("▏", Style::default().fg(Color::Yellow)));
    }
    if app.dialog.is_submitting() {
        quantity_spans.push(Span::styled("  Adding...", Style::default().fg(Color::DarkGray)));
    }

    let border = if app.focus == Focus::Quantity { Color::Yellow } else { Color::White };

    let form = Paragraph::new(vec![resource_line, Line::from(quantity_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(" Allocation "),
    );

    f.render_widget(form, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = Vec::new();

    if let Some(message) = app.last_message() {
        let color = match message.severity {
            Severity::Success => Color::Green,
            Severity::Error => Color::Red,
        };
        status_spans.push(Span::styled(
            format!(" {}: {} ", message.title, message.description),
            Style::default().fg(color),
        ));
        status_spans.push(Span::raw("|"));
    }

    status_spans.push(Span::styled(" Enter", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Select/Add | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Focus | "));
    status_spans.push(Span::styled("r", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Reload | "));
    status_spans.push(Span::styled("Esc", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Close"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
