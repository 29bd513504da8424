//! UI rendering for the TUI.

use gangterm_core::session::{ExecutionStatus, LogEntry, LogLevel, Sender, SnapshotState};
use gangterm_core::{ConnectionState, OutputStream};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{App, Tab};

/// Border color for the connection panel
const BORDER_CONNECTION: Color = Color::Rgb(0, 150, 150);
/// Border color for log panels
const BORDER_LOG: Color = Color::Rgb(80, 160, 80);
/// Border color for the terminal
const BORDER_TERMINAL: Color = Color::Rgb(120, 120, 120);
/// Border color for the snapshot panels
const BORDER_SNAPSHOT: Color = Color::Rgb(180, 100, 180);
/// Label color for key/value rows
const LABEL_COLOR: Color = Color::Rgb(100, 180, 180);
/// Dim gray for timestamps and hints
const DIM: Color = Color::Rgb(128, 128, 128);

/// Render the application UI.
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Layout: tab header, body, footer
    let chunks = Layout::vertical([
        Constraint::Length(2), // Tab header
        Constraint::Min(5),    // Body
        Constraint::Length(1), // Footer
    ])
    .split(area);

    render_tab_header(frame, app, chunks[0]);

    match app.tab {
        Tab::Console => render_console(frame, app, chunks[1]),
        Tab::Pty => render_terminal(frame, app, chunks[1]),
        Tab::Exec => render_exec(frame, app, chunks[1]),
        Tab::Snapshot => render_snapshot(frame, app, chunks[1]),
        Tab::State => render_state(frame, app, chunks[1]),
        Tab::Chat => render_chat(frame, app, chunks[1]),
    }

    render_footer(frame, app, chunks[2]);
}

/// Render the tab bar with the connection indicator on the right.
fn render_tab_header(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::horizontal([
        Constraint::Length(11), // App name
        Constraint::Min(1),     // Tabs
        Constraint::Length(18), // Connection indicator
    ])
    .split(area);

    let app_name = Paragraph::new(" gangterm").style(Style::default().fg(Color::Cyan).bold());
    frame.render_widget(app_name, chunks[0]);

    let active_style = Style::default()
        .fg(Color::Cyan)
        .bold()
        .add_modifier(Modifier::UNDERLINED);
    let inactive_style = Style::default().fg(Color::DarkGray);

    let mut spans = Vec::new();
    for (i, tab) in Tab::ALL.iter().enumerate() {
        let style = if *tab == app.tab {
            active_style
        } else {
            inactive_style
        };
        spans.push(Span::styled(format!(" F{} {} ", i + 1, tab.title()), style));
    }
    let tabs = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(tabs, chunks[1]);

    let state = app.session.state();
    let indicator = Paragraph::new(Line::from(vec![
        Span::styled("● ", Style::default().fg(state_color(state))),
        Span::raw(state.label()),
    ]))
    .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(indicator, chunks[2]);
}

fn state_color(state: ConnectionState) -> Color {
    match state {
        ConnectionState::Disconnected => Color::Red,
        ConnectionState::Connecting => Color::Yellow,
        ConnectionState::Connected => Color::Green,
    }
}

fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Info => Color::Reset,
        LogLevel::Warn => Color::Yellow,
        LogLevel::Error => Color::Red,
    }
}

fn log_line(entry: &LogEntry) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("[{}] ", entry.timestamp.format("%H:%M:%S")),
            Style::default().fg(DIM),
        ),
        Span::styled(entry.text.clone(), Style::default().fg(level_color(entry.level))),
    ])
}

/// Lines that fit in `height`, newest at the bottom.
fn tail<T>(items: &[T], height: u16) -> &[T] {
    let keep = usize::from(height);
    &items[items.len().saturating_sub(keep)..]
}

fn panel(title: &str, color: Color) -> Block<'static> {
    Block::default()
        .title(format!(" {} ", title))
        .title_style(Style::default().fg(color).bold())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

// ========== Console ==========

fn render_console(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::vertical([
        Constraint::Length(6), // Connection details
        Constraint::Min(3),    // Connection log
    ])
    .split(area);

    let session = &app.session;
    let url = match &app.url_input {
        Some(editing) => Span::styled(format!("{}▏", editing), Style::default().fg(Color::Yellow)),
        None => Span::raw(session.url().unwrap_or("(not set)").to_string()),
    };
    let connection = session
        .connection_id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "—".to_string());
    let last_audit = session
        .audit()
        .iter()
        .next()
        .map(|e| format!("{} at {}", e.event, e.timestamp.format("%H:%M:%S")))
        .unwrap_or_else(|| "—".to_string());

    let label = |text: &'static str| Span::styled(text, Style::default().fg(LABEL_COLOR));
    let lines = vec![
        Line::from(vec![label("Remote      "), url]),
        Line::from(vec![
            label("State       "),
            Span::styled(
                session.state().label(),
                Style::default().fg(state_color(session.state())),
            ),
            Span::styled(format!("  {}", connection), Style::default().fg(DIM)),
        ]),
        Line::from(vec![
            label("Guardian    "),
            Span::raw(session.settings().guardian_mode.label()),
        ]),
        Line::from(vec![label("Last event  "), Span::raw(last_audit)]),
    ];
    let details = Paragraph::new(lines).block(panel("Head Honcho", BORDER_CONNECTION));
    frame.render_widget(details, chunks[0]);

    let block = panel("Connection Log", BORDER_LOG);
    let inner = block.inner(chunks[1]);
    let entries: Vec<_> = session.logs().iter().collect();
    let lines: Vec<Line> = tail(&entries, inner.height)
        .iter()
        .map(|e| log_line(e))
        .collect();
    frame.render_widget(Paragraph::new(lines).block(block), chunks[1]);
}

// ========== Terminal ==========

fn render_terminal(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = panel("Remote Terminal", BORDER_TERMINAL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    app.resize_screen(inner.height, inner.width);

    let Ok(parser) = app.screen.lock() else {
        return;
    };
    let screen = parser.screen();
    frame.render_widget(Paragraph::new(screen_text(screen, inner)), inner);

    if app.session.state() == ConnectionState::Connected && !screen.hide_cursor() {
        let (row, col) = screen.cursor_position();
        frame.set_cursor_position((inner.x + col, inner.y + row));
    }
}

/// Convert the visible part of a vt100 screen to styled text.
fn screen_text(screen: &vt100::Screen, area: Rect) -> Text<'static> {
    let (rows, cols) = screen.size();
    let rows = rows.min(area.height);
    let cols = cols.min(area.width);

    let mut lines = Vec::with_capacity(usize::from(rows));
    for row in 0..rows {
        let mut spans = Vec::new();
        let mut run = String::new();
        let mut run_style = Style::default();

        let mut col = 0;
        while col < cols {
            let (text, style, width) = match screen.cell(row, col) {
                Some(cell) if cell.is_wide_continuation() => {
                    col += 1;
                    continue;
                }
                Some(cell) => {
                    let mut text = cell.contents();
                    if text.is_empty() {
                        text.push(' ');
                    }
                    (text, cell_style(cell), if cell.is_wide() { 2 } else { 1 })
                }
                None => (" ".to_string(), Style::default(), 1),
            };

            if style != run_style && !run.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut run), run_style));
            }
            run_style = style;
            run.push_str(&text);
            col += width;
        }
        if !run.is_empty() {
            spans.push(Span::styled(run, run_style));
        }
        lines.push(Line::from(spans));
    }
    Text::from(lines)
}

fn cell_style(cell: &vt100::Cell) -> Style {
    let mut style = Style::default();
    if let Some(color) = vt_color(cell.fgcolor()) {
        style = style.fg(color);
    }
    if let Some(color) = vt_color(cell.bgcolor()) {
        style = style.bg(color);
    }
    if cell.bold() {
        style = style.add_modifier(Modifier::BOLD);
    }
    if cell.italic() {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if cell.underline() {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if cell.inverse() {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

fn vt_color(color: vt100::Color) -> Option<Color> {
    match color {
        vt100::Color::Default => None,
        vt100::Color::Idx(idx) => Some(Color::Indexed(idx)),
        vt100::Color::Rgb(r, g, b) => Some(Color::Rgb(r, g, b)),
    }
}

// ========== Exec ==========

fn render_exec(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::horizontal([
        Constraint::Percentage(45), // Script
        Constraint::Percentage(55), // Output
    ])
    .split(area);

    let title = match &app.script_path {
        Some(path) => format!("Script: {}", path.display()),
        None => "Script".to_string(),
    };
    let script = Paragraph::new(format!("{}▏", app.script))
        .wrap(Wrap { trim: false })
        .block(panel(&title, BORDER_CONNECTION));
    frame.render_widget(script, chunks[0]);

    let execution = app.session.execution();
    let status = match execution.status() {
        ExecutionStatus::Idle => Span::styled("idle", Style::default().fg(DIM)),
        ExecutionStatus::Running => Span::styled("running…", Style::default().fg(Color::Yellow)),
        ExecutionStatus::Exited(0) => Span::styled("exit 0", Style::default().fg(Color::Green)),
        ExecutionStatus::Exited(code) => {
            Span::styled(format!("exit {}", code), Style::default().fg(Color::Red))
        }
        ExecutionStatus::Aborted => {
            Span::styled("aborted (outcome unknown)", Style::default().fg(Color::Red))
        }
    };

    let block = Block::default()
        .title(Line::from(vec![Span::raw(" Output "), status, Span::raw(" ")]))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_LOG));
    let inner = block.inner(chunks[1]);

    let mut lines: Vec<Line> = Vec::new();
    if execution.truncated() > 0 {
        lines.push(Line::styled(
            format!("… {} earlier lines dropped", execution.truncated()),
            Style::default().fg(DIM),
        ));
    }
    let visible = inner.height.saturating_sub(lines.len() as u16);
    for line in tail(execution.output(), visible) {
        let color = match line.stream {
            OutputStream::Stdout => Color::Reset,
            OutputStream::Stderr => Color::Red,
        };
        lines.push(Line::from(vec![
            Span::styled(format!("[{}] ", line.stream.label()), Style::default().fg(DIM)),
            Span::styled(line.text.clone(), Style::default().fg(color)),
        ]));
    }
    frame.render_widget(Paragraph::new(lines).block(block), chunks[1]);
}

// ========== Snapshot ==========

fn render_snapshot(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::vertical([
        Constraint::Length(4), // Status
        Constraint::Min(3),    // Workflow log
    ])
    .split(area);

    let snapshot = app.session.snapshot();
    let (status, color) = match snapshot.state() {
        SnapshotState::Idle => ("No snapshot requested yet.".to_string(), DIM),
        SnapshotState::Requested => ("Waiting for Head Honcho to start…".to_string(), Color::Yellow),
        SnapshotState::Running => ("Snapshot in progress…".to_string(), Color::Yellow),
        SnapshotState::Succeeded => ("Snapshot completed successfully.".to_string(), Color::Green),
        SnapshotState::Failed(reason) => (format!("Snapshot failed: {}", reason), Color::Red),
    };
    let target = match &app.session.settings().workspace_sync_target {
        Some(target) => Span::raw(target.clone()),
        None => Span::styled(
            "not configured (Head Honcho will refuse)",
            Style::default().fg(Color::Yellow),
        ),
    };
    let lines = vec![
        Line::styled(status, Style::default().fg(color).bold()),
        Line::from(vec![
            Span::styled("Sync target  ", Style::default().fg(LABEL_COLOR)),
            target,
        ]),
    ];
    frame.render_widget(
        Paragraph::new(lines).block(panel("Workspace Snapshot", BORDER_SNAPSHOT)),
        chunks[0],
    );

    let block = panel("Snapshot Log", BORDER_SNAPSHOT);
    let inner = block.inner(chunks[1]);
    let lines: Vec<Line> = tail(snapshot.log(), inner.height)
        .iter()
        .map(log_line)
        .collect();
    frame.render_widget(Paragraph::new(lines).block(block), chunks[1]);
}

// ========== State ==========

fn render_state(frame: &mut Frame, app: &App, area: Rect) {
    let Some(state) = app.session.system_state() else {
        let hint = Paragraph::new("No system state yet. Press r to request it.")
            .style(Style::default().fg(DIM))
            .block(panel("Internal State", BORDER_CONNECTION));
        frame.render_widget(hint, area);
        return;
    };

    let flag = |value: Option<bool>| match value {
        Some(true) => Cell::from("yes").style(Style::default().fg(Color::Green)),
        Some(false) => Cell::from("no").style(Style::default().fg(Color::Red)),
        None => Cell::from("—").style(Style::default().fg(DIM)),
    };
    let mut rows = vec![
        Row::new(vec![Cell::from("Model loaded"), flag(state.model_loaded())]),
        Row::new(vec![
            Cell::from("Workspace hydrated"),
            flag(state.workspace_hydrated()),
        ]),
        Row::new(vec![Cell::from("Snapshot exists"), flag(state.snapshot_exists())]),
    ];
    const SHOWN: [&str; 3] = ["model_loaded", "workspace_hydrated", "snapshot_exists"];
    for (key, value) in state.display_rows() {
        if SHOWN.contains(&key.as_str()) {
            continue;
        }
        rows.push(Row::new(vec![Cell::from(key), Cell::from(value)]));
    }

    let title = format!(
        "Internal State (received {})",
        state.received_at().format("%H:%M:%S")
    );
    let table = Table::new(rows, [Constraint::Length(24), Constraint::Min(10)])
        .column_spacing(2)
        .block(panel(&title, BORDER_CONNECTION));
    frame.render_widget(table, area);
}

// ========== Chat ==========

fn render_chat(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::vertical([
        Constraint::Min(3),    // Conversation
        Constraint::Length(3), // Input
    ])
    .split(area);

    let conversation = app.session.conversation();
    let mut lines: Vec<Line> = Vec::new();
    for message in conversation.messages() {
        let (who, color) = match message.sender {
            Sender::User => ("you", Color::Cyan),
            Sender::Remote => ("honcho", Color::Magenta),
        };
        lines.push(Line::styled(format!("{}:", who), Style::default().fg(color).bold()));
        for text in message.text.lines() {
            lines.push(Line::raw(format!("  {}", text)));
        }
        lines.push(Line::raw(""));
    }
    if conversation.awaiting_reply() {
        lines.push(Line::styled("honcho is thinking…", Style::default().fg(DIM)));
    }

    let block = panel("Conversation", BORDER_LOG);
    let inner = block.inner(chunks[0]);
    let scroll = (lines.len() as u16).saturating_sub(inner.height);
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(block);
    frame.render_widget(paragraph, chunks[0]);

    let input = Paragraph::new(format!("{}▏", app.chat_input)).block(panel("Ask", BORDER_CONNECTION));
    frame.render_widget(input, chunks[1]);
}

// ========== Footer ==========

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(status) = &app.status {
        let footer = Paragraph::new(format!(" {}", status)).style(Style::default().fg(Color::Red));
        frame.render_widget(footer, area);
        return;
    }

    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let mut spans = vec![key(" F1-F6"), Span::raw(" tabs  ")];
    match app.tab {
        Tab::Console if app.url_input.is_some() => {
            spans.extend([key("Enter"), Span::raw(" apply  "), key("Esc"), Span::raw(" cancel  ")]);
        }
        Tab::Console => {
            spans.extend([
                key("c"),
                Span::raw(" connect  "),
                key("d"),
                Span::raw(" disconnect  "),
                key("u"),
                Span::raw(" edit url  "),
            ]);
        }
        Tab::Pty => spans.extend([key("F8"), Span::raw(" clear screen  ")]),
        Tab::Exec => {
            spans.extend([key("^R"), Span::raw(" run  "), key("^O"), Span::raw(" reload file  ")]);
        }
        Tab::Snapshot => spans.extend([key("s"), Span::raw(" create snapshot  ")]),
        Tab::State => spans.extend([key("r"), Span::raw(" refresh  ")]),
        Tab::Chat => spans.extend([key("Enter"), Span::raw(" send  "), key("Esc"), Span::raw(" clear  ")]),
    }
    spans.extend([key("^Q"), Span::raw(" quit")]);

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, area);
}
