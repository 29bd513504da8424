//! Application state for the TUI.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use gangterm_core::{ConnectionState, Session, Transport, TransportEvents, WsTransport};

use crate::input::key_to_chunk;

/// Scrollback kept by the terminal view
const SCROLLBACK_LINES: usize = 1_000;

/// Control panel tabs, in F-key order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    /// Connection status and the connection log
    #[default]
    Console,
    /// Interactive remote terminal
    Pty,
    /// Remote script execution
    Exec,
    /// Workspace snapshot workflow
    Snapshot,
    /// Backend internal state
    State,
    /// Chat with the backend's model
    Chat,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Console,
        Tab::Pty,
        Tab::Exec,
        Tab::Snapshot,
        Tab::State,
        Tab::Chat,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Console => "Console",
            Tab::Pty => "Terminal",
            Tab::Exec => "Exec",
            Tab::Snapshot => "Snapshot",
            Tab::State => "State",
            Tab::Chat => "Chat",
        }
    }

    /// Tab selected by function key `n` (F1 = first tab)
    fn from_function_key(n: u8) -> Option<Tab> {
        Tab::ALL.get(usize::from(n).checked_sub(1)?).copied()
    }
}

/// Main application state.
pub struct App<T: Transport = WsTransport> {
    /// The one remote session
    pub session: Session<T>,
    /// Events reported by the session's transport
    events: TransportEvents,
    /// Currently visible tab
    pub tab: Tab,
    /// Screen model fed by remote PTY output
    pub screen: Arc<Mutex<vt100::Parser>>,
    /// Script buffer for the Exec tab
    pub script: String,
    /// File the script buffer was loaded from
    pub script_path: Option<PathBuf>,
    /// URL being edited on the Console tab, if any
    pub url_input: Option<String>,
    /// Pending chat message
    pub chat_input: String,
    /// Last rejected action, shown in the footer until the next key
    pub status: Option<String>,
    /// Whether the app should exit
    pub should_quit: bool,
}

impl<T: Transport> App<T> {
    pub fn new(
        session: Session<T>,
        events: TransportEvents,
        script_path: Option<PathBuf>,
    ) -> Result<Self> {
        let script = match &script_path {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read script {}", path.display()))?,
            None => String::new(),
        };

        Ok(Self {
            session,
            events,
            tab: Tab::default(),
            screen: Arc::new(Mutex::new(vt100::Parser::new(24, 80, SCROLLBACK_LINES))),
            script,
            script_path,
            url_input: None,
            chat_input: String::new(),
            status: None,
            should_quit: false,
        })
    }

    /// Feed every transport event that arrived since the last tick to the
    /// session.
    ///
    /// The terminal view is rebound as soon as a connection opens, before
    /// the next event in the batch, so output sent right after the
    /// handshake lands on the new screen.
    pub fn pump_events(&mut self) {
        while let Ok((id, event)) = self.events.try_recv() {
            self.session.handle_transport_event(id, event);
            if self.session.state() == ConnectionState::Connected
                && self.session.terminal().bound_to() != self.session.connection_id()
            {
                self.bind_terminal();
            }
        }
    }

    /// Give the remote shell a fresh screen for the current connection.
    fn bind_terminal(&mut self) {
        if let Ok(mut parser) = self.screen.lock() {
            let (rows, cols) = parser.screen().size();
            *parser = vt100::Parser::new(rows, cols, SCROLLBACK_LINES);
        }

        let screen = Arc::clone(&self.screen);
        let sink = move |chunk: &str| {
            if let Ok(mut parser) = screen.lock() {
                parser.process(chunk.as_bytes());
            }
        };
        if let Err(e) = self.session.bind_terminal(Box::new(sink)) {
            tracing::warn!(error = %e, "Failed to bind terminal view");
        }
    }

    /// Keep the terminal model the same size as the area it is drawn in.
    pub fn resize_screen(&mut self, rows: u16, cols: u16) {
        if rows == 0 || cols == 0 {
            return;
        }
        if let Ok(mut parser) = self.screen.lock() {
            if parser.screen().size() != (rows, cols) {
                parser.set_size(rows, cols);
            }
        }
    }

    /// Remember a rejected action for the footer. The session has already
    /// logged it.
    fn report(&mut self, result: gangterm_core::Result<()>) {
        if let Err(e) = result {
            self.status = Some(e.to_string());
        }
    }

    /// Context sent along with every chat query
    fn chat_context(&self) -> String {
        let mut context = format!("The user is currently in the \"{}\" view.\n", self.tab.title());
        context.push_str(&format!(
            "Guardian security level: {}\n",
            self.session.settings().guardian_mode.label()
        ));
        if !self.script.trim().is_empty() {
            context.push_str("Script buffer:\n");
            context.push_str(&self.script);
            context.push('\n');
        }
        context
    }

    // ========== Key handling ==========

    /// Handle a key press.
    pub fn handle_key(&mut self, key: KeyEvent) {
        self.status = None;

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('q') {
            self.should_quit = true;
            return;
        }
        if let KeyCode::F(n) = key.code {
            if let Some(tab) = Tab::from_function_key(n) {
                self.tab = tab;
                return;
            }
        }

        match self.tab {
            Tab::Console => self.handle_console_key(key),
            Tab::Pty => self.handle_pty_key(key),
            Tab::Exec => self.handle_exec_key(key),
            Tab::Snapshot => self.handle_snapshot_key(key),
            Tab::State => self.handle_state_key(key),
            Tab::Chat => self.handle_chat_key(key),
        }
    }

    /// Handle a bracketed paste.
    pub fn handle_paste(&mut self, text: &str) {
        match self.tab {
            Tab::Pty => {
                let result = self.session.terminal_input(text);
                self.report(result);
            }
            Tab::Exec => self.script.push_str(text),
            Tab::Chat => self.chat_input.push_str(text),
            Tab::Console => {
                if let Some(url) = &mut self.url_input {
                    url.push_str(text.trim());
                }
            }
            Tab::Snapshot | Tab::State => {}
        }
    }

    fn handle_console_key(&mut self, key: KeyEvent) {
        if let Some(url) = &mut self.url_input {
            match key.code {
                KeyCode::Enter => {
                    let url = std::mem::take(url);
                    self.url_input = None;
                    let result = self.session.set_url(url);
                    self.report(result);
                }
                KeyCode::Esc => self.url_input = None,
                KeyCode::Backspace => {
                    url.pop();
                }
                KeyCode::Char(c) => url.push(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('c') => {
                let result = self.session.connect();
                self.report(result);
            }
            KeyCode::Char('d') => self.session.disconnect(),
            KeyCode::Char('u') => {
                self.url_input = Some(self.session.url().unwrap_or_default().to_string());
            }
            _ => {}
        }
    }

    fn handle_pty_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::F(8) {
            if let Ok(mut parser) = self.screen.lock() {
                parser.process(b"\x1b[2J\x1b[H");
            }
            return;
        }
        if let Some(chunk) = key_to_chunk(&key) {
            let result = self.session.terminal_input(&chunk);
            self.report(result);
        }
    }

    fn handle_exec_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('r') => {
                    let script = self.script.clone();
                    let result = self.session.execute(&script);
                    self.report(result);
                }
                KeyCode::Char('o') => self.reload_script(),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char(c) => self.script.push(c),
            KeyCode::Enter => self.script.push('\n'),
            KeyCode::Tab => self.script.push_str("    "),
            KeyCode::Backspace => {
                self.script.pop();
            }
            _ => {}
        }
    }

    fn reload_script(&mut self) {
        let Some(path) = &self.script_path else {
            self.status = Some("no script file given on the command line".to_string());
            return;
        };
        match std::fs::read_to_string(path) {
            Ok(script) => self.script = script,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to reload script");
                self.status = Some(format!("failed to read {}: {}", path.display(), e));
            }
        }
    }

    fn handle_snapshot_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('s') => {
                let result = self.session.create_snapshot();
                self.report(result);
            }
            _ => {}
        }
    }

    fn handle_state_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('r') => {
                let result = self.session.request_system_state();
                self.report(result);
            }
            _ => {}
        }
    }

    fn handle_chat_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let message = self.chat_input.trim().to_string();
                if message.is_empty() {
                    return;
                }
                let context = self.chat_context();
                let result = self.session.ask(&message, &context);
                if result.is_ok() {
                    self.chat_input.clear();
                }
                self.report(result);
            }
            KeyCode::Esc => self.chat_input.clear(),
            KeyCode::Backspace => {
                self.chat_input.pop();
            }
            KeyCode::Char(c) => self.chat_input.push(c),
            _ => {}
        }
    }
}
