//! Remote session controller
//!
//! A [`Session`] owns the single connection to Head Honcho and every piece of
//! state derived from it. UI code reads that state through accessors and
//! changes it only by calling `Session` methods; inbound traffic arrives via
//! [`Session::handle_transport_event`], which processes one event to
//! completion before the next.
//!
//! ## Multiplexed exchanges
//!
//! Chat, terminal I/O, script execution, snapshots, and state queries all
//! share one transport and are told apart only by their `action` tag. Each
//! handler touches its own state slice, so interleavings such as a
//! `PTY_OUTPUT` arriving between two `SNAPSHOT_LOG`s are harmless.
//!
//! ## Failure policy
//!
//! Nothing here panics or propagates a transport failure. Local rejections
//! (sending while disconnected, a second script while one runs) return an
//! `Err` *and* leave a warning in the [`LogBuffer`]; remote failures become
//! sticky state. Reconnection is always manual.

mod conversation;
mod execution;
mod log;
mod snapshot;
mod system_state;
mod terminal;

use std::fmt;

use serde_json::{Map, Value};

pub use conversation::{ChatMessage, ConversationThread, Sender};
pub use execution::{ExecutionRelay, ExecutionStatus, OutputLine, MAX_OUTPUT_LINES};
pub use log::{AuditEntry, AuditLog, LogBuffer, LogEntry, LogLevel, AUDIT_CAPACITY, LOG_CAPACITY};
pub use snapshot::{SnapshotCoordinator, SnapshotState, CONNECTION_LOST};
pub use system_state::InternalStateSnapshot;
pub use terminal::{TerminalBridge, TerminalSink};

use self::snapshot::{EndOutcome, StartOutcome};
use crate::config::{Config, SecurityLevel};
use crate::error::{Error, Result};
use crate::protocol::{self, DecodeError, Inbound, OutputStream, Outbound};
use crate::transport::{ConnectionId, Transport, TransportEvent};

/// Lifecycle of the one connection a session may have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Operator settings a session needs, taken from [`Config`]
#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    pub url: Option<String>,
    pub guardian_mode: SecurityLevel,
    pub workspace_sync_target: Option<String>,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            url: config.remote.url.clone(),
            guardian_mode: config.guardian.security_level,
            workspace_sync_target: config.remote.workspace_sync_target.clone(),
        }
    }
}

/// The remote session controller
pub struct Session<T: Transport> {
    transport: T,
    settings: SessionSettings,
    state: ConnectionState,
    active: Option<ConnectionId>,
    next_id: ConnectionId,
    logs: LogBuffer,
    audit: AuditLog,
    conversation: ConversationThread,
    terminal: TerminalBridge,
    snapshot: SnapshotCoordinator,
    execution: ExecutionRelay,
    system_state: Option<InternalStateSnapshot>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, settings: SessionSettings) -> Self {
        Self {
            transport,
            settings,
            state: ConnectionState::Disconnected,
            active: None,
            next_id: ConnectionId::first(),
            logs: LogBuffer::default(),
            audit: AuditLog::default(),
            conversation: ConversationThread::default(),
            terminal: TerminalBridge::default(),
            snapshot: SnapshotCoordinator::default(),
            execution: ExecutionRelay::default(),
            system_state: None,
        }
    }

    // ========== Observable state ==========

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Id of the live (or connecting) transport, if any
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.active
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn url(&self) -> Option<&str> {
        self.settings.url.as_deref()
    }

    pub fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn conversation(&self) -> &ConversationThread {
        &self.conversation
    }

    pub fn terminal(&self) -> &TerminalBridge {
        &self.terminal
    }

    pub fn snapshot(&self) -> &SnapshotCoordinator {
        &self.snapshot
    }

    pub fn execution(&self) -> &ExecutionRelay {
        &self.execution
    }

    pub fn system_state(&self) -> Option<&InternalStateSnapshot> {
        self.system_state.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ========== Connection lifecycle ==========

    /// Change the remote URL. Only allowed while disconnected.
    pub fn set_url(&mut self, url: impl Into<String>) -> Result<()> {
        if self.state != ConnectionState::Disconnected {
            self.logs.push(
                LogLevel::Warn,
                "Cannot change the remote URL while a connection is open.",
            );
            return Err(Error::AlreadyConnecting(self.state.label().to_string()));
        }
        let url = url.into();
        let url = url.trim();
        if url.is_empty() {
            self.settings.url = None;
            return Ok(());
        }
        if let Err(e) = crate::config::validate_ws_url(url) {
            self.logs.push(LogLevel::Warn, format!("Rejected remote URL: {}", e));
            return Err(e);
        }
        self.settings.url = Some(url.to_string());
        Ok(())
    }

    /// Open the transport if none is open or opening.
    pub fn connect(&mut self) -> Result<()> {
        if self.state != ConnectionState::Disconnected {
            self.logs.push(
                LogLevel::Warn,
                format!("Connect ignored: connection already {}.", self.state),
            );
            return Err(Error::AlreadyConnecting(self.state.label().to_string()));
        }

        let Some(url) = self.settings.url.clone() else {
            self.logs
                .push(LogLevel::Warn, "Cannot connect: no remote URL configured.");
            return Err(Error::MissingUrl);
        };

        let id = self.next_id;
        self.next_id = id.next();

        self.logs
            .push(LogLevel::Info, format!("Attempting to connect to {}...", url));
        tracing::info!(connection = %id, url = %url, "Opening connection");

        if let Err(e) = self.transport.open(id, &url) {
            self.logs
                .push(LogLevel::Error, format!("Failed to connect: {}", e));
            return Err(e);
        }

        self.state = ConnectionState::Connecting;
        self.active = Some(id);
        Ok(())
    }

    /// Ask the transport to close. The state only changes once the
    /// transport reports the close.
    pub fn disconnect(&mut self) {
        match self.active {
            Some(id) => {
                tracing::info!(connection = %id, "Closing connection");
                self.transport.close(id);
            }
            None => {
                self.logs
                    .push(LogLevel::Warn, "Disconnect ignored: not connected.");
            }
        }
    }

    /// Feed one transport event. Events for any connection other than the
    /// current one are dropped.
    pub fn handle_transport_event(&mut self, id: ConnectionId, event: TransportEvent) {
        if self.active != Some(id) {
            tracing::debug!(connection = %id, ?event, "Dropping event from stale connection");
            return;
        }

        match event {
            TransportEvent::Opened => self.on_opened(id),
            TransportEvent::Message(raw) => {
                if self.state == ConnectionState::Connected {
                    self.route(id, &raw);
                } else {
                    tracing::warn!(connection = %id, "Message before open, dropping");
                }
            }
            TransportEvent::Error(error) => {
                self.teardown(
                    LogLevel::Error,
                    format!("WebSocket error: {}. Connection closed.", error),
                );
            }
            TransportEvent::Closed => {
                self.teardown(LogLevel::Info, "WebSocket connection closed.".to_string());
            }
        }
    }

    fn on_opened(&mut self, id: ConnectionId) {
        if self.state == ConnectionState::Connected {
            return;
        }
        self.state = ConnectionState::Connected;
        self.conversation.clear();
        self.terminal.unbind();
        self.logs
            .push(LogLevel::Info, "WebSocket connection established.");
        let details = format!("Connected to {}", self.url().unwrap_or_default());
        self.audit.record("Head Honcho Connect", details);
        tracing::info!(connection = %id, "Connection established");
    }

    /// Move to Disconnected and force every outstanding exchange to a
    /// terminal state.
    fn teardown(&mut self, level: LogLevel, line: String) {
        let Some(id) = self.active.take() else {
            return;
        };
        self.state = ConnectionState::Disconnected;
        self.logs.push(level, line);

        if self.snapshot.connection_lost() {
            tracing::warn!(connection = %id, "Snapshot abandoned: connection lost");
        }
        if self.execution.connection_lost() {
            tracing::warn!(connection = %id, "Script execution abandoned: connection lost");
        }
        self.conversation.stop_waiting();
        self.terminal.unbind();
        self.audit
            .record("Head Honcho Disconnect", "Connection was closed.");
    }

    // ========== Outbound actions ==========

    /// Send one envelope on the live connection.
    fn send(&mut self, envelope: &Outbound) -> Result<()> {
        let id = match (self.state, self.active) {
            (ConnectionState::Connected, Some(id)) => id,
            _ => {
                self.logs.push(
                    LogLevel::Warn,
                    format!("Cannot send {}: not connected.", envelope.action()),
                );
                return Err(Error::NotConnected);
            }
        };

        let text = envelope.encode()?;
        if let Err(e) = self.transport.send(id, text) {
            self.logs.push(
                LogLevel::Error,
                format!("Failed to send {}: {}", envelope.action(), e),
            );
            return Err(e);
        }
        Ok(())
    }

    /// Forward one keystroke or paste to the remote PTY, unbatched.
    pub fn terminal_input(&mut self, chunk: &str) -> Result<()> {
        self.send(&Outbound::PtyInput {
            data: chunk.to_string(),
        })
    }

    /// Bind the terminal renderer for the current connection.
    ///
    /// Must be called again after every reconnect; a sink never outlives the
    /// connection it was bound to.
    pub fn bind_terminal(&mut self, sink: Box<dyn TerminalSink + Send>) -> Result<()> {
        match (self.state, self.active) {
            (ConnectionState::Connected, Some(id)) => {
                self.terminal.bind(id, sink);
                Ok(())
            }
            _ => Err(Error::NotConnected),
        }
    }

    /// Ask the backend's model a question.
    pub fn ask(&mut self, message: &str, context: &str) -> Result<()> {
        if self.conversation.awaiting_reply() {
            self.logs.push(
                LogLevel::Warn,
                "Query ignored: still waiting for the previous reply.",
            );
            return Err(Error::AwaitingReply);
        }
        self.send(&Outbound::AiQuery {
            context: context.to_string(),
            message: message.to_string(),
            guardian_mode: self.settings.guardian_mode,
        })?;
        self.conversation.push_user(message);
        Ok(())
    }

    /// Run a script remotely. Only one execution may be in flight.
    pub fn execute(&mut self, script: &str) -> Result<()> {
        if self.execution.in_flight() {
            self.logs.push(
                LogLevel::Warn,
                "Execution ignored: another script is still running.",
            );
            return Err(Error::ExecutionInFlight);
        }
        self.send(&Outbound::ExecuteScript {
            script: script.to_string(),
        })?;
        self.execution.begin();
        self.logs
            .push(LogLevel::Info, "Script sent for remote execution.");
        Ok(())
    }

    /// Ask the backend to snapshot its workspace.
    pub fn create_snapshot(&mut self) -> Result<()> {
        if self.snapshot.is_active() {
            self.logs.push(
                LogLevel::Warn,
                "Snapshot ignored: a snapshot is already in progress.",
            );
            return Err(Error::SnapshotRunning);
        }
        self.send(&Outbound::CreateSnapshot)?;
        self.snapshot.request();
        self.logs
            .push(LogLevel::Info, "Requesting workspace snapshot...");
        if self.settings.workspace_sync_target.is_none() {
            self.logs.push(
                LogLevel::Warn,
                "No workspace sync target is configured; Head Honcho needs one to snapshot.",
            );
        }
        Ok(())
    }

    /// Ask for a fresh internal-state record. The latest response wins.
    pub fn request_system_state(&mut self) -> Result<()> {
        self.send(&Outbound::GetSystemState)?;
        self.logs.push(LogLevel::Info, "Requesting system state...");
        Ok(())
    }

    // ========== Inbound routing ==========

    fn route(&mut self, id: ConnectionId, raw: &str) {
        match protocol::decode(raw) {
            Ok(inbound) => self.dispatch(id, inbound),
            Err(DecodeError::UnknownAction(action)) => {
                self.logs.push(
                    LogLevel::Error,
                    format!("ERROR: Received unknown action '{}': {}", action, raw),
                );
            }
            Err(e) => {
                tracing::debug!(connection = %id, error = %e, "Undecodable message");
                self.logs.push(
                    LogLevel::Error,
                    format!("ERROR: Received invalid message: {}", raw),
                );
            }
        }
    }

    fn dispatch(&mut self, id: ConnectionId, inbound: Inbound) {
        match inbound {
            Inbound::AiResponse { response } => self.conversation.push_remote(response),
            Inbound::PtyOutput { data } => self.terminal.write(id, &data),
            Inbound::ExecutionStart => self.on_execution_start(),
            Inbound::ExecutionOutput { line, stream } => self.on_execution_output(stream, &line),
            Inbound::ExecutionEnd { exit_code } => self.on_execution_end(exit_code),
            Inbound::SnapshotStart => self.on_snapshot_start(),
            Inbound::SnapshotLog { line } => {
                if !self.snapshot.on_log(&line) {
                    tracing::warn!(connection = %id, line = %line, "Snapshot log outside a running snapshot");
                }
            }
            Inbound::SnapshotEnd { success, error } => self.on_snapshot_end(success, error),
            Inbound::SystemStateResponse { state } => self.on_system_state(state),
            Inbound::RemoteError { error } => {
                self.logs.push(
                    LogLevel::Error,
                    format!("ERROR: Head Honcho reported: {}", error),
                );
            }
        }
    }

    fn on_execution_start(&mut self) {
        if !self.execution.on_start() {
            self.logs.push(
                LogLevel::Warn,
                "Execution start received without a pending script.",
            );
        }
    }

    fn on_execution_output(&mut self, stream: Option<OutputStream>, line: &str) {
        if !self.execution.on_output(stream, line) {
            tracing::warn!(line = %line, "Execution output without a running script");
        }
    }

    fn on_execution_end(&mut self, exit_code: Option<i32>) {
        if !self.execution.on_end(exit_code) {
            tracing::warn!(?exit_code, "Execution end without a running script");
            return;
        }
        match exit_code {
            Some(0) => self
                .logs
                .push(LogLevel::Info, "Script finished with exit code 0."),
            Some(code) => self.logs.push(
                LogLevel::Warn,
                format!("Script finished with exit code {}.", code),
            ),
            None => self.logs.push(
                LogLevel::Warn,
                "Script finished without reporting an exit code.",
            ),
        }
    }

    fn on_snapshot_start(&mut self) {
        match self.snapshot.on_start() {
            StartOutcome::Started => self
                .logs
                .push(LogLevel::Info, "Workspace snapshot process started."),
            StartOutcome::AlreadyRunning => self.logs.push(
                LogLevel::Warn,
                "Snapshot start ignored: a snapshot is already running.",
            ),
        }
    }

    fn on_snapshot_end(&mut self, success: bool, error: Option<String>) {
        match self.snapshot.on_end(success, error) {
            EndOutcome::Succeeded => self
                .logs
                .push(LogLevel::Info, "Workspace snapshot completed successfully."),
            EndOutcome::Failed(reason) => self.logs.push(
                LogLevel::Error,
                format!("ERROR: Workspace snapshot failed: {}", reason),
            ),
            EndOutcome::Ignored => {
                tracing::warn!("Snapshot end for a workflow that already finished");
            }
        }
    }

    fn on_system_state(&mut self, state: Map<String, Value>) {
        self.system_state = Some(InternalStateSnapshot::new(state));
        self.logs
            .push(LogLevel::Info, "Received system state from Head Honcho.");
    }
}
