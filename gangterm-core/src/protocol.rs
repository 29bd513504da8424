//! Action envelopes exchanged with Head Honcho
//!
//! Every frame on the WebSocket is a JSON object with a top-level `action`
//! string. Outbound and inbound envelopes are separate closed enums so the
//! router can match exhaustively on what the backend is allowed to send.
//!
//! ```text
//! client ── AI_QUERY / PTY_INPUT / EXECUTE_SCRIPT / CREATE_SNAPSHOT / GET_SYSTEM_STATE ──▶ backend
//! client ◀── AI_RESPONSE / PTY_OUTPUT / EXECUTION_* / SNAPSHOT_* / SYSTEM_STATE_RESPONSE ── backend
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::SecurityLevel;

/// Envelope sent from the control panel to the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outbound {
    /// Chat query answered by the backend's model
    AiQuery {
        context: String,
        message: String,
        guardian_mode: SecurityLevel,
    },
    /// Raw keystrokes for the remote PTY
    PtyInput { data: String },
    /// Script body to run remotely
    ExecuteScript { script: String },
    /// Persist the remote workspace to its sync target
    CreateSnapshot,
    /// Ask for a full internal-state record
    GetSystemState,
}

impl Outbound {
    /// The wire `action` tag
    pub fn action(&self) -> &'static str {
        match self {
            Outbound::AiQuery { .. } => "AI_QUERY",
            Outbound::PtyInput { .. } => "PTY_INPUT",
            Outbound::ExecuteScript { .. } => "EXECUTE_SCRIPT",
            Outbound::CreateSnapshot => "CREATE_SNAPSHOT",
            Outbound::GetSystemState => "GET_SYSTEM_STATE",
        }
    }

    /// Serialize to a text frame
    pub fn encode(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Envelope received from the backend
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Inbound {
    /// Reply to an `AI_QUERY`
    AiResponse { response: String },
    /// Raw output chunk from the remote PTY
    PtyOutput { data: String },
    /// A script started running
    ExecutionStart,
    /// One line of script output
    ExecutionOutput {
        line: String,
        #[serde(default)]
        stream: Option<OutputStream>,
    },
    /// The script exited
    ExecutionEnd {
        #[serde(default)]
        exit_code: Option<i32>,
    },
    /// The backend began a workspace snapshot
    SnapshotStart,
    /// Progress line for the running snapshot
    SnapshotLog { line: String },
    /// The snapshot finished
    SnapshotEnd {
        success: bool,
        #[serde(default)]
        error: Option<String>,
    },
    /// Full internal-state record
    SystemStateResponse { state: Map<String, Value> },
    /// Untagged `{"error": "..."}` frame the backend sends when one of its
    /// handlers fails or it does not recognize our action.
    #[serde(skip)]
    RemoteError { error: String },
}

impl Inbound {
    /// Tags accepted by [`decode`]
    pub const ACTIONS: &'static [&'static str] = &[
        "AI_RESPONSE",
        "PTY_OUTPUT",
        "EXECUTION_START",
        "EXECUTION_OUTPUT",
        "EXECUTION_END",
        "SNAPSHOT_START",
        "SNAPSHOT_LOG",
        "SNAPSHOT_END",
        "SYSTEM_STATE_RESPONSE",
    ];
}

/// Why an inbound frame could not be turned into an [`Inbound`]
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message has no action tag")]
    MissingAction,

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("malformed {action} message: {source}")]
    InvalidFields {
        action: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse one inbound text frame.
pub fn decode(raw: &str) -> Result<Inbound, DecodeError> {
    let value: Value = serde_json::from_str(raw)?;

    let action = match value.get("action") {
        Some(Value::String(action)) => action.clone(),
        Some(_) => return Err(DecodeError::MissingAction),
        None => {
            return match value.get("error") {
                Some(Value::String(error)) => Ok(Inbound::RemoteError {
                    error: error.clone(),
                }),
                _ => Err(DecodeError::MissingAction),
            };
        }
    };

    if !Inbound::ACTIONS.contains(&action.as_str()) {
        return Err(DecodeError::UnknownAction(action));
    }

    serde_json::from_value(value).map_err(|source| DecodeError::InvalidFields { action, source })
}

/// Which stream a line of script output came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn label(&self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

/// Split a backend output line of the form `[stderr] text` into its label
/// and text. Lines without a recognized label are treated as stdout.
pub fn split_labeled_line(line: &str) -> (OutputStream, &str) {
    for stream in [OutputStream::Stdout, OutputStream::Stderr] {
        let tag = match stream {
            OutputStream::Stdout => "[stdout]",
            OutputStream::Stderr => "[stderr]",
        };
        if let Some(rest) = line.strip_prefix(tag) {
            return (stream, rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    (OutputStream::Stdout, line)
}
