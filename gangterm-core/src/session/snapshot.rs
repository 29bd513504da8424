//! Workspace snapshot workflow.
//!
//! ```text
//!            create_snapshot()        SNAPSHOT_START
//!   Idle ─────────────────────▶ Requested ──────────▶ Running
//!    ▲                              │                    │
//!    │                              │ SNAPSHOT_END       │ SNAPSHOT_END / connection lost
//!    │                              ▼                    ▼
//!    └──── create_snapshot() ── Succeeded | Failed(reason)
//! ```
//!
//! The backend answers `CREATE_SNAPSHOT` with `SNAPSHOT_END{success:false}`
//! and no `SNAPSHOT_START` when it has no sync target, so `Requested` may go
//! straight to a terminal state. Terminal states stay put until the operator
//! requests another snapshot.

use super::log::{LogEntry, LogLevel};

/// Reason recorded when the connection drops mid-snapshot
pub const CONNECTION_LOST: &str = "connection lost";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SnapshotState {
    #[default]
    Idle,
    /// `CREATE_SNAPSHOT` sent, backend has not started yet
    Requested,
    Running,
    Succeeded,
    Failed(String),
}

impl SnapshotState {
    pub fn label(&self) -> &'static str {
        match self {
            SnapshotState::Idle => "idle",
            SnapshotState::Requested => "requested",
            SnapshotState::Running => "running",
            SnapshotState::Succeeded => "succeeded",
            SnapshotState::Failed(_) => "failed",
        }
    }
}

/// Result of feeding `SNAPSHOT_START` to the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Result of feeding `SNAPSHOT_END` to the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EndOutcome {
    Succeeded,
    Failed(String),
    /// A workflow that had already finished was reported finished again
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotCoordinator {
    state: SnapshotState,
    log: Vec<LogEntry>,
}

impl SnapshotCoordinator {
    pub fn state(&self) -> &SnapshotState {
        &self.state
    }

    /// Progress lines of the current (or most recent) workflow.
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// Requested or running
    pub fn is_active(&self) -> bool {
        matches!(self.state, SnapshotState::Requested | SnapshotState::Running)
    }

    /// Operator asked for a new snapshot; leaves any sticky terminal state.
    pub(crate) fn request(&mut self) {
        self.log.clear();
        self.state = SnapshotState::Requested;
    }

    pub(crate) fn on_start(&mut self) -> StartOutcome {
        if self.state == SnapshotState::Running {
            return StartOutcome::AlreadyRunning;
        }
        if !matches!(self.state, SnapshotState::Requested) {
            // Started without a request from this panel; show it fresh.
            self.log.clear();
        }
        self.state = SnapshotState::Running;
        StartOutcome::Started
    }

    /// Append a progress line. Returns false when no snapshot is running.
    pub(crate) fn on_log(&mut self, line: &str) -> bool {
        if self.state != SnapshotState::Running {
            return false;
        }
        self.log.push(LogEntry::new(LogLevel::Info, line));
        true
    }

    pub(crate) fn on_end(&mut self, success: bool, error: Option<String>) -> EndOutcome {
        if matches!(
            self.state,
            SnapshotState::Succeeded | SnapshotState::Failed(_)
        ) {
            return EndOutcome::Ignored;
        }

        if success {
            self.state = SnapshotState::Succeeded;
            EndOutcome::Succeeded
        } else {
            let reason = error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| "unknown error".to_string());
            self.log.push(LogEntry::new(LogLevel::Error, reason.clone()));
            self.state = SnapshotState::Failed(reason.clone());
            EndOutcome::Failed(reason)
        }
    }

    /// Force an outstanding workflow to `Failed("connection lost")`.
    /// Returns true if one was outstanding.
    pub(crate) fn connection_lost(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.log
            .push(LogEntry::new(LogLevel::Error, CONNECTION_LOST));
        self.state = SnapshotState::Failed(CONNECTION_LOST.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(coordinator: &SnapshotCoordinator) -> Vec<&str> {
        coordinator.log().iter().map(|e| e.text.as_str()).collect()
    }

    #[test]
    fn test_successful_workflow() {
        let mut snapshot = SnapshotCoordinator::default();
        snapshot.request();
        assert!(snapshot.is_active());
        assert_eq!(snapshot.on_start(), StartOutcome::Started);
        assert!(snapshot.on_log("Creating archive"));
        assert!(snapshot.on_log("Pushing to Git"));
        assert_eq!(snapshot.on_end(true, None), EndOutcome::Succeeded);

        assert_eq!(snapshot.state(), &SnapshotState::Succeeded);
        assert_eq!(lines(&snapshot), vec!["Creating archive", "Pushing to Git"]);
        assert!(!snapshot.is_active());
    }

    #[test]
    fn test_refused_without_start() {
        let mut snapshot = SnapshotCoordinator::default();
        snapshot.request();
        let outcome = snapshot.on_end(false, Some("No workspace sync target configured.".into()));
        assert_eq!(
            outcome,
            EndOutcome::Failed("No workspace sync target configured.".to_string())
        );
        assert!(matches!(snapshot.state(), SnapshotState::Failed(_)));
    }

    #[test]
    fn test_terminal_state_is_sticky() {
        let mut snapshot = SnapshotCoordinator::default();
        snapshot.request();
        snapshot.on_start();
        snapshot.on_end(false, None);
        assert_eq!(
            snapshot.state(),
            &SnapshotState::Failed("unknown error".to_string())
        );

        assert_eq!(snapshot.on_end(true, None), EndOutcome::Ignored);
        assert!(!snapshot.on_log("late line"));
        assert!(!snapshot.connection_lost());
        assert_eq!(
            snapshot.state(),
            &SnapshotState::Failed("unknown error".to_string())
        );

        snapshot.request();
        assert_eq!(snapshot.state(), &SnapshotState::Requested);
        assert!(snapshot.log().is_empty());
    }

    #[test]
    fn test_second_start_is_ignored() {
        let mut snapshot = SnapshotCoordinator::default();
        snapshot.request();
        snapshot.on_start();
        snapshot.on_log("first");
        assert_eq!(snapshot.on_start(), StartOutcome::AlreadyRunning);
        assert_eq!(lines(&snapshot), vec!["first"]);
    }

    #[test]
    fn test_connection_lost_fails_running_workflow() {
        let mut snapshot = SnapshotCoordinator::default();
        snapshot.request();
        snapshot.on_start();
        assert!(snapshot.connection_lost());
        assert_eq!(
            snapshot.state(),
            &SnapshotState::Failed(CONNECTION_LOST.to_string())
        );
    }
}
