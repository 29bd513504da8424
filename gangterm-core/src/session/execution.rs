//! Remote script execution relay: single-flight per connection, streamed
//! labeled output, final exit status.

use crate::protocol::{split_labeled_line, OutputStream};

/// Output lines kept for the live view; older lines are dropped first.
pub const MAX_OUTPUT_LINES: usize = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStatus {
    #[default]
    Idle,
    Running,
    Exited(i32),
    /// Connection dropped (or the backend reported no exit code) before the
    /// script finished; its real outcome is unknown.
    Aborted,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionRelay {
    status: ExecutionStatus,
    output: Vec<OutputLine>,
    truncated: usize,
}

impl ExecutionRelay {
    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn in_flight(&self) -> bool {
        self.status == ExecutionStatus::Running
    }

    pub fn output(&self) -> &[OutputLine] {
        &self.output
    }

    /// Lines dropped from the front of the live view
    pub fn truncated(&self) -> usize {
        self.truncated
    }

    pub(crate) fn begin(&mut self) {
        self.output.clear();
        self.truncated = 0;
        self.status = ExecutionStatus::Running;
    }

    /// The backend started the script. Returns false when nothing is running.
    pub(crate) fn on_start(&mut self) -> bool {
        if !self.in_flight() {
            return false;
        }
        self.output.clear();
        self.truncated = 0;
        true
    }

    /// Append one output line. Returns false when nothing is running.
    pub(crate) fn on_output(&mut self, stream: Option<OutputStream>, line: &str) -> bool {
        if !self.in_flight() {
            return false;
        }
        let (labeled, text) = split_labeled_line(line);
        self.output.push(OutputLine {
            stream: stream.unwrap_or(labeled),
            text: text.to_string(),
        });
        if self.output.len() > MAX_OUTPUT_LINES {
            let excess = self.output.len() - MAX_OUTPUT_LINES;
            self.output.drain(..excess);
            self.truncated += excess;
        }
        true
    }

    /// Record the final status. Returns false when nothing is running.
    pub(crate) fn on_end(&mut self, exit_code: Option<i32>) -> bool {
        if !self.in_flight() {
            return false;
        }
        self.status = match exit_code {
            Some(code) => ExecutionStatus::Exited(code),
            None => ExecutionStatus::Aborted,
        };
        true
    }

    /// Returns true if an execution was in flight.
    pub(crate) fn connection_lost(&mut self) -> bool {
        if !self.in_flight() {
            return false;
        }
        self.status = ExecutionStatus::Aborted;
        true
    }
}
