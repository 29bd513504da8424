//! Bridge between the interactive terminal view and the remote PTY.
//!
//! Output chunks are handed to the bound sink exactly as received: no
//! escaping, no line buffering. The sink is bound per connection and dropped
//! when that connection ends, so output can never reach a terminal that
//! belongs to a different session.

use crate::transport::ConnectionId;

/// Receives raw PTY output for display.
pub trait TerminalSink {
    fn write(&mut self, chunk: &str);
}

impl<F: FnMut(&str)> TerminalSink for F {
    fn write(&mut self, chunk: &str) {
        self(chunk)
    }
}

#[derive(Default)]
pub struct TerminalBridge {
    sink: Option<(ConnectionId, Box<dyn TerminalSink + Send>)>,
    dropped_chunks: usize,
}

impl TerminalBridge {
    /// Connection the current sink belongs to, if any.
    pub fn bound_to(&self) -> Option<ConnectionId> {
        self.sink.as_ref().map(|(id, _)| *id)
    }

    /// Output chunks that arrived while no sink was bound.
    pub fn dropped_chunks(&self) -> usize {
        self.dropped_chunks
    }

    pub(crate) fn bind(&mut self, id: ConnectionId, sink: Box<dyn TerminalSink + Send>) {
        self.sink = Some((id, sink));
    }

    pub(crate) fn unbind(&mut self) {
        self.sink = None;
    }

    /// Forward a chunk of remote output for connection `id`.
    pub(crate) fn write(&mut self, id: ConnectionId, chunk: &str) {
        match &mut self.sink {
            Some((bound, sink)) if *bound == id => sink.write(chunk),
            _ => {
                self.dropped_chunks += 1;
                tracing::debug!(connection = %id, bytes = chunk.len(), "no terminal bound, dropping output");
            }
        }
    }
}

impl std::fmt::Debug for TerminalBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalBridge")
            .field("bound_to", &self.bound_to())
            .field("dropped_chunks", &self.dropped_chunks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_writes_reach_sink_verbatim_and_in_order() {
        let written = Arc::new(Mutex::new(String::new()));
        let sink = {
            let written = Arc::clone(&written);
            move |chunk: &str| written.lock().unwrap().push_str(chunk)
        };

        let id = ConnectionId::first();
        let mut bridge = TerminalBridge::default();
        bridge.bind(id, Box::new(sink));
        bridge.write(id, "\x1b[32m$ ");
        bridge.write(id, "ls\r\n");

        assert_eq!(*written.lock().unwrap(), "\x1b[32m$ ls\r\n");
        assert_eq!(bridge.dropped_chunks(), 0);
    }

    #[test]
    fn test_output_for_other_connection_is_dropped() {
        let written = Arc::new(Mutex::new(String::new()));
        let sink = {
            let written = Arc::clone(&written);
            move |chunk: &str| written.lock().unwrap().push_str(chunk)
        };

        let old = ConnectionId::first();
        let mut bridge = TerminalBridge::default();
        bridge.bind(old.next(), Box::new(sink));
        bridge.write(old, "stale");

        assert!(written.lock().unwrap().is_empty());
        assert_eq!(bridge.dropped_chunks(), 1);

        bridge.unbind();
        assert_eq!(bridge.bound_to(), None);
    }
}
