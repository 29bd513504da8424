//! # gangterm-core
//!
//! Core library for gangterm - a terminal control panel for a remote
//! Head Honcho compute backend.
//!
//! This library provides:
//! - Action envelopes for the Head Honcho WebSocket protocol
//! - A transport binding built on `tokio-tungstenite`
//! - The session controller and the state it exposes to a UI
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! One [`Session`] owns one [`Transport`]. UI code calls `Session` methods
//! for every action and feeds whatever the transport reports back into
//! [`Session::handle_transport_event`]; the session routes each inbound
//! envelope to the state slice it belongs to.
//!
//! ## Example
//!
//! ```rust,no_run
//! use gangterm_core::{Config, Session, SessionSettings, WsTransport};
//!
//! let config = Config::load().expect("failed to load config");
//! let runtime = tokio::runtime::Runtime::new().expect("failed to start runtime");
//!
//! let (transport, mut events) =
//!     WsTransport::new(runtime.handle().clone(), config.remote.connect_timeout());
//! let mut session = Session::new(transport, SessionSettings::from_config(&config));
//! session.connect().expect("failed to connect");
//!
//! while let Some((id, event)) = events.blocking_recv() {
//!     session.handle_transport_event(id, event);
//! }
//! ```

pub use config::{Config, SecurityLevel};
pub use error::{Error, Result};
pub use protocol::{Inbound, Outbound, OutputStream};
pub use session::{ConnectionState, Session, SessionSettings};
pub use transport::{ConnectionId, Transport, TransportEvent, TransportEvents, WsTransport};

pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod transport;
