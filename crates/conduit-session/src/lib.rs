//! # conduit-session
//!
//! Owns the single WebSocket connection to the controller.
//!
//! - [`Session::connect`] opens the connection with `Authorization` and
//!   `Origin` headers and starts reconciliation in the command store
//! - inbound text is buffered until the terminal fragment, then handed to
//!   the protocol layer one message at a time
//! - responses and events leave through the [`Outbox`]
//! - on loss, [`FailurePolicy::Strict`] stops the host and
//!   [`FailurePolicy::Lenient`] schedules one reconnect after a fixed delay

#![deny(unsafe_code)]

pub mod buffer;
pub mod config;
pub mod errors;
pub mod outbox;
pub mod session;
pub mod state;

pub use buffer::FragmentBuffer;
pub use config::{FailurePolicy, SessionConfig};
pub use errors::SessionError;
pub use outbox::Outbox;
pub use session::Session;
pub use state::ConnectionState;
