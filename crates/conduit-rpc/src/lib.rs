//! # conduit-rpc
//!
//! Request/response protocol between the controller and the host.
//!
//! Each inbound text message is parsed into an
//! [`InboundMessage`](conduit_core::InboundMessage), routed by its `type`
//! through a [`HandlerTable`], and answered with exactly one
//! [`OutboundResponse`](conduit_core::OutboundResponse) carrying the same `id`.
//! Envelope defects are logged and dropped without a response.

#![deny(unsafe_code)]

pub mod context;
pub mod errors;
pub mod handler;
pub mod handlers;
pub mod host;
pub mod registry;
pub mod types;

pub use context::ProtocolContext;
pub use errors::ProtocolError;
pub use handler::handle_message;
pub use handlers::register_all;
pub use host::Host;
pub use registry::{HandlerTable, MessageHandler};
pub use types::MessageType;
