//! # conduit-core
//!
//! Shared vocabulary for the conduit control-plane bridge.
//!
//! - **Wire types**: [`InboundMessage`], [`OutboundResponse`], [`OutboundEvent`]
//! - **Command specifications**: [`CommandSpec`], [`SubcommandSpec`], [`ArgumentSpec`]
//! - **Collaborator seams**: [`EventSink`] for fire-and-forget telemetry
//! - **Errors**: [`HostError`], [`SpecError`], [`EnvelopeError`] via `thiserror`
//! - **Logging**: [`logging::init_subscriber`]

#![deny(unsafe_code)]

pub mod errors;
pub mod logging;
pub mod messages;
pub mod spec;

pub use errors::{EnvelopeError, HostError, SpecError};
pub use messages::{EventSink, InboundMessage, OutboundEvent, OutboundResponse, event_types};
pub use spec::{ArgumentSpec, ArgumentType, CommandSpec, SubcommandSpec};
