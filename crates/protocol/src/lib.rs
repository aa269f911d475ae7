//! Wire types for the domwire polling protocol.
//!
//! This crate contains the serde-serializable shapes exchanged between a
//! polling page and the server that feeds it DOM instructions. These types
//! represent the "protocol layer" - data as it appears on the wire.
//!
//! # Message Flow
//!
//! 1. The client sends a [`PollRequest`] naming an action, its session key, and data
//! 2. The server runs the action, diffs queued changes against the session
//! 3. The server answers with an [`Envelope`] holding the diff and loop directives
//!
//! Types in this crate carry no behavior beyond (de)serialization and
//! [`Target`] classification. The server and client logic live in
//! `dw-server` and `dw-client`.

pub mod envelope;
pub mod request;
pub mod target;

pub use envelope::*;
pub use request::*;
pub use target::*;

/// Marker that turns a diff key into a named handler call.
pub const HANDLER_PREFIX: char = '@';

/// Data key carrying a URL-encoded form body that must be decoded server side.
pub const SERIALIZED_KEY: &str = "__serialized";

/// Keep-alive action the client re-sends on its own.
pub const PING_ACTION: &str = "ping";

/// Client handler that writes its payload to the action log.
pub const LOG_HANDLER: &str = "log";

/// Client handler that raises host alerts.
pub const ALERT_HANDLER: &str = "alert";

/// Ordered `target -> payload` instruction mapping.
pub type Instructions = serde_json::Map<String, serde_json::Value>;
