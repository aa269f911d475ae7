//! Server half of the domwire polling protocol.
//!
//! A poll arrives as a [`PollRequest`](dw_protocol::PollRequest). The
//! [`Server`] resolves its session, routes the action to a handler, lets the
//! handler queue changes through a [`Context`], and reconciles those changes
//! against what the session was last sent before replying with an
//! [`Envelope`](dw_protocol::Envelope).
//!
//! # Delivery
//!
//! Changes are committed to the session baseline when the reply is built,
//! not when the client acknowledges it. A reply lost in transit is never
//! resent unless the handler forces it: delivery is at-most-once.

pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod input;
pub mod interval;
pub mod reconcile;
pub mod router;
pub mod server;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ServerConfig;
pub use context::Context;
pub use error::{Error, Result};
pub use interval::{IntervalPolicy, IntervalStep, LoadSource, ProcLoadAvg, StaticLoad};
pub use reconcile::{PendingBatch, diff_and_commit};
pub use router::{ActionHandler, Router};
pub use server::{Server, ServerBuilder};
pub use session::{MemoryBackend, SessionBackend, SessionHandle, SessionStore};
