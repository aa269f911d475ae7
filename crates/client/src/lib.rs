//! Client half of the domwire polling protocol.
//!
//! A [`Connection`] owns everything one page connection needs: the session
//! key, send and retry counters, the action log, per-action timers, and the
//! [`Dispatcher`] that turns instruction diffs into [`Dom`] calls.
//!
//! # Loop
//!
//! ```text
//! Idle -> Sending -> success -> Scheduled (repeat or ping fallback) | Idle
//!                 -> failure -> Retrying -> Sending
//! ```
//!
//! Timers live in an explicit [`Scheduler`] keyed by action name and read a
//! [`Clock`], so the loop can be driven by [`ManualClock`] in tests.

pub mod clock;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod dom;
pub mod error;
pub mod fake;
pub mod log;
pub mod scheduler;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ClientConfig;
pub use connection::{ActionState, Completion, Connection};
pub use dispatch::{Dispatcher, NamedHandler, Operation, Registry, RegistryBuilder, Scope, UtilityFn, render};
pub use dom::{Dom, TraversalOp};
pub use error::{Error, Result, TransportError};
pub use log::ActionLog;
pub use scheduler::{PendingSend, Scheduler};
pub use transport::Transport;
