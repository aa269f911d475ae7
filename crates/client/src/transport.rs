//! Request/response seam between the loop and the network.

use std::future::Future;
use std::pin::Pin;

use dw_protocol::PollRequest;
use serde_json::Value;

use crate::error::TransportError;

/// Sends one request and yields the raw reply body.
///
/// Implementations map network failures and non-2xx statuses to
/// [`TransportError`]; body validation happens in the connection.
pub trait Transport: Send {
	fn send(&mut self, request: PollRequest) -> Pin<Box<dyn Future<Output = Result<Value, TransportError>> + Send + '_>>;
}
