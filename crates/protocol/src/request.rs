//! Client to server poll/action request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single poll or action request.
///
/// ```json
/// { "action": "ping", "k": "3f7c...", "data": { "__serialized": "a=1&b=2" } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollRequest {
	/// Action name routed to a server handler.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub action: Option<String>,
	/// Session key, absent on the first request of a connection.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub k: Option<String>,
	/// Opaque action input.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
}

impl PollRequest {
	pub fn new(action: impl Into<String>) -> Self {
		Self {
			action: Some(action.into()),
			..Default::default()
		}
	}

	pub fn with_key(mut self, key: Option<String>) -> Self {
		self.k = key;
		self
	}

	pub fn with_data(mut self, data: Option<Value>) -> Self {
		self.data = data;
		self
	}

	/// Session key with the `""`/`"null"` placeholders some clients send treated as absent.
	pub fn session_key(&self) -> Option<&str> {
		self.k.as_deref().filter(|key| !key.is_empty() && *key != "null")
	}
}
