//! Server to client reply.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Instructions;

/// The only output of a request cycle.
///
/// ```json
/// { "i": { "#clock": { "text": "12:00" } }, "r": true, "u": 1500, "k": "3f7c...", "t": 0.0012, "v": false }
/// ```
///
/// Every field is optional on the way in so a client can distinguish an
/// absent directive from a `false` one. Servers always fill the six core
/// fields; `s` is a debug dump of the session record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
	/// Instruction diff, `target -> payload`.
	#[serde(rename = "i", default, skip_serializing_if = "Option::is_none")]
	pub instructions: Option<Instructions>,
	/// Whether the client should repeat this action.
	#[serde(rename = "r", default, skip_serializing_if = "Option::is_none")]
	pub repeat: Option<bool>,
	/// Delay before the repeat, in milliseconds.
	#[serde(rename = "u", default, skip_serializing_if = "Option::is_none")]
	pub interval_ms: Option<u64>,
	/// Session key, echoed or newly issued.
	#[serde(rename = "k", default, skip_serializing_if = "Option::is_none")]
	pub key: Option<String>,
	/// Server time spent on the request, in seconds.
	#[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
	pub elapsed_secs: Option<f64>,
	/// Client logging toggle.
	#[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
	pub verbose: Option<bool>,
	#[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
	pub session: Option<Value>,
}

impl Envelope {
	/// Parses a reply body, rejecting anything that is not a JSON object.
	pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
		if !value.is_object() {
			return Err(serde::de::Error::custom(format!("expected a JSON object reply, got {}", kind_of(&value))));
		}
		serde_json::from_value(value)
	}

	pub fn instructions_len(&self) -> usize {
		self.instructions.as_ref().map_or(0, |i| i.len())
	}
}

fn kind_of(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}
