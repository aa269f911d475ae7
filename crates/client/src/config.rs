//! Client loop configuration.

use std::collections::HashMap;
use std::time::Duration;

use dw_protocol::PING_ACTION;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
	/// Base retry delay; grows by one step every ten consecutive failures.
	pub retry_pace_ms: u64,
	/// Re-ping delay when the server does not ask for a repeat.
	pub ping_fallback_ms: u64,
	/// Keep-alive action name.
	pub ping_action: String,
	/// Action log capacity.
	pub log_max: usize,
	/// Initial logging state, until a reply carries `v`.
	pub logging: bool,
	/// Per-action data that replaces whatever data a send provides.
	pub default_data: HashMap<String, Value>,
	/// Maximum nesting of traversal instructions.
	pub depth_limit: usize,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			retry_pace_ms: 2_500,
			ping_fallback_ms: 60_000,
			ping_action: PING_ACTION.to_string(),
			log_max: 500,
			logging: false,
			default_data: HashMap::new(),
			depth_limit: 32,
		}
	}
}

impl ClientConfig {
	/// `retry_pace * (floor(attempt / 10) + 1)`, unbounded.
	pub fn retry_delay(&self, attempt: u32) -> Duration {
		Duration::from_millis(self.retry_pace_ms.saturating_mul(u64::from(attempt / 10) + 1))
	}

	pub fn ping_fallback(&self) -> Duration {
		Duration::from_millis(self.ping_fallback_ms)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn retry_delay_steps_every_ten_failures() {
		let config = ClientConfig::default();
		for attempt in 1..=9 {
			assert_eq!(config.retry_delay(attempt), Duration::from_millis(2_500));
		}
		for attempt in 10..=19 {
			assert_eq!(config.retry_delay(attempt), Duration::from_millis(5_000));
		}
		assert_eq!(config.retry_delay(20), Duration::from_millis(7_500));
		assert_eq!(config.retry_delay(105), Duration::from_millis(27_500));
	}

	#[test]
	fn deserializes_partial_config() {
		let config: ClientConfig = serde_json::from_str(r#"{"retryPaceMs": 100, "defaultData": {"ping": {"page": 1}}}"#).unwrap();
		assert_eq!(config.retry_pace_ms, 100);
		assert_eq!(config.ping_action, "ping");
		assert_eq!(config.default_data["ping"]["page"], 1);
	}
}
