//! Server configuration loaded from JSON.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_SESSION_LIFETIME_SECS: u64 = 60;

/// Defaults applied to every request cycle.
///
/// Handlers may override `repeat`, `verbose`, `forced`, and the interval
/// floor for their own request through the [`Context`](crate::Context).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
	/// Idle seconds before a session is swept.
	pub session_lifetime_secs: u64,
	/// Ask clients to repeat actions.
	pub repeat: bool,
	/// Default force flag for queued changes.
	pub forced: bool,
	/// Turn on client-side logging.
	pub verbose: bool,
	/// Added to every sampled poll interval.
	pub min_update_interval_ms: u64,
	/// Include the full session record in replies (`s`), for debugging.
	pub expose_session: bool,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			session_lifetime_secs: DEFAULT_SESSION_LIFETIME_SECS,
			repeat: false,
			forced: false,
			verbose: false,
			min_update_interval_ms: 0,
			expose_session: false,
		}
	}
}

impl ServerConfig {
	/// Reads a config file; missing keys fall back to defaults.
	pub fn load(path: &Path) -> Result<Self> {
		let content = fs::read_to_string(path)?;
		serde_json::from_str(&content).map_err(|err| Error::Config {
			path: path.to_path_buf(),
			message: err.to_string(),
		})
	}

	pub fn session_lifetime(&self) -> Duration {
		Duration::from_secs(self.session_lifetime_secs)
	}
}
