//! Persistence seam for session records.

use std::collections::HashMap;

use serde_json::Value;

/// Key-value persistence for session records.
///
/// Implementations only store and enumerate; lifetime and eviction policy
/// belong to [`SessionStore`](super::SessionStore).
pub trait SessionBackend: Send {
	fn load(&self, key: &str) -> Option<Value>;
	fn save(&mut self, key: &str, record: Value);
	fn remove(&mut self, key: &str) -> Option<Value>;
	fn keys(&self) -> Vec<String>;
}

/// Process-local backend.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
	records: HashMap<String, Value>,
}

impl MemoryBackend {
	pub fn new() -> Self {
		Self::default()
	}
}

impl SessionBackend for MemoryBackend {
	fn load(&self, key: &str) -> Option<Value> {
		self.records.get(key).cloned()
	}

	fn save(&mut self, key: &str, record: Value) {
		self.records.insert(key.to_string(), record);
	}

	fn remove(&mut self, key: &str) -> Option<Value> {
		self.records.remove(key)
	}

	fn keys(&self) -> Vec<String> {
		self.records.keys().cloned().collect()
	}
}
