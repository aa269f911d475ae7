//! Per-connection session state with idle eviction.
//!
//! Each session is a JSON object record:
//!
//! ```json
//! { "birth": 1700000000000, "touched": 1700000042000, "changes": { "#clock": { "text": "12:00" } } }
//! ```
//!
//! `changes` holds the last payload sent for every target. Records are
//! loaded into a [`SessionHandle`] for one request cycle and written back
//! with [`SessionStore::commit`].

mod backend;
mod key;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, warn};

pub use backend::{MemoryBackend, SessionBackend};
pub use key::generate_key;

use crate::clock::{Clock, SystemClock};

pub const BIRTH_FIELD: &str = "birth";
pub const TOUCHED_FIELD: &str = "touched";
pub const CHANGES_FIELD: &str = "changes";

/// A session record borrowed for one request cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionHandle {
	key: String,
	record: Value,
	created: bool,
}

impl SessionHandle {
	fn fresh(key: String, now_ms: u64) -> Self {
		let mut record = Map::new();
		record.insert(BIRTH_FIELD.to_string(), Value::from(now_ms));
		Self {
			key,
			record: Value::Object(record),
			created: true,
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	/// Whether the record was created (or reset) for this request.
	pub fn is_new(&self) -> bool {
		self.created
	}

	pub fn birth(&self) -> Option<u64> {
		self.read_path(&[BIRTH_FIELD]).and_then(Value::as_u64)
	}

	pub fn touched(&self) -> Option<u64> {
		self.read_path(&[TOUCHED_FIELD]).and_then(Value::as_u64)
	}

	/// The whole record.
	pub fn record(&self) -> &Value {
		&self.record
	}

	/// Drills into the record one segment at a time.
	///
	/// Returns `None` when a segment is missing or an intermediate value is
	/// not an object. An empty path yields the whole record.
	pub fn read_path(&self, path: &[&str]) -> Option<&Value> {
		path.iter()
			.try_fold(&self.record, |value, segment| value.as_object()?.get(*segment))
	}

	/// Writes `value` at `path`, creating (or replacing non-object)
	/// intermediates along the way.
	///
	/// An empty path replaces the whole record, but only with an object.
	pub fn write_path(&mut self, path: &[&str], value: Value) {
		let Some((leaf, parents)) = path.split_last() else {
			if value.is_object() {
				self.record = value;
			}
			return;
		};

		let mut cursor = &mut self.record;
		for segment in parents {
			cursor = ensure_object(cursor)
				.entry(segment.to_string())
				.or_insert_with(|| Value::Object(Map::new()));
		}
		ensure_object(cursor).insert(leaf.to_string(), value);
	}
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
	if !value.is_object() {
		*value = Value::Object(Map::new());
	}
	match value {
		Value::Object(map) => map,
		_ => unreachable!("value was just replaced with an object"),
	}
}

/// Owns every session record and applies the idle lifetime.
pub struct SessionStore<B = MemoryBackend> {
	backend: B,
	lifetime: Duration,
	clock: Arc<dyn Clock>,
}

impl SessionStore<MemoryBackend> {
	pub fn in_memory(lifetime: Duration) -> Self {
		Self::new(MemoryBackend::new(), lifetime, Arc::new(SystemClock))
	}
}

impl<B: SessionBackend> SessionStore<B> {
	pub fn new(backend: B, lifetime: Duration, clock: Arc<dyn Clock>) -> Self {
		Self {
			backend,
			lifetime,
			clock,
		}
	}

	pub fn lifetime(&self) -> Duration {
		self.lifetime
	}

	pub fn backend(&self) -> &B {
		&self.backend
	}

	pub fn contains(&self, key: &str) -> bool {
		self.backend.load(key).is_some()
	}

	/// Loads the session for `key`, or starts a new one under a fresh key.
	///
	/// An absent or unknown key yields a new session keyed from `client`.
	/// A known key whose record is not an object is reset in place. The
	/// returned handle is already touched, and the touch is saved so a
	/// concurrent sweep sees the session as active.
	pub fn get_or_create(&mut self, key: Option<&str>, client: &str) -> SessionHandle {
		let now = self.clock.now_ms();
		let mut handle = match key.map(|key| (key, self.backend.load(key))) {
			Some((key, Some(record))) if record.is_object() => SessionHandle {
				key: key.to_string(),
				record,
				created: false,
			},
			Some((key, Some(_))) => {
				warn!(target = "dw.session", key, "session record is not an object; resetting");
				SessionHandle::fresh(key.to_string(), now)
			}
			Some((key, None)) => {
				let handle = SessionHandle::fresh(generate_key(client), now);
				debug!(target = "dw.session", requested = key, issued = handle.key(), "unknown session key; issuing a new one");
				handle
			}
			None => {
				let handle = SessionHandle::fresh(generate_key(client), now);
				debug!(target = "dw.session", issued = handle.key(), "new session");
				handle
			}
		};
		if handle.birth().is_none() {
			handle.write_path(&[BIRTH_FIELD], Value::from(now));
		}
		self.touch(&mut handle);
		self.backend.save(&handle.key, handle.record.clone());
		handle
	}

	/// Refreshes the handle's touched timestamp.
	pub fn touch(&self, handle: &mut SessionHandle) {
		handle.write_path(&[TOUCHED_FIELD], Value::from(self.clock.now_ms()));
	}

	/// Writes the handle back.
	pub fn commit(&mut self, handle: SessionHandle) {
		self.backend.save(&handle.key, handle.record);
	}

	/// Deletes every session idle longer than the lifetime, except
	/// `exclude`. Records without a touched timestamp are left alone.
	///
	/// Returns the evicted keys.
	pub fn sweep(&mut self, exclude: &str) -> Vec<String> {
		let now = self.clock.now_ms();
		let lifetime_ms = self.lifetime.as_millis() as u64;
		let mut evicted = Vec::new();

		for key in self.backend.keys() {
			if key == exclude {
				continue;
			}
			let touched = self
				.backend
				.load(&key)
				.and_then(|record| record.get(TOUCHED_FIELD).and_then(Value::as_u64));
			let Some(touched) = touched else {
				continue;
			};
			if now.saturating_sub(touched) > lifetime_ms {
				self.backend.remove(&key);
				evicted.push(key);
			}
		}

		if !evicted.is_empty() {
			debug!(target = "dw.session", count = evicted.len(), "evicted idle sessions");
		}
		evicted
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::clock::ManualClock;
	use serde_json::json;

	fn store_with_clock(lifetime_secs: u64) -> (SessionStore, Arc<ManualClock>) {
		let clock = Arc::new(ManualClock::new(1_000_000));
		let store = SessionStore::new(MemoryBackend::new(), Duration::from_secs(lifetime_secs), clock.clone());
		(store, clock)
	}

	#[test]
	fn missing_key_creates_fresh_session() {
		let (mut store, _) = store_with_clock(60);
		let handle = store.get_or_create(None, "127.0.0.1");

		assert!(handle.is_new());
		assert_eq!(handle.key().len(), 64);
		assert_eq!(handle.birth(), Some(1_000_000));
		assert_eq!(handle.touched(), Some(1_000_000));
		assert_eq!(handle.read_path(&[CHANGES_FIELD]), None);
	}

	#[test]
	fn unknown_key_is_replaced() {
		let (mut store, _) = store_with_clock(60);
		let handle = store.get_or_create(Some("forged"), "127.0.0.1");
		assert!(handle.is_new());
		assert_ne!(handle.key(), "forged");
	}

	#[test]
	fn known_key_keeps_birth_and_refreshes_touch() {
		let (mut store, clock) = store_with_clock(60);
		let handle = store.get_or_create(None, "127.0.0.1");
		let key = handle.key().to_string();
		store.commit(handle);

		clock.advance(Duration::from_secs(5));
		let handle = store.get_or_create(Some(&key), "127.0.0.1");
		assert!(!handle.is_new());
		assert_eq!(handle.key(), key);
		assert_eq!(handle.birth(), Some(1_000_000));
		assert_eq!(handle.touched(), Some(1_005_000));
	}

	#[test]
	fn corrupt_record_is_reset_under_same_key() {
		let (mut store, _) = store_with_clock(60);
		store.backend.save("S1", json!("garbage"));

		let handle = store.get_or_create(Some("S1"), "127.0.0.1");
		assert!(handle.is_new());
		assert_eq!(handle.key(), "S1");
		assert_eq!(handle.read_path(&[CHANGES_FIELD, "#a"]), None);
	}

	#[test]
	fn read_path_stops_at_non_objects() {
		let (mut store, _) = store_with_clock(60);
		let mut handle = store.get_or_create(None, "c");
		handle.write_path(&["changes", "#a"], json!("text"));

		assert_eq!(handle.read_path(&["changes", "#a"]), Some(&json!("text")));
		assert_eq!(handle.read_path(&["changes", "#a", "deeper"]), None);
		assert_eq!(handle.read_path(&["changes", "#missing"]), None);
		assert!(handle.read_path(&[]).is_some_and(Value::is_object));
	}

	#[test]
	fn write_path_replaces_scalar_intermediates() {
		let (mut store, _) = store_with_clock(60);
		let mut handle = store.get_or_create(None, "c");
		handle.write_path(&["changes"], json!(42));
		handle.write_path(&["changes", "#a", "text"], json!("hi"));

		assert_eq!(handle.read_path(&["changes"]), Some(&json!({ "#a": { "text": "hi" } })));
	}

	#[test]
	fn write_empty_path_only_accepts_objects() {
		let (mut store, _) = store_with_clock(60);
		let mut handle = store.get_or_create(None, "c");
		handle.write_path(&[], json!("nope"));
		assert!(handle.record().is_object());

		handle.write_path(&[], json!({ "birth": 1 }));
		assert_eq!(handle.record(), &json!({ "birth": 1 }));
	}

	#[test]
	fn sweep_evicts_idle_sessions_but_not_excluded() {
		let (mut store, clock) = store_with_clock(60);
		let stale = store.get_or_create(None, "a");
		let stale_key = stale.key().to_string();
		store.commit(stale);
		let active = store.get_or_create(None, "b");
		let active_key = active.key().to_string();
		store.commit(active);

		clock.advance(Duration::from_secs(61));
		let evicted = store.sweep(&active_key);

		assert_eq!(evicted, vec![stale_key.clone()]);
		assert!(!store.contains(&stale_key));
		assert!(store.contains(&active_key));
	}

	#[test]
	fn touch_is_saved_before_commit() {
		let (mut store, clock) = store_with_clock(60);
		let handle = store.get_or_create(None, "a");
		let key = handle.key().to_string();
		store.commit(handle);

		clock.advance(Duration::from_secs(61));
		let in_flight = store.get_or_create(Some(&key), "a");
		assert!(store.sweep("other").is_empty());
		assert!(store.contains(&key));
		assert_eq!(in_flight.key(), key);
	}

	#[test]
	fn sweep_keeps_sessions_at_exact_lifetime() {
		let (mut store, clock) = store_with_clock(60);
		let handle = store.get_or_create(None, "a");
		let key = handle.key().to_string();
		store.commit(handle);

		clock.advance(Duration::from_secs(60));
		assert!(store.sweep("other").is_empty());
		assert!(store.contains(&key));
	}

	#[test]
	fn sweep_ignores_records_without_touch() {
		let (mut store, clock) = store_with_clock(1);
		store.backend.save("legacy", json!({ "birth": 0 }));
		clock.advance(Duration::from_secs(3600));
		assert!(store.sweep("other").is_empty());
		assert!(store.contains("legacy"));
	}
}
