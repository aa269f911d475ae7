//! Per-action timers.
//!
//! At most one timer exists per action name; scheduling an action replaces
//! its previous timer. Times are offsets on the connection's [`Clock`](crate::Clock).

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

/// A send waiting for its timer.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSend {
	pub action: String,
	pub data: Option<Value>,
}

#[derive(Debug)]
struct Timer {
	id: u64,
	due: Duration,
	send: PendingSend,
}

#[derive(Debug, Default)]
pub struct Scheduler {
	timers: HashMap<String, Timer>,
	next_id: u64,
}

impl Scheduler {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn schedule(&mut self, now: Duration, delay: Duration, send: PendingSend) {
		self.next_id += 1;
		self.timers.insert(
			send.action.clone(),
			Timer {
				id: self.next_id,
				due: now + delay,
				send,
			},
		);
	}

	/// Drops the action's timer, if any.
	pub fn cancel(&mut self, action: &str) -> bool {
		self.timers.remove(action).is_some()
	}

	pub fn is_scheduled(&self, action: &str) -> bool {
		self.timers.contains_key(action)
	}

	pub fn due_at(&self, action: &str) -> Option<Duration> {
		self.timers.get(action).map(|timer| timer.due)
	}

	pub fn next_due(&self) -> Option<Duration> {
		self.timers.values().map(|timer| timer.due).min()
	}

	/// Removes and returns every send due at `now`, earliest first.
	pub fn take_due(&mut self, now: Duration) -> Vec<PendingSend> {
		let due: Vec<String> = self
			.timers
			.iter()
			.filter(|(_, timer)| timer.due <= now)
			.map(|(action, _)| action.clone())
			.collect();
		let mut fired: Vec<Timer> = due.into_iter().filter_map(|action| self.timers.remove(&action)).collect();
		fired.sort_by_key(|timer| (timer.due, timer.id));
		fired.into_iter().map(|timer| timer.send).collect()
	}

	pub fn len(&self) -> usize {
		self.timers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.timers.is_empty()
	}
}
