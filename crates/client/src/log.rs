//! Bounded action log.

use std::collections::VecDeque;

use tracing::{info, trace};

/// The connection's running log.
///
/// Every entry is kept (up to capacity). Entries are echoed as `info`
/// events when forced or when logging is on, and as `trace` otherwise.
#[derive(Debug, Clone)]
pub struct ActionLog {
	entries: VecDeque<String>,
	max: usize,
	logging: bool,
}

impl ActionLog {
	pub fn new(max: usize, logging: bool) -> Self {
		Self {
			entries: VecDeque::new(),
			max: max.max(1),
			logging,
		}
	}

	pub fn record(&mut self, message: impl Into<String>, force: bool) {
		let message = message.into();
		if force || self.logging {
			info!(target = "dw.client", "{message}");
		} else {
			trace!(target = "dw.client", "{message}");
		}

		if self.entries.len() >= self.max {
			self.entries.pop_front();
		}
		self.entries.push_back(message);
	}

	pub fn logging(&self) -> bool {
		self.logging
	}

	pub fn set_logging(&mut self, logging: bool) {
		self.logging = logging;
	}

	pub fn entries(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(String::as_str)
	}

	pub fn contains(&self, needle: &str) -> bool {
		self.entries.iter().any(|entry| entry.contains(needle))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn drops_oldest_beyond_capacity() {
		let mut log = ActionLog::new(3, false);
		for n in 0..5 {
			log.record(format!("entry {n}"), false);
		}
		assert_eq!(log.entries().collect::<Vec<_>>(), ["entry 2", "entry 3", "entry 4"]);
	}

	#[test]
	fn logging_toggle_is_tracked() {
		let mut log = ActionLog::new(10, false);
		assert!(!log.logging());
		log.set_logging(true);
		assert!(log.logging());
	}
}
