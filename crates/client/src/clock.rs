//! Monotonic time source for the client scheduler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Time elapsed since the clock's origin.
pub trait Clock: Send + Sync {
	fn now(&self) -> Duration;
}

/// Tokio's clock, so paused-time runtimes work too.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
	origin: Instant,
}

impl Default for SystemClock {
	fn default() -> Self {
		Self { origin: Instant::now() }
	}
}

impl Clock for SystemClock {
	fn now(&self) -> Duration {
		self.origin.elapsed()
	}
}

/// Virtual clock for deterministic loop tests.
#[derive(Debug, Default)]
pub struct ManualClock {
	now_ms: AtomicU64,
}

impl ManualClock {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn advance(&self, by: Duration) {
		self.now_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
	}
}

impl Clock for ManualClock {
	fn now(&self) -> Duration {
		Duration::from_millis(self.now_ms.load(Ordering::SeqCst))
	}
}
