//! Poll interval tuning from system load.
//!
//! The policy is a step function: the first step whose `max_load` covers the
//! sampled load picks an inclusive millisecond range, and the interval is
//! drawn uniformly from it. Loads above every step use the overload range.
//! Thresholds are a tunable policy; the defaults suit a four-core host.

use std::fs;
use std::path::PathBuf;

use rand::Rng;
use tracing::trace;

/// Source of a one-minute load figure.
pub trait LoadSource: Send + Sync {
	fn sample(&self) -> f64;
}

/// Reads the first field of `/proc/loadavg`, or reports 1.0 when unavailable.
#[derive(Debug, Clone)]
pub struct ProcLoadAvg {
	path: PathBuf,
}

impl Default for ProcLoadAvg {
	fn default() -> Self {
		Self {
			path: PathBuf::from("/proc/loadavg"),
		}
	}
}

impl ProcLoadAvg {
	pub fn at(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

impl LoadSource for ProcLoadAvg {
	fn sample(&self) -> f64 {
		fs::read_to_string(&self.path)
			.ok()
			.and_then(|content| content.split_whitespace().next()?.parse().ok())
			.unwrap_or(1.0)
	}
}

/// Fixed load, for hosts without a load figure and for tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticLoad(pub f64);

impl LoadSource for StaticLoad {
	fn sample(&self) -> f64 {
		self.0
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalStep {
	pub max_load: f64,
	pub min_ms: u64,
	pub max_ms: u64,
}

const fn step(max_load: f64, min_ms: u64, max_ms: u64) -> IntervalStep {
	IntervalStep { max_load, min_ms, max_ms }
}

const DEFAULT_STEPS: [IntervalStep; 11] = [
	step(1.5, 1_000, 2_000),
	step(2.5, 1_500, 2_500),
	step(3.0, 2_000, 3_000),
	step(3.25, 2_500, 3_500),
	step(3.45, 3_500, 4_500),
	step(3.55, 4_500, 5_500),
	step(3.65, 5_500, 6_500),
	step(3.75, 6_500, 7_500),
	step(3.85, 7_500, 8_500),
	step(3.95, 9_000, 11_000),
	step(f64::INFINITY, 19_000, 21_000),
];

#[derive(Debug, Clone, PartialEq)]
pub struct IntervalPolicy {
	steps: Vec<IntervalStep>,
}

impl Default for IntervalPolicy {
	fn default() -> Self {
		Self::new(DEFAULT_STEPS.to_vec())
	}
}

impl IntervalPolicy {
	/// Steps are ordered by `max_load`; inverted ranges are normalized.
	pub fn new(mut steps: Vec<IntervalStep>) -> Self {
		steps.sort_by(|a, b| a.max_load.total_cmp(&b.max_load));
		for step in &mut steps {
			if step.min_ms > step.max_ms {
				std::mem::swap(&mut step.min_ms, &mut step.max_ms);
			}
		}
		Self { steps }
	}

	/// A policy that always yields `interval_ms`.
	pub fn fixed(interval_ms: u64) -> Self {
		Self::new(vec![step(f64::INFINITY, interval_ms, interval_ms)])
	}

	/// Range for `load`, as `(min_ms, max_ms)`.
	pub fn range_for(&self, load: f64) -> (u64, u64) {
		self.steps
			.iter()
			.find(|step| load <= step.max_load)
			.or(self.steps.last())
			.map_or((0, 0), |step| (step.min_ms, step.max_ms))
	}

	pub fn sample<R: Rng + ?Sized>(&self, load: f64, rng: &mut R) -> u64 {
		let (min_ms, max_ms) = self.range_for(load);
		let interval = rng.gen_range(min_ms..=max_ms);
		trace!(target = "dw.interval", load, interval, "sampled poll interval");
		interval
	}
}
