//! Change batching and diffing against the session baseline.
//!
//! Handlers queue changes into a [`PendingBatch`]. [`diff_and_commit`] then
//! drops every change the session was already sent, records the rest as the
//! new baseline, and returns them as the instruction diff.

use std::collections::HashSet;

use dw_protocol::{Instructions, Target};
use serde_json::Value;
use tracing::trace;

use crate::session::{CHANGES_FIELD, SessionHandle};

/// Changes queued during one request, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingBatch {
	changes: Instructions,
	forced: HashSet<String>,
}

impl PendingBatch {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queues properties for `target`, merging onto any properties already
	/// queued for it. Later values win. Non-object payloads replace.
	pub fn update(&mut self, target: &str, payload: Value, force: bool) {
		self.force_if(target, force);
		match self.changes.get_mut(target) {
			Some(Value::Object(existing)) if payload.is_object() => {
				if let Value::Object(incoming) = payload {
					existing.extend(incoming);
				}
			}
			_ => {
				self.changes.insert(target.to_string(), payload);
			}
		}
	}

	/// Queues a single property for `target`.
	pub fn update_property(&mut self, target: &str, property: &str, value: Value, force: bool) {
		self.force_if(target, force);
		match self.changes.get_mut(target) {
			Some(Value::Object(existing)) => {
				existing.insert(property.to_string(), value);
			}
			_ => {
				let mut payload = Instructions::new();
				payload.insert(property.to_string(), value);
				self.changes.insert(target.to_string(), Value::Object(payload));
			}
		}
	}

	/// Queues a named handler call, replacing any earlier call to it.
	pub fn call(&mut self, handler: &str, data: Value, force: bool) {
		let key = Target::handler_key(handler);
		self.force_if(&key, force);
		self.changes.insert(key, data);
	}

	/// Queues several targets at once with [`update`](Self::update) semantics.
	pub fn bulk_update(&mut self, targets: Instructions, force: bool) {
		for (target, payload) in targets {
			self.update(&target, payload, force);
		}
	}

	pub fn mark_forced(&mut self, target: &str) {
		self.forced.insert(target.to_string());
	}

	pub fn is_forced(&self, target: &str) -> bool {
		self.forced.contains(target)
	}

	pub fn get(&self, target: &str) -> Option<&Value> {
		self.changes.get(target)
	}

	pub fn changes(&self) -> &Instructions {
		&self.changes
	}

	pub fn len(&self) -> usize {
		self.changes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.changes.is_empty()
	}

	fn force_if(&mut self, target: &str, force: bool) {
		if force {
			self.mark_forced(target);
		}
	}
}

/// Deep value equality: object key order is ignored, scalars compare exactly.
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
	a == b
}

/// Diffs `batch` against the session's last-sent changes and commits the
/// survivors as the new baseline.
///
/// A target is skipped when its stored payload equals the queued one and it
/// is not forced. Everything else is written to `changes.<target>` and
/// returned. The commit happens here, before the reply is delivered.
pub fn diff_and_commit(session: &mut SessionHandle, batch: PendingBatch) -> Instructions {
	let PendingBatch { changes, forced } = batch;
	let mut diff = Instructions::new();

	for (target, change) in changes {
		let unchanged = session
			.read_path(&[CHANGES_FIELD, &target])
			.is_some_and(|stored| structurally_equal(stored, &change));

		if unchanged && !forced.contains(&target) {
			trace!(target = "dw.reconcile", key = %target, "unchanged; omitted");
			continue;
		}

		session.write_path(&[CHANGES_FIELD, &target], change.clone());
		diff.insert(target, change);
	}

	trace!(target = "dw.reconcile", sent = diff.len(), "diff committed");
	diff
}
