//! The handler-facing view of one request cycle.

use dw_protocol::Instructions;
use serde_json::{Map, Value};

use crate::config::ServerConfig;
use crate::reconcile::PendingBatch;
use crate::session::SessionHandle;

/// Mutable request state handed to action handlers.
///
/// Handlers queue changes here; nothing is sent until the cycle ends and
/// the batch is reconciled. Every queueing method takes `force: Option<bool>`;
/// `None` falls back to [`Context::forced`].
pub struct Context<'a> {
	session: &'a mut SessionHandle,
	batch: PendingBatch,
	/// Ask the client to repeat this action.
	pub repeat: bool,
	/// Turn client logging on or off.
	pub verbose: bool,
	/// Default force flag.
	pub forced: bool,
	/// Floor added to the poll interval, in milliseconds.
	pub min_update_interval: u64,
	update_interval: Option<u64>,
}

/// What a finished [`Context`] leaves behind for the reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Directives {
	pub repeat: bool,
	pub verbose: bool,
	pub min_update_interval: u64,
	pub update_interval: Option<u64>,
}

impl<'a> Context<'a> {
	pub fn new(session: &'a mut SessionHandle, config: &ServerConfig) -> Self {
		Self {
			session,
			batch: PendingBatch::new(),
			repeat: config.repeat,
			verbose: config.verbose,
			forced: config.forced,
			min_update_interval: config.min_update_interval_ms,
			update_interval: None,
		}
	}

	pub fn session_key(&self) -> &str {
		self.session.key()
	}

	/// Merges `payload` properties onto `target`.
	pub fn update(&mut self, target: &str, payload: Value, force: Option<bool>) {
		let force = self.resolve(force);
		self.batch.update(target, payload, force);
	}

	pub fn update_property(&mut self, target: &str, property: &str, value: impl Into<Value>, force: Option<bool>) {
		let force = self.resolve(force);
		self.batch.update_property(target, property, value.into(), force);
	}

	/// Calls the client handler `handler` (without the `@` prefix) with `data`.
	pub fn call(&mut self, handler: &str, data: impl Into<Value>, force: Option<bool>) {
		let force = self.resolve(force);
		self.batch.call(handler, data.into(), force);
	}

	pub fn bulk_update(&mut self, targets: Instructions, force: Option<bool>) {
		let force = self.resolve(force);
		self.batch.bulk_update(targets, force);
	}

	/// Sets one `property` on many targets, given as `target -> value`.
	pub fn bulk_update_property(&mut self, property: &str, targets: Map<String, Value>, force: Option<bool>) {
		let force = self.resolve(force);
		for (target, value) in targets {
			self.batch.update_property(&target, property, value, force);
		}
	}

	/// Pins the poll interval for this reply instead of sampling it from load.
	pub fn set_update_interval(&mut self, interval_ms: u64) {
		self.update_interval = Some(interval_ms);
	}

	pub fn session_get(&self, path: &[&str]) -> Option<&Value> {
		self.session.read_path(path)
	}

	pub fn session_set(&mut self, path: &[&str], value: Value) {
		self.session.write_path(path, value);
	}

	pub fn pending(&self) -> &PendingBatch {
		&self.batch
	}

	pub fn finish(self) -> (PendingBatch, Directives) {
		let directives = Directives {
			repeat: self.repeat,
			verbose: self.verbose,
			min_update_interval: self.min_update_interval,
			update_interval: self.update_interval,
		};
		(self.batch, directives)
	}

	fn resolve(&self, force: Option<bool>) -> bool {
		force.unwrap_or(self.forced)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::session::SessionStore;
	use serde_json::json;
	use std::time::Duration;

	fn handle() -> SessionHandle {
		SessionStore::in_memory(Duration::from_secs(60)).get_or_create(None, "test")
	}

	#[test]
	fn force_none_uses_context_default() {
		let mut session = handle();
		let mut ctx = Context::new(&mut session, &ServerConfig::default());

		ctx.update("#a", json!({ "text": "x" }), None);
		ctx.forced = true;
		ctx.update("#b", json!({ "text": "y" }), None);
		ctx.update("#c", json!({ "text": "z" }), Some(false));

		let (batch, _) = ctx.finish();
		assert!(!batch.is_forced("#a"));
		assert!(batch.is_forced("#b"));
		assert!(!batch.is_forced("#c"));
	}

	#[test]
	fn config_seeds_directives() {
		let config = ServerConfig {
			repeat: true,
			verbose: true,
			min_update_interval_ms: 250,
			..Default::default()
		};
		let mut session = handle();
		let mut ctx = Context::new(&mut session, &config);
		ctx.set_update_interval(900);

		let (_, directives) = ctx.finish();
		assert_eq!(
			directives,
			Directives {
				repeat: true,
				verbose: true,
				min_update_interval: 250,
				update_interval: Some(900),
			}
		);
	}

	#[test]
	fn bulk_update_property_fans_out() {
		let mut session = handle();
		let mut ctx = Context::new(&mut session, &ServerConfig::default());

		let mut targets = Map::new();
		targets.insert("#a".to_string(), json!("A"));
		targets.insert("#b".to_string(), json!("B"));
		ctx.bulk_update_property("text", targets, Some(true));

		assert_eq!(ctx.pending().get("#a"), Some(&json!({ "text": "A" })));
		assert_eq!(ctx.pending().get("#b"), Some(&json!({ "text": "B" })));
		assert!(ctx.pending().is_forced("#b"));
	}

	#[test]
	fn session_state_is_shared_with_handle() {
		let mut session = handle();
		{
			let mut ctx = Context::new(&mut session, &ServerConfig::default());
			ctx.session_set(&["visits"], json!(3));
			assert_eq!(ctx.session_get(&["visits"]), Some(&json!(3)));
		}
		assert_eq!(session.read_path(&["visits"]), Some(&json!(3)));
	}
}
