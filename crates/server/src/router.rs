//! Action name to handler routing.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dw_protocol::LOG_HANDLER;
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::Context;
use crate::input::decode_input;

/// Handler signature: `(context, parsed input, action name)`.
///
/// Handlers return nothing; their effect is whatever they queue on the
/// context.
pub type ActionHandler = Arc<dyn Fn(&mut Context<'_>, &Value, &str) + Send + Sync>;

/// Routes actions by exact name, then to the default handler.
#[derive(Default, Clone)]
pub struct Router {
	handlers: HashMap<String, ActionHandler>,
	default: Option<ActionHandler>,
}

impl Router {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register<F>(&mut self, action: impl Into<String>, handler: F) -> &mut Self
	where
		F: Fn(&mut Context<'_>, &Value, &str) + Send + Sync + 'static,
	{
		self.handlers.insert(action.into(), Arc::new(handler));
		self
	}

	/// Handler for every action without its own registration.
	pub fn register_default<F>(&mut self, handler: F) -> &mut Self
	where
		F: Fn(&mut Context<'_>, &Value, &str) + Send + Sync + 'static,
	{
		self.default = Some(Arc::new(handler));
		self
	}

	pub fn handles(&self, action: &str) -> bool {
		self.handlers.contains_key(action) || self.default.is_some()
	}

	/// Runs the handler for `action` against `ctx`.
	///
	/// Input is decoded first (see [`decode_input`]); absent input reaches
	/// the handler as `null`. A missing action, or one with no handler and
	/// no default, queues a forced `@log` message instead.
	pub fn dispatch(&self, action: Option<&str>, raw_input: Option<Value>, ctx: &mut Context<'_>) {
		let Some(action) = action else {
			warn!(target = "dw.router", "request without action");
			ctx.call(LOG_HANDLER, "No action specified", Some(true));
			return;
		};

		let handler = self.handlers.get(action).or(self.default.as_ref());
		let Some(handler) = handler else {
			warn!(target = "dw.router", action, "unrecognized action");
			ctx.call(LOG_HANDLER, format!("Unrecognized action: {action}, no default function set."), Some(true));
			return;
		};

		let input = decode_input(raw_input.unwrap_or(Value::Null));
		debug!(target = "dw.router", action, "dispatching");
		handler(ctx, &input, action);
	}
}

impl fmt::Debug for Router {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut actions: Vec<_> = self.handlers.keys().collect();
		actions.sort();
		f.debug_struct("Router")
			.field("actions", &actions)
			.field("default", &self.default.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::ServerConfig;
	use crate::session::{SessionHandle, SessionStore};
	use parking_lot::Mutex;
	use serde_json::json;
	use std::time::Duration;

	fn handle() -> SessionHandle {
		SessionStore::in_memory(Duration::from_secs(60)).get_or_create(None, "test")
	}

	#[test]
	fn exact_name_wins_over_default() {
		let mut router = Router::new();
		router
			.register("greet", |ctx, _, _| ctx.update_property("#out", "text", "exact", None))
			.register_default(|ctx, _, _| ctx.update_property("#out", "text", "default", None));

		let mut session = handle();
		let mut ctx = Context::new(&mut session, &ServerConfig::default());
		router.dispatch(Some("greet"), None, &mut ctx);
		assert_eq!(ctx.pending().get("#out"), Some(&json!({ "text": "exact" })));
	}

	#[test]
	fn default_receives_action_name() {
		let mut router = Router::new();
		router.register_default(|ctx, _, action| ctx.call("log", action.to_string(), None));

		let mut session = handle();
		let mut ctx = Context::new(&mut session, &ServerConfig::default());
		router.dispatch(Some("whatever"), None, &mut ctx);
		assert_eq!(ctx.pending().get("@log"), Some(&json!("whatever")));
	}

	#[test]
	fn unrecognized_action_queues_forced_log() {
		let router = Router::new();
		let mut session = handle();
		let mut ctx = Context::new(&mut session, &ServerConfig::default());
		router.dispatch(Some("nope"), None, &mut ctx);

		assert_eq!(ctx.pending().get("@log"), Some(&json!("Unrecognized action: nope, no default function set.")));
		assert!(ctx.pending().is_forced("@log"));
	}

	#[test]
	fn missing_action_queues_forced_log() {
		let mut router = Router::new();
		router.register_default(|ctx, _, _| ctx.update_property("#never", "text", "ran", None));

		let mut session = handle();
		let mut ctx = Context::new(&mut session, &ServerConfig::default());
		router.dispatch(None, Some(json!({})), &mut ctx);

		assert_eq!(ctx.pending().get("@log"), Some(&json!("No action specified")));
		assert!(ctx.pending().get("#never").is_none());
	}

	#[test]
	fn serialized_input_reaches_handler_decoded() {
		let seen = Arc::new(Mutex::new(Value::Null));
		let mut router = Router::new();
		{
			let seen = Arc::clone(&seen);
			router.register("submit", move |_, input, _| *seen.lock() = input.clone());
		}

		let mut session = handle();
		let mut ctx = Context::new(&mut session, &ServerConfig::default());
		router.dispatch(Some("submit"), Some(json!({ "__serialized": "a=1&b=2" })), &mut ctx);

		assert_eq!(*seen.lock(), json!({ "a": "1", "b": "2" }));
	}

	#[test]
	fn absent_input_is_null() {
		let seen = Arc::new(Mutex::new(json!("unset")));
		let mut router = Router::new();
		{
			let seen = Arc::clone(&seen);
			router.register("ping", move |_, input, _| *seen.lock() = input.clone());
		}

		let mut session = handle();
		let mut ctx = Context::new(&mut session, &ServerConfig::default());
		router.dispatch(Some("ping"), None, &mut ctx);
		assert_eq!(*seen.lock(), Value::Null);
	}
}
