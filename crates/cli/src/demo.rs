//! Actions served by `dw serve`.

use std::time::{SystemTime, UNIX_EPOCH};

use dw_server::Router;
use serde_json::{Value, json};

/// `ping` marks the page online, `clock` streams the server time, `echo`
/// logs its input on the client, and `visits` counts requests per session.
pub fn demo_router() -> Router {
	let mut router = Router::new();
	router
		.register("ping", |ctx, _, _| {
			ctx.update_property("#status", "text", "online", None);
		})
		.register("clock", |ctx, _, _| {
			let secs = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
			ctx.update_property("#clock", "text", clock_text(secs), None);
			ctx.repeat = true;
		})
		.register("echo", |ctx, input, _| {
			ctx.call("log", input.clone(), Some(true));
		})
		.register("visits", |ctx, _, _| {
			let visits = ctx.session_get(&["visits"]).and_then(Value::as_u64).unwrap_or(0) + 1;
			ctx.session_set(&["visits"], json!(visits));
			ctx.update_property("#visits", "text", visits, None);
		})
		.register_default(|ctx, _, action| {
			ctx.call("log", format!("demo server has no `{action}` action"), Some(true));
		});
	router
}

/// `HH:MM:SS` UTC.
fn clock_text(unix_secs: u64) -> String {
	let day = unix_secs % 86_400;
	format!("{:02}:{:02}:{:02}", day / 3600, day % 3600 / 60, day % 60)
}
