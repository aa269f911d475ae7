//! Built-in named handlers and utilities.

use dw_protocol::{ALERT_HANDLER, LOG_HANDLER};
use serde_json::Value;
use tracing::warn;

use std::sync::Arc;

use super::{NamedHandler, Scope};
use crate::dom::Dom;

/// `@log` and `@alert`.
pub(super) fn builtin<D: Dom>() -> Vec<(&'static str, NamedHandler<D>)> {
	vec![
		(LOG_HANDLER, Arc::new(log::<D>) as NamedHandler<D>),
		(ALERT_HANDLER, Arc::new(alert::<D>) as NamedHandler<D>),
	]
}

fn log<D: Dom>(scope: &mut Scope<'_, D>, payload: &Value, _key: &str) {
	scope.log.record("Data returned, logging data.", false);
	scope.log.record(render(payload), true);
}

/// One alert per member for objects and arrays, otherwise one alert.
fn alert<D: Dom>(scope: &mut Scope<'_, D>, payload: &Value, _key: &str) {
	match payload {
		Value::Object(map) => map.values().for_each(|value| scope.dom.alert(&render(value))),
		Value::Array(items) => items.iter().for_each(|value| scope.dom.alert(&render(value))),
		other => scope.dom.alert(&render(other)),
	}
}

/// `css` and `data`: each `{key: value}` member becomes `name(key, value)`.
pub(super) fn pairwise<D: Dom>(scope: &mut Scope<'_, D>, name: &str, value: &Value, elements: &D::Elements) {
	let Value::Object(pairs) = value else {
		warn!(target = "dw.dispatch", utility = name, "expected an object of pairs");
		scope.log.record(format!("{name} expects an object, got {value}"), false);
		return;
	};
	for (key, value) in pairs {
		scope.dom.call(elements, name, &[Value::String(key.clone()), value.clone()]);
	}
}

/// Strings verbatim, everything else as JSON text.
pub fn render(value: &Value) -> String {
	match value {
		Value::String(text) => text.clone(),
		other => other.to_string(),
	}
}
