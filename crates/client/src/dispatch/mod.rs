//! Instruction dispatch: turns a diff into [`Dom`] calls.
//!
//! Keys starting with `@` call named handlers with the raw payload. Any
//! other key is a selector whose payload maps property names to values;
//! each name is resolved through the [`Registry`] and applied to every
//! matched element. Traversal names nest a further payload under a related
//! selection, bounded by the depth limit.

mod handlers;
mod registry;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dw_protocol::{Instructions, Target};
use serde_json::{Map, Value};
use tracing::{error, warn};

pub use handlers::render;
pub use registry::{Operation, Registry, RegistryBuilder, UtilityFn};

use crate::dom::{Dom, TraversalOp};
use crate::log::ActionLog;

/// A handler for `@name` keys. Receives the payload and the full key.
pub type NamedHandler<D> = Arc<dyn Fn(&mut Scope<'_, D>, &Value, &str) + Send + Sync>;

const DEFAULT_DEPTH_LIMIT: usize = 32;

pub struct Dispatcher<D: Dom> {
	registry: Registry<D>,
	handlers: HashMap<String, NamedHandler<D>>,
	depth_limit: usize,
}

impl<D: Dom> Dispatcher<D> {
	/// A dispatcher over `registry` with the built-in `@log` and `@alert`.
	pub fn new(registry: Registry<D>) -> Self {
		let handlers = handlers::builtin::<D>()
			.into_iter()
			.map(|(name, handler)| (name.to_string(), handler))
			.collect();
		Self {
			registry,
			handlers,
			depth_limit: DEFAULT_DEPTH_LIMIT,
		}
	}

	pub fn standard() -> Self {
		Self::new(Registry::standard())
	}

	/// Registers (or replaces) the handler for `@name`.
	pub fn handler<F>(mut self, name: impl Into<String>, f: F) -> Self
	where
		F: Fn(&mut Scope<'_, D>, &Value, &str) + Send + Sync + 'static,
	{
		let name = name.into();
		let name = name.strip_prefix(dw_protocol::HANDLER_PREFIX).map(str::to_string).unwrap_or(name);
		self.handlers.insert(name, Arc::new(f));
		self
	}

	pub fn with_depth_limit(mut self, limit: usize) -> Self {
		self.depth_limit = limit;
		self
	}

	pub fn set_depth_limit(&mut self, limit: usize) {
		self.depth_limit = limit;
	}

	pub fn depth_limit(&self) -> usize {
		self.depth_limit
	}

	pub fn registry(&self) -> &Registry<D> {
		&self.registry
	}

	pub fn has_handler(&self, name: &str) -> bool {
		self.handlers.contains_key(name)
	}

	/// Applies every instruction in order.
	pub fn apply(&self, dom: &mut D, log: &mut ActionLog, instructions: &Instructions) {
		for (key, payload) in instructions {
			log.record(format!("Begin processing {key}"), false);
			let mut scope = Scope {
				dispatcher: self,
				dom: &mut *dom,
				log: &mut *log,
				depth: 0,
			};

			match Target::parse(key) {
				Target::Handler(name) => match self.handlers.get(name) {
					Some(handler) => handler(&mut scope, payload, key),
					None => {
						warn!(target = "dw.dispatch", handler = name, "no such handler");
						scope.log.record(format!("No handler registered for {key}"), false);
					}
				},
				Target::Selector(selector) => {
					let Value::Object(properties) = payload else {
						warn!(target = "dw.dispatch", selector, "payload is not an object");
						scope.log.record(format!("Instructions for {selector} are not an object"), false);
						continue;
					};
					let elements = scope.dom.query(selector);
					if scope.dom.is_empty(&elements) {
						warn!(target = "dw.dispatch", selector, "no matching elements");
						scope.log.record(format!("No elements match {selector}"), false);
						continue;
					}
					scope.apply_properties(properties, &elements);
				}
			}
		}
	}
}

impl<D: Dom> fmt::Debug for Dispatcher<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut handlers: Vec<_> = self.handlers.keys().collect();
		handlers.sort();
		f.debug_struct("Dispatcher")
			.field("registry", &self.registry)
			.field("handlers", &handlers)
			.field("depth_limit", &self.depth_limit)
			.finish()
	}
}

/// What a handler or utility sees while one instruction is applied.
pub struct Scope<'a, D: Dom> {
	dispatcher: &'a Dispatcher<D>,
	pub dom: &'a mut D,
	pub log: &'a mut ActionLog,
	depth: usize,
}

impl<'a, D: Dom> Scope<'a, D> {
	/// Traversal nesting of this scope; top-level selectors are depth 0.
	pub fn depth(&self) -> usize {
		self.depth
	}

	pub fn apply_properties(&mut self, properties: &Map<String, Value>, elements: &D::Elements) {
		for (name, value) in properties {
			self.process(name, value, elements);
		}
	}

	/// Resolves `name` and applies `value` to `elements`.
	pub fn process(&mut self, name: &str, value: &Value, elements: &D::Elements) {
		let dispatcher = self.dispatcher;
		match dispatcher.registry.resolve(name) {
			Operation::Attribute => self.dom.set_attribute(elements, name, value),
			Operation::Property => self.dom.set_property(elements, name, value),
			Operation::CallNoArg => self.dom.call(elements, name, &[]),
			Operation::CallOneArg => self.dom.call(elements, name, std::slice::from_ref(value)),
			Operation::CallMultiArg => match value {
				Value::Array(args) => self.dom.call(elements, name, args),
				single => self.dom.call(elements, name, std::slice::from_ref(single)),
			},
			Operation::Utility(utility) => utility(self, name, value, elements),
			Operation::Traverse(op) => self.traverse(op, value, elements),
			Operation::Field => self.dom.set_field(elements, name, value),
		}
	}

	/// `value` is `[argument, payload]` or a bare payload object.
	fn traverse(&mut self, op: TraversalOp, value: &Value, elements: &D::Elements) {
		let (argument, payload) = match value {
			Value::Array(items) => match items.as_slice() {
				[argument, Value::Object(payload)] => (Some(argument).filter(|a| !a.is_null()), payload),
				_ => {
					warn!(target = "dw.dispatch", op = %op, "malformed traversal");
					self.log.record(format!("Malformed {op} instruction: {value}"), false);
					return;
				}
			},
			Value::Object(payload) => (None, payload),
			_ => {
				warn!(target = "dw.dispatch", op = %op, "malformed traversal");
				self.log.record(format!("Malformed {op} instruction: {value}"), false);
				return;
			}
		};

		if self.depth + 1 > self.dispatcher.depth_limit {
			error!(target = "dw.dispatch", depth = self.depth, "Depth limit reached");
			self.log.record(format!("Depth limit reached at {op}"), true);
			return;
		}

		let related = self.dom.traverse(elements, op, argument);
		if self.dom.is_empty(&related) {
			self.log.record(format!("No elements for {op}"), false);
			return;
		}

		let mut nested = Scope {
			dispatcher: self.dispatcher,
			dom: &mut *self.dom,
			log: &mut *self.log,
			depth: self.depth + 1,
		};
		nested.apply_properties(payload, &related);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fake::{DomOp, RecordingDom};
	use serde_json::json;

	fn instructions(value: Value) -> Instructions {
		match value {
			Value::Object(map) => map,
			_ => unreachable!("test instructions are objects"),
		}
	}

	fn run(dispatcher: &Dispatcher<RecordingDom>, dom: &mut RecordingDom, value: Value) -> ActionLog {
		let mut log = ActionLog::new(100, false);
		dispatcher.apply(dom, &mut log, &instructions(value));
		log
	}

	fn sel(ids: &[&str]) -> Vec<String> {
		ids.iter().map(|id| id.to_string()).collect()
	}

	#[test]
	fn properties_route_by_category() {
		let dispatcher = Dispatcher::standard();
		let mut dom = RecordingDom::new().with_match("#a", ["a1", "a2"]);

		run(
			&dispatcher,
			&mut dom,
			json!({ "#a": {
				"class": "on",
				"checked": true,
				"hide": null,
				"text": "hi",
				"fadeTo": [200, 0.5],
				"attr": "title",
				"innerText": "raw"
			}}),
		);

		let a = sel(&["a1", "a2"]);
		assert_eq!(
			dom.mutations(),
			vec![
				DomOp::SetAttribute { elements: a.clone(), name: "class".into(), value: json!("on") },
				DomOp::SetProperty { elements: a.clone(), name: "checked".into(), value: json!(true) },
				DomOp::Call { elements: a.clone(), method: "hide".into(), args: vec![] },
				DomOp::Call { elements: a.clone(), method: "text".into(), args: vec![json!("hi")] },
				DomOp::Call { elements: a.clone(), method: "fadeTo".into(), args: vec![json!(200), json!(0.5)] },
				DomOp::Call { elements: a.clone(), method: "attr".into(), args: vec![json!("title")] },
				DomOp::SetField { elements: a, name: "innerText".into(), value: json!("raw") },
			]
		);
	}

	#[test]
	fn category_wins_over_utility_of_same_name() {
		let registry = RegistryBuilder::standard()
			.utility("text", |scope: &mut Scope<'_, RecordingDom>, _, _, _| scope.dom.alert("utility"))
			.build();
		let dispatcher = Dispatcher::new(registry);
		let mut dom = RecordingDom::new().with_match("#a", ["a"]);

		run(&dispatcher, &mut dom, json!({ "#a": { "text": "hi" } }));

		assert_eq!(
			dom.mutations(),
			vec![DomOp::Call { elements: sel(&["a"]), method: "text".into(), args: vec![json!("hi")] }]
		);
	}

	#[test]
	fn css_expands_pairs() {
		let dispatcher = Dispatcher::standard();
		let mut dom = RecordingDom::new().with_match(".box", ["b"]);

		run(&dispatcher, &mut dom, json!({ ".box": { "css": { "color": "red", "width": "3px" } } }));

		assert_eq!(
			dom.mutations(),
			vec![
				DomOp::Call { elements: sel(&["b"]), method: "css".into(), args: vec![json!("color"), json!("red")] },
				DomOp::Call { elements: sel(&["b"]), method: "css".into(), args: vec![json!("width"), json!("3px")] },
			]
		);
	}

	#[test]
	fn traversal_nests_under_related_selection() {
		let dispatcher = Dispatcher::standard();
		let mut dom = RecordingDom::new().with_match("#list", ["list"]);

		run(
			&dispatcher,
			&mut dom,
			json!({ "#list": { "children": ["li", { "addClass": "seen", "parent": { "text": "top" } }] } }),
		);

		let children = sel(&["list>children(\"li\")"]);
		let parent = sel(&["list>children(\"li\")>parent"]);
		assert_eq!(
			dom.ops(),
			&[
				DomOp::Query("#list".into()),
				DomOp::Traverse { elements: sel(&["list"]), op: TraversalOp::Children, argument: Some(json!("li")) },
				DomOp::Call { elements: children.clone(), method: "addClass".into(), args: vec![json!("seen")] },
				DomOp::Traverse { elements: children, op: TraversalOp::Parent, argument: None },
				DomOp::Call { elements: parent, method: "text".into(), args: vec![json!("top")] },
			]
		);
	}

	#[test]
	fn depth_limit_stops_nesting() {
		let dispatcher = Dispatcher::standard().with_depth_limit(1);
		let mut dom = RecordingDom::new().with_match("#a", ["a"]);

		let log = run(&dispatcher, &mut dom, json!({ "#a": { "parent": { "parent": { "text": "too deep" } } } }));

		assert!(log.contains("Depth limit reached"));
		assert!(dom.mutations().is_empty());
		assert_eq!(dom.ops().iter().filter(|op| matches!(op, DomOp::Traverse { .. })).count(), 1);
	}

	#[test]
	fn named_handlers_get_raw_payload() {
		let dispatcher = Dispatcher::standard().handler("@flash", |scope: &mut Scope<'_, RecordingDom>, payload: &Value, key: &str| {
			scope.dom.alert(&format!("{key}={payload}"));
		});
		let mut dom = RecordingDom::new();

		let log = run(
			&dispatcher,
			&mut dom,
			json!({ "@flash": [1, 2], "@alert": { "a": "one", "b": 2 }, "@log": "hello", "@missing": 1 }),
		);

		assert_eq!(
			dom.mutations(),
			vec![
				DomOp::Alert("@flash=[1,2]".into()),
				DomOp::Alert("one".into()),
				DomOp::Alert("2".into()),
			]
		);
		assert!(log.contains("hello"));
		assert!(log.contains("No handler registered for @missing"));
	}

	#[test]
	fn unmatched_selector_is_skipped() {
		let dispatcher = Dispatcher::standard();
		let mut dom = RecordingDom::new().with_match("#b", ["b"]);

		let log = run(&dispatcher, &mut dom, json!({ "#a": { "text": "x" }, "#b": { "text": "y" } }));

		assert!(log.contains("No elements match #a"));
		assert_eq!(
			dom.mutations(),
			vec![DomOp::Call { elements: sel(&["b"]), method: "text".into(), args: vec![json!("y")] }]
		);
	}
}
