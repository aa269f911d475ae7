//! In-memory doubles for driving a [`Connection`](crate::Connection) in tests.
//!
//! [`FakeTransport`] replays scripted replies and records every request.
//! [`RecordingDom`] resolves selectors from a fixed table and records every
//! call the dispatcher makes.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dw_protocol::PollRequest;
use parking_lot::Mutex;
use serde_json::Value;

use crate::dom::{Dom, TraversalOp};
use crate::error::TransportError;
use crate::transport::Transport;

#[derive(Debug, Default)]
struct Script {
	replies: VecDeque<Result<Value, TransportError>>,
	sent: Vec<PollRequest>,
}

/// Scripted transport. Clones share the same script.
///
/// With no reply queued a send fails with [`TransportError::Network`].
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
	script: Arc<Mutex<Script>>,
}

impl FakeTransport {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push_reply(&self, body: Value) {
		self.script.lock().replies.push_back(Ok(body));
	}

	pub fn push_error(&self, error: TransportError) {
		self.script.lock().replies.push_back(Err(error));
	}

	pub fn pending_replies(&self) -> usize {
		self.script.lock().replies.len()
	}

	pub fn sent(&self) -> Vec<PollRequest> {
		self.script.lock().sent.clone()
	}

	pub fn take_sent(&self) -> Vec<PollRequest> {
		std::mem::take(&mut self.script.lock().sent)
	}
}

impl Transport for FakeTransport {
	fn send(&mut self, request: PollRequest) -> Pin<Box<dyn Future<Output = Result<Value, TransportError>> + Send + '_>> {
		let reply = {
			let mut script = self.script.lock();
			script.sent.push(request);
			script
				.replies
				.pop_front()
				.unwrap_or_else(|| Err(TransportError::Network("no scripted reply".into())))
		};
		Box::pin(async move { reply })
	}
}

/// One recorded DOM interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum DomOp {
	Query(String),
	SetAttribute { elements: Vec<String>, name: String, value: Value },
	SetProperty { elements: Vec<String>, name: String, value: Value },
	Call { elements: Vec<String>, method: String, args: Vec<Value> },
	SetField { elements: Vec<String>, name: String, value: Value },
	Traverse { elements: Vec<String>, op: TraversalOp, argument: Option<Value> },
	Alert(String),
}

impl DomOp {
	fn is_read(&self) -> bool {
		matches!(self, DomOp::Query(_) | DomOp::Traverse { .. })
	}
}

/// A DOM whose elements are plain ids.
///
/// `query` answers from the table built with [`with_match`](Self::with_match).
/// `traverse` derives ids as `id>op` or `id>op(argument)`, so nested
/// instructions stay visible in the record.
#[derive(Debug, Default)]
pub struct RecordingDom {
	matches: HashMap<String, Vec<String>>,
	ops: Vec<DomOp>,
}

impl RecordingDom {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_match<I, S>(mut self, selector: &str, ids: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.matches.insert(selector.to_string(), ids.into_iter().map(Into::into).collect());
		self
	}

	pub fn ops(&self) -> &[DomOp] {
		&self.ops
	}

	/// Recorded operations minus queries and traversals.
	pub fn mutations(&self) -> Vec<DomOp> {
		self.ops.iter().filter(|op| !op.is_read()).cloned().collect()
	}

	pub fn alerts(&self) -> Vec<String> {
		self.ops
			.iter()
			.filter_map(|op| match op {
				DomOp::Alert(message) => Some(message.clone()),
				_ => None,
			})
			.collect()
	}

	pub fn clear(&mut self) {
		self.ops.clear();
	}
}

impl Dom for RecordingDom {
	type Elements = Vec<String>;

	fn query(&mut self, selector: &str) -> Self::Elements {
		self.ops.push(DomOp::Query(selector.to_string()));
		self.matches.get(selector).cloned().unwrap_or_default()
	}

	fn is_empty(&self, elements: &Self::Elements) -> bool {
		elements.is_empty()
	}

	fn set_attribute(&mut self, elements: &Self::Elements, name: &str, value: &Value) {
		self.ops.push(DomOp::SetAttribute {
			elements: elements.clone(),
			name: name.to_string(),
			value: value.clone(),
		});
	}

	fn set_property(&mut self, elements: &Self::Elements, name: &str, value: &Value) {
		self.ops.push(DomOp::SetProperty {
			elements: elements.clone(),
			name: name.to_string(),
			value: value.clone(),
		});
	}

	fn call(&mut self, elements: &Self::Elements, method: &str, args: &[Value]) {
		self.ops.push(DomOp::Call {
			elements: elements.clone(),
			method: method.to_string(),
			args: args.to_vec(),
		});
	}

	fn set_field(&mut self, elements: &Self::Elements, name: &str, value: &Value) {
		self.ops.push(DomOp::SetField {
			elements: elements.clone(),
			name: name.to_string(),
			value: value.clone(),
		});
	}

	fn traverse(&mut self, elements: &Self::Elements, op: TraversalOp, argument: Option<&Value>) -> Self::Elements {
		self.ops.push(DomOp::Traverse {
			elements: elements.clone(),
			op,
			argument: argument.cloned(),
		});
		elements
			.iter()
			.map(|id| match argument {
				Some(argument) => format!("{id}>{op}({argument})"),
				None => format!("{id}>{op}"),
			})
			.collect()
	}

	fn alert(&mut self, message: &str) {
		self.ops.push(DomOp::Alert(message.to_string()));
	}
}
