//! The DOM capability the dispatcher drives.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::Error;

/// Abstract page access.
///
/// `Elements` is a selection: whatever the host uses to stand for the set
/// of elements a selector matched. Every mutating call applies to the whole
/// selection.
pub trait Dom: 'static {
	type Elements;

	fn query(&mut self, selector: &str) -> Self::Elements;

	fn is_empty(&self, elements: &Self::Elements) -> bool;

	fn set_attribute(&mut self, elements: &Self::Elements, name: &str, value: &Value);

	fn set_property(&mut self, elements: &Self::Elements, name: &str, value: &Value);

	/// Invokes a selection method such as `text` or `animate`.
	fn call(&mut self, elements: &Self::Elements, method: &str, args: &[Value]);

	/// Raw assignment for names no registry entry claims.
	fn set_field(&mut self, elements: &Self::Elements, name: &str, value: &Value);

	/// Moves to a related selection. `argument` is the optional filter
	/// selector or index.
	fn traverse(&mut self, elements: &Self::Elements, op: TraversalOp, argument: Option<&Value>) -> Self::Elements;

	fn alert(&mut self, message: &str);
}

/// Selection traversals the dispatcher can nest instructions under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraversalOp {
	Children,
	Eq,
	Filter,
	Find,
	Has,
	Is,
	Next,
	NextAll,
	NextUntil,
	Not,
	Parent,
	Parents,
	ParentsUntil,
	Prev,
	PrevAll,
	PrevUntil,
	Siblings,
}

impl TraversalOp {
	pub const ALL: [TraversalOp; 17] = [
		Self::Children,
		Self::Eq,
		Self::Filter,
		Self::Find,
		Self::Has,
		Self::Is,
		Self::Next,
		Self::NextAll,
		Self::NextUntil,
		Self::Not,
		Self::Parent,
		Self::Parents,
		Self::ParentsUntil,
		Self::Prev,
		Self::PrevAll,
		Self::PrevUntil,
		Self::Siblings,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Children => "children",
			Self::Eq => "eq",
			Self::Filter => "filter",
			Self::Find => "find",
			Self::Has => "has",
			Self::Is => "is",
			Self::Next => "next",
			Self::NextAll => "nextAll",
			Self::NextUntil => "nextUntil",
			Self::Not => "not",
			Self::Parent => "parent",
			Self::Parents => "parents",
			Self::ParentsUntil => "parentsUntil",
			Self::Prev => "prev",
			Self::PrevAll => "prevAll",
			Self::PrevUntil => "prevUntil",
			Self::Siblings => "siblings",
		}
	}
}

impl FromStr for TraversalOp {
	type Err = Error;

	fn from_str(name: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|op| op.as_str() == name)
			.ok_or_else(|| Error::NotTraversal(name.to_string()))
	}
}

impl fmt::Display for TraversalOp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
