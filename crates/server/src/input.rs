//! Decoding of form-serialized action input.
//!
//! Non-AJAX form submissions arrive as `{ "__serialized": "a=1&b%5B%5D=2" }`.
//! The string is decoded with query-string rules before the handler sees it:
//! `name[]` appends to an array, `name[key]` nests an object, and a repeated
//! plain name keeps its last value.

use dw_protocol::SERIALIZED_KEY;
use serde_json::{Map, Value};
use url::form_urlencoded;

/// Replaces a serialized form payload with its decoded mapping.
///
/// Anything else passes through untouched.
pub fn decode_input(raw: Value) -> Value {
	let serialized = match &raw {
		Value::Object(map) => map.get(SERIALIZED_KEY).and_then(Value::as_str),
		_ => None,
	};
	if let Some(query) = serialized {
		return Value::Object(parse_query(query));
	}
	raw
}

pub fn parse_query(query: &str) -> Map<String, Value> {
	let mut out = Map::new();
	for (name, value) in form_urlencoded::parse(query.as_bytes()) {
		let (base, segments) = split_brackets(&name);
		if base.is_empty() {
			continue;
		}
		insert_nested(&mut out, base, &segments, Value::String(value.into_owned()));
	}
	out
}

fn split_brackets(name: &str) -> (&str, Vec<&str>) {
	let Some(open) = name.find('[') else {
		return (name, Vec::new());
	};

	let mut segments = Vec::new();
	let mut rest = &name[open..];
	while let Some(inner) = rest.strip_prefix('[') {
		let Some(close) = inner.find(']') else {
			break;
		};
		segments.push(&inner[..close]);
		rest = &inner[close + 1..];
	}

	if segments.is_empty() {
		(name, segments)
	} else {
		(&name[..open], segments)
	}
}

fn insert_nested(map: &mut Map<String, Value>, key: &str, segments: &[&str], value: Value) {
	let Some((next, rest)) = segments.split_first() else {
		map.insert(key.to_string(), value);
		return;
	};
	let slot = map.entry(key.to_string()).or_insert(Value::Null);
	insert_segment(slot, next, rest, value);
}

fn insert_segment(slot: &mut Value, segment: &str, rest: &[&str], value: Value) {
	if segment.is_empty() {
		if !slot.is_array() {
			*slot = Value::Array(Vec::new());
		}
		let Value::Array(items) = slot else {
			return;
		};
		match rest.split_first() {
			None => items.push(value),
			Some((next, rest)) => {
				let mut child = Value::Null;
				insert_segment(&mut child, next, rest, value);
				items.push(child);
			}
		}
	} else {
		if !slot.is_object() {
			*slot = Value::Object(Map::new());
		}
		let Value::Object(map) = slot else {
			return;
		};
		insert_nested(map, segment, rest, value);
	}
}
