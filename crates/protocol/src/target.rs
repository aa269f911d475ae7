//! Diff key classification.

use std::fmt;

use crate::HANDLER_PREFIX;

/// A diff key: either a page-element selector or a named client handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
	/// `@name` keys, carrying `name`.
	Handler(&'a str),
	Selector(&'a str),
}

impl<'a> Target<'a> {
	pub fn parse(key: &'a str) -> Self {
		match key.strip_prefix(HANDLER_PREFIX) {
			Some(name) => Target::Handler(name),
			None => Target::Selector(key),
		}
	}

	/// Builds the diff key for a named handler call.
	pub fn handler_key(name: &str) -> String {
		if name.starts_with(HANDLER_PREFIX) {
			name.to_string()
		} else {
			format!("{HANDLER_PREFIX}{name}")
		}
	}

	pub fn is_handler(&self) -> bool {
		matches!(self, Target::Handler(_))
	}
}

impl fmt::Display for Target<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Target::Handler(name) => write!(f, "{HANDLER_PREFIX}{name}"),
			Target::Selector(selector) => f.write_str(selector),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn prefix_marks_handlers() {
		assert_eq!(Target::parse("@log"), Target::Handler("log"));
		assert_eq!(Target::parse("#main .item"), Target::Selector("#main .item"));
		assert_eq!(Target::parse("0"), Target::Selector("0"));
	}

	#[test]
	fn handler_key_is_idempotent() {
		assert_eq!(Target::handler_key("alert"), "@alert");
		assert_eq!(Target::handler_key("@alert"), "@alert");
	}

	#[test]
	fn display_restores_key() {
		assert_eq!(Target::parse("@log").to_string(), "@log");
		assert_eq!(Target::parse("a.stringquery").to_string(), "a.stringquery");
	}
}
