//! Name resolution for instruction properties.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::Scope;
use crate::dom::{Dom, TraversalOp};
use crate::error::{Error, Result};

/// A utility: custom handling for one property name.
pub type UtilityFn<D> = Arc<dyn Fn(&mut Scope<'_, D>, &str, &Value, &<D as Dom>::Elements) + Send + Sync>;

/// What the dispatcher does with one `(name, value)` pair.
///
/// Resolution order is the variant order: the first category claiming a
/// name wins, and [`Operation::Field`] catches everything else.
pub enum Operation<'r, D: Dom> {
	Attribute,
	Property,
	CallNoArg,
	CallOneArg,
	CallMultiArg,
	Utility(&'r UtilityFn<D>),
	Traverse(TraversalOp),
	Field,
}

impl<D: Dom> fmt::Debug for Operation<'_, D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Attribute => f.write_str("Attribute"),
			Self::Property => f.write_str("Property"),
			Self::CallNoArg => f.write_str("CallNoArg"),
			Self::CallOneArg => f.write_str("CallOneArg"),
			Self::CallMultiArg => f.write_str("CallMultiArg"),
			Self::Utility(_) => f.write_str("Utility"),
			Self::Traverse(op) => write!(f, "Traverse({op})"),
			Self::Field => f.write_str("Field"),
		}
	}
}

enum Utility<D: Dom> {
	Custom(UtilityFn<D>),
	Traverse(TraversalOp),
}

impl<D: Dom> Clone for Utility<D> {
	fn clone(&self) -> Self {
		match self {
			Self::Custom(f) => Self::Custom(Arc::clone(f)),
			Self::Traverse(op) => Self::Traverse(*op),
		}
	}
}

const ATTRIBUTES: &[&str] = &["href", "class"];
const ATTRIBUTE_PATTERNS: &[&str] = &["data-"];
const PROPERTIES: &[&str] = &["checked", "selected", "nodeType"];
const NO_ARG: &[&str] = &["hide", "show"];
const ONE_ARG: &[&str] = &[
	"addClass",
	"after",
	"append",
	"appendTo",
	"before",
	"detach",
	"empty",
	"fadeIn",
	"fadeOut",
	"height",
	"html",
	"insertAfter",
	"insertBefore",
	"prepend",
	"prependTo",
	"remove",
	"removeAttr",
	"removeClass",
	"removeData",
	"removeProp",
	"replaceWith",
	"scrollLeft",
	"scrollTop",
	"text",
	"toggleClass",
	"unwrap",
	"val",
	"width",
	"wrap",
	"wrapAll",
	"wrapInner",
];
const MULTI_ARG: &[&str] = &["animate", "attr", "fadeTo", "prop"];

/// Collects the name tables, then freezes them into a [`Registry`].
pub struct RegistryBuilder<D: Dom> {
	attributes: HashSet<String>,
	attribute_patterns: Vec<String>,
	properties: HashSet<String>,
	no_arg: HashSet<String>,
	one_arg: HashSet<String>,
	multi_arg: HashSet<String>,
	utilities: HashMap<String, Utility<D>>,
}

impl<D: Dom> RegistryBuilder<D> {
	/// No names at all; every property becomes a raw field write.
	pub fn empty() -> Self {
		Self {
			attributes: HashSet::new(),
			attribute_patterns: Vec::new(),
			properties: HashSet::new(),
			no_arg: HashSet::new(),
			one_arg: HashSet::new(),
			multi_arg: HashSet::new(),
			utilities: HashMap::new(),
		}
	}

	/// The jQuery-shaped tables plus the `css`/`data` utilities and every
	/// traversal.
	pub fn standard() -> Self {
		let owned = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<HashSet<_>>();

		let mut builder = Self {
			attributes: owned(ATTRIBUTES),
			attribute_patterns: ATTRIBUTE_PATTERNS.iter().map(|p| p.to_string()).collect(),
			properties: owned(PROPERTIES),
			no_arg: owned(NO_ARG),
			one_arg: owned(ONE_ARG),
			multi_arg: owned(MULTI_ARG),
			utilities: HashMap::new(),
		};
		builder = builder.utility("css", super::handlers::pairwise::<D>).utility("data", super::handlers::pairwise::<D>);
		for op in TraversalOp::ALL {
			builder.utilities.insert(op.as_str().to_string(), Utility::Traverse(op));
		}
		builder
	}

	pub fn attribute(mut self, name: impl Into<String>) -> Self {
		self.attributes.insert(name.into());
		self
	}

	/// Claims every name containing `fragment` as an attribute.
	pub fn attribute_pattern(mut self, fragment: impl Into<String>) -> Self {
		self.attribute_patterns.push(fragment.into());
		self
	}

	pub fn property(mut self, name: impl Into<String>) -> Self {
		self.properties.insert(name.into());
		self
	}

	pub fn no_arg(mut self, name: impl Into<String>) -> Self {
		self.no_arg.insert(name.into());
		self
	}

	pub fn one_arg(mut self, name: impl Into<String>) -> Self {
		self.one_arg.insert(name.into());
		self
	}

	pub fn multi_arg(mut self, name: impl Into<String>) -> Self {
		self.multi_arg.insert(name.into());
		self
	}

	pub fn utility<F>(mut self, name: impl Into<String>, f: F) -> Self
	where
		F: Fn(&mut Scope<'_, D>, &str, &Value, &D::Elements) + Send + Sync + 'static,
	{
		self.utilities.insert(name.into(), Utility::Custom(Arc::new(f)));
		self
	}

	/// Makes `alias` behave exactly like `target`.
	///
	/// `target` must be a utility registered so far, or `traverse`, in which
	/// case `alias` itself must name a traversal operation. Resolution
	/// happens now; later changes to `target` do not follow.
	pub fn alias(mut self, alias: impl Into<String>, target: &str) -> Result<Self> {
		let alias = alias.into();
		let resolved = match self.utilities.get(target) {
			Some(utility) => utility.clone(),
			None if target == "traverse" => Utility::Traverse(alias.parse()?),
			None => {
				return Err(Error::UnknownAlias {
					alias,
					target: target.to_string(),
				});
			}
		};
		self.utilities.insert(alias, resolved);
		Ok(self)
	}

	pub fn build(self) -> Registry<D> {
		Registry {
			attributes: self.attributes,
			attribute_patterns: self.attribute_patterns,
			properties: self.properties,
			no_arg: self.no_arg,
			one_arg: self.one_arg,
			multi_arg: self.multi_arg,
			utilities: self.utilities,
		}
	}
}

impl<D: Dom> Default for RegistryBuilder<D> {
	fn default() -> Self {
		Self::standard()
	}
}

/// Frozen name tables.
pub struct Registry<D: Dom> {
	attributes: HashSet<String>,
	attribute_patterns: Vec<String>,
	properties: HashSet<String>,
	no_arg: HashSet<String>,
	one_arg: HashSet<String>,
	multi_arg: HashSet<String>,
	utilities: HashMap<String, Utility<D>>,
}

impl<D: Dom> Registry<D> {
	pub fn standard() -> Self {
		RegistryBuilder::standard().build()
	}

	pub fn resolve(&self, name: &str) -> Operation<'_, D> {
		if self.attributes.contains(name) || self.attribute_patterns.iter().any(|p| name.contains(p.as_str())) {
			return Operation::Attribute;
		}
		if self.properties.contains(name) {
			return Operation::Property;
		}
		if self.no_arg.contains(name) {
			return Operation::CallNoArg;
		}
		if self.one_arg.contains(name) {
			return Operation::CallOneArg;
		}
		if self.multi_arg.contains(name) {
			return Operation::CallMultiArg;
		}
		match self.utilities.get(name) {
			Some(Utility::Custom(f)) => Operation::Utility(f),
			Some(Utility::Traverse(op)) => Operation::Traverse(*op),
			None => Operation::Field,
		}
	}
}

impl<D: Dom> fmt::Debug for Registry<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Registry")
			.field("attributes", &self.attributes.len())
			.field("properties", &self.properties.len())
			.field("no_arg", &self.no_arg.len())
			.field("one_arg", &self.one_arg.len())
			.field("multi_arg", &self.multi_arg.len())
			.field("utilities", &self.utilities.len())
			.finish()
	}
}
