use crate::filter::{Filter, FilterCompiler, FilterSyntaxError};

use super::Capability;

/// A need of a resource that some [`Capability`] must meet.
///
/// Equality and hashing only consider the filter text.
#[derive(Debug, Clone)]
pub struct Requirement {
	name: String,
	filter: Filter,
	optional: bool,
	multiple: bool,
	extend: bool,
	comment: String,
}

impl Requirement {
	pub fn new(name: impl Into<String>, filter: Filter) -> Self {
		Self {
			name: name.into(),
			filter,
			optional: false,
			multiple: false,
			extend: false,
			comment: String::new(),
		}
	}

	/// Compiles `filter` with `compiler` and builds a mandatory requirement.
	///
	/// # Errors
	/// - [`FilterSyntaxError`] when the filter can't be compiled.
	pub fn parse(name: impl Into<String>, filter: &str, compiler: &dyn FilterCompiler) -> Result<Self, FilterSyntaxError> {
		Ok(Self::new(name, Filter::compile(filter, compiler)?))
	}

	pub fn optional(mut self, optional: bool) -> Self {
		self.optional = optional;
		self
	}

	pub fn multiple(mut self, multiple: bool) -> Self {
		self.multiple = multiple;
		self
	}

	pub fn extend(mut self, extend: bool) -> Self {
		self.extend = extend;
		self
	}

	pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
		self.comment = comment.into();
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn filter(&self) -> &Filter {
		&self.filter
	}

	pub fn is_optional(&self) -> bool {
		self.optional
	}

	pub fn is_multiple(&self) -> bool {
		self.multiple
	}

	pub fn is_extend(&self) -> bool {
		self.extend
	}

	pub fn comment(&self) -> &str {
		&self.comment
	}

	/// `true` when `capability` has the same name and its properties pass the filter.
	pub fn is_satisfied(&self, capability: &Capability) -> bool {
		self.name == capability.name() && self.filter.evaluate(capability.properties())
	}
}

impl PartialEq for Requirement {
	fn eq(&self, other: &Self) -> bool {
		self.filter == other.filter
	}
}

impl Eq for Requirement {}

impl std::hash::Hash for Requirement {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.filter.hash(state);
	}
}

impl std::fmt::Display for Requirement {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} {}", self.name, self.filter)?;
		if self.optional {
			write!(f, " (optional)")?;
		}
		Ok(())
	}
}
