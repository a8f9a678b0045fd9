//! Boundary to the filter language used by requirements.
//!
//! The resolver never looks inside a filter, it only asks a compiled [`Predicate`] whether a
//! capability's [`Properties`] match. Parsing the filter text is the job of a [`FilterCompiler`]
//! supplied by the caller.

use std::sync::Arc;

use crate::repository::Properties;

/// A compiled filter.
pub trait Predicate: Send + Sync {
	fn evaluate(&self, properties: &Properties) -> bool;
}

impl<F> Predicate for F
where F: Fn(&Properties) -> bool + Send + Sync
{
	fn evaluate(&self, properties: &Properties) -> bool {
		self(properties)
	}
}

/// Turns filter text into a [`Predicate`].
pub trait FilterCompiler: Send + Sync {
	/// # Errors
	/// - [`FilterSyntaxError`] when `text` is malformed.
	fn compile(&self, text: &str) -> Result<Arc<dyn Predicate>, FilterSyntaxError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid filter \"{filter}\": {message}")]
pub struct FilterSyntaxError {
	pub filter: String,
	pub message: String,
}

impl FilterSyntaxError {
	pub fn new(filter: impl Into<String>, message: impl Into<String>) -> Self {
		Self { filter: filter.into(), message: message.into() }
	}
}

/// Filter text together with its compiled form.
///
/// Two filters are equal when their text is equal.
#[derive(Clone)]
pub struct Filter {
	text: String,
	predicate: Arc<dyn Predicate>,
}

impl Filter {
	/// Compiles `text` immediately so syntax errors surface where the filter is created.
	pub fn compile(text: impl Into<String>, compiler: &dyn FilterCompiler) -> Result<Self, FilterSyntaxError> {
		let text = text.into();
		let predicate = compiler.compile(&text)?;
		Ok(Self { text, predicate })
	}

	/// Pairs already compiled `predicate` with the `text` it was compiled from.
	pub fn from_predicate(text: impl Into<String>, predicate: impl Predicate + 'static) -> Self {
		Self { text: text.into(), predicate: Arc::new(predicate) }
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	pub fn evaluate(&self, properties: &Properties) -> bool {
		self.predicate.evaluate(properties)
	}
}

impl std::fmt::Debug for Filter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("Filter").field(&self.text).finish()
	}
}

impl std::fmt::Display for Filter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.text)
	}
}

impl PartialEq for Filter {
	fn eq(&self, other: &Self) -> bool {
		self.text == other.text
	}
}

impl Eq for Filter {}

impl std::hash::Hash for Filter {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.text.hash(state);
	}
}
