use serde::{Serialize, Deserialize};

use super::{Properties, TypedValue, Version};

/// Capability name offered by every resource with an identity.
pub const BUNDLE: &str = "bundle";
pub const PACKAGE: &str = "package";
pub const SERVICE: &str = "service";
pub const FRAGMENT: &str = "fragment";
/// Execution environment, usually offered by the system resource.
pub const EXECUTION_ENVIRONMENT: &str = "ee";

/// Something a resource offers, described by a name and typed properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
	name: String,
	properties: Properties,
}

impl Capability {
	pub fn new(name: impl Into<String>, properties: Properties) -> Self {
		Self { name: name.into(), properties }
	}

	/// Convenience for a capability with a single `name=value` property, eg. `package=foo`.
	pub fn named(name: impl Into<String>, value: impl Into<TypedValue>) -> Self {
		let name = name.into();
		let properties = Properties::from_iter([(name.clone(), value.into())]);
		Self { name, properties }
	}

	/// Adds a property, only usable while building.
	pub fn with_property(mut self, key: impl Into<String>, value: impl Into<TypedValue>) -> Self {
		self.properties.insert(key, value);
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn properties(&self) -> &Properties {
		&self.properties
	}

	/// The `version` property, when it is version typed.
	pub fn version(&self) -> Option<&Version> {
		self.properties.get(super::VERSION).and_then(TypedValue::as_version)
	}
}

impl std::fmt::Display for Capability {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.name)?;
		for (k, v) in self.properties.iter() {
			write!(f, " {}={}", k, v)?;
		}
		Ok(())
	}
}
