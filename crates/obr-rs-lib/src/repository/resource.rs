use std::sync::{Arc, Weak};

use serde::{Serialize, Deserialize};

use super::*;

/// Opaque id the deployment target gave a materialized resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeploymentHandle(pub u64);

impl std::fmt::Display for DeploymentHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// The `(symbolic name, version)` pair identifying a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentity {
	pub symbolic_name: String,
	pub version: Version,
}

impl std::fmt::Display for ResourceIdentity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}@{}", self.symbolic_name, self.version)
	}
}

/// A versioned unit bundling capabilities and requirements.
///
/// Resources are shared as `Arc<Resource>`. Two resources are equal when both have a symbolic
/// name and version and those match, otherwise only a resource is equal to itself.
#[derive(Debug)]
pub struct Resource {
	symbolic_name: Option<String>,
	version: Option<Version>,
	presentation_name: Option<String>,
	uri: Option<String>,
	capabilities: Vec<Capability>,
	requirements: Vec<Requirement>,
	locality: Locality,
	handle: Option<DeploymentHandle>,
	repository: Weak<Repository>,
}

impl Resource {
	pub fn builder() -> ResourceBuilder {
		ResourceBuilder::default()
	}

	pub fn symbolic_name(&self) -> Option<&str> {
		self.symbolic_name.as_deref()
	}

	pub fn version(&self) -> Option<&Version> {
		self.version.as_ref()
	}

	pub fn identity(&self) -> Option<ResourceIdentity> {
		match (&self.symbolic_name, &self.version) {
			(Some(symbolic_name), Some(version)) => Some(ResourceIdentity { symbolic_name: symbolic_name.clone(), version: version.clone() }),
			_ => None,
		}
	}

	/// Falls back to the symbolic name when no presentation name was given.
	pub fn presentation_name(&self) -> Option<&str> {
		self.presentation_name.as_deref().or(self.symbolic_name.as_deref())
	}

	pub fn uri(&self) -> Option<&str> {
		self.uri.as_deref()
	}

	pub fn capabilities(&self) -> &[Capability] {
		&self.capabilities
	}

	pub fn requirements(&self) -> &[Requirement] {
		&self.requirements
	}

	pub fn locality(&self) -> Locality {
		self.locality
	}

	/// Local and system resources are already present in the running system.
	pub fn is_local(&self) -> bool {
		self.locality.is_local()
	}

	/// Handle of the materialized resource, only present on installed resources.
	pub fn handle(&self) -> Option<DeploymentHandle> {
		self.handle
	}

	/// The repository holding this resource, if it still exists.
	pub fn repository(&self) -> Option<Arc<Repository>> {
		self.repository.upgrade()
	}

	/// The first capability of this resource satisfying `requirement`.
	pub fn satisfying_capability(&self, requirement: &Requirement) -> Option<&Capability> {
		self.capabilities.iter().find(|c| requirement.is_satisfied(c))
	}

	pub fn satisfies(&self, requirement: &Requirement) -> bool {
		self.satisfying_capability(requirement).is_some()
	}

	pub(crate) fn set_owner(&mut self, repository: Weak<Repository>, locality: Locality) {
		self.repository = repository;
		self.locality = locality;
	}
}

impl PartialEq for Resource {
	fn eq(&self, other: &Self) -> bool {
		match (self.identity(), other.identity()) {
			(Some(a), Some(b)) => a == b,
			_ => std::ptr::eq(self, other),
		}
	}
}

impl Eq for Resource {}

impl std::hash::Hash for Resource {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		/* Anonymous resources hash by address, stable as long as they live inside an `Arc` */
		match (&self.symbolic_name, &self.version) {
			(Some(name), Some(version)) => {
				name.hash(state);
				version.hash(state);
			},
			_ => (self as *const Resource as usize).hash(state),
		}
	}
}

impl std::fmt::Display for Resource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match (self.presentation_name(), &self.version) {
			(Some(name), Some(version)) => write!(f, "{} ({})", name, version),
			(Some(name), None) => write!(f, "{}", name),
			(None, _) => write!(f, "<anonymous resource>"),
		}
	}
}

/// Builds a [`Resource`].
///
/// When both a symbolic name and a version are given and no [`BUNDLE`](capability::BUNDLE)
/// capability is added explicitly, one is generated carrying `symbolicname` and `version`.
#[derive(Debug, Default)]
pub struct ResourceBuilder {
	symbolic_name: Option<String>,
	version: Option<Version>,
	presentation_name: Option<String>,
	uri: Option<String>,
	capabilities: Vec<Capability>,
	requirements: Vec<Requirement>,
	handle: Option<DeploymentHandle>,
}

impl ResourceBuilder {
	pub fn symbolic_name(mut self, name: impl Into<String>) -> Self {
		self.symbolic_name = Some(name.into());
		self
	}

	pub fn version(mut self, version: Version) -> Self {
		self.version = Some(version);
		self
	}

	pub fn presentation_name(mut self, name: impl Into<String>) -> Self {
		self.presentation_name = Some(name.into());
		self
	}

	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = Some(uri.into());
		self
	}

	pub fn capability(mut self, capability: Capability) -> Self {
		self.capabilities.push(capability);
		self
	}

	pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
		self.capabilities.extend(capabilities);
		self
	}

	pub fn requirement(mut self, requirement: Requirement) -> Self {
		self.requirements.push(requirement);
		self
	}

	pub fn requirements(mut self, requirements: impl IntoIterator<Item = Requirement>) -> Self {
		self.requirements.extend(requirements);
		self
	}

	/// Marks the resource as materialized in the running system under `handle`.
	pub fn installed_as(mut self, handle: DeploymentHandle) -> Self {
		self.handle = Some(handle);
		self
	}

	pub fn build(mut self) -> Resource {
		if let (Some(name), Some(version)) = (&self.symbolic_name, &self.version) {
			if !self.capabilities.iter().any(|c| c.name() == capability::BUNDLE) {
				let mut bundle = Capability::new(capability::BUNDLE, Properties::new())
					.with_property(SYMBOLIC_NAME, name.clone())
					.with_property(VERSION, version.clone());
				if let Some(presentation_name) = &self.presentation_name {
					bundle = bundle.with_property(PRESENTATION_NAME, presentation_name.clone());
				}
				self.capabilities.insert(0, bundle);
			}
		}

		Resource {
			symbolic_name: self.symbolic_name,
			version: self.version,
			presentation_name: self.presentation_name,
			uri: self.uri,
			capabilities: self.capabilities,
			requirements: self.requirements,
			locality: Locality::Remote,
			handle: self.handle,
			repository: Weak::new(),
		}
	}
}
