use std::sync::Arc;

use super::Resolver;
use crate::repository::*;

/// Collects the repositories and settings for a [`Resolver`].
#[derive(Debug, Default)]
pub struct ResolverBuilder {
	repositories: Vec<Arc<Repository>>,
	config: crate::Config,

	resources: Vec<Arc<Resource>>,
	requirements: Vec<Requirement>,
	global_capabilities: Vec<Capability>,
}

impl ResolverBuilder {
	pub fn new() -> Self {
		Default::default()
	}

	pub fn repository(mut self, repository: Arc<Repository>) -> Self {
		self.repositories.push(repository);
		self
	}

	pub fn repositories(mut self, repositories: impl IntoIterator<Item = Arc<Repository>>) -> Self {
		self.repositories.extend(repositories);
		self
	}

	/// Settings used by [`Resolver::resolve_default()`] and [`Resolver::deploy_default()`].
	pub fn config(mut self, config: crate::Config) -> Self {
		self.config = config;
		self
	}

	pub fn add_resources(mut self, resources: impl IntoIterator<Item = Arc<Resource>>) -> Self {
		self.resources.extend(resources);
		self
	}

	pub fn add_requirements(mut self, requirements: impl IntoIterator<Item = Requirement>) -> Self {
		self.requirements.extend(requirements);
		self
	}

	pub fn add_global_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
		self.global_capabilities.extend(capabilities);
		self
	}

	pub fn build(self) -> Resolver {
		if self.repositories.is_empty() {
			log::warn!("Building a resolver without any repositories.");
		}

		let resolver = Resolver::new(self.repositories, self.config);
		for resource in self.resources {
			resolver.add(resource);
		}
		for requirement in self.requirements {
			resolver.add_requirement(requirement);
		}
		for capability in self.global_capabilities {
			resolver.add_global_capability(capability);
		}
		resolver
	}
}
