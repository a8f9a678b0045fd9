//! The outcome of a completed resolve.

use std::sync::Arc;

use indexmap::IndexMap;

use super::{DependencyGraph, Reason, ResolveFlags};
use crate::repository::*;

/// Read-only results of one resolve, shared between the resolver and deployments planned from it.
#[derive(Debug)]
pub struct ResolverFinalized {
	flags: ResolveFlags,
	/// Newest `last_modified` of the repositories at the start of the resolve.
	timestamp: u64,
	succeeded: bool,

	added: Vec<Arc<Resource>>,
	required: Vec<Arc<Resource>>,
	optional: Vec<Arc<Resource>>,
	reasons: IndexMap<Arc<Resource>, Vec<Reason>>,
	unsatisfied: Vec<Reason>,

	/// Installed resources seen during the resolve, candidates for updating.
	local_resources: Vec<Arc<Resource>>,
}

impl ResolverFinalized {
	#[allow(clippy::too_many_arguments)]
	pub(super) fn new(
		flags: ResolveFlags,
		timestamp: u64,
		succeeded: bool,
		added: Vec<Arc<Resource>>,
		required: Vec<Arc<Resource>>,
		optional: Vec<Arc<Resource>>,
		reasons: IndexMap<Arc<Resource>, Vec<Reason>>,
		unsatisfied: Vec<Reason>,
		local_resources: Vec<Arc<Resource>>,
	) -> Self {
		Self { flags, timestamp, succeeded, added, required, optional, reasons, unsatisfied, local_resources }
	}

	/// `true` when every mandatory requirement was satisfied.
	pub fn succeeded(&self) -> bool {
		self.succeeded
	}

	pub fn flags(&self) -> ResolveFlags {
		self.flags
	}

	pub fn resolve_timestamp(&self) -> u64 {
		self.timestamp
	}

	pub fn added_resources(&self) -> &[Arc<Resource>] {
		&self.added
	}

	/// Resources needed by the added resources, excluding the added and installed ones.
	pub fn required_resources(&self) -> &[Arc<Resource>] {
		&self.required
	}

	/// Resources only reachable through optional requirements.
	pub fn optional_resources(&self) -> &[Arc<Resource>] {
		&self.optional
	}

	pub fn unsatisfied_requirements(&self) -> &[Reason] {
		&self.unsatisfied
	}

	pub fn reason(&self, resource: &Resource) -> Option<&[Reason]> {
		self.reasons.get(resource).map(Vec::as_slice)
	}

	pub fn reasons(&self) -> &IndexMap<Arc<Resource>, Vec<Reason>> {
		&self.reasons
	}

	pub fn local_resources(&self) -> &[Arc<Resource>] {
		&self.local_resources
	}

	/// Added, required and optional resources without duplicates.
	///
	/// Optional resources are left out with [`ResolveFlags::NO_OPTIONAL_RESOURCES`].
	pub fn deploy_set(&self, flags: ResolveFlags) -> Vec<Arc<Resource>> {
		let optional: &[Arc<Resource>] = if flags.contains(ResolveFlags::NO_OPTIONAL_RESOURCES) { &[] } else { &self.optional };
		let mut set = indexmap::IndexSet::new();
		set.extend(self.added.iter().chain(&self.required).chain(optional).cloned());
		set.into_iter().collect()
	}

	/// Dependency graph between the resources of [`deploy_set()`](Self::deploy_set()).
	pub fn dependency_graph(&self, flags: ResolveFlags) -> DependencyGraph {
		DependencyGraph::new(self.deploy_set(flags), &self.reasons)
	}
}
