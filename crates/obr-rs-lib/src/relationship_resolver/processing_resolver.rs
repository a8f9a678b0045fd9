//! The recursive resolve of one [`Resolver::resolve()`](super::Resolver::resolve()) call.
//!
//! Every resolve starts from empty sets:
//! - `resolving`: resources whose requirements are being resolved, a revisit is treated as satisfied.
//! - `required` and `optional`: resources selected so far.
//! - `failed`: resources known not to resolve, never picked again during this resolve.
//!
//! A resource is in at most one of these at any time.
//!
//! A resource first reached through an optional requirement and later needed by a mandatory one
//! moves to `required`. Dependencies it pulled in while optional stay in `optional`.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use super::{CancelHandle, Reason, ResolveFlags};
use super::candidate::{Candidate, CandidateQueue};
use super::finalized_resolver::ResolverFinalized;
use crate::repository::*;

/// What the caller added to the resolver.
pub(super) struct ResolveInput<'a> {
	pub added: &'a IndexSet<Arc<Resource>>,
	pub added_requirements: &'a IndexSet<Requirement>,
	pub global_capabilities: &'a [Capability],
}

struct ResolverProcessor<'a> {
	flags: ResolveFlags,
	cancel: &'a CancelHandle,

	/// Candidates from local and system repositories, searched before `remotes`.
	locals: Vec<Arc<Resource>>,
	remotes: Vec<Arc<Resource>>,

	added: IndexSet<Arc<Resource>>,
	resolving: IndexSet<Arc<Resource>>,
	required: IndexSet<Arc<Resource>>,
	optional: IndexSet<Arc<Resource>>,
	failed: IndexSet<Arc<Resource>>,

	reasons: IndexMap<Arc<Resource>, Vec<Reason>>,
	unsatisfied: IndexSet<Reason>,
}

/// Runs a full resolve.
///
/// # Errors
/// - [`Interrupted`](crate::Error::Interrupted) when `cancel` is raised before or during the resolve.
pub(super) fn resolve(input: ResolveInput<'_>, repositories: &[Arc<Repository>], flags: ResolveFlags, cancel: &CancelHandle) -> crate::Result<ResolverFinalized> {
	cancel.check()?;

	/* Everything resolved against must be older than this for a later deploy to go ahead */
	let timestamp = repositories.iter().map(|r| r.last_modified()).max().unwrap_or_default();

	let mut locals = Vec::new();
	let mut remotes = Vec::new();
	for repository in repositories {
		match repository.locality() {
			Locality::Local if flags.contains(ResolveFlags::NO_LOCAL_RESOURCES) => continue,
			Locality::System if flags.contains(ResolveFlags::NO_SYSTEM_RESOURCE) => continue,
			_ => {},
		}
		for resource in repository.resources().iter() {
			if resource.is_local() {
				locals.push(resource.clone());
			} else {
				remotes.push(resource.clone());
			}
		}
	}
	log::debug!("Resolving against {} local and {} remote resources", locals.len(), remotes.len());

	let mut processor = ResolverProcessor {
		flags,
		cancel,
		locals,
		remotes,
		added: Default::default(),
		resolving: Default::default(),
		required: Default::default(),
		optional: Default::default(),
		failed: Default::default(),
		reasons: Default::default(),
		unsatisfied: Default::default(),
	};

	/* Bare requirements and global capabilities hang off a resource that's never part of the result */
	let synthetic = if input.added_requirements.is_empty() && input.global_capabilities.is_empty() {
		None
	} else {
		Some(Arc::new(Resource::builder()
			.capabilities(input.global_capabilities.iter().cloned())
			.requirements(input.added_requirements.iter().cloned())
			.build()))
	};

	/* Visited first so its capabilities are found in `resolving` by everything after it */
	processor.added.extend(synthetic.iter().cloned());
	processor.added.extend(input.added.iter().cloned());

	let mut result = true;

	let targets: Vec<_> = processor.added.iter().cloned().collect();
	for target in &targets {
		cancel.check()?;
		if !processor.resolve_one(target, false)? {
			log::debug!("Target {} not resolved", target);
			result = false;
		}
	}

	processor.cleanup();

	if result {
		log::info!("Resolved {} required and {} optional resources", processor.required.len(), processor.optional.len());
	} else {
		log::warn!("Resolve failed with {} unsatisfied requirements", processor.unsatisfied.len());
	}

	let local_resources = processor.locals.iter().filter(|r| r.locality() == Locality::Local).cloned().collect();
	Ok(ResolverFinalized::new(
		flags,
		timestamp,
		result,
		input.added.iter().cloned().collect(),
		processor.required.into_iter().collect(),
		processor.optional.into_iter().collect(),
		processor.reasons,
		processor.unsatisfied.into_iter().collect(),
		local_resources,
	))
}

impl<'a> ResolverProcessor<'a> {
	/// Resolves the requirements of `resource`, recursively selecting candidates for each.
	///
	/// On success `resource` is left in `resolving` for the caller to classify, on failure it's moved to `failed`.
	/// `optional` is true when anything on the path leading here was an optional requirement.
	fn resolve_one(&mut self, resource: &Arc<Resource>, optional: bool) -> crate::Result<bool> {
		/* Cycles resolve optimistically */
		if self.resolving.contains(resource) || self.required.contains(resource) || self.optional.contains(resource) {
			return Ok(true)
		}
		if self.failed.contains(resource) {
			return Ok(false)
		}

		log::trace!("Resolving {}", resource);
		self.resolving.insert(resource.clone());

		let mut result = true;
		for requirement in resource.requirements() {
			if requirement.is_optional() && self.flags.contains(ResolveFlags::NO_OPTIONAL_RESOURCES) {
				continue
			}
			let optional_path = optional || requirement.is_optional();

			let selected = match self.search_selected(requirement)? {
				/* Already picked, no ranking */
				Some(existing) => self.resolve_one(&existing, optional_path)?.then_some(existing),
				None => self.search_repositories(requirement, optional_path)?,
			};

			match selected {
				Some(candidate) => {
					self.classify(&candidate, optional_path);
					self.reasons.entry(candidate).or_default().push(Reason::new(resource.clone(), requirement.clone()));
				},
				None if requirement.is_optional() => {
					log::debug!("Optional requirement {} of {} not satisfied", requirement, resource);
				},
				None => {
					log::debug!("Requirement {} of {} not satisfied", requirement, resource);
					self.unsatisfied.insert(Reason::new(resource.clone(), requirement.clone()));
					result = false;
				},
			}
		}

		if !result {
			/* May have been classified by a cycle in the meantime */
			self.resolving.shift_remove(resource);
			self.required.shift_remove(resource);
			self.optional.shift_remove(resource);
			self.failed.insert(resource.clone());
		}
		Ok(result)
	}

	/// First resource already in play that satisfies `requirement`.
	///
	/// Searches added, required, optional then resolving resources.
	fn search_selected(&self, requirement: &Requirement) -> crate::Result<Option<Arc<Resource>>> {
		let sets = [&self.added, &self.required, &self.optional, &self.resolving];
		for resource in sets.into_iter().flatten() {
			self.cancel.check()?;
			if !self.failed.contains(resource) && resource.satisfies(requirement) {
				return Ok(Some(resource.clone()))
			}
		}
		Ok(None)
	}

	/// Picks the best repository candidate for `requirement` that resolves, trying the next best on failure.
	fn search_repositories(&mut self, requirement: &Requirement, optional: bool) -> crate::Result<Option<Arc<Resource>>> {
		let mut candidates = Vec::new();
		for resource in self.locals.iter().chain(self.remotes.iter()) {
			self.cancel.check()?;
			if self.failed.contains(resource) {
				continue
			}
			for (capability, c) in resource.capabilities().iter().enumerate() {
				if requirement.is_satisfied(c) {
					candidates.push(Candidate { resource: resource.clone(), capability });
				}
			}
		}

		let mut queue = CandidateQueue::new(candidates, !self.flags.contains(ResolveFlags::DO_NOT_PREFER_LOCAL));
		log::trace!("{} candidates for {}", queue.len(), requirement);
		while let Some(best) = queue.pop_best() {
			self.cancel.check()?;
			if self.resolve_one(&best.resource, optional)? {
				return Ok(Some(best.resource))
			}
			log::trace!("Candidate {} failed for {}", best.resource, requirement);
		}
		Ok(None)
	}

	/// Moves a resolved resource out of `resolving` into `required` or `optional`.
	///
	/// Required wins, a resource needed on any mandatory path is never optional.
	fn classify(&mut self, resource: &Arc<Resource>, optional: bool) {
		self.resolving.shift_remove(resource);
		if optional {
			if !self.required.contains(resource) {
				self.optional.insert(resource.clone());
			}
		} else {
			self.optional.shift_remove(resource);
			self.required.insert(resource.clone());
		}
	}

	/// Removes everything that must not be deployed from the results.
	fn cleanup(&mut self) {
		self.resolving.clear();

		for resource in &self.added {
			self.required.shift_remove(resource);
			self.optional.shift_remove(resource);
		}

		let keep_local = self.flags.contains(ResolveFlags::NO_LOCAL_RESOURCES);
		let deployable = |r: &Arc<Resource>| match r.locality() {
			Locality::System => false,
			Locality::Local => keep_local,
			Locality::Remote => true,
		};
		self.required.retain(deployable);
		self.optional.retain(deployable);

		let required = &self.required;
		self.optional.retain(|r| !required.contains(r));
	}
}
