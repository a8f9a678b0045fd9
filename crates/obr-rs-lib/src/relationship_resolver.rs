//! Finding the set of resources needed to satisfy the requirements of some target resources.
//!
//! # Usage
//! 1. Create a [`ResolverBuilder`] with the repositories to resolve against.
//! 1. [`ResolverBuilder::build()`] to get a [`Resolver`].
//! 1. [`Resolver::add()`] target resources, bare requirements with [`Resolver::add_requirement()`].
//! 1. [`Resolver::resolve()`], `Ok(false)` when some mandatory requirement can't be satisfied,
//! see [`Resolver::unsatisfied_requirements()`].
//! 1. Query [`Resolver::required_resources()`] and [`Resolver::optional_resources()`],
//! or [`Resolver::deploy()`] them to a [`DeploymentTarget`](crate::deployment::DeploymentTarget).
//!
//! # Cycles
//! A resource that is revisited while its own requirements are still being resolved is assumed
//! to be satisfied. This keeps cyclic dependencies from recursing forever but means the second
//! visit never checks the requirements again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use indexmap::IndexSet;
use serde::{Serialize, Deserialize};

use crate::repository::*;
use crate::deployment::{DeploymentPlan, DeploymentTarget, DeployReport};

mod candidate;

pub mod dependency_graph;
pub use dependency_graph::DependencyGraph;

mod resolver_builder;
pub use resolver_builder::ResolverBuilder;
mod processing_resolver;
mod finalized_resolver;
pub use finalized_resolver::ResolverFinalized;

bitflags::bitflags! {
	/// Options for [`Resolver::resolve()`] and [`Resolver::deploy()`].
	#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
	pub struct ResolveFlags: u32 {
		/// Ignore local repositories, installed resources are neither candidates nor removed from results.
		const NO_LOCAL_RESOURCES    = 1 << 0;
		/// Ignore the system repository.
		const NO_SYSTEM_RESOURCE    = 1 << 1;
		/// Skip optional requirements and don't deploy optional resources.
		const NO_OPTIONAL_RESOURCES = 1 << 2;
		/// Rank local and remote candidates only by version and capabilities.
		const DO_NOT_PREFER_LOCAL   = 1 << 3;
		/// Deploy only, start resources after installing or updating them.
		const START                 = 1 << 4;
	}
}

impl ResolveFlags {
	/// The flags that change the outcome of a resolve.
	pub fn resolution(self) -> Self {
		self - ResolveFlags::START
	}
}

/// Why a resource was selected or which requirement could not be satisfied.
///
/// `resource` is the resource owning `requirement`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reason {
	pub resource: Arc<Resource>,
	pub requirement: Requirement,
}

impl Reason {
	pub fn new(resource: Arc<Resource>, requirement: Requirement) -> Self {
		Self { resource, requirement }
	}
}

impl std::fmt::Display for Reason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}: {}", self.resource, self.requirement)
	}
}

/// Cancels a running or the next [`Resolver::resolve()`] of the resolver it came from.
///
/// A raised flag is cleared by the resolve that observes it.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
	flag: Arc<AtomicBool>,
}

impl CancelHandle {
	pub fn cancel(&self) {
		self.flag.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.flag.load(Ordering::SeqCst)
	}

	/// `Err(Interrupted)` once after [`cancel()`](Self::cancel()) was called.
	pub(crate) fn check(&self) -> crate::Result<()> {
		if self.flag.swap(false, Ordering::SeqCst) {
			Err(crate::Error::Interrupted)
		} else {
			Ok(())
		}
	}
}

#[derive(Debug, Default)]
struct ResolverState {
	added: IndexSet<Arc<Resource>>,
	added_requirements: IndexSet<Requirement>,
	global_capabilities: Vec<Capability>,
	/// Result of the last completed resolve, cleared whenever the inputs change.
	resolved: Option<Arc<ResolverFinalized>>,
}

/// Resolves target resources against a set of repositories.
///
/// All methods lock the resolver, calls from several threads are serialized.
/// Deployment actions run after the lock is released.
#[derive(Debug)]
pub struct Resolver {
	repositories: Vec<Arc<Repository>>,
	config: crate::Config,
	cancel: CancelHandle,
	state: Mutex<ResolverState>,
}

impl Resolver {
	pub(super) fn new(repositories: Vec<Arc<Repository>>, config: crate::Config) -> Self {
		Self {
			repositories,
			config,
			cancel: Default::default(),
			state: Default::default(),
		}
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, ResolverState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn repositories(&self) -> &[Arc<Repository>] {
		&self.repositories
	}

	pub fn config(&self) -> &crate::Config {
		&self.config
	}

	pub fn cancel_handle(&self) -> CancelHandle {
		self.cancel.clone()
	}

	/* Inputs */

	/// Adds a target resource to be resolved and deployed.
	pub fn add(&self, resource: Arc<Resource>) {
		log::trace!("Adding target resource {}", resource);
		let mut state = self.lock();
		state.resolved = None;
		state.added.insert(resource);
	}

	/// Adds a requirement that must be satisfied without belonging to any target resource.
	pub fn add_requirement(&self, requirement: Requirement) {
		log::trace!("Adding target requirement {}", requirement);
		let mut state = self.lock();
		state.resolved = None;
		state.added_requirements.insert(requirement);
	}

	/// Adds a capability treated as present while resolving, without any resource providing it.
	pub fn add_global_capability(&self, capability: Capability) {
		log::trace!("Adding global capability {}", capability);
		let mut state = self.lock();
		state.resolved = None;
		state.global_capabilities.push(capability);
	}

	pub fn added_resources(&self) -> Vec<Arc<Resource>> {
		self.lock().added.iter().cloned().collect()
	}

	pub fn added_requirements(&self) -> Vec<Requirement> {
		self.lock().added_requirements.iter().cloned().collect()
	}

	pub fn global_capabilities(&self) -> Vec<Capability> {
		self.lock().global_capabilities.clone()
	}

	/* Resolving */

	/// Resolves the added resources and requirements.
	///
	/// Returns `Ok(false)` when a mandatory requirement can't be satisfied, the results are still
	/// available in that case.
	/// # Errors
	/// - [`Interrupted`](crate::Error::Interrupted) when cancelled through [`cancel_handle()`](Self::cancel_handle()).
	pub fn resolve(&self, flags: ResolveFlags) -> crate::Result<bool> {
		let mut state = self.lock();
		Ok(self.resolve_locked(&mut state, flags)?.succeeded())
	}

	/// [`resolve()`](Self::resolve()) with the flags from the resolver's [`Config`](crate::Config).
	pub fn resolve_default(&self) -> crate::Result<bool> {
		self.resolve(self.config.resolve_flags())
	}

	fn resolve_locked(&self, state: &mut ResolverState, flags: ResolveFlags) -> crate::Result<Arc<ResolverFinalized>> {
		state.resolved = None;
		let input = processing_resolver::ResolveInput {
			added: &state.added,
			added_requirements: &state.added_requirements,
			global_capabilities: &state.global_capabilities,
		};
		let finalized = Arc::new(processing_resolver::resolve(input, &self.repositories, flags.resolution(), &self.cancel)?);
		state.resolved = Some(finalized.clone());
		Ok(finalized)
	}

	/// The result of the last resolve.
	/// # Errors
	/// - [`NotResolved`](crate::Error::NotResolved) when there was no resolve since the inputs last changed.
	pub fn finalized(&self) -> crate::Result<Arc<ResolverFinalized>> {
		self.lock().resolved.clone().ok_or(crate::Error::NotResolved)
	}

	pub fn required_resources(&self) -> crate::Result<Vec<Arc<Resource>>> {
		Ok(self.finalized()?.required_resources().to_vec())
	}

	/// Resources only needed through optional requirements.
	///
	/// Can include mandatory dependencies of a required resource that was first reached optionally.
	pub fn optional_resources(&self) -> crate::Result<Vec<Arc<Resource>>> {
		Ok(self.finalized()?.optional_resources().to_vec())
	}

	pub fn unsatisfied_requirements(&self) -> crate::Result<Vec<Reason>> {
		Ok(self.finalized()?.unsatisfied_requirements().to_vec())
	}

	/// Why `resource` was selected, `None` when it wasn't selected to satisfy anything.
	pub fn reason(&self, resource: &Resource) -> crate::Result<Option<Vec<Reason>>> {
		Ok(self.finalized()?.reason(resource).map(<[Reason]>::to_vec))
	}

	/* Deploying */

	/// Resolves when needed and checks that no repository changed since.
	fn prepare_deployment(&self, flags: ResolveFlags) -> crate::Result<Arc<ResolverFinalized>> {
		let mut state = self.lock();

		let cached = state.resolved.clone().filter(|f| f.flags() == flags.resolution());
		let finalized = match cached {
			Some(f) => f,
			None => self.resolve_locked(&mut state, flags)?,
		};

		if !finalized.succeeded() {
			log::error!("Resolver: Cannot resolve target resources.");
			return Err(crate::Error::Unresolvable(finalized.unsatisfied_requirements().to_vec()))
		}

		/* Optimistic, the repositories can still change while deploying */
		for repository in &self.repositories {
			if repository.last_modified() > finalized.resolve_timestamp() {
				log::warn!("Repository {} changed since the last resolve.", repository.name());
				return Err(crate::Error::StateChanged)
			}
		}

		Ok(finalized)
	}

	/// Lists the actions [`deploy()`](Self::deploy()) would take without executing them.
	pub fn plan_deployment(&self, flags: ResolveFlags) -> crate::Result<DeploymentPlan> {
		let finalized = self.prepare_deployment(flags)?;
		Ok(DeploymentPlan::new(&finalized, flags))
	}

	/// Installs or updates the added, required and optional resources then starts them if requested.
	///
	/// # Errors
	/// - [`Unresolvable`](crate::Error::Unresolvable) when resolving fails.
	/// - [`StateChanged`](crate::Error::StateChanged) when a repository changed since the last resolve.
	/// - [`Deployment`](crate::Error::Deployment) when an install or update fails, remaining actions are skipped.
	/// Start failures don't fail the deploy, they are listed in the [`DeployReport`].
	pub fn deploy(&self, flags: ResolveFlags, target: &mut dyn DeploymentTarget) -> crate::Result<DeployReport> {
		let plan = self.plan_deployment(flags)?;
		Ok(plan.execute(target)?)
	}

	/// [`deploy()`](Self::deploy()) with the flags from the resolver's [`Config`](crate::Config).
	pub fn deploy_default(&self, target: &mut dyn DeploymentTarget) -> crate::Result<DeployReport> {
		self.deploy(self.config.deploy_flags(), target)
	}
}
