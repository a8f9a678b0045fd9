//! # Deployment
//!
//! Turning a resolve into installs and updates on a [`DeploymentTarget`].
//!
//! A [`DeploymentPlan`] is computed from a [`ResolverFinalized`] without touching the target.
//! Every resource of the deploy set is either
//! - left alone when the same identity is already installed,
//! - updated in place when an installed resource with the same symbolic name can be replaced
//! without breaking any requirement it currently satisfies,
//! - or installed.
//!
//! Actions are ordered dependencies first. Executing stops at the first failed install or update,
//! start failures are only collected.

use std::collections::HashSet;
use std::sync::Arc;

use crate::relationship_resolver::{ResolveFlags, ResolverFinalized};
use crate::repository::*;

pub type TargetError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleState {
	Active,
	Inactive,
}

/// The runtime resources get materialized into.
pub trait DeploymentTarget {
	fn install(&mut self, resource: &Resource) -> Result<DeploymentHandle, TargetError>;
	fn update(&mut self, handle: DeploymentHandle, resource: &Resource) -> Result<(), TargetError>;
	fn start(&mut self, handle: DeploymentHandle) -> Result<(), TargetError>;
	fn stop(&mut self, handle: DeploymentHandle) -> Result<(), TargetError>;
	fn current_state(&self, handle: DeploymentHandle) -> Result<HandleState, TargetError>;

	/// Fragments attach to another resource and are never started.
	///
	/// Defaults to resources offering a [`FRAGMENT`](capability::FRAGMENT) capability.
	fn is_fragment(&self, resource: &Resource) -> bool {
		resource.capabilities().iter().any(|c| c.name() == capability::FRAGMENT)
	}
}

#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
	#[error("failed to install {resource}: {source}")]
	Install { resource: String, source: TargetError },
	#[error("failed to update {handle} to {resource}: {source}")]
	Update { resource: String, handle: DeploymentHandle, source: TargetError },
	#[error("failed to stop {handle} ({resource}): {source}")]
	Stop { resource: String, handle: DeploymentHandle, source: TargetError },
	#[error("failed to start {handle} ({resource}): {source}")]
	Start { resource: String, handle: DeploymentHandle, source: TargetError },
	#[error("failed to query the state of {handle} ({resource}): {source}")]
	State { resource: String, handle: DeploymentHandle, source: TargetError },
}

#[derive(Debug, Clone)]
pub enum DeployAction {
	Install {
		resource: Arc<Resource>,
	},
	/// Replace the installed `from` with `to`, keeping the handle.
	Update {
		from: Arc<Resource>,
		to: Arc<Resource>,
		handle: DeploymentHandle,
	},
}

impl DeployAction {
	/// The resource ending up deployed.
	pub fn resource(&self) -> &Arc<Resource> {
		match self {
			DeployAction::Install { resource } => resource,
			DeployAction::Update { to, .. } => to,
		}
	}
}

impl std::fmt::Display for DeployAction {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			DeployAction::Install { resource } => write!(f, "install {}", resource),
			DeployAction::Update { from, to, handle } => write!(f, "update {} {} -> {}", handle, from, to),
		}
	}
}

/// What happened during [`DeploymentPlan::execute()`].
#[derive(Debug, Default)]
pub struct DeployReport {
	pub installed: Vec<(Arc<Resource>, DeploymentHandle)>,
	/// `(from, to, handle)`
	pub updated: Vec<(Arc<Resource>, Arc<Resource>, DeploymentHandle)>,
	pub started: Vec<DeploymentHandle>,
	pub start_failures: Vec<DeploymentError>,
}

#[derive(Debug, Clone)]
pub struct DeploymentPlan {
	actions: Vec<DeployAction>,
	/// Deploy set members already installed with the same identity.
	unchanged: Vec<Arc<Resource>>,
	start: bool,
}

impl DeploymentPlan {
	pub fn new(finalized: &ResolverFinalized, flags: ResolveFlags) -> Self {
		let deploy_set = finalized.dependency_graph(flags).install_order();
		let locals = finalized.local_resources();

		/* A handle is replaced at most once, installed identities are never replaced */
		let mut claimed: HashSet<DeploymentHandle> = deploy_set.iter()
			.filter_map(|r| locals.iter().find(|l| ***l == **r))
			.filter_map(|l| l.handle())
			.collect();

		let mut actions = Vec::new();
		let mut unchanged = Vec::new();
		for resource in &deploy_set {
			match find_updatable_local_resource(resource, locals, &claimed) {
				Some(local) if local == resource => {
					log::trace!("{} is already installed", resource);
					unchanged.push(resource.clone());
				},
				Some(local) => match local.handle() {
					Some(handle) if is_resource_updatable(local, resource, &deploy_set) => {
						claimed.insert(handle);
						actions.push(DeployAction::Update { from: local.clone(), to: resource.clone(), handle });
					},
					_ => actions.push(DeployAction::Install { resource: resource.clone() }),
				},
				None => actions.push(DeployAction::Install { resource: resource.clone() }),
			}
		}

		Self { actions, unchanged, start: flags.contains(ResolveFlags::START) }
	}

	pub fn actions(&self) -> &[DeployAction] {
		&self.actions
	}

	pub fn unchanged(&self) -> &[Arc<Resource>] {
		&self.unchanged
	}

	pub fn is_empty(&self) -> bool {
		self.actions.is_empty()
	}

	/// Runs the actions against `target`, then starts what was scheduled to start.
	///
	/// Updated resources that were active are restarted regardless of [`ResolveFlags::START`].
	/// # Errors
	/// The first failing install, update, stop or state query. Nothing after it is attempted.
	pub fn execute(&self, target: &mut dyn DeploymentTarget) -> Result<DeployReport, DeploymentError> {
		let mut report = DeployReport::default();
		let mut start_list = Vec::<(&Arc<Resource>, DeploymentHandle)>::new();

		for action in &self.actions {
			match action {
				DeployAction::Update { from, to, handle } => {
					let handle = *handle;
					log::info!("Updating {} from {} to {}", handle, from, to);

					let state = target.current_state(handle)
						.map_err(|source| DeploymentError::State { resource: from.to_string(), handle, source })?;
					let mut start = self.start;
					if state == HandleState::Active {
						start = true;
						target.stop(handle)
							.map_err(|source| DeploymentError::Stop { resource: from.to_string(), handle, source })?;
					}

					target.update(handle, to)
						.map_err(|source| DeploymentError::Update { resource: to.to_string(), handle, source })?;
					report.updated.push((from.clone(), to.clone(), handle));

					if start && !target.is_fragment(to) {
						start_list.push((to, handle));
					}
				},
				DeployAction::Install { resource } => {
					log::info!("Installing {}", resource);
					let handle = target.install(resource)
						.map_err(|source| DeploymentError::Install { resource: resource.to_string(), source })?;
					report.installed.push((resource.clone(), handle));

					if self.start && !target.is_fragment(resource) {
						start_list.push((resource, handle));
					}
				},
			}
		}

		for (resource, handle) in start_list {
			log::trace!("Starting {}", resource);
			match target.start(handle) {
				Ok(()) => report.started.push(handle),
				Err(source) => {
					let e = DeploymentError::Start { resource: resource.to_string(), handle, source };
					log::error!("{}", e);
					report.start_failures.push(e);
				},
			}
		}

		Ok(report)
	}
}

/// The installed resource `resource` would replace, if any.
///
/// Returns an installed resource with the same identity as is, otherwise the first installed resource
/// with the same symbolic name that can be replaced without breaking the other installed resources.
/// Resources whose handle is in `claimed` are not replaced.
fn find_updatable_local_resource<'a>(resource: &Resource, locals: &'a [Arc<Resource>], claimed: &HashSet<DeploymentHandle>) -> Option<&'a Arc<Resource>> {
	let name = resource.symbolic_name()?;
	let same_name = || locals.iter().filter(move |l| l.symbolic_name() == Some(name));

	same_name().find(|l| ***l == *resource)
		.or_else(|| same_name().find(|l| {
			l.handle().map_or(false, |h| !claimed.contains(&h)) && is_resource_updatable(l, resource, locals)
		}))
}

/// Whether `new` can replace `old` without leaving a requirement of `resources` unsatisfied.
///
/// Only requirements currently satisfied by `old` are checked, `old`'s own are ignored.
pub fn is_resource_updatable(old: &Resource, new: &Resource, resources: &[Arc<Resource>]) -> bool {
	resources.iter()
		.filter(|r| !std::ptr::eq(Arc::as_ptr(r), old))
		.flat_map(|r| r.requirements())
		.filter(|requirement| old.satisfies(requirement))
		.all(|requirement| new.satisfies(requirement))
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::filter::Filter;

	fn package_requirement(package: &str, minimum: &str) -> Requirement {
		let (name, minimum) = (package.to_string(), Version::parse(minimum).unwrap());
		let filter = Filter::from_predicate(format!("(&(package={})(version>={}))", package, minimum), move |p: &Properties| {
			p.get(capability::PACKAGE).map(|v| v.to_string()) == Some(name.clone())
				&& p.get(VERSION).and_then(|v| v.as_version()).map_or(false, |v| v >= &minimum)
		});
		Requirement::new(capability::PACKAGE, filter)
	}

	fn exporting(name: &str, version: &str) -> Arc<Resource> {
		let v = Version::parse(version).unwrap();
		Arc::new(Resource::builder()
			.symbolic_name(name)
			.version(v.clone())
			.capability(Capability::named(capability::PACKAGE, name).with_property(VERSION, v))
			.build())
	}

	fn requiring(name: &str, requirement: Requirement) -> Arc<Resource> {
		Arc::new(Resource::builder().symbolic_name(name).version(Version::default()).requirement(requirement).build())
	}

	#[test]
	fn updatable_when_dependents_stay_satisfied() {
		let (old, new) = (exporting("lib", "1.0"), exporting("lib", "1.5"));
		let dependents = vec![requiring("app", package_requirement("lib", "1.0"))];
		assert!(is_resource_updatable(&old, &new, &dependents));
	}

	#[test]
	fn not_updatable_when_a_dependent_breaks() {
		let (old, new) = (exporting("lib", "1.0"), exporting("lib", "0.9"));
		let dependents = vec![requiring("app", package_requirement("lib", "1.0"))];
		assert!(!is_resource_updatable(&old, &new, &dependents));
	}

	#[test]
	fn unrelated_requirements_are_ignored() {
		let (old, new) = (exporting("lib", "1.0"), exporting("lib", "0.9"));
		let dependents = vec![requiring("app", package_requirement("other", "1.0"))];
		assert!(is_resource_updatable(&old, &new, &dependents));
	}

	#[test]
	fn same_identity_is_found_first() {
		let locals = vec![exporting("lib", "1.0"), exporting("lib", "2.0")];
		let found = find_updatable_local_resource(&exporting("lib", "2.0"), &locals, &HashSet::new()).unwrap();
		assert!(Arc::ptr_eq(found, &locals[1]));
	}

	#[test]
	fn locals_without_handle_are_not_replaced() {
		let locals = vec![exporting("lib", "1.0")];
		assert!(find_updatable_local_resource(&exporting("lib", "2.0"), &locals, &HashSet::new()).is_none());
	}

	#[test]
	fn claimed_locals_are_not_replaced() {
		let installed = |handle| Arc::new(Resource::builder()
			.symbolic_name("lib")
			.version(Version::new(1, 0, handle))
			.installed_as(DeploymentHandle(handle))
			.build());
		let locals = vec![installed(1), installed(2)];

		let found = find_updatable_local_resource(&exporting("lib", "2.0"), &locals, &HashSet::from([DeploymentHandle(1)])).unwrap();
		assert!(Arc::ptr_eq(found, &locals[1]));
		assert!(find_updatable_local_resource(&exporting("lib", "2.0"), &locals, &HashSet::from([DeploymentHandle(1), DeploymentHandle(2)])).is_none());
	}

	#[test]
	fn default_fragment_detection() {
		struct Nothing;
		impl DeploymentTarget for Nothing {
			fn install(&mut self, _: &Resource) -> Result<DeploymentHandle, TargetError> { Err("unused".into()) }
			fn update(&mut self, _: DeploymentHandle, _: &Resource) -> Result<(), TargetError> { Ok(()) }
			fn start(&mut self, _: DeploymentHandle) -> Result<(), TargetError> { Ok(()) }
			fn stop(&mut self, _: DeploymentHandle) -> Result<(), TargetError> { Ok(()) }
			fn current_state(&self, _: DeploymentHandle) -> Result<HandleState, TargetError> { Ok(HandleState::Inactive) }
		}
		let fragment = Resource::builder().symbolic_name("frag").version(Version::default()).capability(Capability::named(capability::FRAGMENT, "host")).build();
		assert!(Nothing.is_fragment(&fragment));
		assert!(!Nothing.is_fragment(&exporting("lib", "1.0")));
	}
}
