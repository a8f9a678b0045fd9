//! Repositories and the resources they hold.
//!
//! A [`Repository`] is shared as `Arc<Repository>` between whoever keeps it fresh and any number
//! of resolvers. The resolver only ever reads immutable snapshots from [`Repository::resources()`],
//! staleness is detected through [`Repository::last_modified()`].

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Serialize, Deserialize};

mod version;
pub use version::Version;

mod property;
pub use property::PropertyType;
pub use property::Properties;
pub use property::TypedValue;

pub mod capability;
pub use capability::Capability;

mod requirement;
pub use requirement::Requirement;

mod resource;
pub use resource::DeploymentHandle;
pub use resource::Resource;
pub use resource::ResourceBuilder;
pub use resource::ResourceIdentity;

/* Well known property keys */
pub const SYMBOLIC_NAME: &str = "symbolicname";
pub const VERSION: &str = "version";
pub const PRESENTATION_NAME: &str = "presentationname";
pub const URI: &str = "uri";

/// Symbolic name of the synthetic resource in a [`Locality::System`] repository.
pub const SYSTEM_RESOURCE_NAME: &str = "system.bundle";

/// Where the resources of a repository live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locality {
	/// Resources already materialized in the running system.
	Local,
	/// The single synthetic resource describing what the platform provides.
	System,
	/// Resources that have to be fetched before use.
	#[default] Remote,
}

impl Locality {
	pub fn is_local(&self) -> bool {
		matches!(self, Locality::Local | Locality::System)
	}
}

#[derive(Debug, Default)]
struct RepositoryState {
	entries: Vec<Arc<Resource>>,
	last_modified: u64,
	generation: u64,
	snapshot: Option<Arc<[Arc<Resource>]>>,
}

impl RepositoryState {
	/// Called on every mutation.
	fn invalidate(&mut self) {
		self.snapshot = None;
		self.generation += 1;
		self.last_modified = std::cmp::max(now_millis(), self.last_modified + 1);
	}
}

fn now_millis() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_millis() as u64)
		.unwrap_or_default()
}

/// A named collection of resources.
///
/// Adding a resource whose identity matches an existing one replaces it in place.
#[derive(Debug)]
pub struct Repository {
	name: String,
	locality: Locality,
	state: Mutex<RepositoryState>,
}

impl Repository {
	pub fn new(name: impl Into<String>, locality: Locality) -> Arc<Self> {
		let repository = Arc::new(Self {
			name: name.into(),
			locality,
			state: Default::default(),
		});
		repository.touch();
		repository
	}

	/// Creates a repository already containing `resources`.
	pub fn with_resources(name: impl Into<String>, locality: Locality, resources: impl IntoIterator<Item = Resource>) -> Arc<Self> {
		let repository = Self::new(name, locality);
		for resource in resources {
			repository.add_resource(resource);
		}
		repository
	}

	/// Creates the system repository, holding one resource that offers `capabilities`.
	pub fn system(capabilities: impl IntoIterator<Item = Capability>) -> Arc<Self> {
		let resource = Resource::builder()
			.symbolic_name(SYSTEM_RESOURCE_NAME)
			.version(Version::default())
			.presentation_name("System Bundle")
			.capabilities(capabilities)
			.build();
		Self::with_resources("System Repository", Locality::System, [resource])
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn locality(&self) -> Locality {
		self.locality
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, RepositoryState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Adds `resource`, taking ownership and tagging it with this repository's locality.
	///
	/// Returns the shared resource as stored.
	pub fn add_resource(self: &Arc<Self>, mut resource: Resource) -> Arc<Resource> {
		resource.set_owner(Arc::downgrade(self), self.locality);
		let resource = Arc::new(resource);

		let mut state = self.lock();
		match state.entries.iter().position(|r| r == &resource) {
			Some(i) => {
				log::trace!("Replacing resource {} in repository {}", resource, self.name);
				state.entries[i] = resource.clone();
			},
			None => {
				log::trace!("Adding resource {} to repository {}", resource, self.name);
				state.entries.push(resource.clone());
			},
		}
		state.invalidate();
		resource
	}

	/// Removes the resource with `identity`, if present.
	pub fn remove_resource(&self, identity: &ResourceIdentity) -> Option<Arc<Resource>> {
		let mut state = self.lock();
		let i = state.entries.iter().position(|r| r.identity().as_ref() == Some(identity))?;
		let removed = state.entries.remove(i);
		log::trace!("Removed resource {} from repository {}", removed, self.name);
		state.invalidate();
		Some(removed)
	}

	/// Marks the repository as changed without altering its content.
	pub fn touch(&self) {
		self.lock().invalidate();
	}

	/// An immutable snapshot of the current resources, rebuilt only after a mutation.
	pub fn resources(&self) -> Arc<[Arc<Resource>]> {
		let mut state = self.lock();
		if let Some(snapshot) = &state.snapshot {
			return snapshot.clone()
		}
		let snapshot: Arc<[Arc<Resource>]> = state.entries.iter().cloned().collect();
		state.snapshot = Some(snapshot.clone());
		snapshot
	}

	/// Milliseconds since the unix epoch of the last mutation. Strictly increases on every change.
	pub fn last_modified(&self) -> u64 {
		self.lock().last_modified
	}

	/// Counts mutations, identifies the snapshot returned by [`resources()`](Self::resources()).
	pub fn generation(&self) -> u64 {
		self.lock().generation
	}
}
