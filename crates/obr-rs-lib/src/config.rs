//! Resolution defaults.
//!
//! Stored as JSON, see [`Config::load_from_disk()`].

use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::relationship_resolver::ResolveFlags;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Prefer already installed resources over remote ones when ranking candidates.
	prefer_local: bool,
	/// Consider resources from local repositories at all.
	use_local_resources: bool,
	/// Consider the system resource.
	use_system_resource: bool,
	/// Resolve and deploy optional requirements.
	include_optional: bool,
	/// Start resources after they are deployed.
	start_after_deploy: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			prefer_local: true,
			use_local_resources: true,
			use_system_resource: true,
			include_optional: true,
			start_after_deploy: false,
		}
	}
}

impl Config {
	/// Default location of the config file.
	///
	/// `$XDG_CONFIG_HOME/obr-rs/config.json`, falling back to `$HOME/.config`, or `%APPDATA%` on windows.
	/// # Errors
	/// - [`IO`](crate::Error::IO) when none of the environment variables are set.
	pub fn default_path() -> crate::Result<PathBuf> {
		fn env(key: &str) -> crate::Result<PathBuf> {
			std::env::var_os(key)
				.map(PathBuf::from)
				.ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, format!("{} environment variable not set.", key)).into())
		}

		#[cfg(target_os = "windows")]
		let path = env("APPDATA")?;

		#[cfg(not(target_os = "windows"))]
		let path = env("XDG_CONFIG_HOME").or_else(|_| env("HOME").map(|p| p.join(".config")))?;

		Ok(path.join("obr-rs").join("config.json"))
	}

	/// # Errors
	/// - [`IO`](crate::Error::IO) when the file can't be read.
	/// - [`SerdeJSON`](crate::Error::SerdeJSON) when the file isn't a valid config.
	pub fn load_from_disk(path: impl AsRef<Path>) -> crate::Result<Self> {
		let path = path.as_ref();
		log::debug!("Loading config from {}", path.display());
		let file = std::fs::File::open(path)?;
		Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
	}

	/// Writes the config, creating parent directories as needed.
	pub fn save_to_disk(&self, path: impl AsRef<Path>) -> crate::Result<()> {
		let path = path.as_ref();
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		log::debug!("Saving config to {}", path.display());
		let file = std::fs::File::create(path)?;
		serde_json::to_writer_pretty(file, self)?;
		Ok(())
	}

	/// Flags used by [`Resolver::resolve_default()`](crate::Resolver::resolve_default()).
	pub fn resolve_flags(&self) -> ResolveFlags {
		let mut flags = ResolveFlags::empty();
		flags.set(ResolveFlags::DO_NOT_PREFER_LOCAL, !self.prefer_local);
		flags.set(ResolveFlags::NO_LOCAL_RESOURCES, !self.use_local_resources);
		flags.set(ResolveFlags::NO_SYSTEM_RESOURCE, !self.use_system_resource);
		flags.set(ResolveFlags::NO_OPTIONAL_RESOURCES, !self.include_optional);
		flags
	}

	/// Flags used by [`Resolver::deploy_default()`](crate::Resolver::deploy_default()).
	pub fn deploy_flags(&self) -> ResolveFlags {
		let mut flags = self.resolve_flags();
		flags.set(ResolveFlags::START, self.start_after_deploy);
		flags
	}

	pub fn prefer_local(&self) -> bool {
		self.prefer_local
	}
	pub fn set_prefer_local(&mut self, prefer_local: bool) {
		self.prefer_local = prefer_local;
	}

	pub fn use_local_resources(&self) -> bool {
		self.use_local_resources
	}
	pub fn set_use_local_resources(&mut self, use_local_resources: bool) {
		self.use_local_resources = use_local_resources;
	}

	pub fn use_system_resource(&self) -> bool {
		self.use_system_resource
	}
	pub fn set_use_system_resource(&mut self, use_system_resource: bool) {
		self.use_system_resource = use_system_resource;
	}

	pub fn include_optional(&self) -> bool {
		self.include_optional
	}
	pub fn set_include_optional(&mut self, include_optional: bool) {
		self.include_optional = include_optional;
	}

	pub fn start_after_deploy(&self) -> bool {
		self.start_after_deploy
	}
	pub fn set_start_after_deploy(&mut self, start_after_deploy: bool) {
		self.start_after_deploy = start_after_deploy;
	}
}
