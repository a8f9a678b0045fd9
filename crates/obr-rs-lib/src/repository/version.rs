use serde::*;

/// A resource or capability version in `major.minor.micro.qualifier` form.
///
/// Missing numeric parts are treated as zero so `1.2` and `1.2.0` are equal.
/// Comparison is numeric on the first three parts then lexical on the qualifier,
/// so `1.2.10` is greater than `1.2.4`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
	major: u64,
	minor: u64,
	micro: u64,
	qualifier: String,
}

impl Version {
	pub fn new(major: u64, minor: u64, micro: u64) -> Self {
		Self { major, minor, micro, qualifier: String::new() }
	}

	pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
		self.qualifier = qualifier.into();
		self
	}

	/// Parses a version string.
	///
	/// # Errors
	/// - [`Parse`](crate::Error::Parse) when a numeric part isn't a number or there are too many parts.
	pub fn parse(version: &str) -> crate::Result<Self> {
		let version = version.trim();
		if version.is_empty() {
			return Ok(Self::default())
		}

		let mut parts = version.splitn(4, '.');
		let mut numeric = [0u64; 3];
		for slot in numeric.iter_mut() {
			match parts.next() {
				Some(p) => {
					*slot = p.parse::<u64>().map_err(|_| crate::Error::Parse(format!("invalid version component \"{}\" in \"{}\"", p, version)))?;
				},
				None => break,
			}
		}

		let qualifier = parts.next().unwrap_or_default();
		if !qualifier.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
			return Err(crate::Error::Parse(format!("invalid version qualifier \"{}\" in \"{}\"", qualifier, version)))
		}

		Ok(Version {
			major: numeric[0],
			minor: numeric[1],
			micro: numeric[2],
			qualifier: qualifier.to_string(),
		})
	}

	pub fn major(&self) -> u64 { self.major }
	pub fn minor(&self) -> u64 { self.minor }
	pub fn micro(&self) -> u64 { self.micro }
	pub fn qualifier(&self) -> &str { &self.qualifier }
}

impl TryFrom<&str> for Version {
	type Error = crate::Error;
	fn try_from(value: &str) -> Result<Self, Self::Error> { Self::parse(value) }
}

impl std::str::FromStr for Version {
	type Err = crate::Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl Ord for Version {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.major.cmp(&other.major)
			.then(self.minor.cmp(&other.minor))
			.then(self.micro.cmp(&other.micro))
			.then_with(|| self.qualifier.cmp(&other.qualifier))
	}
}

impl PartialOrd for Version {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl std::fmt::Display for Version {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
		if !self.qualifier.is_empty() {
			write!(f, ".{}", self.qualifier)?;
		}
		Ok(())
	}
}
