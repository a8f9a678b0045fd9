//! Various helpers for testing
//!
//! functions in this module should use results and not use any panics to avoid confusion in callers

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use obr_rs::deployment::{DeploymentTarget, HandleState, TargetError};
use obr_rs::filter::{FilterCompiler, FilterSyntaxError, Predicate};
use obr_rs::repository::*;

/* Filters */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
	Equal,
	GreaterEqual,
	LessEqual,
	Greater,
	Less,
}

#[derive(Debug, Clone)]
enum Clause {
	And(Vec<Clause>),
	Or(Vec<Clause>),
	Not(Box<Clause>),
	Compare { key: String, operator: Operator, value: String },
}

impl Predicate for Clause {
	fn evaluate(&self, properties: &Properties) -> bool {
		use std::cmp::Ordering::*;
		match self {
			Clause::And(c) => c.iter().all(|c| c.evaluate(properties)),
			Clause::Or(c) => c.iter().any(|c| c.evaluate(properties)),
			Clause::Not(c) => !c.evaluate(properties),
			Clause::Compare { key, operator, value } => {
				let Some(property) = properties.get(key) else { return false };
				if *operator == Operator::Equal && value == "*" {
					return true
				}
				match (operator, property.compare_text(value)) {
					(_, None) => false,
					(Operator::Equal, Some(o)) => o == Equal,
					(Operator::GreaterEqual, Some(o)) => o != Less,
					(Operator::LessEqual, Some(o)) => o != Greater,
					(Operator::Greater, Some(o)) => o == Greater,
					(Operator::Less, Some(o)) => o == Less,
				}
			},
		}
	}
}

fn comparison_regex() -> &'static regex::Regex {
	static RE: OnceLock<regex::Regex> = OnceLock::new();
	RE.get_or_init(|| regex::Regex::new(r"^\s*([^=<>()\s]+)\s*(>=|<=|=|>|<)\s*([^()]*?)\s*$").expect("valid regex"))
}

/// Compiles LDAP style filters: `(key=value)`, `(key>=value)`, `(key<=value)`, `(key>value)`, `(key<value)`,
/// `(key=*)` for presence, combined with `(&...)`, `(|...)` and `(!...)`.
///
/// Values are compared with the type of the property they are compared against.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClauseFilterCompiler;

impl ClauseFilterCompiler {
	fn parse(&self, filter: &str, text: &str) -> Result<Clause, FilterSyntaxError> {
		let text = text.trim();
		let inner = text.strip_prefix('(')
			.and_then(|t| t.strip_suffix(')'))
			.ok_or_else(|| FilterSyntaxError::new(filter, format!("expected parenthesized clause at \"{}\"", text)))?;

		if let Some(rest) = inner.strip_prefix('&') {
			Ok(Clause::And(self.parse_list(filter, rest)?))
		} else if let Some(rest) = inner.strip_prefix('|') {
			Ok(Clause::Or(self.parse_list(filter, rest)?))
		} else if let Some(rest) = inner.strip_prefix('!') {
			Ok(Clause::Not(Box::new(self.parse(filter, rest)?)))
		} else {
			let captures = comparison_regex().captures(inner)
				.ok_or_else(|| FilterSyntaxError::new(filter, format!("invalid comparison \"{}\"", inner)))?;
			let operator = match &captures[2] {
				">=" => Operator::GreaterEqual,
				"<=" => Operator::LessEqual,
				">" => Operator::Greater,
				"<" => Operator::Less,
				_ => Operator::Equal,
			};
			Ok(Clause::Compare { key: captures[1].to_string(), operator, value: captures[3].to_string() })
		}
	}

	/// Splits `(a)(b)(c)` into its balanced parts.
	fn parse_list(&self, filter: &str, text: &str) -> Result<Vec<Clause>, FilterSyntaxError> {
		let mut clauses = Vec::new();
		let mut depth = 0usize;
		let mut start = None;
		for (i, c) in text.char_indices() {
			match c {
				'(' => {
					if depth == 0 { start = Some(i); }
					depth += 1;
				},
				')' => {
					depth = depth.checked_sub(1).ok_or_else(|| FilterSyntaxError::new(filter, "unbalanced parentheses"))?;
					if depth == 0 {
						if let Some(s) = start.take() {
							clauses.push(self.parse(filter, &text[s..=i])?);
						}
					}
				},
				c if depth == 0 && !c.is_whitespace() => {
					return Err(FilterSyntaxError::new(filter, format!("unexpected '{}'", c)))
				},
				_ => {},
			}
		}
		if depth != 0 {
			return Err(FilterSyntaxError::new(filter, "unbalanced parentheses"))
		}
		if clauses.is_empty() {
			return Err(FilterSyntaxError::new(filter, "empty clause list"))
		}
		Ok(clauses)
	}
}

impl FilterCompiler for ClauseFilterCompiler {
	fn compile(&self, text: &str) -> Result<Arc<dyn Predicate>, FilterSyntaxError> {
		Ok(Arc::new(self.parse(text, text)?))
	}
}

/* Resources */

/// A requirement named `name` using `filter` compiled by [`ClauseFilterCompiler`].
pub fn requirement(name: &str, filter: &str) -> Result<Requirement, FilterSyntaxError> {
	Requirement::parse(name, filter, &ClauseFilterCompiler)
}

/// Requirement on a package with at least `minimum_version`.
pub fn package_requirement(package: &str, minimum_version: &str) -> Result<Requirement, FilterSyntaxError> {
	requirement(capability::PACKAGE, &format!("(&(package={})(version>={}))", package, minimum_version))
}

/// Requirement on a bundle by symbolic name.
pub fn bundle_requirement(symbolic_name: &str) -> Result<Requirement, FilterSyntaxError> {
	requirement(capability::BUNDLE, &format!("(symbolicname={})", symbolic_name))
}

pub fn package_capability(package: &str, version: &str) -> obr_rs::Result<Capability> {
	Ok(Capability::named(capability::PACKAGE, package).with_property(VERSION, Version::parse(version)?))
}

/// A resource builder with a symbolic name and version set.
pub fn bundle(symbolic_name: &str, version: &str) -> obr_rs::Result<ResourceBuilder> {
	Ok(Resource::builder().symbolic_name(symbolic_name).version(Version::parse(version)?))
}

/// A bundle exporting a package of its own name and version.
pub fn library(symbolic_name: &str, version: &str) -> obr_rs::Result<ResourceBuilder> {
	Ok(bundle(symbolic_name, version)?.capability(package_capability(symbolic_name, version)?))
}

/* Deployment */

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetCall {
	Install(String),
	Update(DeploymentHandle, String),
	Start(DeploymentHandle),
	Stop(DeploymentHandle),
}

#[derive(Debug, thiserror::Error)]
pub enum RecordingTargetError {
	#[error("install of {0} refused")]
	InstallRefused(String),
	#[error("start of {0} refused")]
	StartRefused(DeploymentHandle),
	#[error("unknown handle {0}")]
	UnknownHandle(DeploymentHandle),
}

fn identity_text(resource: &Resource) -> String {
	resource.identity().map(|i| i.to_string()).unwrap_or_else(|| resource.to_string())
}

/// Deployment target keeping everything in memory and recording every call.
///
/// Handles it hands out start at 100.
#[derive(Debug)]
pub struct RecordingTarget {
	pub calls: Vec<TargetCall>,
	pub states: HashMap<DeploymentHandle, HandleState>,
	/// Symbolic names whose install fails.
	pub refuse_install: HashSet<String>,
	/// Symbolic names whose start fails.
	pub refuse_start: HashSet<String>,
	/// Symbolic names treated as fragments.
	pub fragments: HashSet<String>,
	names: HashMap<DeploymentHandle, String>,
	next_handle: u64,
}

impl Default for RecordingTarget {
	fn default() -> Self {
		Self {
			calls: Default::default(),
			states: Default::default(),
			refuse_install: Default::default(),
			refuse_start: Default::default(),
			fragments: Default::default(),
			names: Default::default(),
			next_handle: 100,
		}
	}
}

impl RecordingTarget {
	pub fn new() -> Self {
		Default::default()
	}

	/// Registers an already installed resource.
	pub fn with_installed(mut self, resource: &Resource, state: HandleState) -> Self {
		if let Some(handle) = resource.handle() {
			self.states.insert(handle, state);
			self.names.insert(handle, resource.symbolic_name().unwrap_or_default().to_string());
		}
		self
	}

	pub fn installed(&self) -> Vec<&str> {
		self.calls.iter().filter_map(|c| match c {
			TargetCall::Install(r) => Some(r.as_str()),
			_ => None,
		}).collect()
	}

	pub fn started(&self) -> Vec<DeploymentHandle> {
		self.calls.iter().filter_map(|c| match c {
			TargetCall::Start(h) => Some(*h),
			_ => None,
		}).collect()
	}
}

impl DeploymentTarget for RecordingTarget {
	fn install(&mut self, resource: &Resource) -> Result<DeploymentHandle, TargetError> {
		let name = resource.symbolic_name().unwrap_or_default().to_string();
		if self.refuse_install.contains(&name) {
			return Err(RecordingTargetError::InstallRefused(name).into())
		}
		let handle = DeploymentHandle(self.next_handle);
		self.next_handle += 1;
		self.calls.push(TargetCall::Install(identity_text(resource)));
		self.states.insert(handle, HandleState::Inactive);
		self.names.insert(handle, name);
		Ok(handle)
	}

	fn update(&mut self, handle: DeploymentHandle, resource: &Resource) -> Result<(), TargetError> {
		if !self.states.contains_key(&handle) {
			return Err(RecordingTargetError::UnknownHandle(handle).into())
		}
		self.calls.push(TargetCall::Update(handle, identity_text(resource)));
		self.names.insert(handle, resource.symbolic_name().unwrap_or_default().to_string());
		Ok(())
	}

	fn start(&mut self, handle: DeploymentHandle) -> Result<(), TargetError> {
		let name = self.names.get(&handle).ok_or(RecordingTargetError::UnknownHandle(handle))?;
		if self.refuse_start.contains(name) {
			return Err(RecordingTargetError::StartRefused(handle).into())
		}
		self.calls.push(TargetCall::Start(handle));
		self.states.insert(handle, HandleState::Active);
		Ok(())
	}

	fn stop(&mut self, handle: DeploymentHandle) -> Result<(), TargetError> {
		let state = self.states.get_mut(&handle).ok_or(RecordingTargetError::UnknownHandle(handle))?;
		*state = HandleState::Inactive;
		self.calls.push(TargetCall::Stop(handle));
		Ok(())
	}

	fn current_state(&self, handle: DeploymentHandle) -> Result<HandleState, TargetError> {
		Ok(*self.states.get(&handle).ok_or(RecordingTargetError::UnknownHandle(handle))?)
	}

	fn is_fragment(&self, resource: &Resource) -> bool {
		resource.symbolic_name().map_or(false, |n| self.fragments.contains(n))
			|| resource.capabilities().iter().any(|c| c.name() == capability::FRAGMENT)
	}
}
