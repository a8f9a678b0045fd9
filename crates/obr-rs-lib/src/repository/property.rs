//! Typed capability properties.
//!
//! Filter engines compare requirement text against these values using the value's own type,
//! see [`TypedValue::compare_text()`].

use std::cmp::Ordering;
use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Serialize, Deserialize};

use super::Version;

/// The declared type of a property value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
	#[default] String,
	Version,
	Long,
	Double,
	Uri,
	Url,
	Set,
}

impl std::fmt::Display for PropertyType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			PropertyType::String => "string",
			PropertyType::Version => "version",
			PropertyType::Long => "long",
			PropertyType::Double => "double",
			PropertyType::Uri => "uri",
			PropertyType::Url => "url",
			PropertyType::Set => "set",
		};
		f.write_str(s)
	}
}

/// A property value carrying its declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedValue {
	String(String),
	Version(Version),
	Long(i64),
	Double(f64),
	Uri(String),
	Url(String),
	Set(BTreeSet<String>),
}

impl TypedValue {
	/// Builds a value of type `ty` from its textual form.
	///
	/// Sets are comma separated, surrounding whitespace is ignored.
	/// # Errors
	/// - [`Parse`](crate::Error::Parse) when `text` isn't valid for `ty`.
	pub fn parse(ty: PropertyType, text: &str) -> crate::Result<Self> {
		Ok(match ty {
			PropertyType::String => TypedValue::String(text.to_string()),
			PropertyType::Version => TypedValue::Version(Version::parse(text)?),
			PropertyType::Long => TypedValue::Long(
				text.trim().parse::<i64>().map_err(|_| crate::Error::Parse(format!("\"{}\" is not a long", text)))?
			),
			PropertyType::Double => TypedValue::Double(
				text.trim().parse::<f64>().map_err(|_| crate::Error::Parse(format!("\"{}\" is not a double", text)))?
			),
			PropertyType::Uri => TypedValue::Uri(text.to_string()),
			PropertyType::Url => TypedValue::Url(text.to_string()),
			PropertyType::Set => TypedValue::Set(split_set(text)),
		})
	}

	pub fn property_type(&self) -> PropertyType {
		match self {
			TypedValue::String(_) => PropertyType::String,
			TypedValue::Version(_) => PropertyType::Version,
			TypedValue::Long(_) => PropertyType::Long,
			TypedValue::Double(_) => PropertyType::Double,
			TypedValue::Uri(_) => PropertyType::Uri,
			TypedValue::Url(_) => PropertyType::Url,
			TypedValue::Set(_) => PropertyType::Set,
		}
	}

	pub fn as_version(&self) -> Option<&Version> {
		if let TypedValue::Version(v) = self { Some(v) } else { None }
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			TypedValue::String(s) | TypedValue::Uri(s) | TypedValue::Url(s) => Some(s),
			_ => None,
		}
	}

	/// Compares this value against `text` interpreted as this value's type.
	///
	/// Returns `None` when `text` can't be read as this type, or for a set when the
	/// elements in `text` aren't all present. A set containing every element returns `Equal`.
	pub fn compare_text(&self, text: &str) -> Option<Ordering> {
		match self {
			TypedValue::String(s) | TypedValue::Uri(s) | TypedValue::Url(s) => Some(s.as_str().cmp(text)),
			TypedValue::Version(v) => Version::parse(text).ok().map(|other| v.cmp(&other)),
			TypedValue::Long(l) => text.trim().parse::<i64>().ok().map(|other| l.cmp(&other)),
			TypedValue::Double(d) => text.trim().parse::<f64>().ok().and_then(|other| d.partial_cmp(&other)),
			TypedValue::Set(set) => split_set(text).is_subset(set).then_some(Ordering::Equal),
		}
	}
}

fn split_set(text: &str) -> BTreeSet<String> {
	text.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(str::to_string)
		.collect()
}

impl std::fmt::Display for TypedValue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			TypedValue::String(s) | TypedValue::Uri(s) | TypedValue::Url(s) => f.write_str(s),
			TypedValue::Version(v) => write!(f, "{}", v),
			TypedValue::Long(l) => write!(f, "{}", l),
			TypedValue::Double(d) => write!(f, "{}", d),
			TypedValue::Set(set) => {
				let joined = set.iter().map(String::as_str).collect::<Vec<_>>().join(",");
				f.write_str(&joined)
			},
		}
	}
}

impl From<&str> for TypedValue {
	fn from(value: &str) -> Self { TypedValue::String(value.to_string()) }
}

impl From<String> for TypedValue {
	fn from(value: String) -> Self { TypedValue::String(value) }
}

impl From<Version> for TypedValue {
	fn from(value: Version) -> Self { TypedValue::Version(value) }
}

impl From<i64> for TypedValue {
	fn from(value: i64) -> Self { TypedValue::Long(value) }
}

impl From<f64> for TypedValue {
	fn from(value: f64) -> Self { TypedValue::Double(value) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Entry {
	/// Key as first given, kept for display.
	key: String,
	value: TypedValue,
}

/// A case-insensitively keyed property map.
///
/// Iteration follows the order keys were first inserted.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Properties {
	entries: IndexMap<String, Entry>,
}

impl Properties {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts a value, replacing any existing value for the key regardless of case.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<TypedValue>) {
		let key = key.into();
		let value = value.into();
		match self.entries.get_mut(&key.to_lowercase()) {
			Some(existing) => existing.value = value,
			None => {
				self.entries.insert(key.to_lowercase(), Entry { key, value });
			},
		}
	}

	pub fn get(&self, key: &str) -> Option<&TypedValue> {
		self.entries.get(&key.to_lowercase()).map(|e| &e.value)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.contains_key(&key.to_lowercase())
	}

	/// Iterates `(key, value)` with keys in their original spelling.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
		self.entries.values().map(|e| (e.key.as_str(), &e.value))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl<K, V> FromIterator<(K, V)> for Properties
where K: Into<String>, V: Into<TypedValue>
{
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		let mut properties = Properties::new();
		for (k, v) in iter {
			properties.insert(k, v);
		}
		properties
	}
}
