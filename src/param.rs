//! Typed protocol parameters: values, validated sets, per-call overrides, and the
//! resolution pipeline that merges them.

pub mod decode;
pub mod pipeline;
pub mod registry;

pub use decode::*;
pub use pipeline::*;
pub use registry::*;

// crates.io
use serde_json::Number;
// self
use crate::{_prelude::*, error::ConfigError};

/// A single parameter value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
	/// JSON boolean.
	Boolean(bool),
	/// JSON number.
	Number(Number),
	/// Plain string.
	String(String),
	/// String array (space-joined on the wire).
	StringArray(Vec<String>),
	/// Any other JSON value.
	Json(Value),
}
impl ParamValue {
	/// Converts a JSON value, keeping arrays of strings as [`ParamValue::StringArray`].
	pub fn from_json(value: Value) -> Self {
		match value {
			Value::Bool(b) => Self::Boolean(b),
			Value::Number(n) => Self::Number(n),
			Value::String(s) => Self::String(s),
			Value::Array(items) if items.iter().all(Value::is_string) => Self::StringArray(
				items.into_iter().filter_map(|v| v.as_str().map(ToOwned::to_owned)).collect(),
			),
			other => Self::Json(other),
		}
	}

	/// Converts back into a JSON value.
	pub fn to_json(&self) -> Value {
		match self {
			Self::Boolean(b) => Value::Bool(*b),
			Self::Number(n) => Value::Number(n.clone()),
			Self::String(s) => Value::String(s.clone()),
			Self::StringArray(items) => Value::from(items.clone()),
			Self::Json(v) => v.clone(),
		}
	}

	/// Renders the value the way it travels in a form or query string.
	pub fn to_wire(&self) -> String {
		match self {
			Self::Boolean(b) => b.to_string(),
			Self::Number(n) => n.to_string(),
			Self::String(s) => s.clone(),
			Self::StringArray(items) => items.join(" "),
			Self::Json(v) => v.to_string(),
		}
	}

	/// Borrows the string payload.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(s) => Some(s),
			_ => None,
		}
	}

	/// Borrows the string-array payload.
	pub fn as_strings(&self) -> Option<&[String]> {
		match self {
			Self::StringArray(items) => Some(items),
			_ => None,
		}
	}

	/// Borrows the number payload.
	pub fn as_number(&self) -> Option<&Number> {
		match self {
			Self::Number(n) => Some(n),
			_ => None,
		}
	}
}
impl From<&str> for ParamValue {
	fn from(value: &str) -> Self {
		Self::String(value.to_owned())
	}
}
impl From<String> for ParamValue {
	fn from(value: String) -> Self {
		Self::String(value)
	}
}
impl From<Vec<String>> for ParamValue {
	fn from(value: Vec<String>) -> Self {
		Self::StringArray(value)
	}
}
impl<const N: usize> From<[&str; N]> for ParamValue {
	fn from(value: [&str; N]) -> Self {
		Self::StringArray(value.iter().map(|s| (*s).to_owned()).collect())
	}
}
impl From<bool> for ParamValue {
	fn from(value: bool) -> Self {
		Self::Boolean(value)
	}
}
impl From<i64> for ParamValue {
	fn from(value: i64) -> Self {
		Self::Number(value.into())
	}
}

impl ParameterType {
	/// Accepts `value` if it satisfies this type, splitting a string supplied for a
	/// [`ParameterType::StringArray`] on whitespace.
	pub fn accept(self, value: ParamValue) -> Option<ParamValue> {
		match (self, value) {
			(Self::Json | Self::Untyped, value) => Some(value),
			(Self::String, value @ ParamValue::String(_))
			| (Self::StringArray, value @ ParamValue::StringArray(_))
			| (Self::Number, value @ ParamValue::Number(_))
			| (Self::Boolean, value @ ParamValue::Boolean(_)) => Some(value),
			(Self::StringArray, ParamValue::String(s)) =>
				Some(ParamValue::StringArray(s.split_whitespace().map(ToOwned::to_owned).collect())),
			_ => None,
		}
	}
}

/// Validated parameter set keyed by wire name.
///
/// Values inserted through [`Parameters::insert`] always satisfy their declared type; typed
/// accessors such as [`Parameters::strings`] return `None` for a value of the wrong shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, ParamValue>);
impl Parameters {
	/// Inserts a value after checking it against the type registry.
	pub fn insert(
		&mut self,
		name: impl Into<String>,
		value: impl Into<ParamValue>,
	) -> Result<Option<ParamValue>, ConfigError> {
		let name = name.into();
		let expected = type_of(&name);
		let value = expected
			.accept(value.into())
			.ok_or_else(|| ConfigError::InvalidParameter { name: name.clone(), expected })?;

		Ok(self.0.insert(name, value))
	}

	/// Stores a string under a known name.
	pub fn set_str(&mut self, name: ParamName, value: impl Into<String>) {
		debug_assert_eq!(name.parameter_type(), ParameterType::String);

		self.0.insert(name.as_str().to_owned(), ParamValue::String(value.into()));
	}

	/// Stores a string array under a known name.
	pub fn set_strings(&mut self, name: ParamName, value: Vec<String>) {
		debug_assert_eq!(name.parameter_type(), ParameterType::StringArray);

		self.0.insert(name.as_str().to_owned(), ParamValue::StringArray(value));
	}

	pub(crate) fn put(&mut self, name: String, value: ParamValue) {
		self.0.insert(name, value);
	}

	/// Returns the raw value stored under `name`.
	pub fn get(&self, name: &str) -> Option<&ParamValue> {
		self.0.get(name)
	}

	/// Returns the string stored under a known name.
	pub fn str(&self, name: ParamName) -> Option<&str> {
		self.get(name.as_str()).and_then(ParamValue::as_str)
	}

	/// Returns the string array stored under a known name.
	pub fn strings(&self, name: ParamName) -> Option<&[String]> {
		self.get(name.as_str()).and_then(ParamValue::as_strings)
	}

	/// Returns the number stored under a known name.
	pub fn number(&self, name: ParamName) -> Option<&Number> {
		self.get(name.as_str()).and_then(ParamValue::as_number)
	}

	/// Returns `true` when `name` is present.
	pub fn contains(&self, name: &str) -> bool {
		self.0.contains_key(name)
	}

	/// Removes and returns the value stored under `name`.
	pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
		self.0.remove(name)
	}

	/// Overlays `other`; its values win.
	pub fn merge(&mut self, other: Parameters) {
		self.0.extend(other.0);
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when no parameter is set.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates over `(name, value)` pairs in name order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Wire-form pairs (arrays space-joined, JSON values serialized).
	pub fn to_wire(&self) -> Vec<(String, String)> {
		self.0.iter().map(|(k, v)| (k.clone(), v.to_wire())).collect()
	}

	/// JSON object view.
	pub fn to_json(&self) -> Map<String, Value> {
		self.0.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
	}
}

/// Per-endpoint or per-call parameter overrides.
///
/// A `None` entry (JSON `null`) deletes the parameter from the resolved set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Overrides(BTreeMap<String, Option<ParamValue>>);
impl Overrides {
	/// Creates an empty override map.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder-style [`Overrides::set`].
	pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
		self.set(name, value);

		self
	}

	/// Builder-style [`Overrides::delete`].
	pub fn without(mut self, name: impl Into<String>) -> Self {
		self.delete(name);

		self
	}

	/// Overrides `name` with `value`.
	pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
		self.0.insert(name.into(), Some(value.into()));
	}

	/// Marks `name` for deletion.
	pub fn delete(&mut self, name: impl Into<String>) {
		self.0.insert(name.into(), None);
	}

	/// Drops the entry for `name` entirely (neither override nor deletion).
	pub fn remove(&mut self, name: &str) -> Option<Option<ParamValue>> {
		self.0.remove(name)
	}

	/// Returns the entry for `name`: `Some(None)` means "delete".
	pub fn get(&self, name: &str) -> Option<Option<&ParamValue>> {
		self.0.get(name).map(Option::as_ref)
	}

	/// Returns the string override for `name`, if one is set.
	pub fn str(&self, name: &str) -> Option<&str> {
		self.get(name).flatten().and_then(ParamValue::as_str)
	}

	/// Returns `true` when no entry exists.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates over entries in name order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ParamValue>)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
	}
}
