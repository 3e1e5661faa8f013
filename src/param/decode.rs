//! Typed decoding of values received from redirects and token responses.

// crates.io
use serde_json::Number;
// self
use crate::{
	_prelude::*,
	param::{ParamName, ParamValue, ParameterType, Parameters, type_of},
};

/// A received value does not match its declared type.
#[derive(Debug, ThisError)]
#[error("Received parameter `{name}` is not a valid {expected}.")]
pub struct DecodeError {
	/// Parameter name.
	pub name: String,
	/// Declared type.
	pub expected: ParameterType,
	/// JSON parsing failure, when one occurred.
	#[source]
	pub source: Option<serde_json::Error>,
}

/// Decodes a raw string (fragment or query value) according to the declared type of `name`.
///
/// `string[]` values are split on whitespace; `number`, `boolean`, and `json` values are
/// parsed as JSON; strings and untyped names are kept verbatim.
pub fn decode_str(name: &str, raw: &str) -> Result<ParamValue, DecodeError> {
	let expected = type_of(name);
	let fail = |source| DecodeError { name: name.to_owned(), expected, source };

	match expected {
		ParameterType::String | ParameterType::Untyped => Ok(ParamValue::String(raw.to_owned())),
		ParameterType::StringArray =>
			Ok(ParamValue::StringArray(raw.split_whitespace().map(ToOwned::to_owned).collect())),
		ParameterType::Number => serde_json::from_str::<Number>(raw.trim())
			.map(ParamValue::Number)
			.map_err(|e| fail(Some(e))),
		ParameterType::Boolean => serde_json::from_str::<bool>(raw.trim())
			.map(ParamValue::Boolean)
			.map_err(|e| fail(Some(e))),
		ParameterType::Json =>
			serde_json::from_str::<Value>(raw).map(ParamValue::Json).map_err(|e| fail(Some(e))),
	}
}

/// Decodes a JSON value according to the declared type of `name`.
///
/// Strings supplied for non-string types go through [`decode_str`].
pub fn decode_json(name: &str, value: Value) -> Result<ParamValue, DecodeError> {
	let expected = type_of(name);

	match value {
		Value::String(raw)
			if !matches!(expected, ParameterType::String | ParameterType::Untyped) =>
			decode_str(name, &raw),
		value => expected
			.accept(ParamValue::from_json(value))
			.ok_or(DecodeError { name: name.to_owned(), expected, source: None }),
	}
}

/// Converts a relative `expires_in` (seconds) into an absolute epoch-millisecond timestamp.
pub fn absolute_expiry(seconds: &Number, now: OffsetDateTime) -> Number {
	let now_ms = (now.unix_timestamp_nanos() / 1_000_000) as i64;
	let delta_ms = seconds.as_f64().map(|s| (s * 1_000.0).round() as i64).unwrap_or_default();

	Number::from(now_ms.saturating_add(delta_ms))
}

/// Decodes `application/x-www-form-urlencoded` pairs into a typed parameter set.
pub fn decode_pairs<I>(pairs: I, now: OffsetDateTime) -> Result<Parameters, DecodeError>
where
	I: IntoIterator<Item = (String, String)>,
{
	let mut decoded = Parameters::default();

	for (name, raw) in pairs {
		let value = with_absolute_expiry(&name, decode_str(&name, &raw)?, now);

		decoded.put(name, value);
	}

	Ok(decoded)
}

/// Decodes a JSON response object into a typed parameter set.
pub fn decode_response(
	response: &Map<String, Value>,
	now: OffsetDateTime,
) -> Result<Parameters, DecodeError> {
	let mut decoded = Parameters::default();

	for (name, value) in response {
		let value = with_absolute_expiry(name, decode_json(name, value.clone())?, now);

		decoded.put(name.clone(), value);
	}

	Ok(decoded)
}

fn with_absolute_expiry(name: &str, value: ParamValue, now: OffsetDateTime) -> ParamValue {
	match value {
		ParamValue::Number(seconds) if name == ParamName::ExpiresIn.as_str() =>
			ParamValue::Number(absolute_expiry(&seconds, now)),
		value => value,
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn strings_decode_per_declared_type() {
		assert_eq!(
			decode_str("scope", "openid  email").unwrap(),
			ParamValue::from(["openid", "email"])
		);
		assert_eq!(decode_str("max_age", "30").unwrap(), ParamValue::from(30_i64));
		assert_eq!(decode_str("x-flag", "30").unwrap(), ParamValue::from("30"));
		assert!(decode_str("expires_in", "later").is_err());
		assert!(decode_str("claims", "{not json").is_err());
	}

	#[test]
	fn json_strings_for_numbers_are_parsed() {
		assert_eq!(decode_json("expires_in", Value::from("60")).unwrap(), ParamValue::from(60_i64));
		assert_eq!(decode_json("access_token", Value::from("abc")).unwrap(), ParamValue::from("abc"));
		assert!(decode_json("access_token", Value::from(5)).is_err());
	}

	#[test]
	fn expires_in_becomes_absolute_milliseconds() {
		let now = datetime!(2025-01-01 00:00 UTC);
		let decoded = decode_pairs([("expires_in".to_owned(), "3600".to_owned())], now).unwrap();
		let expected = now.unix_timestamp() * 1_000 + 3_600_000;

		assert_eq!(
			decoded.number(ParamName::ExpiresIn).and_then(Number::as_i64),
			Some(expected)
		);
	}
}
