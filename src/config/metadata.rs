//! Authorization server metadata (RFC 8414 / OpenID Connect Discovery).

// self
use crate::{_prelude::*, error::ProtocolError};

/// Discovery metadata; well-known fields are typed and everything else lands in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
	/// Issuer identifier.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub issuer: Option<String>,
	/// Authorization endpoint URL.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub authorization_endpoint: Option<String>,
	/// Token endpoint URL.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token_endpoint: Option<String>,
	/// Revocation endpoint URL.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub revocation_endpoint: Option<String>,
	/// UserInfo endpoint URL.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub userinfo_endpoint: Option<String>,
	/// RP-initiated logout endpoint URL.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub end_session_endpoint: Option<String>,
	/// Introspection endpoint URL.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub introspection_endpoint: Option<String>,
	/// Device authorization endpoint URL.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub device_authorization_endpoint: Option<String>,
	/// JWKS document URL.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub jwks_uri: Option<String>,
	#[allow(missing_docs)]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub scopes_supported: Option<Vec<String>>,
	#[allow(missing_docs)]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub response_types_supported: Option<Vec<String>>,
	#[allow(missing_docs)]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub grant_types_supported: Option<Vec<String>>,
	#[allow(missing_docs)]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub code_challenge_methods_supported: Option<Vec<String>>,
	#[allow(missing_docs)]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id_token_signing_alg_values_supported: Option<Vec<String>>,
	#[allow(missing_docs)]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token_endpoint_auth_methods_supported: Option<Vec<String>>,
	/// Fields outside the typed set.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}
impl Metadata {
	/// Overlays a discovery document; fields present in `document` win.
	pub fn merge(&mut self, document: Map<String, Value>) -> Result<(), ProtocolError> {
		let mut merged = match serde_json::to_value(&*self) {
			Ok(Value::Object(map)) => map,
			_ => Map::new(),
		};

		merged.extend(document);

		*self = serde_path_to_error::deserialize(Value::Object(merged))?;

		Ok(())
	}

	/// Returns `true` when no field is set.
	pub fn is_empty(&self) -> bool {
		self == &Self::default()
	}
}
