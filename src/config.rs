//! Caller-owned session state: configuration, discovery metadata, live parameters, and
//! per-endpoint overrides.
//!
//! Every flow takes `&mut Session` and writes its results back into it; this is how the
//! PKCE verifier, `state`, and `nonce` generated during authorization reach the token and
//! verification flows later. The engine keeps no hidden copy and no lock: a caller that runs
//! two flows concurrently against the same session must serialize access itself.

mod metadata;

pub use metadata::*;

// self
use crate::{
	_prelude::*,
	param::{Endpoint, Overrides, Parameters},
};

/// Default suffix appended to the issuer to locate the discovery document.
pub const DEFAULT_DISCOVERY_SUFFIX: &str = ".well-known/openid-configuration";

/// The authorization grant the client runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationGrant {
	/// Authorization Code grant (PKCE by default).
	#[default]
	Code,
	/// Implicit grant.
	Implicit,
	/// OpenID Connect hybrid flow.
	Hybrid,
}
impl AuthorizationGrant {
	/// Returns the configuration label.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthorizationGrant::Code => "code",
			AuthorizationGrant::Implicit => "implicit",
			AuthorizationGrant::Hybrid => "hybrid",
		}
	}
}
impl Display for AuthorizationGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Body encoding for `POST` requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
	/// `application/x-www-form-urlencoded`.
	#[default]
	Form,
	/// `application/json`.
	Json,
}
impl ContentType {
	/// Returns the MIME type.
	pub const fn mime(self) -> &'static str {
		match self {
			ContentType::Form => "application/x-www-form-urlencoded",
			ContentType::Json => "application/json",
		}
	}
}

/// Client behavior switches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
	/// Grant driving `response_type` synthesis, PKCE, and nonce rules.
	pub grant_type: AuthorizationGrant,
	/// Disables PKCE.
	pub no_pkce: bool,
	/// Disables `state` (honored only while `storage` is enabled).
	pub no_state: bool,
	/// Persists the session before an `HREF` redirect so it survives the navigation.
	pub storage: bool,
	/// Records outgoing payloads and intercepts `HREF` dispatches.
	pub test: bool,
	/// Body encoding for `POST` requests.
	pub content_type: ContentType,
	/// Explicit discovery document URL.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub discovery_endpoint: Option<String>,
	/// Suffix appended to the issuer when `discovery_endpoint` is unset.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub discovery_suffix: Option<String>,
}
impl Configuration {
	/// Discovery suffix, falling back to [`DEFAULT_DISCOVERY_SUFFIX`].
	pub fn discovery_suffix(&self) -> &str {
		self.discovery_suffix.as_deref().unwrap_or(DEFAULT_DISCOVERY_SUFFIX)
	}
}
impl Default for Configuration {
	fn default() -> Self {
		Self {
			grant_type: AuthorizationGrant::default(),
			no_pkce: false,
			no_state: false,
			storage: true,
			test: false,
			content_type: ContentType::default(),
			discovery_endpoint: None,
			discovery_suffix: None,
		}
	}
}

/// Configuration root shared by every flow.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Behavior switches.
	pub configuration: Configuration,
	/// Discovery metadata.
	pub metadata: Metadata,
	/// Live parameter values; authoritative cross-flow state.
	pub parameters: Parameters,
	/// Overrides applied to discovery requests only.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub discovery: Option<Overrides>,
	/// Overrides applied to authorization requests only.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub authorization: Option<Overrides>,
	/// Overrides applied to token requests only.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token: Option<Overrides>,
	/// Overrides applied to refresh requests only.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub refresh: Option<Overrides>,
	/// Overrides applied to revocation requests only.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub revocation: Option<Overrides>,
	/// Overrides applied to `id_token` verification only.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub verify_token: Option<Overrides>,
}
impl Config {
	/// Override map for `endpoint`, if configured.
	pub fn overrides(&self, endpoint: Endpoint) -> Option<&Overrides> {
		match endpoint {
			Endpoint::Discovery => self.discovery.as_ref(),
			Endpoint::Authorization => self.authorization.as_ref(),
			Endpoint::Token => self.token.as_ref(),
			Endpoint::Refresh => self.refresh.as_ref(),
			Endpoint::Revocation => self.revocation.as_ref(),
			Endpoint::VerifyToken => self.verify_token.as_ref(),
		}
	}

	/// Mutable override map for `endpoint`, created on demand.
	pub fn overrides_mut(&mut self, endpoint: Endpoint) -> &mut Overrides {
		let slot = match endpoint {
			Endpoint::Discovery => &mut self.discovery,
			Endpoint::Authorization => &mut self.authorization,
			Endpoint::Token => &mut self.token,
			Endpoint::Refresh => &mut self.refresh,
			Endpoint::Revocation => &mut self.revocation,
			Endpoint::VerifyToken => &mut self.verify_token,
		};

		slot.get_or_insert_with(Overrides::default)
	}

	/// Returns `true` when nothing has been configured or recovered.
	pub fn is_empty(&self) -> bool {
		self == &Self::default()
	}

	/// Shallow merge: every non-empty section of `other` replaces the matching section.
	pub fn merge_shallow(&mut self, other: Config) {
		let Config {
			configuration,
			metadata,
			parameters,
			discovery,
			authorization,
			token,
			refresh,
			revocation,
			verify_token,
		} = other;

		if configuration != Configuration::default() {
			self.configuration = configuration;
		}
		if !metadata.is_empty() {
			self.metadata = metadata;
		}
		if !parameters.is_empty() {
			self.parameters = parameters;
		}

		for (slot, value) in [
			(&mut self.discovery, discovery),
			(&mut self.authorization, authorization),
			(&mut self.token, token),
			(&mut self.refresh, refresh),
			(&mut self.revocation, revocation),
			(&mut self.verify_token, verify_token),
		] {
			if value.is_some() {
				*slot = value;
			}
		}
	}
}

/// Claims of the last verified `id_token`; replaced wholesale on every verification.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdTokenClaims(pub Map<String, Value>);
impl IdTokenClaims {
	/// Returns the claim named `name`.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.0.get(name)
	}

	/// Returns the string claim named `name`.
	pub fn str(&self, name: &str) -> Option<&str> {
		self.get(name).and_then(Value::as_str)
	}

	/// Returns `true` when no claim is held.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// Caller-owned root passed by `&mut` into every flow.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
	/// Configuration, metadata, parameters, and overrides.
	pub config: Config,
	/// Claims of the last verified `id_token`.
	pub id_token: IdTokenClaims,
}
impl Session {
	/// Wraps a configuration with no verified claims.
	pub fn new(config: Config) -> Self {
		Self { config, id_token: IdTokenClaims::default() }
	}

	/// Returns `true` when neither configuration nor claims are held.
	pub fn is_empty(&self) -> bool {
		self.config.is_empty() && self.id_token.is_empty()
	}
}
