//! Outgoing parameter resolution: configured values, per-endpoint overrides, and call-site
//! overrides layered into one validated set.

// self
use crate::{
	_prelude::*,
	config::Config,
	error::ConfigError,
	obs::{self, FlowKind},
	param::{Overrides, ParamName, ParamValue, ParameterType, Parameters, type_of},
};

/// Call-site key carrying an explicit endpoint URL; never sent on the wire.
pub const URL_KEY: &str = "url";

/// Endpoints whose outgoing parameters the pipeline resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
	/// Discovery document.
	Discovery,
	/// Authorization endpoint.
	Authorization,
	/// Token endpoint (code, password, assertion, device grants).
	Token,
	/// Token endpoint for `refresh_token` grants.
	Refresh,
	/// Revocation endpoint.
	Revocation,
	/// Local `id_token` verification.
	VerifyToken,
}
impl Endpoint {
	/// Returns the label used in diagnostics.
	pub const fn as_str(self) -> &'static str {
		match self {
			Endpoint::Discovery => "discovery",
			Endpoint::Authorization => "authorization",
			Endpoint::Token => "token",
			Endpoint::Refresh => "refresh",
			Endpoint::Revocation => "revocation",
			Endpoint::VerifyToken => "verify_token",
		}
	}

	/// Configured parameters that apply to this endpoint.
	pub const fn parameters(self) -> &'static [ParamName] {
		use ParamName::*;

		match self {
			Endpoint::Discovery => &[],
			Endpoint::Authorization => &[
				ResponseType,
				ClientId,
				RedirectUri,
				Scope,
				State,
				Nonce,
				CodeChallenge,
				CodeChallengeMethod,
				ResponseMode,
				Display,
				Prompt,
				MaxAge,
				UiLocales,
				IdTokenHint,
				LoginHint,
				AcrValues,
				Claims,
				ClaimsLocales,
				Request,
				RequestUri,
				Registration,
				Audience,
				Resource,
			],
			Endpoint::Token => &[
				GrantType,
				Code,
				RedirectUri,
				ClientId,
				ClientSecret,
				CodeVerifier,
				RefreshToken,
				Scope,
				Username,
				Password,
				Assertion,
				DeviceCode,
				ClientAssertion,
				ClientAssertionType,
				Audience,
				Resource,
			],
			Endpoint::Refresh => &[
				GrantType,
				RefreshToken,
				ClientId,
				ClientSecret,
				Scope,
				ClientAssertion,
				ClientAssertionType,
				Resource,
			],
			Endpoint::Revocation => &[
				Token,
				TokenTypeHint,
				ClientId,
				ClientSecret,
				AccessToken,
				RefreshToken,
				ClientAssertion,
				ClientAssertionType,
			],
			Endpoint::VerifyToken => &[IdToken, Nonce, ClientId, Audience],
		}
	}

	/// Returns `true` when `name` is a configured parameter of this endpoint.
	pub fn applies(self, name: &str) -> bool {
		self.parameters().iter().any(|p| p.as_str() == name)
	}
}
impl Display for Endpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Resolves the outgoing parameter set for `endpoint`.
///
/// Layers, lowest precedence first: `config.parameters` restricted to the endpoint's
/// applicable names, the endpoint's override map, then `custom`. A `None` override deletes
/// the parameter. Every surviving value is checked against its declared type; names without
/// a declared type are logged and passed through. The [`URL_KEY`] entry is skipped.
pub fn resolve(
	flow: FlowKind,
	endpoint: Endpoint,
	config: &Config,
	custom: &Overrides,
) -> Result<Parameters> {
	let mut layered = BTreeMap::<&str, Option<&ParamValue>>::new();

	for (name, value) in config.parameters.iter() {
		if endpoint.applies(name) {
			layered.insert(name, Some(value));
		}
	}
	for overrides in config.overrides(endpoint).into_iter().chain([custom]) {
		for (name, value) in overrides.iter() {
			layered.insert(name, value);
		}
	}

	let mut resolved = Parameters::default();

	for (name, value) in layered {
		let Some(value) = value else { continue };

		if name == URL_KEY {
			continue;
		}

		let expected = type_of(name);

		if expected == ParameterType::Untyped {
			obs::warn_untyped_parameter(flow, name);
		}

		let value = expected.accept(value.clone()).ok_or_else(|| {
			Error::config(flow, ConfigError::InvalidParameter { name: name.to_owned(), expected })
		})?;

		resolved.put(name.to_owned(), value);
	}

	Ok(resolved)
}
