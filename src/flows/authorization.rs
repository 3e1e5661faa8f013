//! Authorization request construction: `response_type`/`scope` synthesis, PKCE, `state`, and
//! `nonce`, followed by the `HREF` redirect.

// self
use crate::{
	_prelude::*,
	config::{AuthorizationGrant, Config, Session},
	crypto::{self, CodeChallengeMethod, RandomBytes},
	dispatch::{DispatchRequest, Dispatcher, Method},
	error::ConfigError,
	flows::{Client, common},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	param::{Endpoint, Overrides, ParamName, ParamValue, Parameters, resolve},
};

/// Scope requested when none is configured.
pub const DEFAULT_SCOPE: [&str; 3] = ["openid", "email", "profile"];
/// Scopes that identify the end user and therefore call for an `id_token`.
pub const IDENTITY_SCOPES: [&str; 3] = ["openid", "email", "profile"];

const KIND: FlowKind = FlowKind::Authorization;

/// A fully resolved authorization request.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthorizationRequest {
	/// `HREF` request carrying the wire payload.
	pub request: DispatchRequest,
	/// Typed parameters sent to the authorization endpoint.
	pub parameters: Parameters,
}
impl AuthorizationRequest {
	/// Navigation target: the endpoint URL with the payload as its query string.
	pub fn href(&self) -> Result<Url> {
		self.request.href().map_err(|source| {
			Error::config(KIND, ConfigError::InvalidUrl { url: self.request.url.clone(), source })
		})
	}
}

impl<D> Client<D>
where
	D: ?Sized + Dispatcher,
{
	/// Builds the authorization request without dispatching it.
	///
	/// PKCE values, `state`, and `nonce` are written into `session.config.parameters`; the
	/// `code_verifier` goes to the token override map because only the token endpoint may
	/// see it. `state_payload` is appended to the `state` value.
	pub fn build_authorization_request(
		&self,
		session: &mut Session,
		custom: &Overrides,
		state_payload: Option<&str>,
		url: Option<&str>,
	) -> Result<AuthorizationRequest> {
		prepare(&mut session.config, custom, state_payload, url, &*self.random)
	}

	/// Builds the authorization request, persists the session (when storage is enabled), and
	/// dispatches the `HREF` redirect.
	///
	/// In test mode the payload is recorded and the redirect is not dispatched.
	pub async fn authorize(
		&self,
		session: &mut Session,
		custom: &Overrides,
		state_payload: Option<&str>,
		url: Option<&str>,
	) -> Result<AuthorizationRequest> {
		let span = FlowSpan::new(KIND, "authorize");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let prepared = self.build_authorization_request(session, custom, state_payload, url)?;

				common::record_test_payload(&*self.store, &session.config, KIND, &prepared.request);

				if session.config.configuration.storage {
					self.persist(session)?;
				}
				if !session.config.configuration.test {
					common::dispatch(&*self.dispatcher, KIND, prepared.request.clone()).await?;
				}

				Ok(prepared)
			})
			.await;

		common::record_outcome(KIND, &result);

		result
	}
}

/// Resolves the authorization request against `config` and records the generated PKCE,
/// `state`, and `nonce` values in it.
pub fn prepare(
	config: &mut Config,
	custom: &Overrides,
	state_payload: Option<&str>,
	url: Option<&str>,
	random: &dyn RandomBytes,
) -> Result<AuthorizationRequest> {
	let url = common::resolve_url(
		KIND,
		Endpoint::Authorization,
		url,
		custom,
		config.metadata.authorization_endpoint.as_deref(),
	)?;
	let mut parameters = resolve(KIND, Endpoint::Authorization, config, custom)?;
	let grant = config.configuration.grant_type;
	let mut scope = normalize(parameters.get(ParamName::Scope.as_str()));

	if scope.is_empty() {
		scope = DEFAULT_SCOPE.iter().map(|s| (*s).to_owned()).collect();
	}

	let requested = normalize(parameters.get(ParamName::ResponseType.as_str()));
	let response_type = synthesize_response_type(grant, &scope, requested);

	parameters.set_strings(ParamName::Scope, scope);
	parameters.set_strings(ParamName::ResponseType, response_type.clone());

	let code_verifier = apply_pkce(config, custom, &mut parameters, random)?;

	apply_state(config, custom, &mut parameters, state_payload, random);
	apply_nonce(config, custom, &response_type, &mut parameters, random);

	for name in
		[ParamName::CodeChallenge, ParamName::CodeChallengeMethod, ParamName::State, ParamName::Nonce]
	{
		match parameters.get(name.as_str()) {
			Some(value) => config.parameters.put(name.as_str().to_owned(), value.clone()),
			None => {
				config.parameters.remove(name.as_str());
			},
		}
	}

	match code_verifier {
		Some(verifier) =>
			config.overrides_mut(Endpoint::Token).set(ParamName::CodeVerifier.as_str(), verifier),
		None => {
			if let Some(token) = config.token.as_mut() {
				token.remove(ParamName::CodeVerifier.as_str());
			}
		},
	}

	let request = common::request(Method::Href, url, &parameters, config);

	Ok(AuthorizationRequest { request, parameters })
}

/// Lower-cases and de-duplicates a `string[]` value, keeping first-seen order.
fn normalize(value: Option<&ParamValue>) -> Vec<String> {
	let mut out = Vec::<String>::new();

	for item in value.and_then(ParamValue::as_strings).unwrap_or_default() {
		let item = item.to_lowercase();

		if !item.is_empty() && !out.contains(&item) {
			out.push(item);
		}
	}

	out
}

/// Derives `response_type` from the grant and the requested scope.
pub fn synthesize_response_type(
	grant: AuthorizationGrant,
	scope: &[String],
	mut response_type: Vec<String>,
) -> Vec<String> {
	let has = |types: &[String], t: &str| types.iter().any(|v| v == t);

	match grant {
		AuthorizationGrant::Code => response_type = vec!["code".into()],
		AuthorizationGrant::Implicit => {
			let identity = scope.iter().any(|s| IDENTITY_SCOPES.contains(&s.as_str()));
			let delegated = scope.iter().any(|s| !IDENTITY_SCOPES.contains(&s.as_str()));

			response_type.retain(|t| t != "code");

			if identity && !has(&response_type, "id_token") && !has(&response_type, "token") {
				response_type.push("id_token".into());
			}
			if delegated && !has(&response_type, "token") {
				response_type.push("token".into());
			}
		},
		AuthorizationGrant::Hybrid =>
			if response_type.is_empty() {
				response_type = vec!["code".into(), "id_token".into()];
			},
	}

	if response_type.len() > 1 {
		response_type.retain(|t| t != "none");
	}

	response_type
}

/// Non-empty string supplied for `name` by the call site or the authorization override map.
///
/// Values a previous authorization left in `config.parameters` never count: PKCE, `state`,
/// and `nonce` are single-use and must be fresh for every request.
fn explicit<'a>(config: &'a Config, custom: &'a Overrides, name: ParamName) -> Option<&'a str> {
	custom
		.get(name.as_str())
		.or_else(|| config.overrides(Endpoint::Authorization).and_then(|o| o.get(name.as_str())))
		.flatten()
		.and_then(ParamValue::as_str)
		.filter(|v| !v.is_empty())
}

/// Validates or generates the PKCE parameters; returns the verifier to keep for the token
/// exchange.
fn apply_pkce(
	config: &Config,
	custom: &Overrides,
	parameters: &mut Parameters,
	random: &dyn RandomBytes,
) -> Result<Option<String>> {
	let explicit_verifier = parameters.remove(ParamName::CodeVerifier.as_str());

	if config.configuration.no_pkce || config.configuration.grant_type != AuthorizationGrant::Code
	{
		parameters.remove(ParamName::CodeChallenge.as_str());
		parameters.remove(ParamName::CodeChallengeMethod.as_str());

		return Ok(None);
	}

	let method = match parameters.str(ParamName::CodeChallengeMethod) {
		Some(method) => method.parse::<CodeChallengeMethod>().map_err(|e| Error::config(KIND, e))?,
		None => CodeChallengeMethod::default(),
	};
	let verifier = match explicit_verifier {
		Some(ParamValue::String(verifier)) if !verifier.is_empty() => verifier,
		Some(_) => return Err(Error::config(KIND, ConfigError::EmptyCodeVerifier)),
		None => crypto::generate_verifier(random),
	};
	let challenge = match explicit(config, custom, ParamName::CodeChallenge) {
		Some(challenge) => challenge.to_owned(),
		None => method.challenge(&verifier),
	};

	parameters.set_str(ParamName::CodeChallenge, challenge);
	parameters.set_str(ParamName::CodeChallengeMethod, method.as_str());

	Ok(Some(verifier))
}

fn apply_state(
	config: &Config,
	custom: &Overrides,
	parameters: &mut Parameters,
	state_payload: Option<&str>,
	random: &dyn RandomBytes,
) {
	if config.configuration.no_state && config.configuration.storage {
		parameters.remove(ParamName::State.as_str());

		return;
	}

	let base = match explicit(config, custom, ParamName::State) {
		Some(state) => state.to_owned(),
		None => crypto::random_token(random),
	};

	parameters.set_str(ParamName::State, format!("{base}{}", state_payload.unwrap_or_default()));
}

fn apply_nonce(
	config: &Config,
	custom: &Overrides,
	response_type: &[String],
	parameters: &mut Parameters,
	random: &dyn RandomBytes,
) {
	let wanted = match config.configuration.grant_type {
		AuthorizationGrant::Code => true,
		AuthorizationGrant::Implicit | AuthorizationGrant::Hybrid =>
			response_type.iter().any(|t| t == "id_token"),
	};

	if !wanted {
		parameters.remove(ParamName::Nonce.as_str());

		return;
	}

	let nonce = match explicit(config, custom, ParamName::Nonce) {
		Some(nonce) => nonce.to_owned(),
		None => crypto::random_token(random),
	};

	parameters.set_str(ParamName::Nonce, nonce);
}
