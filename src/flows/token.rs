//! Token endpoint exchanges (`authorization_code`, `refresh_token`, and any other grant the
//! caller configures).

// self
use crate::{
	_prelude::*,
	config::{Config, Session},
	dispatch::{DispatchRequest, Dispatcher, Method},
	error::ConfigError,
	flows::{Client, common},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	param::{Endpoint, Overrides, ParamName, Parameters, resolve},
};

const AUTHORIZATION_CODE: &str = "authorization_code";
const REFRESH_TOKEN: &str = "refresh_token";

/// A completed token exchange.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenExchange {
	/// Request sent to the token endpoint.
	pub request: DispatchRequest,
	/// Decoded response, already merged into the session parameters.
	pub response: Parameters,
}

impl<D> Client<D>
where
	D: ?Sized + Dispatcher,
{
	/// Exchanges the configured grant at the token endpoint.
	///
	/// For `authorization_code` with PKCE enabled the stored `code_verifier`, `code_challenge`,
	/// and `code_challenge_method` are retired once the request is built, whatever the outcome
	/// of the exchange.
	pub async fn token(
		&self,
		session: &mut Session,
		custom: &Overrides,
		url: Option<&str>,
	) -> Result<TokenExchange> {
		self.exchange(session, custom, url, Endpoint::Token, FlowKind::Token, "token").await
	}

	/// Runs a `refresh_token` grant using the `refresh` parameter set and overrides.
	pub async fn refresh(
		&self,
		session: &mut Session,
		custom: &Overrides,
		url: Option<&str>,
	) -> Result<TokenExchange> {
		self.exchange(session, custom, url, Endpoint::Refresh, FlowKind::Refresh, "refresh").await
	}

	async fn exchange(
		&self,
		session: &mut Session,
		custom: &Overrides,
		url: Option<&str>,
		endpoint: Endpoint,
		kind: FlowKind,
		stage: &'static str,
	) -> Result<TokenExchange> {
		let span = FlowSpan::new(kind, stage);

		obs::record_flow_outcome(kind, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = prepare(&mut session.config, custom, url, endpoint, kind)?;

				common::record_test_payload(&*self.store, &session.config, kind, &request);

				let response = common::dispatch(&*self.dispatcher, kind, request.clone()).await?;
				let response = common::apply_response(kind, &mut session.config, &response)?;

				Ok(TokenExchange { request, response })
			})
			.await;

		common::record_outcome(kind, &result);

		result
	}
}

/// Builds the token request for `endpoint` and retires the consumed PKCE verifier and challenge.
pub fn prepare(
	config: &mut Config,
	custom: &Overrides,
	url: Option<&str>,
	endpoint: Endpoint,
	kind: FlowKind,
) -> Result<DispatchRequest> {
	let url =
		common::resolve_url(kind, endpoint, url, custom, config.metadata.token_endpoint.as_deref())?;
	let mut parameters = resolve(kind, endpoint, config, custom)?;

	if endpoint == Endpoint::Refresh {
		parameters.set_str(ParamName::GrantType, REFRESH_TOKEN);
	}

	let grant_type = parameters
		.str(ParamName::GrantType)
		.filter(|g| !g.is_empty())
		.map(ToOwned::to_owned)
		.ok_or_else(|| Error::config(kind, ConfigError::MissingGrantType))?;
	let pkce = !config.configuration.no_pkce;
	let dropped: &[ParamName] = match grant_type.as_str() {
		AUTHORIZATION_CODE => &[ParamName::Assertion, ParamName::DeviceCode, ParamName::RefreshToken],
		REFRESH_TOKEN => &[
			ParamName::Assertion,
			ParamName::Code,
			ParamName::CodeVerifier,
			ParamName::DeviceCode,
		],
		_ => &[],
	};

	for name in dropped {
		parameters.remove(name.as_str());
	}
	if !pkce {
		parameters.remove(ParamName::CodeVerifier.as_str());
	}

	let request = common::request(Method::Post, url, &parameters, config);

	if grant_type == AUTHORIZATION_CODE && pkce {
		if let Some(token) = config.token.as_mut() {
			token.remove(ParamName::CodeVerifier.as_str());
		}

		for name in
			[ParamName::CodeVerifier, ParamName::CodeChallenge, ParamName::CodeChallengeMethod]
		{
			config.parameters.remove(name.as_str());
		}
	}

	Ok(request)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config() -> Config {
		let mut config = Config::default();

		config.metadata.token_endpoint = Some("https://idp.example.com/token".into());
		config.parameters.set_str(ParamName::ClientId, "app");
		config.parameters.set_str(ParamName::RefreshToken, "R");
		config.overrides_mut(Endpoint::Token).set("code_verifier", "v".repeat(64));

		config
	}

	#[test]
	fn authorization_code_retires_the_pkce_pair() {
		let mut config = config();

		config.parameters.set_str(ParamName::CodeChallenge, "c-1");
		config.parameters.set_str(ParamName::CodeChallengeMethod, "S256");

		let custom = Overrides::new().with("grant_type", "authorization_code").with("code", "C");
		let request = prepare(&mut config, &custom, None, Endpoint::Token, FlowKind::Token).unwrap();

		assert_eq!(request.method, Method::Post);
		assert_eq!(request.param("code_verifier"), Some("v".repeat(64).as_str()));
		assert_eq!(request.param("code"), Some("C"));
		assert_eq!(request.param("refresh_token"), None);
		assert_eq!(request.param("code_challenge"), None);
		assert_eq!(config.overrides(Endpoint::Token).and_then(|o| o.get("code_verifier")), None);
		assert_eq!(config.parameters.str(ParamName::CodeChallenge), None);
		assert_eq!(config.parameters.str(ParamName::CodeChallengeMethod), None);

		let request = prepare(&mut config, &custom, None, Endpoint::Token, FlowKind::Token).unwrap();

		assert_eq!(request.param("code_verifier"), None, "The verifier is single-use.");
	}

	#[test]
	fn refresh_forces_its_grant_and_drops_code_parameters() {
		let mut config = config();
		let custom = Overrides::new().with("code", "C").with("grant_type", "password");
		let request =
			prepare(&mut config, &custom, None, Endpoint::Refresh, FlowKind::Refresh).unwrap();

		assert_eq!(request.param("grant_type"), Some("refresh_token"));
		assert_eq!(request.param("refresh_token"), Some("R"));
		assert_eq!(request.param("code"), None);
		assert_eq!(request.param("code_verifier"), None);
		assert!(config.overrides(Endpoint::Token).and_then(|o| o.get("code_verifier")).is_some());
	}

	#[test]
	fn no_pkce_always_drops_the_verifier() {
		let mut config = config();

		config.configuration.no_pkce = true;

		let custom = Overrides::new().with("grant_type", "urn:example:custom");
		let request = prepare(&mut config, &custom, None, Endpoint::Token, FlowKind::Token).unwrap();

		assert_eq!(request.param("code_verifier"), None);
		assert_eq!(request.param("refresh_token"), Some("R"));
	}

	#[test]
	fn missing_grant_type_or_url_is_fatal() {
		let mut config = config();
		let custom = Overrides::new();
		let err = prepare(&mut config, &custom, None, Endpoint::Token, FlowKind::Token).unwrap_err();

		assert!(matches!(err, Error::Config { source: ConfigError::MissingGrantType, .. }));

		config.metadata.token_endpoint = None;

		let custom = custom.with("grant_type", "authorization_code");
		let err = prepare(&mut config, &custom, None, Endpoint::Token, FlowKind::Token).unwrap_err();

		assert_eq!(err.cause(), Some("oauth2 token"));
		assert!(matches!(err, Error::Config { source: ConfigError::MissingUrl { .. }, .. }));
	}
}
