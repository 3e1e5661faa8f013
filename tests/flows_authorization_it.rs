// std
use std::{collections::HashMap, sync::Arc};
// self
use oauth2_pilot::{
	config::{AuthorizationGrant, Config, Session},
	crypto::{CodeChallengeMethod, OsRandom, PKCE_VERIFIER_LEN},
	dispatch::{Method, SimulatedDispatcher},
	flows::{Client, test_payload_key},
	obs::FlowKind,
	param::{Endpoint, Overrides, ParamName},
	storage::{KeyValueStore, MemoryCookieJar, MemoryStore},
	url::Url,
};

const REDIRECT_URI: &str = "https://app.example.com/callback";

fn build_client() -> (Client<SimulatedDispatcher>, Arc<SimulatedDispatcher>, Arc<MemoryStore>) {
	let dispatcher = Arc::new(SimulatedDispatcher::default());
	let store = Arc::new(MemoryStore::default());
	let client = Client::with_parts(
		dispatcher.clone(),
		Arc::new(OsRandom),
		store.clone(),
		Arc::new(MemoryCookieJar::default()),
	);

	(client, dispatcher, store)
}

fn build_session() -> Session {
	let mut config = Config::default();

	config.metadata.issuer = Some("https://idp.example.com".into());
	config.metadata.authorization_endpoint = Some("https://idp.example.com/authorize".into());
	config.metadata.token_endpoint = Some("https://idp.example.com/token".into());
	config.parameters.set_str(ParamName::ClientId, "app");
	config.parameters.set_str(ParamName::RedirectUri, REDIRECT_URI);

	Session::new(config)
}

fn token_response() -> serde_json::Map<String, serde_json::Value> {
	serde_json::json!({
		"access_token": "access-success",
		"refresh_token": "refresh-success",
		"token_type": "Bearer",
		"expires_in": 3600
	})
	.as_object()
	.cloned()
	.expect("Token response fixture should be an object.")
}

#[tokio::test]
async fn authorization_code_round_trip_survives_the_redirect() {
	let (client, dispatcher, _) = build_client();
	let mut session = build_session();
	let prepared = client
		.authorize(&mut session, &Overrides::new(), Some("-return-to"), None)
		.await
		.expect("Authorization should dispatch successfully.");
	let sent = dispatcher.last_request().expect("The redirect should have been dispatched.");

	assert_eq!(sent, prepared.request);
	assert_eq!(sent.method, Method::Href);

	let href = prepared.href().expect("Authorization URL should be valid.");
	let pairs: HashMap<_, _> = href.query_pairs().into_owned().collect();
	let verifier = session
		.config
		.overrides(Endpoint::Token)
		.and_then(|o| o.str("code_verifier"))
		.expect("The verifier should be kept for the token endpoint.")
		.to_owned();
	let state = pairs.get("state").expect("A state should be sent.").clone();

	assert_eq!(href.path(), "/authorize");
	assert_eq!(pairs.get("response_type"), Some(&"code".into()));
	assert_eq!(pairs.get("scope"), Some(&"openid email profile".into()));
	assert_eq!(pairs.get("redirect_uri"), Some(&REDIRECT_URI.into()));
	assert_eq!(pairs.get("code_challenge_method"), Some(&"S256".into()));
	assert_eq!(pairs.get("code_challenge"), Some(&CodeChallengeMethod::S256.challenge(&verifier)));
	assert!(!pairs.contains_key("code_verifier"));
	assert!(pairs.contains_key("nonce"));
	assert!(state.ends_with("-return-to"));
	assert_eq!(verifier.len(), PKCE_VERIFIER_LEN);

	// The page reloads: the live session is gone and comes back from the encrypted hand-off.
	let mut reloaded = Session::default();
	let mut callback = Url::parse(REDIRECT_URI).expect("Callback URL should parse.");

	callback.query_pairs_mut().append_pair("code", "auth-code").append_pair("state", &state);
	client
		.intercept_redirect(&mut reloaded, &mut callback)
		.expect("Redirect interception should succeed.");

	assert_eq!(callback.as_str(), REDIRECT_URI);
	assert_eq!(reloaded.config.parameters.str(ParamName::Code), Some("auth-code"));
	assert_eq!(reloaded.config.parameters.str(ParamName::State), Some(state.as_str()));

	dispatcher.respond("https://idp.example.com/token", token_response());

	let exchange = client
		.token(&mut reloaded, &Overrides::new().with("grant_type", "authorization_code"), None)
		.await
		.expect("Token exchange should succeed.");

	assert_eq!(exchange.request.method, Method::Post);
	assert_eq!(exchange.request.param("code"), Some("auth-code"));
	assert_eq!(exchange.request.param("code_verifier"), Some(verifier.as_str()));
	assert_eq!(exchange.request.param("state"), None);
	assert_eq!(reloaded.config.parameters.str(ParamName::AccessToken), Some("access-success"));
	assert!(
		reloaded.config.overrides(Endpoint::Token).and_then(|o| o.get("code_verifier")).is_none(),
		"The verifier must be retired after the exchange."
	);
	assert_eq!(reloaded.config.parameters.str(ParamName::CodeChallenge), None);

	let expires_at = reloaded
		.config
		.parameters
		.number(ParamName::ExpiresIn)
		.and_then(|n| n.as_i64())
		.expect("expires_in should be stored as an absolute timestamp.");

	assert!(expires_at > 1_000_000_000_000);
}

#[tokio::test]
async fn test_mode_records_the_payload_without_navigating() {
	let (client, dispatcher, store) = build_client();
	let mut session = build_session();

	session.config.configuration.test = true;
	session.config.configuration.storage = false;
	client
		.authorize(&mut session, &Overrides::new().with("prompt", "login"), None, None)
		.await
		.expect("Authorization should succeed in test mode.");

	assert!(dispatcher.requests().is_empty());

	let recorded = store
		.get(&test_payload_key(FlowKind::Authorization))
		.expect("The payload should be recorded.");
	let recorded: serde_json::Value =
		serde_json::from_str(&recorded).expect("The recorded payload should be JSON.");

	assert_eq!(recorded["client_id"], "app");
	assert_eq!(recorded["prompt"], "login");
	assert_eq!(recorded["response_type"], "code");
}

#[test]
fn implicit_grant_skips_pkce_and_asks_for_tokens() {
	let (client, dispatcher, _) = build_client();
	let mut session = build_session();

	session.config.configuration.grant_type = AuthorizationGrant::Implicit;
	session
		.config
		.parameters
		.set_strings(ParamName::Scope, vec!["OpenID".into(), "api:read".into(), "openid".into()]);

	let prepared = client
		.build_authorization_request(&mut session, &Overrides::new(), None, None)
		.expect("Implicit authorization request should build.");

	assert_eq!(prepared.request.param("response_type"), Some("id_token token"));
	assert_eq!(prepared.request.param("scope"), Some("openid api:read"));
	assert_eq!(prepared.request.param("code_challenge"), None);
	assert!(prepared.request.param("nonce").is_some());
	assert!(session.config.overrides(Endpoint::Token).is_none());
	assert!(dispatcher.requests().is_empty());
}

#[tokio::test]
async fn missing_authorization_endpoint_is_fatal() {
	let (client, dispatcher, _) = build_client();
	let mut session = build_session();

	session.config.metadata.authorization_endpoint = None;

	let err = client
		.authorize(&mut session, &Overrides::new(), None, None)
		.await
		.expect_err("Authorization without an endpoint should fail.");

	assert_eq!(err.cause(), Some("oauth2 authorization"));
	assert!(dispatcher.requests().is_empty());
}
