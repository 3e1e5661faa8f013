#![cfg(feature = "reqwest")]

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use httpmock::prelude::*;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use time::OffsetDateTime;
// self
use oauth2_pilot::{
	config::{Config, Session},
	error::{ConfigError, Error, VerificationErrorKind},
	flows::{ReqwestOAuth2Client, VerifyOptions},
	param::{Overrides, ParamName},
};

const ISSUER: &str = "https://idp.example.com";
const KID: &str = "hmac-1";
const SECRET: &[u8] = b"oauth2-pilot-hmac-test-secret-0123456789ab";
const RSA_PEM: &str = include_str!("fixtures/rsa-2048.pem");
const RSA_JWK: &str = include_str!("fixtures/rsa-2048.jwk.json");

fn jwks_body() -> String {
	let key = serde_json::json!({
		"kty": "oct",
		"kid": KID,
		"alg": "HS256",
		"use": "sig",
		"k": URL_SAFE_NO_PAD.encode(SECRET)
	});

	serde_json::json!({ "keys": [key] }).to_string()
}

fn mint(nonce: &str, exp_offset: i64) -> String {
	let mut header = Header::new(Algorithm::HS256);

	header.kid = Some(KID.into());

	encode(&header, &id_token_claims(nonce, exp_offset), &EncodingKey::from_secret(SECRET))
		.expect("Test id_token should encode.")
}

fn mint_rs256(nonce: &str) -> String {
	let mut header = Header::new(Algorithm::RS256);
	let key = EncodingKey::from_rsa_pem(RSA_PEM.as_bytes()).expect("Test RSA key should parse.");

	header.kid = Some("rsa-1".into());

	encode(&header, &id_token_claims(nonce, 300), &key).expect("Test id_token should encode.")
}

fn id_token_claims(nonce: &str, exp_offset: i64) -> serde_json::Value {
	let now = OffsetDateTime::now_utc().unix_timestamp();

	serde_json::json!({
		"iss": ISSUER,
		"aud": "app",
		"sub": "user-42",
		"email": "user@example.com",
		"iat": now,
		"exp": now + exp_offset,
		"nonce": nonce
	})
}

fn build_session(server: &MockServer, id_token: Option<String>) -> Session {
	let mut config = Config::default();

	config.metadata.issuer = Some(ISSUER.into());
	config.metadata.jwks_uri = Some(server.url("/jwks"));
	config.parameters.set_str(ParamName::ClientId, "app");
	config.parameters.set_str(ParamName::Nonce, "nonce-1");

	if let Some(id_token) = id_token {
		config.parameters.set_str(ParamName::IdToken, id_token);
	}

	Session::new(config)
}

#[tokio::test]
async fn verified_claims_replace_the_session_claims() {
	let server = MockServer::start_async().await;
	let jwks = server
		.mock_async(|when, then| {
			when.method(GET).path("/jwks");
			then.status(200).header("content-type", "application/json").body(jwks_body());
		})
		.await;
	let client = ReqwestOAuth2Client::new().expect("Reqwest client should build.");
	let mut session = build_session(&server, Some(mint("nonce-1", 300)));

	session.id_token.0.insert("stale".into(), true.into());

	let options = VerifyOptions { required_claims: vec!["email".into()], ..Default::default() };
	let claims = client
		.verify_token(&mut session, &Overrides::new(), &options, None, None)
		.await
		.expect("Verification should succeed.")
		.expect("Claims should be returned.");

	jwks.assert_async().await;

	assert_eq!(claims.str("sub"), Some("user-42"));
	assert_eq!(session.id_token, claims);
	assert!(session.id_token.get("stale").is_none(), "Claims are replaced, never merged.");
}

#[tokio::test]
async fn rs256_tokens_verify_against_a_published_rsa_key() {
	let server = MockServer::start_async().await;
	let rsa: serde_json::Value = serde_json::from_str(RSA_JWK).expect("RSA JWK should parse.");
	let body = serde_json::json!({ "keys": [rsa] }).to_string();
	let jwks = server
		.mock_async(|when, then| {
			when.method(GET).path("/jwks");
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await;
	let client = ReqwestOAuth2Client::new().expect("Reqwest client should build.");
	let mut session = build_session(&server, Some(mint_rs256("nonce-1")));
	let claims = client
		.verify_token(&mut session, &Overrides::new(), &VerifyOptions::default(), None, None)
		.await
		.expect("RS256 verification should succeed.")
		.expect("Claims should be returned.");

	jwks.assert_async().await;

	assert_eq!(claims.str("email"), Some("user@example.com"));

	let mut session = build_session(&server, Some(mint("nonce-1", 300)));
	let err = client
		.verify_token(&mut session, &Overrides::new(), &VerifyOptions::default(), None, None)
		.await
		.expect_err("An HMAC token must not verify against an RSA key set.");

	let Error::Verification { source, .. } = err else {
		panic!("Expected a verification error.");
	};

	assert_eq!(source.kind, VerificationErrorKind::JwksNoMatchingKey);
}

#[tokio::test]
async fn missing_id_token_is_a_no_op() {
	let server = MockServer::start_async().await;
	let jwks = server
		.mock_async(|when, then| {
			when.method(GET).path("/jwks");
			then.status(200).header("content-type", "application/json").body(jwks_body());
		})
		.await;
	let client = ReqwestOAuth2Client::new().expect("Reqwest client should build.");
	let mut session = build_session(&server, None);
	let claims = client
		.verify_token(&mut session, &Overrides::new(), &VerifyOptions::default(), None, None)
		.await
		.expect("Verification without an id_token should not fail.");

	assert!(claims.is_none());
	assert!(session.id_token.is_empty());
	assert_eq!(jwks.hits_async().await, 0);
}

#[tokio::test]
async fn verification_failures_keep_their_jose_names() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/jwks");
			then.status(200).header("content-type", "application/json").body(jwks_body());
		})
		.await;

	let client = ReqwestOAuth2Client::new().expect("Reqwest client should build.");

	for (id_token, expected) in [
		(mint("nonce-other", 300), VerificationErrorKind::JwtClaimValidationFailed),
		(mint("nonce-1", -600), VerificationErrorKind::JwtExpired),
	] {
		let mut session = build_session(&server, Some(id_token));
		let err = client
			.verify_token(&mut session, &Overrides::new(), &VerifyOptions::default(), None, None)
			.await
			.expect_err("Verification should fail.");

		assert_eq!(err.cause(), Some("oauth2 verify_token"));

		let Error::Verification { source, .. } = err else {
			panic!("Expected a verification error.");
		};

		assert_eq!(source.kind, expected);
		assert!(session.id_token.is_empty());
	}

	let mut session = build_session(&server, Some(mint("nonce-1", 300)));

	session.config.parameters.remove(ParamName::ClientId.as_str());

	let err = client
		.verify_token(&mut session, &Overrides::new(), &VerifyOptions::default(), None, None)
		.await
		.expect_err("Verification without an audience should fail.");

	assert!(matches!(err, Error::Config { source: ConfigError::MissingAudience, .. }));
}

#[tokio::test]
async fn malformed_key_sets_are_reported() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/jwks");
			then.status(200).header("content-type", "application/json").body("{\"keys\":42}");
		})
		.await;

	let client = ReqwestOAuth2Client::new().expect("Reqwest client should build.");
	let mut session = build_session(&server, Some(mint("nonce-1", 300)));
	let err = client
		.verify_token(&mut session, &Overrides::new(), &VerifyOptions::default(), None, None)
		.await
		.expect_err("A malformed key set should fail.");

	assert!(matches!(
		err,
		Error::Verification { ref source, .. } if source.kind == VerificationErrorKind::JwksInvalid
	));
}
