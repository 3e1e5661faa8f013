//! `id_token` verification against the issuer's remote JWKS.

// crates.io
use jsonwebtoken::{
	Algorithm, DecodingKey, Validation, decode, decode_header,
	jwk::{AlgorithmParameters, Jwk, JwkSet, PublicKeyUse},
};
// self
use crate::{
	_prelude::*,
	config::{Config, IdTokenClaims, Session},
	dispatch::{Dispatcher, Method, Response},
	error::{ConfigError, VerificationError, VerificationErrorKind},
	flows::{Client, common},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	param::{Endpoint, Overrides, ParamName, Parameters, resolve},
};

const KIND: FlowKind = FlowKind::VerifyToken;

/// JOSE options applied on top of the standard `exp`/`nbf`/`iss`/`aud` checks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VerifyOptions {
	/// Accepted signing algorithms; empty accepts whatever a matching key supports.
	pub algorithms: Vec<Algorithm>,
	/// Leeway applied to every time-based claim.
	pub clock_tolerance: Duration,
	/// Claims that must be present in the payload.
	pub required_claims: Vec<String>,
	/// Maximum age of the token measured from `iat`.
	pub max_token_age: Option<Duration>,
}

/// Everything needed to verify one `id_token`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationTarget {
	/// Compact JWS to verify.
	pub id_token: String,
	/// Key set location.
	pub jwks_uri: String,
	/// Expected `iss`.
	pub issuer: String,
	/// Expected `aud`.
	pub audience: String,
	/// Locally tracked nonce.
	pub nonce: Option<String>,
}

impl<D> Client<D>
where
	D: ?Sized + Dispatcher,
{
	/// Verifies the session's `id_token` and replaces `session.id_token` with its claims.
	///
	/// Returns `Ok(None)` without touching the session when no `id_token` is available.
	pub async fn verify_token(
		&self,
		session: &mut Session,
		custom: &Overrides,
		options: &VerifyOptions,
		issuer: Option<&str>,
		jwks_uri: Option<&str>,
	) -> Result<Option<IdTokenClaims>> {
		let span = FlowSpan::new(KIND, "verify_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let Some(target) = prepare(&session.config, custom, issuer, jwks_uri)? else {
					return Ok(None);
				};
				let request = common::request(
					Method::Get,
					target.jwks_uri.clone(),
					&Parameters::default(),
					&session.config,
				);

				common::record_test_payload(&*self.store, &session.config, KIND, &request);

				let response = common::dispatch(&*self.dispatcher, KIND, request).await?;
				let jwks = parse_jwks(response).map_err(|e| Error::verification(KIND, e))?;
				let claims = verify_id_token(&target, &jwks, options, OffsetDateTime::now_utc())
					.map_err(|e| Error::verification(KIND, e))?;

				session.id_token = claims.clone();

				Ok(Some(claims))
			})
			.await;

		common::record_outcome(KIND, &result);

		result
	}
}

/// Resolves the token, key set, issuer, audience, and nonce to verify against.
///
/// `jwks_uri` and `issuer` come from the explicit arguments, else from metadata. The audience
/// is the `audience` parameter, else `client_id`. Returns `Ok(None)` when there is no
/// `id_token`.
pub fn prepare(
	config: &Config,
	custom: &Overrides,
	issuer: Option<&str>,
	jwks_uri: Option<&str>,
) -> Result<Option<VerificationTarget>> {
	let parameters = resolve(KIND, Endpoint::VerifyToken, config, custom)?;
	let non_empty = |name: ParamName| parameters.str(name).filter(|v| !v.is_empty());
	let Some(id_token) = non_empty(ParamName::IdToken) else {
		return Ok(None);
	};
	let jwks_uri = first_non_empty(jwks_uri, config.metadata.jwks_uri.as_deref())
		.ok_or_else(|| Error::config(KIND, ConfigError::MissingJwksUri))?;
	let issuer = first_non_empty(issuer, config.metadata.issuer.as_deref())
		.ok_or_else(|| Error::config(KIND, ConfigError::MissingIssuer))?;
	let audience = non_empty(ParamName::Audience)
		.or_else(|| non_empty(ParamName::ClientId))
		.ok_or_else(|| Error::config(KIND, ConfigError::MissingAudience))?;

	Ok(Some(VerificationTarget {
		id_token: id_token.to_owned(),
		jwks_uri: jwks_uri.to_owned(),
		issuer: issuer.to_owned(),
		audience: audience.to_owned(),
		nonce: non_empty(ParamName::Nonce).map(ToOwned::to_owned),
	}))
}

fn first_non_empty<'a>(explicit: Option<&'a str>, fallback: Option<&'a str>) -> Option<&'a str> {
	explicit.into_iter().chain(fallback).find(|v| !v.is_empty())
}

/// Parses a JWKS response body.
pub fn parse_jwks(response: Response) -> Result<JwkSet, VerificationError> {
	serde_path_to_error::deserialize(Value::Object(response)).map_err(|e| {
		VerificationError::new(VerificationErrorKind::JwksInvalid, format!("Malformed JWKS: {e}."))
	})
}

/// Verifies `target.id_token` against `jwks`, returning its claims.
///
/// Keys are selected by `kid` (when the header carries one), key family, and `use`. Each
/// candidate is tried in turn until one verifies the signature. After the library checks,
/// `required_claims`, `iat` bounds, and the `nonce` claim are validated here.
pub fn verify_id_token(
	target: &VerificationTarget,
	jwks: &JwkSet,
	options: &VerifyOptions,
	now: OffsetDateTime,
) -> Result<IdTokenClaims, VerificationError> {
	let header = decode_header(&target.id_token)?;

	if !options.algorithms.is_empty() && !options.algorithms.contains(&header.alg) {
		return Err(VerificationError::new(
			VerificationErrorKind::JoseAlgNotAllowed,
			format!("Algorithm {:?} is not allowed.", header.alg),
		));
	}

	let candidates = jwks
		.keys
		.iter()
		.filter(|key| is_candidate(key, header.alg, header.kid.as_deref()))
		.collect::<Vec<_>>();

	if candidates.is_empty() {
		return Err(VerificationError::new(
			VerificationErrorKind::JwksNoMatchingKey,
			"No key in the set matches the token header.",
		));
	}

	let leeway = options.clock_tolerance.whole_seconds().max(0);
	let mut validation = Validation::new(header.alg);

	validation.leeway = leeway as u64;
	validation.validate_nbf = true;
	validation.set_issuer(&[&target.issuer]);
	validation.set_audience(&[&target.audience]);

	let mut last_error = None;
	let mut payload = None;

	for key in candidates {
		let attempt = DecodingKey::from_jwk(key)
			.and_then(|key| decode::<Map<String, Value>>(&target.id_token, &key, &validation));

		match attempt {
			Ok(data) => {
				payload = Some(data.claims);

				break;
			},
			Err(e) if is_key_specific(&e) => last_error = Some(e),
			Err(e) => return Err(e.into()),
		}
	}

	let Some(payload) = payload else {
		return Err(last_error.map(VerificationError::from).unwrap_or_else(|| {
			VerificationError::new(VerificationErrorKind::JwksNoMatchingKey, "No key verified.")
		}));
	};

	check_claims(&payload, target, options, now.unix_timestamp(), leeway)?;

	Ok(IdTokenClaims(payload))
}

fn is_candidate(key: &Jwk, alg: Algorithm, kid: Option<&str>) -> bool {
	if matches!(key.common.public_key_use, Some(PublicKeyUse::Encryption)) {
		return false;
	}
	if kid.is_some() && key.common.key_id.as_deref() != kid {
		return false;
	}

	match &key.algorithm {
		AlgorithmParameters::RSA(_) => matches!(
			alg,
			Algorithm::RS256
				| Algorithm::RS384
				| Algorithm::RS512
				| Algorithm::PS256
				| Algorithm::PS384
				| Algorithm::PS512
		),
		AlgorithmParameters::EllipticCurve(_) => matches!(alg, Algorithm::ES256 | Algorithm::ES384),
		AlgorithmParameters::OctetKey(_) =>
			matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512),
		AlgorithmParameters::OctetKeyPair(_) => alg == Algorithm::EdDSA,
	}
}

fn is_key_specific(e: &jsonwebtoken::errors::Error) -> bool {
	use jsonwebtoken::errors::ErrorKind;

	matches!(
		e.kind(),
		ErrorKind::InvalidSignature
			| ErrorKind::InvalidAlgorithm
			| ErrorKind::InvalidKeyFormat
			| ErrorKind::InvalidRsaKey(_)
			| ErrorKind::InvalidEcdsaKey
	)
}

fn check_claims(
	payload: &Map<String, Value>,
	target: &VerificationTarget,
	options: &VerifyOptions,
	now: i64,
	leeway: i64,
) -> Result<(), VerificationError> {
	let fail = |message: String| {
		VerificationError::new(VerificationErrorKind::JwtClaimValidationFailed, message)
	};

	if let Some(missing) = options.required_claims.iter().find(|c| !payload.contains_key(*c)) {
		return Err(fail(format!("Missing required claim `{missing}`.")));
	}

	let iat = payload.get("iat").and_then(Value::as_f64).map(|iat| iat as i64);

	if iat.is_some_and(|iat| iat > now.saturating_add(leeway)) {
		return Err(fail("The `iat` claim is in the future.".into()));
	}
	if let Some(max_age) = options.max_token_age {
		let Some(iat) = iat else {
			return Err(fail("The `iat` claim is required to enforce a max token age.".into()));
		};

		if now.saturating_sub(iat) > max_age.whole_seconds().saturating_add(leeway) {
			return Err(fail("The token is older than the max token age.".into()));
		}
	}

	match payload.get("nonce") {
		Some(nonce) if nonce.as_str() != target.nonce.as_deref() =>
			Err(fail("The `nonce` claim does not match the local nonce.".into())),
		_ => Ok(()),
	}
}
