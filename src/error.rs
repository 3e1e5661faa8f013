//! Engine-level error types, tagged with the flow that raised them.

// crates.io
use oauth2::basic::BasicErrorResponseType;
// self
use crate::{
	_prelude::*,
	dispatch::Response,
	obs::FlowKind,
	param::{DecodeError, ParameterType, Parameters},
};

/// Engine-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by every flow.
///
/// Each flow-scoped variant carries the [`FlowKind`] that raised it so callers can branch on
/// origin with a `match` instead of comparing cause strings.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Missing or malformed local configuration.
	#[error("[{flow}] {source}")]
	Config {
		/// Flow that rejected the configuration.
		flow: FlowKind,
		/// Underlying configuration problem.
		#[source]
		source: ConfigError,
	},
	/// The authorization server (or redirect) violated the protocol.
	#[error("[{flow}] {source}")]
	Protocol {
		/// Flow that observed the violation.
		flow: FlowKind,
		/// Underlying protocol problem.
		#[source]
		source: ProtocolError,
	},
	/// The `id_token` failed verification.
	#[error("[{flow}] {source}")]
	Verification {
		/// Flow that verified the token.
		flow: FlowKind,
		/// Underlying verification failure.
		#[source]
		source: VerificationError,
	},
	/// The dispatcher failed to complete the request.
	#[error("[{flow}] {source}")]
	Transport {
		/// Flow that issued the request.
		flow: FlowKind,
		/// Underlying transport failure.
		#[source]
		source: TransportError,
	},
	/// Encrypted redirect hand-off failure.
	#[error(transparent)]
	Persistence(#[from] PersistenceError),
}
impl Error {
	/// Builds a [`Error::Config`] for `flow`.
	pub fn config(flow: FlowKind, source: impl Into<ConfigError>) -> Self {
		Self::Config { flow, source: source.into() }
	}

	/// Builds a [`Error::Protocol`] for `flow`.
	pub fn protocol(flow: FlowKind, source: impl Into<ProtocolError>) -> Self {
		Self::Protocol { flow, source: source.into() }
	}

	/// Builds a [`Error::Verification`] for `flow`.
	pub fn verification(flow: FlowKind, source: VerificationError) -> Self {
		Self::Verification { flow, source }
	}

	/// Maps a dispatcher failure, lifting OAuth error bodies into [`ProtocolError::OAuth`].
	pub fn transport(flow: FlowKind, source: TransportError) -> Self {
		match source {
			TransportError::Status { response: Some(response), .. }
				if response.contains_key("error") =>
				Self::protocol(flow, ProtocolError::from_response(&response)),
			source => Self::Transport { flow, source },
		}
	}

	/// Flow that raised the error, if any.
	pub fn flow(&self) -> Option<FlowKind> {
		match self {
			Self::Config { flow, .. }
			| Self::Protocol { flow, .. }
			| Self::Verification { flow, .. }
			| Self::Transport { flow, .. } => Some(*flow),
			Self::Persistence(_) => None,
		}
	}

	/// Cause tag in the form `oauth2 <flow>`.
	pub fn cause(&self) -> Option<&'static str> {
		self.flow().map(FlowKind::cause)
	}
}

/// Configuration and input validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// No URL could be resolved for the endpoint.
	#[error("Missing URL for the {endpoint} endpoint.")]
	MissingUrl {
		/// Endpoint label.
		endpoint: &'static str,
	},
	/// A resolved URL failed to parse.
	#[error("URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The token request has no `grant_type`.
	#[error("Missing grant_type for the token request.")]
	MissingGrantType,
	/// A parameter does not satisfy its declared type.
	#[error("Parameter `{name}` must be of type {expected}.")]
	InvalidParameter {
		/// Parameter name.
		name: String,
		/// Declared type.
		expected: ParameterType,
	},
	/// `code_challenge_method` is neither `S256` nor `plain`.
	#[error("Unsupported code_challenge_method `{method}`; expected S256 or plain.")]
	InvalidCodeChallengeMethod {
		/// Supplied method.
		method: String,
	},
	/// `code_verifier` was supplied but empty.
	#[error("The code_verifier must be a non-empty string.")]
	EmptyCodeVerifier,
	/// A hinted token is absent.
	#[error("Token type hint `{hint}` was given but no {hint} is available.")]
	MissingHintedToken {
		/// The `token_type_hint` value.
		hint: String,
	},
	/// No token could be selected for revocation.
	#[error("No token is available to revoke.")]
	MissingToken,
	/// `jwks_uri` could not be resolved.
	#[error("Missing jwks_uri for id_token verification.")]
	MissingJwksUri,
	/// `issuer` could not be resolved.
	#[error("Missing issuer for id_token verification.")]
	MissingIssuer,
	/// Neither `audience` nor `client_id` is available.
	#[error("Missing audience (or client_id) for id_token verification.")]
	MissingAudience,
}

/// Protocol violations observed in responses or redirects.
#[derive(Debug, ThisError)]
pub enum ProtocolError {
	/// Returned `state` differs from the configured one.
	#[error("Illegal state received.")]
	StateMismatch {
		/// State received on the redirect, if any.
		received: Option<String>,
	},
	/// The server answered with an OAuth `error`.
	#[error("Authorization server returned `{error}`{}.", fmt_description(.description))]
	OAuth {
		/// Classified OAuth error code.
		error: BasicErrorResponseType,
		/// Optional `error_description`.
		description: Option<String>,
		/// Full decoded payload for diagnostics.
		payload: Response,
	},
	/// A received value does not decode to its declared type.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// A JSON document (discovery, JWKS) is malformed.
	#[error("Document is malformed.")]
	InvalidDocument(#[from] serde_path_to_error::Error<serde_json::Error>),
}
impl ProtocolError {
	/// Builds [`ProtocolError::OAuth`] from a response carrying an `error` field.
	pub fn from_response(response: &Response) -> Self {
		let error = response.get("error").and_then(Value::as_str).unwrap_or_default().to_owned();
		let description =
			response.get("error_description").and_then(Value::as_str).map(ToOwned::to_owned);

		Self::OAuth {
			error: serde_json::from_value(Value::String(error.clone()))
				.unwrap_or(BasicErrorResponseType::Extension(error)),
			description,
			payload: response.clone(),
		}
	}

	/// Builds [`ProtocolError::OAuth`] from decoded redirect parameters.
	pub fn from_parameters(parameters: &Parameters) -> Self {
		Self::from_response(&parameters.to_json())
	}
}

fn fmt_description(description: &Option<String>) -> String {
	description.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

/// Stable JOSE error names preserved across re-wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VerificationErrorKind {
	/// `exp` is in the past.
	JwtExpired,
	/// A claim (`iss`, `aud`, `nbf`, `iat`, `nonce`, required claims) failed validation.
	JwtClaimValidationFailed,
	/// The token is not a well-formed JWT.
	JwtInvalid,
	/// The signature does not match any candidate key.
	JwsSignatureVerificationFailed,
	/// The token algorithm is not allowed.
	JoseAlgNotAllowed,
	/// A JWK could not be turned into a verification key.
	JwkInvalid,
	/// The key set is malformed.
	JwksInvalid,
	/// No key in the set matches the token header.
	JwksNoMatchingKey,
	/// Any other JOSE failure.
	JoseError,
}
impl VerificationErrorKind {
	/// Returns the JOSE error name (e.g. `JWTExpired`).
	pub const fn name(self) -> &'static str {
		match self {
			Self::JwtExpired => "JWTExpired",
			Self::JwtClaimValidationFailed => "JWTClaimValidationFailed",
			Self::JwtInvalid => "JWTInvalid",
			Self::JwsSignatureVerificationFailed => "JWSSignatureVerificationFailed",
			Self::JoseAlgNotAllowed => "JOSEAlgNotAllowed",
			Self::JwkInvalid => "JWKInvalid",
			Self::JwksInvalid => "JWKSInvalid",
			Self::JwksNoMatchingKey => "JWKSNoMatchingKey",
			Self::JoseError => "JOSEError",
		}
	}
}
impl Display for VerificationErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.name())
	}
}

/// `id_token` verification failure.
#[derive(Debug, ThisError)]
#[error("{kind}: {message}")]
pub struct VerificationError {
	/// JOSE error name used for discrimination.
	pub kind: VerificationErrorKind,
	/// Human-readable detail.
	pub message: String,
	/// Original library error, when one exists.
	#[source]
	pub source: Option<jsonwebtoken::errors::Error>,
}
impl VerificationError {
	/// Creates an error without an underlying library failure.
	pub fn new(kind: VerificationErrorKind, message: impl Into<String>) -> Self {
		Self { kind, message: message.into(), source: None }
	}
}
impl From<jsonwebtoken::errors::Error> for VerificationError {
	fn from(e: jsonwebtoken::errors::Error) -> Self {
		use jsonwebtoken::errors::ErrorKind;

		let kind = match e.kind() {
			ErrorKind::ExpiredSignature => VerificationErrorKind::JwtExpired,
			ErrorKind::InvalidIssuer
			| ErrorKind::InvalidAudience
			| ErrorKind::InvalidSubject
			| ErrorKind::ImmatureSignature
			| ErrorKind::MissingRequiredClaim(_) => VerificationErrorKind::JwtClaimValidationFailed,
			ErrorKind::InvalidSignature => VerificationErrorKind::JwsSignatureVerificationFailed,
			ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName =>
				VerificationErrorKind::JoseAlgNotAllowed,
			ErrorKind::InvalidToken
			| ErrorKind::Base64(_)
			| ErrorKind::Json(_)
			| ErrorKind::Utf8(_) => VerificationErrorKind::JwtInvalid,
			ErrorKind::InvalidKeyFormat
			| ErrorKind::InvalidRsaKey(_)
			| ErrorKind::InvalidEcdsaKey => VerificationErrorKind::JwkInvalid,
			_ => VerificationErrorKind::JoseError,
		};

		Self { kind, message: e.to_string(), source: Some(e) }
	}
}

/// Dispatcher failures.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Target URL.
		url: String,
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// The endpoint answered with a non-success status.
	#[error("Endpoint answered with HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Parsed JSON body, when the body was a JSON object.
		response: Option<Response>,
	},
	/// The body is not a JSON object.
	#[error("Endpoint returned a body that is not a JSON object.")]
	InvalidBody {
		/// Structured parsing failure, when the body is not JSON at all.
		#[source]
		source: Option<serde_json::Error>,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: impl Into<String>, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { url: url.into(), source: Box::new(src) }
	}
}

/// Failures of the encrypted redirect hand-off.
#[derive(Debug, ThisError)]
pub enum PersistenceError {
	/// The key cookie is not 88 hex characters.
	#[error("Persisted key cookie is malformed.")]
	MalformedCookie,
	/// Stored ciphertext is not valid hex.
	#[error("Persisted state is not valid hex.")]
	Hex(#[from] hex::FromHexError),
	/// AES-GCM rejected the key, IV, or ciphertext.
	#[error("Persisted state could not be encrypted or decrypted.")]
	Crypto,
	/// The session could not be serialized.
	#[error("Session could not be serialized.")]
	Serialize(#[from] serde_json::Error),
	/// Decrypted bytes do not describe a session.
	#[error("Persisted state could not be decoded.")]
	Deserialize(#[from] serde_path_to_error::Error<serde_json::Error>),
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn cause_tags_name_the_flow() {
		let err = Error::config(FlowKind::Authorization, ConfigError::MissingUrl {
			endpoint: "authorization",
		});

		assert_eq!(err.cause(), Some("oauth2 authorization"));
		assert_eq!(err.flow(), Some(FlowKind::Authorization));
		assert!(err.to_string().contains("Missing URL for the authorization endpoint"));
	}

	#[test]
	fn oauth_error_bodies_become_protocol_errors() {
		let mut body = Response::new();

		body.insert("error".into(), "invalid_grant".into());
		body.insert("error_description".into(), "code already used".into());

		let err = Error::transport(FlowKind::Token, TransportError::Status {
			status: 400,
			response: Some(body),
		});

		match err {
			Error::Protocol { flow, source: ProtocolError::OAuth { error, description, .. } } => {
				assert_eq!(flow, FlowKind::Token);
				assert_eq!(error, BasicErrorResponseType::InvalidGrant);
				assert_eq!(description.as_deref(), Some("code already used"));
			},
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn plain_status_errors_stay_transport_errors() {
		let err =
			Error::transport(FlowKind::Discovery, TransportError::Status { status: 503, response: None });

		assert!(matches!(err, Error::Transport { flow: FlowKind::Discovery, .. }));
	}

	#[test]
	fn jose_names_survive_wrapping() {
		let inner = jsonwebtoken::errors::Error::from(
			jsonwebtoken::errors::ErrorKind::ExpiredSignature,
		);
		let err = VerificationError::from(inner);

		assert_eq!(err.kind, VerificationErrorKind::JwtExpired);
		assert_eq!(err.kind.name(), "JWTExpired");
		assert!(err.source.is_some());
	}
}
