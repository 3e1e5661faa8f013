//! Proof Key for Code Exchange (RFC 7636).

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	crypto::{RandomBytes, UNRESERVED, random_string},
	error::ConfigError,
};

/// Length of generated code verifiers (the RFC 7636 maximum).
pub const PKCE_VERIFIER_LEN: usize = 128;

/// PKCE challenge methods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CodeChallengeMethod {
	/// `BASE64URL(SHA256(verifier))`.
	#[default]
	S256,
	/// The verifier itself.
	Plain,
}
impl CodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub const fn as_str(self) -> &'static str {
		match self {
			CodeChallengeMethod::S256 => "S256",
			CodeChallengeMethod::Plain => "plain",
		}
	}

	/// Derives the challenge for `verifier`.
	pub fn challenge(self, verifier: &str) -> String {
		match self {
			CodeChallengeMethod::S256 => URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes())),
			CodeChallengeMethod::Plain => verifier.to_owned(),
		}
	}
}
impl FromStr for CodeChallengeMethod {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.eq_ignore_ascii_case("s256") {
			Ok(Self::S256)
		} else if s.eq_ignore_ascii_case("plain") {
			Ok(Self::Plain)
		} else {
			Err(ConfigError::InvalidCodeChallengeMethod { method: s.to_owned() })
		}
	}
}
impl Display for CodeChallengeMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Fresh code verifier drawn from the unreserved character set.
pub fn generate_verifier(random: &dyn RandomBytes) -> String {
	random_string(random, PKCE_VERIFIER_LEN, UNRESERVED)
}
