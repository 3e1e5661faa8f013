//! Random byte source and random token helpers.

// crates.io
use rand::RngCore;

/// Unreserved URI characters (RFC 3986 section 2.3), the PKCE verifier alphabet.
pub const UNRESERVED: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
/// ASCII letters and digits, used for `state` and `nonce` tokens.
pub const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length of generated `state` and `nonce` tokens.
pub const TOKEN_LEN: usize = 32;

/// Cryptographically secure random byte source.
pub trait RandomBytes
where
	Self: Send + Sync,
{
	/// Fills `dest` with random bytes.
	fn fill(&self, dest: &mut [u8]);
}

/// [`RandomBytes`] backed by the thread-local OS-seeded generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsRandom;
impl RandomBytes for OsRandom {
	fn fill(&self, dest: &mut [u8]) {
		rand::rng().fill_bytes(dest);
	}
}

const MAX_REJECTION_ROUNDS: usize = 16;

/// Draws `len` characters uniformly from `charset` (at most 256 entries).
pub fn random_string(random: &dyn RandomBytes, len: usize, charset: &[u8]) -> String {
	debug_assert!(!charset.is_empty() && charset.len() <= 256);

	// Largest multiple of the charset size that fits in a byte; higher bytes are rejected.
	let zone = 256 - 256 % charset.len();
	let mut out = String::with_capacity(len);
	let mut buf = [0_u8; 64];
	let mut rounds = 0;

	while out.len() < len {
		random.fill(&mut buf);

		rounds += 1;

		// A source stuck above `zone` falls back to plain modulo so generation terminates.
		let strict = rounds <= MAX_REJECTION_ROUNDS;

		for b in buf.iter().map(|b| *b as usize).filter(|b| !strict || *b < zone) {
			if out.len() == len {
				break;
			}

			out.push(charset[b % charset.len()] as char);
		}
	}

	out
}

/// Fresh `state`/`nonce` token.
pub fn random_token(random: &dyn RandomBytes) -> String {
	random_string(random, TOKEN_LEN, ALPHANUMERIC)
}

/// `len` random bytes.
pub fn random_bytes(random: &dyn RandomBytes, len: usize) -> Vec<u8> {
	let mut out = vec![0; len];

	random.fill(&mut out);

	out
}
