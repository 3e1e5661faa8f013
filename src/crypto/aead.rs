//! Authenticated encryption used by the redirect hand-off.

// crates.io
use aes_gcm::{
	Aes256Gcm, Nonce,
	aead::{Aead, KeyInit},
};
// self
use crate::error::PersistenceError;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;
/// GCM IV length in bytes (96 bits).
pub const IV_LEN: usize = 12;

/// Authenticated cipher over caller-supplied key material.
pub trait AeadCipher
where
	Self: Send + Sync,
{
	/// Encrypts `plaintext`, returning ciphertext with the authentication tag appended.
	fn encrypt(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, PersistenceError>;

	/// Decrypts and authenticates `ciphertext`.
	fn decrypt(&self, key: &[u8], iv: &[u8], ciphertext: &[u8])
	-> Result<Vec<u8>, PersistenceError>;
}

/// [`AeadCipher`] implementing AES-256-GCM.
#[derive(Clone, Copy, Debug, Default)]
pub struct AesGcmCipher;
impl AesGcmCipher {
	fn cipher(key: &[u8], iv: &[u8]) -> Result<Aes256Gcm, PersistenceError> {
		if iv.len() != IV_LEN {
			return Err(PersistenceError::Crypto);
		}

		Aes256Gcm::new_from_slice(key).map_err(|_| PersistenceError::Crypto)
	}
}
impl AeadCipher for AesGcmCipher {
	fn encrypt(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, PersistenceError> {
		Self::cipher(key, iv)?
			.encrypt(Nonce::from_slice(iv), plaintext)
			.map_err(|_| PersistenceError::Crypto)
	}

	fn decrypt(
		&self,
		key: &[u8],
		iv: &[u8],
		ciphertext: &[u8],
	) -> Result<Vec<u8>, PersistenceError> {
		Self::cipher(key, iv)?
			.decrypt(Nonce::from_slice(iv), ciphertext)
			.map_err(|_| PersistenceError::Crypto)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn ciphertext_is_authenticated() {
		let key = [7_u8; KEY_LEN];
		let iv = [9_u8; IV_LEN];
		let mut sealed = AesGcmCipher.encrypt(&key, &iv, b"session").unwrap();

		assert_eq!(AesGcmCipher.decrypt(&key, &iv, &sealed).unwrap(), b"session");

		sealed[0] ^= 1;

		assert!(matches!(AesGcmCipher.decrypt(&key, &iv, &sealed), Err(PersistenceError::Crypto)));
	}

	#[test]
	fn wrong_lengths_are_rejected() {
		assert!(AesGcmCipher.encrypt(&[0; 16], &[0; IV_LEN], b"x").is_err());
		assert!(AesGcmCipher.encrypt(&[0; KEY_LEN], &[0; 16], b"x").is_err());
	}
}
