//! Encrypted hand-off of the in-flight session across a full-page redirect.
//!
//! [`SecureStatePersistence::save`] seals the session with a fresh AES-256-GCM key and IV. The
//! hex ciphertext goes to a session-scoped storage slot while the hex `key || iv` goes to a
//! short-lived `Secure; SameSite=Strict` cookie. Neither artifact alone reveals the session.
//! [`SecureStatePersistence::recover`] takes both artifacts (erasing them whether or not
//! recovery succeeds) and merges the decrypted session into the caller's live one. The key is
//! never retained in memory after `save` returns.

// self
use crate::{
	_prelude::*,
	config::Session,
	crypto::{AeadCipher, IV_LEN, KEY_LEN, RandomBytes, random_bytes},
	error::PersistenceError,
	storage::{Cookie, CookieJar, KeyValueStore},
};

/// Cookie holding the hex-encoded `key || iv`.
pub const STATE_COOKIE: &str = "oauth2_pilot_state";
/// Storage slot holding the hex-encoded ciphertext.
pub const STATE_SLOT: &str = "oauth2_pilot_state";
/// Lifetime of the key cookie.
pub const STATE_COOKIE_MAX_AGE: Duration = Duration::minutes(5);

const COOKIE_HEX_LEN: usize = 2 * (KEY_LEN + IV_LEN);

/// Single-use encrypted persistence of a [`Session`].
#[derive(Clone)]
pub struct SecureStatePersistence {
	random: Arc<dyn RandomBytes>,
	cipher: Arc<dyn AeadCipher>,
	store: Arc<dyn KeyValueStore>,
	cookies: Arc<dyn CookieJar>,
}
impl SecureStatePersistence {
	/// Wires the persistence layer to its capabilities.
	pub fn new(
		random: Arc<dyn RandomBytes>,
		cipher: Arc<dyn AeadCipher>,
		store: Arc<dyn KeyValueStore>,
		cookies: Arc<dyn CookieJar>,
	) -> Self {
		Self { random, cipher, store, cookies }
	}

	/// Seals `session` into the storage slot and key cookie, replacing earlier artifacts.
	pub fn save(&self, session: &Session) -> Result<(), PersistenceError> {
		let plaintext = serde_json::to_vec(session)?;
		let mut key_iv = random_bytes(&*self.random, KEY_LEN + IV_LEN);
		let (key, iv) = key_iv.split_at(KEY_LEN);
		let ciphertext = self.cipher.encrypt(key, iv, &plaintext)?;

		self.store.set(STATE_SLOT, hex::encode(ciphertext));
		self.cookies.set(
			Cookie::new(STATE_COOKIE, hex::encode(&key_iv)).with_max_age(STATE_COOKIE_MAX_AGE),
		);
		key_iv.fill(0);

		Ok(())
	}

	/// Restores a saved session into `session`.
	///
	/// Both artifacts are erased first. Returns `Ok(false)` without touching `session` when it
	/// already holds state or when either artifact is missing; a second call after a successful
	/// recovery is therefore a no-op.
	pub fn recover(&self, session: &mut Session) -> Result<bool, PersistenceError> {
		let cookie = self.cookies.remove(STATE_COOKIE);
		let sealed = self.store.remove(STATE_SLOT);

		if !session.is_empty() {
			return Ok(false);
		}

		let (Some(cookie), Some(sealed)) = (cookie, sealed) else {
			return Ok(false);
		};

		if cookie.value.len() != COOKIE_HEX_LEN {
			return Err(PersistenceError::MalformedCookie);
		}

		let key_iv = hex::decode(&cookie.value)?;
		let (key, iv) = key_iv.split_at(KEY_LEN);
		let plaintext = self.cipher.decrypt(key, iv, &hex::decode(sealed)?)?;
		let recovered: Session =
			serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(&plaintext))?;

		session.config.merge_shallow(recovered.config);

		if !recovered.id_token.is_empty() {
			session.id_token = recovered.id_token;
		}

		Ok(true)
	}

	/// Erases both artifacts.
	pub fn clear(&self) {
		self.cookies.remove(STATE_COOKIE);
		self.store.remove(STATE_SLOT);
	}
}
impl Debug for SecureStatePersistence {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SecureStatePersistence").finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		config::{AuthorizationGrant, IdTokenClaims},
		crypto::{AesGcmCipher, OsRandom},
		param::{Endpoint, ParamName},
		storage::{MemoryCookieJar, MemoryStore, SameSite},
	};

	fn persistence() -> (SecureStatePersistence, Arc<MemoryStore>, Arc<MemoryCookieJar>) {
		let store = Arc::new(MemoryStore::default());
		let cookies = Arc::new(MemoryCookieJar::default());
		let persistence = SecureStatePersistence::new(
			Arc::new(OsRandom),
			Arc::new(AesGcmCipher),
			store.clone(),
			cookies.clone(),
		);

		(persistence, store, cookies)
	}

	fn in_flight() -> Session {
		let mut session = Session::default();

		session.config.configuration.grant_type = AuthorizationGrant::Hybrid;
		session.config.metadata.issuer = Some("https://idp.example.com".into());
		session.config.parameters.set_str(ParamName::State, "abc");
		session.config.parameters.set_strings(ParamName::Scope, vec!["openid".into()]);
		session.config.overrides_mut(Endpoint::Token).set("code_verifier", "v".repeat(64));
		session.config.overrides_mut(Endpoint::Authorization).delete("prompt");
		session.id_token =
			IdTokenClaims(serde_json::json!({ "sub": "42" }).as_object().cloned().unwrap());

		session
	}

	#[test]
	fn save_then_recover_round_trips_once() {
		let (persistence, store, cookies) = persistence();
		let original = in_flight();

		persistence.save(&original).unwrap();

		let cookie = cookies.get(STATE_COOKIE).unwrap();

		assert_eq!(cookie.value.len(), 88);
		assert!(cookie.secure && !cookie.http_only);
		assert_eq!(cookie.same_site, SameSite::Strict);

		let mut recovered = Session::default();

		assert!(persistence.recover(&mut recovered).unwrap());
		assert_eq!(
			serde_json::to_value(&recovered).unwrap(),
			serde_json::to_value(&original).unwrap()
		);
		assert!(store.is_empty());
		assert!(cookies.get(STATE_COOKIE).is_none());

		let mut again = Session::default();

		assert!(!persistence.recover(&mut again).unwrap());
		assert!(again.is_empty());
	}

	#[test]
	fn live_sessions_are_not_overwritten_but_artifacts_are_erased() {
		let (persistence, store, _) = persistence();
		let mut live = Session::default();

		persistence.save(&in_flight()).unwrap();
		live.config.parameters.set_str(ParamName::ClientId, "app");

		assert!(!persistence.recover(&mut live).unwrap());
		assert_eq!(live.config.parameters.str(ParamName::State), None);
		assert!(store.is_empty());
	}

	#[test]
	fn malformed_artifacts_fail_without_lingering() {
		let (persistence, store, cookies) = persistence();

		persistence.save(&in_flight()).unwrap();
		cookies.set(Cookie::new(STATE_COOKIE, "abcd"));

		let mut session = Session::default();

		assert!(matches!(
			persistence.recover(&mut session),
			Err(PersistenceError::MalformedCookie)
		));
		assert!(store.is_empty());

		persistence.save(&in_flight()).unwrap();
		store.set(STATE_SLOT, "00".repeat(40));

		assert!(matches!(persistence.recover(&mut session), Err(PersistenceError::Crypto)));
		assert!(session.is_empty());
		assert!(cookies.get(STATE_COOKIE).is_none());
	}
}
