//! Protocol flows driven through the [`Client`] facade.
//!
//! Every flow takes the caller-owned [`Session`] by `&mut` and writes its results back into
//! it. Flows are plain `async fn`s; they suspend only while the [`Dispatcher`] is working and
//! support no mid-flight cancellation beyond dropping the future.

pub mod authorization;
pub mod common;
pub mod discovery;
pub mod redirect;
pub mod revocation;
pub mod token;
pub mod verify;

pub use authorization::AuthorizationRequest;
pub use common::{TEST_PAYLOAD_PREFIX, test_payload_key};
pub use revocation::Revocation;
pub use token::TokenExchange;
pub use verify::VerifyOptions;

// self
use crate::{
	_prelude::*,
	config::{Config, Session},
	crypto::{AesGcmCipher, RandomBytes},
	dispatch::Dispatcher,
	persistence::SecureStatePersistence,
	storage::{CookieJar, KeyValueStore},
};
#[cfg(feature = "reqwest")]
use crate::{
	crypto::OsRandom,
	dispatch::ReqwestDispatcher,
	storage::{MemoryCookieJar, MemoryStore},
};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestOAuth2Client = Client<ReqwestDispatcher>;

/// Runs OAuth 2.0 / OpenID Connect flows against caller-owned sessions.
///
/// The client owns the dispatcher and the capabilities standing in for browser side effects
/// (randomness, session storage, cookies) so individual flows can focus on protocol logic.
/// It holds no session state of its own: one client can serve many sessions.
pub struct Client<D>
where
	D: ?Sized + Dispatcher,
{
	/// Transport used for every redirect and HTTP call.
	pub dispatcher: Arc<D>,
	/// Randomness for PKCE verifiers, `state`, `nonce`, and persistence keys.
	pub random: Arc<dyn RandomBytes>,
	/// Session-scoped storage (encrypted hand-off and test-mode payloads).
	pub store: Arc<dyn KeyValueStore>,
	/// Encrypted redirect hand-off.
	pub persistence: SecureStatePersistence,
}
impl<D> Client<D>
where
	D: ?Sized + Dispatcher,
{
	/// Creates a client from its dispatcher and capabilities, using AES-256-GCM for the
	/// redirect hand-off.
	pub fn with_parts(
		dispatcher: impl Into<Arc<D>>,
		random: Arc<dyn RandomBytes>,
		store: Arc<dyn KeyValueStore>,
		cookies: Arc<dyn CookieJar>,
	) -> Self {
		let persistence = SecureStatePersistence::new(
			random.clone(),
			Arc::new(AesGcmCipher),
			store.clone(),
			cookies,
		);

		Self { dispatcher: dispatcher.into(), random, store, persistence }
	}

	/// Replaces the session configuration and erases any persisted hand-off.
	pub fn set_config(&self, session: &mut Session, config: Config) {
		session.config = config;

		self.persistence.clear();
	}

	/// Seals the session so it survives the next full-page navigation.
	pub fn persist(&self, session: &Session) -> Result<()> {
		self.persistence.save(session)?;

		Ok(())
	}
}
#[cfg(feature = "reqwest")]
impl Client<ReqwestDispatcher> {
	/// Creates a reqwest-backed client with in-memory storage and cookies.
	pub fn new() -> Result<Self, ReqwestError> {
		Ok(Self::with_parts(
			ReqwestDispatcher::new()?,
			Arc::new(OsRandom),
			Arc::new(MemoryStore::default()),
			Arc::new(MemoryCookieJar::default()),
		))
	}
}
impl<D> Clone for Client<D>
where
	D: ?Sized + Dispatcher,
{
	fn clone(&self) -> Self {
		Self {
			dispatcher: self.dispatcher.clone(),
			random: self.random.clone(),
			store: self.store.clone(),
			persistence: self.persistence.clone(),
		}
	}
}
impl<D> Debug for Client<D>
where
	D: ?Sized + Dispatcher,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client").field("persistence", &self.persistence).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use crate::{_preludet::*, param::ParamName, persistence::STATE_COOKIE, storage::CookieJar};

	#[test]
	fn set_config_erases_persisted_state() {
		let (client, parts) = build_simulated_client();
		let mut session = example_session();

		client.persist(&session).unwrap();

		assert!(parts.cookies.get(STATE_COOKIE).is_some());

		let mut config = session.config.clone();

		config.parameters.set_str(ParamName::ClientId, "other");
		client.set_config(&mut session, config);

		assert_eq!(session.config.parameters.str(ParamName::ClientId), Some("other"));
		assert!(parts.cookies.get(STATE_COOKIE).is_none());
		assert!(parts.store.is_empty());
	}
}
