//! OAuth 2.0 / OpenID Connect client-side protocol engine: builds authorization, token,
//! revocation, and discovery requests, derives PKCE/state/nonce values, verifies `id_token`s
//! against a remote JWKS, and hands in-flight state across a full-page redirect.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod config;
pub mod crypto;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod flows;
pub mod obs;
pub mod param;
pub mod persistence;
pub mod storage;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::{Config, Session},
		crypto::OsRandom,
		dispatch::SimulatedDispatcher,
		flows::Client,
		storage::{MemoryCookieJar, MemoryStore},
	};

	/// Client type alias used by simulation-backed tests.
	pub type SimulatedClient = Client<SimulatedDispatcher>;

	/// Handles returned by [`build_simulated_client`] so tests can inspect side effects.
	pub struct SimulatedParts {
		/// Dispatcher that recorded every outgoing request.
		pub dispatcher: Arc<SimulatedDispatcher>,
		/// Session-scoped storage backing the client.
		pub store: Arc<MemoryStore>,
		/// Cookie jar backing the client.
		pub cookies: Arc<MemoryCookieJar>,
	}

	/// Constructs a [`Client`] backed by in-memory storage and a [`SimulatedDispatcher`].
	pub fn build_simulated_client() -> (SimulatedClient, SimulatedParts) {
		let dispatcher = Arc::new(SimulatedDispatcher::default());
		let store = Arc::new(MemoryStore::default());
		let cookies = Arc::new(MemoryCookieJar::default());
		let client = Client::with_parts(
			dispatcher.clone(),
			Arc::new(OsRandom),
			store.clone(),
			cookies.clone(),
		);

		(client, SimulatedParts { dispatcher, store, cookies })
	}

	/// Builds a session whose metadata points every endpoint at `https://idp.example.com`.
	pub fn example_session() -> Session {
		let mut config = Config::default();

		config.metadata.issuer = Some("https://idp.example.com".into());
		config.metadata.authorization_endpoint = Some("https://idp.example.com/authorize".into());
		config.metadata.token_endpoint = Some("https://idp.example.com/token".into());
		config.metadata.revocation_endpoint = Some("https://idp.example.com/revoke".into());
		config.metadata.jwks_uri = Some("https://idp.example.com/jwks".into());

		Session::new(config)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Map, Value};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tokio as _};
