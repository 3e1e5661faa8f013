//! OpenID Connect discovery document retrieval.

// self
use crate::{
	_prelude::*,
	config::{Config, Metadata, Session},
	dispatch::{DispatchRequest, Dispatcher, Method},
	endpoint,
	error::ConfigError,
	flows::{Client, common},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	param::{Endpoint, Overrides, resolve},
};

const KIND: FlowKind = FlowKind::Discovery;

impl<D> Client<D>
where
	D: ?Sized + Dispatcher,
{
	/// Fetches the discovery document and merges it into the session metadata.
	///
	/// Document fields win over previously configured metadata. Returns the merged metadata.
	pub async fn discover(
		&self,
		session: &mut Session,
		custom: &Overrides,
		url: Option<&str>,
	) -> Result<Metadata> {
		let span = FlowSpan::new(KIND, "discover");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = prepare(&session.config, custom, url)?;

				common::record_test_payload(&*self.store, &session.config, KIND, &request);

				let response = common::dispatch(&*self.dispatcher, KIND, request).await?;

				common::ensure_no_error(KIND, &response)?;
				session.config.metadata.merge(response).map_err(|e| Error::protocol(KIND, e))?;

				Ok(session.config.metadata.clone())
			})
			.await;

		common::record_outcome(KIND, &result);

		result
	}
}

/// Builds the discovery `GET` request.
///
/// URL precedence: explicit argument, call-site `url` override, then the configured discovery
/// endpoint or the issuer mounted with the discovery suffix.
pub fn prepare(config: &Config, custom: &Overrides, url: Option<&str>) -> Result<DispatchRequest> {
	let fallback = endpoint::resolve_discovery_url(config);
	let url = common::resolve_url(KIND, Endpoint::Discovery, url, custom, fallback.as_deref())?;
	let parameters = resolve(KIND, Endpoint::Discovery, config, custom)?;

	Ok(common::request(Method::Get, url, &parameters, config))
}
