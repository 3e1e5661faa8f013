//! Shared helpers for flow implementations (URL resolution, dispatch, response handling).

// self
use crate::{
	_prelude::*,
	config::Config,
	dispatch::{DispatchRequest, Dispatcher, Method, Response},
	error::{ConfigError, ProtocolError},
	obs::{self, FlowKind, FlowOutcome},
	param::{Endpoint, Overrides, Parameters, URL_KEY, decode_response},
	storage::KeyValueStore,
};

/// Prefix of the storage slots holding test-mode payloads.
pub const TEST_PAYLOAD_PREFIX: &str = "oauth2_pilot_";

/// Storage slot holding the last test-mode payload recorded by `flow`.
pub fn test_payload_key(flow: FlowKind) -> String {
	format!("{TEST_PAYLOAD_PREFIX}{}", flow.as_str())
}

/// Picks the endpoint URL: explicit argument, then the call-site `url` override, then
/// `fallback` (usually discovery metadata). Empty strings count as absent.
pub(crate) fn resolve_url(
	flow: FlowKind,
	endpoint: Endpoint,
	explicit: Option<&str>,
	custom: &Overrides,
	fallback: Option<&str>,
) -> Result<String> {
	let url = explicit
		.into_iter()
		.chain(custom.str(URL_KEY))
		.chain(fallback)
		.find(|url| !url.is_empty())
		.ok_or_else(|| Error::config(flow, ConfigError::MissingUrl { endpoint: endpoint.as_str() }))?;

	Url::parse(url).map_err(|source| {
		Error::config(flow, ConfigError::InvalidUrl { url: url.to_owned(), source })
	})?;

	Ok(url.to_owned())
}

/// Builds a request carrying the wire form of `parameters`.
pub(crate) fn request(
	method: Method,
	url: String,
	parameters: &Parameters,
	config: &Config,
) -> DispatchRequest {
	DispatchRequest {
		method,
		url,
		payload: parameters.to_wire(),
		content_type: config.configuration.content_type,
	}
}

/// Records the raw payload of `request` when test mode is on.
pub(crate) fn record_test_payload(
	store: &dyn KeyValueStore,
	config: &Config,
	flow: FlowKind,
	request: &DispatchRequest,
) {
	if !config.configuration.test {
		return;
	}

	match serde_json::to_string(&request.payload_json()) {
		Ok(payload) => store.set(&test_payload_key(flow), payload),
		Err(e) => obs::warn_soft_failure(flow, "Test payload could not be recorded.", &e),
	}
}

/// Dispatches `request`, tagging transport failures with `flow`.
pub(crate) async fn dispatch<D>(
	dispatcher: &D,
	flow: FlowKind,
	request: DispatchRequest,
) -> Result<Response>
where
	D: ?Sized + Dispatcher,
{
	dispatcher.dispatch(request).await.map_err(|e| Error::transport(flow, e))
}

/// Rejects responses carrying an OAuth `error` field.
pub(crate) fn ensure_no_error(flow: FlowKind, response: &Response) -> Result<()> {
	if response.contains_key("error") {
		return Err(Error::protocol(flow, ProtocolError::from_response(response)));
	}

	Ok(())
}

/// Decodes a token-style response and merges it into `config.parameters`.
pub(crate) fn apply_response(
	flow: FlowKind,
	config: &mut Config,
	response: &Response,
) -> Result<Parameters> {
	ensure_no_error(flow, response)?;

	let decoded = decode_response(response, OffsetDateTime::now_utc())
		.map_err(|e| Error::protocol(flow, e))?;

	config.parameters.merge(decoded.clone());

	Ok(decoded)
}

/// Records the final outcome of a flow.
pub(crate) fn record_outcome<T>(flow: FlowKind, result: &Result<T>) {
	match result {
		Ok(_) => obs::record_flow_outcome(flow, FlowOutcome::Success),
		Err(_) => obs::record_flow_outcome(flow, FlowOutcome::Failure),
	}
}
