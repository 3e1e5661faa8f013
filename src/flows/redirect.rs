//! Post-redirect interception: recovers the persisted session, then decodes the parameters the
//! authorization server sent back in the URL fragment or query.

// self
use crate::{
	_prelude::*,
	config::{Config, Session},
	dispatch::Dispatcher,
	error::ProtocolError,
	flows::{Client, common},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	param::{ParamName, Parameters, decode_pairs},
};

const KIND: FlowKind = FlowKind::Redirect;

impl<D> Client<D>
where
	D: ?Sized + Dispatcher,
{
	/// Handles the page load that follows an authorization redirect.
	///
	/// Recovers any persisted session first; a failed recovery is logged and otherwise
	/// ignored. The fragment and query are always removed from `url`. Decoded values are
	/// merged into `session.config.parameters` after the `state` check passes, and an `error`
	/// field then fails the flow with the full payload.
	pub fn intercept_redirect(&self, session: &mut Session, url: &mut Url) -> Result<Parameters> {
		let span = FlowSpan::new(KIND, "intercept_redirect");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.in_scope(|| {
			if let Err(e) = self.persistence.recover(session) {
				obs::warn_soft_failure(KIND, "Persisted session could not be recovered.", &e);
			}

			let raw = take_redirect_parameters(url);

			apply(&mut session.config, &raw, OffsetDateTime::now_utc())
		});

		common::record_outcome(KIND, &result);

		result
	}
}

/// Returns the fragment when non-empty, else the query, clearing both from `url`.
pub fn take_redirect_parameters(url: &mut Url) -> String {
	let raw = match url.fragment().filter(|f| !f.is_empty()) {
		Some(fragment) => fragment.to_owned(),
		None => url.query().unwrap_or_default().to_owned(),
	};

	url.set_fragment(None);
	url.set_query(None);

	raw
}

/// Validates and decodes `raw` redirect parameters into `config`.
///
/// No pairs yields an empty set. A configured `state` must match the received one exactly,
/// otherwise nothing is merged.
pub fn apply(config: &mut Config, raw: &str, now: OffsetDateTime) -> Result<Parameters> {
	let pairs = url::form_urlencoded::parse(raw.as_bytes()).into_owned().collect::<Vec<_>>();

	if pairs.is_empty() {
		return Ok(Parameters::default());
	}

	if let Some(expected) = config.parameters.str(ParamName::State) {
		let received = pairs
			.iter()
			.find(|(name, _)| name == ParamName::State.as_str())
			.map(|(_, value)| value.as_str());

		if received != Some(expected) {
			return Err(Error::protocol(KIND, ProtocolError::StateMismatch {
				received: received.map(ToOwned::to_owned),
			}));
		}
	}

	let decoded = decode_pairs(pairs, now).map_err(|e| Error::protocol(KIND, e))?;

	config.parameters.merge(decoded.clone());

	if decoded.contains(ParamName::Error.as_str()) {
		return Err(Error::protocol(KIND, ProtocolError::from_parameters(&decoded)));
	}

	Ok(decoded)
}
