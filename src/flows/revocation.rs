//! Token revocation (RFC 7009).

// self
use crate::{
	_prelude::*,
	config::{Config, Session},
	dispatch::{DispatchRequest, Dispatcher, Method},
	error::ConfigError,
	flows::{Client, common},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	param::{Endpoint, Overrides, ParamName, Parameters, resolve},
};

const KIND: FlowKind = FlowKind::Revocation;

/// A completed revocation.
#[derive(Clone, Debug, PartialEq)]
pub struct Revocation {
	/// Request sent to the revocation endpoint.
	pub request: DispatchRequest,
	/// The token that was revoked.
	pub token: String,
}

impl<D> Client<D>
where
	D: ?Sized + Dispatcher,
{
	/// Revokes a token and forgets it locally when it matches a stored token.
	pub async fn revoke(
		&self,
		session: &mut Session,
		custom: &Overrides,
		url: Option<&str>,
	) -> Result<Revocation> {
		let span = FlowSpan::new(KIND, "revoke");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let (request, token) = prepare(&session.config, custom, url)?;

				common::record_test_payload(&*self.store, &session.config, KIND, &request);

				let response = common::dispatch(&*self.dispatcher, KIND, request.clone()).await?;

				common::ensure_no_error(KIND, &response)?;

				for name in [ParamName::AccessToken, ParamName::RefreshToken] {
					if session.config.parameters.str(name) == Some(token.as_str()) {
						session.config.parameters.remove(name.as_str());
					}
				}

				Ok(Revocation { request, token })
			})
			.await;

		common::record_outcome(KIND, &result);

		result
	}
}

/// Builds the revocation request, returning it with the selected token.
pub fn prepare(
	config: &Config,
	custom: &Overrides,
	url: Option<&str>,
) -> Result<(DispatchRequest, String)> {
	let url = common::resolve_url(
		KIND,
		Endpoint::Revocation,
		url,
		custom,
		config.metadata.revocation_endpoint.as_deref(),
	)?;
	let mut parameters = resolve(KIND, Endpoint::Revocation, config, custom)?;
	let token = select_token(&parameters)?;

	parameters.remove(ParamName::AccessToken.as_str());
	parameters.remove(ParamName::RefreshToken.as_str());
	parameters.set_str(ParamName::Token, token.clone());

	Ok((common::request(Method::Post, url, &parameters, config), token))
}

/// Picks the token to revoke: explicit `token`, then the hinted token, then `access_token`,
/// then `refresh_token`.
pub fn select_token(parameters: &Parameters) -> Result<String> {
	let non_empty = move |name: ParamName| parameters.str(name).filter(|t| !t.is_empty());

	if let Some(token) = non_empty(ParamName::Token) {
		return Ok(token.to_owned());
	}

	let token = match parameters.str(ParamName::TokenTypeHint).filter(|h| !h.is_empty()) {
		Some(hint) => {
			let hinted = match hint {
				"refresh_token" => ParamName::RefreshToken,
				_ => ParamName::AccessToken,
			};

			non_empty(hinted).ok_or_else(|| {
				Error::config(KIND, ConfigError::MissingHintedToken { hint: hint.to_owned() })
			})?
		},
		None => non_empty(ParamName::AccessToken)
			.or_else(|| non_empty(ParamName::RefreshToken))
			.ok_or_else(|| Error::config(KIND, ConfigError::MissingToken))?,
	};

	Ok(token.to_owned())
}
