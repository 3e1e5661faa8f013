//! Endpoint URL composition.

// self
use crate::config::Config;

/// Composes an endpoint URL from `base`.
///
/// - `protocol` replaces the scheme (or is prepended when `base` has none, after stripping any
///   leading `:` and `/`).
/// - `suffix` is appended after trimming trailing `:` and `/` from the base.
/// - `trim` removes a trailing `/` from the result.
pub fn mount_url(base: &str, protocol: Option<&str>, suffix: Option<&str>, trim: bool) -> String {
	let protocol = protocol.map(|p| p.trim_end_matches([':', '/'])).filter(|p| !p.is_empty());
	let mut url = match protocol {
		Some(protocol) => match base.split_once("://") {
			Some((scheme, _)) if scheme.eq_ignore_ascii_case(protocol) => base.to_owned(),
			Some((_, rest)) => format!("{protocol}://{rest}"),
			None => format!("{protocol}://{}", base.trim_start_matches([':', '/'])),
		},
		None => base.to_owned(),
	};

	if let Some(suffix) = suffix.filter(|s| !s.is_empty()) {
		url.truncate(url.trim_end_matches([':', '/']).len());
		url.push('/');
		url.push_str(suffix.trim_start_matches('/'));
	}
	if trim && url.ends_with('/') {
		url.pop();
	}

	url
}

/// Discovery document URL: the configured endpoint, else the issuer mounted under `https` with
/// the discovery suffix. `None` when neither is available.
pub fn resolve_discovery_url(config: &Config) -> Option<String> {
	let explicit = config.configuration.discovery_endpoint.as_deref();

	if let Some(endpoint) = explicit.filter(|e| !e.is_empty()) {
		return Some(endpoint.to_owned());
	}

	config.metadata.issuer.as_deref().filter(|issuer| !issuer.is_empty()).map(|issuer| {
		mount_url(issuer, Some("https"), Some(config.configuration.discovery_suffix()), false)
	})
}
