//! Observability helpers for engine flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth2_pilot.flow` with the `flow` and
//!   `stage` (call site) fields, plus warnings for soft failures such as untyped parameters.
//! - Enable `metrics` to increment the `oauth2_pilot_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Engine flows; each one tags the errors it raises.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Authorization request construction and redirect.
	Authorization,
	/// Token endpoint exchange.
	Token,
	/// Refresh-token exchange.
	Refresh,
	/// Token revocation.
	Revocation,
	/// Discovery document retrieval.
	Discovery,
	/// `id_token` verification.
	VerifyToken,
	/// Post-redirect parameter interception.
	Redirect,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Authorization => "authorization",
			FlowKind::Token => "token",
			FlowKind::Refresh => "refresh",
			FlowKind::Revocation => "revocation",
			FlowKind::Discovery => "discovery",
			FlowKind::VerifyToken => "verify_token",
			FlowKind::Redirect => "redirect",
		}
	}

	/// Returns the cause tag attached to errors raised by this flow.
	pub const fn cause(self) -> &'static str {
		match self {
			FlowKind::Authorization => "oauth2 authorization",
			FlowKind::Token => "oauth2 token",
			FlowKind::Refresh => "oauth2 refresh",
			FlowKind::Revocation => "oauth2 revocation",
			FlowKind::Discovery => "oauth2 discovery",
			FlowKind::VerifyToken => "oauth2 verify_token",
			FlowKind::Redirect => "oauth2 redirect",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.cause())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
