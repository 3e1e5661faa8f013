// self
use crate::{_prelude::*, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by engine flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("oauth2_pilot.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}

	/// Runs a synchronous stage inside the span.
	pub fn in_scope<F, T>(&self, f: F) -> T
	where
		F: FnOnce() -> T,
	{
		#[cfg(feature = "tracing")]
		{
			self.span.in_scope(f)
		}
		#[cfg(not(feature = "tracing"))]
		{
			f()
		}
	}
}

/// Emits a soft warning for a parameter the type registry does not know.
pub fn warn_untyped_parameter(flow: FlowKind, name: &str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(flow = flow.as_str(), parameter = name, "Parameter has no declared type.");
	#[cfg(not(feature = "tracing"))]
	let _ = (flow, name);
}

/// Emits a soft warning for a failed (non-fatal) step.
pub fn warn_soft_failure(flow: FlowKind, message: &str, error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(flow = flow.as_str(), error = %error, "{message}");
	#[cfg(not(feature = "tracing"))]
	let _ = (flow, message, error);
}

/// Emits a debug event describing a dispatched request.
pub fn debug_dispatch(method: &str, url: &str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(method, url, "Dispatching request.");
	#[cfg(not(feature = "tracing"))]
	let _ = (method, url);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowKind::Discovery, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
		assert_eq!(span.in_scope(|| 7), 7);
	}

	#[test]
	fn warnings_are_noops_without_subscriber() {
		warn_untyped_parameter(FlowKind::Token, "x-custom");
		warn_soft_failure(
			FlowKind::Redirect,
			"Recovery skipped.",
			&std::io::Error::other("boom"),
		);
	}
}
