// self
use crate::{
	_prelude::*,
	obs::{FlowKind, SecurityEvent},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by token flows.
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
			let span = tracing::info_span!("token_rotor.flow", flow = kind.as_str(), stage);

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
}

/// Writes a [`SecurityEvent`] to the active tracing subscriber (when enabled).
pub fn log_security_event(event: &SecurityEvent) {
	#[cfg(feature = "tracing")]
	match event {
		SecurityEvent::ReplayDetected { user, token, revoked } => tracing::error!(
			event = event.as_str(),
			user = %user,
			token = %token,
			revoked,
			"Refresh token replay detected; descendant chain revoked."
		),
		SecurityEvent::RefreshRefused { token, reason } => tracing::warn!(
			event = event.as_str(),
			token = %token,
			reason,
			"Refresh token refused."
		),
		SecurityEvent::RevokedAll { user, revoked } => tracing::warn!(
			event = event.as_str(),
			user = %user,
			revoked,
			"Revoked every active refresh token of the user."
		),
		SecurityEvent::ClientRefreshRejected =>
			tracing::warn!(event = event.as_str(), "Refresh endpoint rejected the session."),
		SecurityEvent::ClientRefreshUnreachable { reason } => tracing::warn!(
			event = event.as_str(),
			reason = %reason,
			"Refresh endpoint is unreachable."
		),
		SecurityEvent::ClientRefreshTimedOut =>
			tracing::warn!(event = event.as_str(), "Refresh call timed out."),
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = event;
	}
}
