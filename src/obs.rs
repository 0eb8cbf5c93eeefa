//! Optional observability helpers for server and client token flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `token_rotor.flow` with the `flow` and
//!   `stage` (call site) fields, plus [`SecurityEvent`]s as `warn`/`error` events.
//! - Enable `metrics` to increment the `token_rotor_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`, `token_rotor_security_total`
//!   labeled by `event`, and `token_rotor_replay_total` for detected replays.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Token flows observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Sign-in: a new chain is started.
	Issue,
	/// Server-side rotation of a refresh token.
	Rotate,
	/// Server-side revocation (logout, revoke-all, purge).
	Revoke,
	/// Client-side refresh call.
	Refresh,
	/// Client-side protected request.
	Request,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Issue => "issue",
			FlowKind::Rotate => "rotate",
			FlowKind::Revoke => "revoke",
			FlowKind::Refresh => "refresh",
			FlowKind::Request => "request",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
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

/// Diagnostic events worth a log line of their own.
///
/// Token values never appear here, only their
/// [`TokenSecret::fingerprint`](crate::auth::TokenSecret::fingerprint).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SecurityEvent {
	/// A consumed refresh token was presented again.
	ReplayDetected {
		/// Owner of the chain.
		user: String,
		/// Fingerprint of the replayed token.
		token: String,
		/// Descendants revoked as a consequence.
		revoked: usize,
	},
	/// A refresh token was refused; replays also raise [`SecurityEvent::ReplayDetected`].
	RefreshRefused {
		/// Fingerprint of the presented token.
		token: String,
		/// Internal reason label; never sent to the caller.
		reason: &'static str,
	},
	/// Every active token of a user was revoked.
	RevokedAll {
		/// Affected user.
		user: String,
		/// Number of revoked records.
		revoked: usize,
	},
	/// The client's refresh endpoint declined the refresh token.
	ClientRefreshRejected,
	/// The client could not reach the refresh endpoint.
	ClientRefreshUnreachable {
		/// Transport diagnosis.
		reason: String,
	},
	/// The client's refresh call exceeded its deadline.
	ClientRefreshTimedOut,
}
impl SecurityEvent {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(&self) -> &'static str {
		match self {
			SecurityEvent::ReplayDetected { .. } => "replay_detected",
			SecurityEvent::RefreshRefused { .. } => "refresh_refused",
			SecurityEvent::RevokedAll { .. } => "revoked_all",
			SecurityEvent::ClientRefreshRejected => "client_refresh_rejected",
			SecurityEvent::ClientRefreshUnreachable { .. } => "client_refresh_unreachable",
			SecurityEvent::ClientRefreshTimedOut => "client_refresh_timed_out",
		}
	}
}

/// Runs `fut` inside a [`FlowSpan`] and records attempt + outcome counters around it.
pub async fn observe_flow<T, Fut>(kind: FlowKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);

	record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => record_flow_outcome(kind, FlowOutcome::Success),
		Err(_) => record_flow_outcome(kind, FlowOutcome::Failure),
	}

	result
}

/// Emits a [`SecurityEvent`] to every enabled sink.
pub fn emit(event: SecurityEvent) {
	record_security_event(&event);
	log_security_event(&event);
}
