//! Contract for the call that exchanges a refresh token for a new access credential.

// self
use crate::{_prelude::*, auth::AccessCredential};

/// Boxed future returned by [`CredentialRefresher::refresh`].
pub type RefreshFuture<'a> =
	Pin<Box<dyn Future<Output = Result<AccessCredential, RefreshFailure>> + 'a + Send>>;

/// Performs one refresh call against the refresh endpoint.
///
/// Implementations own the refresh token (or rely on a cookie jar); the coordinator only sees the
/// resulting access credential. They never retry on their own.
pub trait CredentialRefresher
where
	Self: 'static + Send + Sync,
{
	/// Requests a new access credential.
	fn refresh(&self) -> RefreshFuture<'_>;
}

/// Outcome of a failed refresh, shared by every caller coalesced onto the same call.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshFailure {
	/// The endpoint declined the refresh token.
	#[error("Refresh endpoint rejected the refresh token.")]
	Rejected,
	/// The endpoint could not be reached or answered with an unexpected status.
	#[error("Refresh endpoint is unreachable: {reason}.")]
	Unreachable {
		/// Human-readable transport diagnosis.
		reason: String,
	},
	/// The call did not finish within the configured deadline.
	#[error("Refresh call timed out.")]
	TimedOut,
	/// The endpoint answered with a body that could not be parsed.
	#[error("Refresh response is malformed: {reason}.")]
	Malformed {
		/// Parser diagnosis.
		reason: String,
	},
}
impl From<RefreshFailure> for Error {
	fn from(failure: RefreshFailure) -> Self {
		match failure {
			RefreshFailure::Rejected => Error::RefreshRejected,
			RefreshFailure::Unreachable { reason } | RefreshFailure::Malformed { reason } =>
				Error::RefreshUnreachable { reason },
			RefreshFailure::TimedOut =>
				Error::RefreshUnreachable { reason: "refresh call timed out".into() },
		}
	}
}
