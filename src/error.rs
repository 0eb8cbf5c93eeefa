//! Crate-level error types shared across issuers, stores, rotation, and the client coordinator.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS) on an outbound request.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token signing, verification, or decoding failure.
	#[error(transparent)]
	Token(#[from] TokenError),

	/// The presented credential was rejected.
	///
	/// Invalid, expired, revoked, and replayed refresh tokens all collapse into this variant so
	/// callers cannot tell which condition applied.
	#[error("Credential was rejected as unauthorized.")]
	Unauthorized,
	/// No access credential is held; the caller is anonymous.
	#[error("No access credential is available.")]
	CredentialAbsent,
	/// The held access credential is expired or inside the refresh margin.
	#[error("Access credential is expired or about to expire.")]
	CredentialExpired,
	/// The refresh endpoint declined the refresh token; the session is over.
	#[error("Refresh token was rejected; re-authentication is required.")]
	RefreshRejected,
	/// The refresh endpoint could not be reached or answered with garbage.
	#[error("Refresh endpoint is unreachable: {reason}.")]
	RefreshUnreachable {
		/// Human-readable transport diagnosis.
		reason: String,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A header value contains bytes HTTP forbids.
	#[error("Header value for `{header}` is invalid.")]
	InvalidHeader {
		/// Header name being written.
		header: &'static str,
		/// Underlying validation failure.
		#[source]
		source: ::http::header::InvalidHeaderValue,
	},
	/// Issuer settings failed validation.
	#[error("Issuer configuration is invalid.")]
	Issuer(#[from] crate::issuer::IssuerConfigError),
}

/// Transport-level failures of a protected request.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}

/// Access-token encoding and decoding failures.
#[derive(Debug, ThisError)]
pub enum TokenError {
	/// Signing the claims failed.
	#[error("Access token could not be signed.")]
	Signing(#[source] jsonwebtoken::errors::Error),
	/// Signature, issuer, audience, or expiry validation failed.
	#[error("Access token failed verification.")]
	Verification(#[source] jsonwebtoken::errors::Error),
	/// The token is not a three-segment JWT with a JSON claims payload.
	#[error("Access token payload is malformed.")]
	Malformed,
}
