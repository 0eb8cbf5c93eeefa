//! Access credentials and the token pairs handed out at sign-in and rotation.

// self
use crate::{
	_prelude::*,
	auth::{AccessClaims, RoleSet, TokenSecret},
	error::TokenError,
};

/// Short-lived signed access token plus its absolute expiry.
///
/// Treated as immutable once issued; holders replace it instead of mutating it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCredential {
	/// Signed token sent as the bearer credential.
	pub token: TokenSecret,
	/// Absolute UTC expiry instant.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}
impl AccessCredential {
	/// Wraps a token value and its expiry.
	pub fn new(token: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { token: TokenSecret::new(token), expires_at }
	}

	/// Returns `true` once `instant` is inside the `margin` before expiry.
	pub fn is_expiring_within_at(&self, margin: Duration, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at - margin
	}

	/// Checks [`is_expiring_within_at`](Self::is_expiring_within_at) against the current clock.
	pub fn is_expiring_within(&self, margin: Duration) -> bool {
		self.is_expiring_within_at(margin, OffsetDateTime::now_utc())
	}

	/// Reads the embedded claims without signature verification.
	pub fn claims(&self) -> Result<AccessClaims, TokenError> {
		AccessClaims::decode_unverified(self.token.expose())
	}
}
impl Debug for AccessCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessCredential")
			.field("token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Token pair minted at sign-in or by a successful rotation.
#[derive(Clone, Debug)]
pub struct IssuedTokens {
	/// Fresh access credential.
	pub access: AccessCredential,
	/// Opaque refresh token; only the server can resolve it.
	pub refresh_token: TokenSecret,
	/// Absolute expiry of the refresh token.
	pub refresh_expires_at: OffsetDateTime,
	/// Roles embedded into the access credential.
	pub roles: RoleSet,
}
