//! Claims embedded in signed access tokens.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{
	_prelude::*,
	auth::{RoleSet, UserId},
	error::TokenError,
};

/// Registered and private claims carried by every access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
	/// Subject the token speaks for.
	pub sub: UserId,
	/// Roles granted to the subject at issuance time.
	#[serde(default)]
	pub roles: RoleSet,
	/// Issuer that minted the token.
	pub iss: String,
	/// Audience the token is intended for.
	pub aud: String,
	/// Issued-at, seconds since the Unix epoch.
	pub iat: i64,
	/// Expiry, seconds since the Unix epoch.
	pub exp: i64,
	/// Unique token identifier.
	pub jti: String,
}
impl AccessClaims {
	/// Reads the claims of a JWT without checking its signature.
	///
	/// Only meant for clients deriving display state from a token they were handed by the
	/// server; anything making an authorization decision must go through
	/// [`TokenIssuer::verify_access_token`](crate::issuer::TokenIssuer::verify_access_token).
	pub fn decode_unverified(token: &str) -> Result<Self, TokenError> {
		let mut segments = token.split('.');
		let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
			(Some(_), Some(payload), Some(_), None) => payload,
			_ => return Err(TokenError::Malformed),
		};
		let bytes = URL_SAFE_NO_PAD.decode(payload).map_err(|_| TokenError::Malformed)?;

		serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
	}

	/// Expiry as an absolute UTC instant.
	pub fn expires_at(&self) -> Result<OffsetDateTime, TokenError> {
		OffsetDateTime::from_unix_timestamp(self.exp).map_err(|_| TokenError::Malformed)
	}
}
