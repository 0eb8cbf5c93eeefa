//! JSON bodies exchanged with the refresh endpoint.
//!
//! Field names are camelCase on the wire. When the refresh token travels in an HttpOnly cookie
//! both `refreshToken` fields are simply omitted. Role names are opaque strings here: a client
//! must accept whatever naming scheme the issuing server uses.

// self
use crate::{_prelude::*, auth::IssuedTokens};

/// Body POSTed to the refresh endpoint.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
	/// Refresh token delivered in the body; `None` under cookie delivery.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
}
impl Debug for RefreshRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshRequest")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Body returned by sign-in and refresh endpoints.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
	/// Signed access token.
	pub access_token: String,
	/// Absolute expiry of the access token.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
	/// Rotated refresh token under body delivery.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
	/// Roles embedded into the access token, as the server names them.
	#[serde(default)]
	pub roles: Vec<String>,
}
impl RefreshResponse {
	/// Builds a response for cookie delivery, leaving the refresh token out of the body.
	pub fn without_refresh_token(issued: &IssuedTokens) -> Self {
		Self { refresh_token: None, ..Self::from(issued) }
	}
}
impl From<&IssuedTokens> for RefreshResponse {
	fn from(issued: &IssuedTokens) -> Self {
		Self {
			access_token: issued.access.token.expose().to_owned(),
			expires_at: issued.access.expires_at,
			refresh_token: Some(issued.refresh_token.expose().to_owned()),
			roles: issued.roles.iter().map(str::to_owned).collect(),
		}
	}
}
impl Debug for RefreshResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshResponse")
			.field("access_token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("roles", &self.roles)
			.finish()
	}
}
