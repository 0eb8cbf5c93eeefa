//! Refresh-token records, their rotation links, and lifecycle helpers.

// crates.io
use uuid::Uuid;
// self
use crate::{
	_prelude::*,
	auth::{UserId, token::secret::TokenSecret},
};

/// Current lifecycle status for a refresh-token record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshTokenStatus {
	/// Not revoked and not expired; the only state that may be rotated.
	Active,
	/// Consumed by a rotation; a successor exists.
	Rotated,
	/// Revoked without a successor (logout, revoke-all, or replay containment).
	Revoked,
	/// Lifetime elapsed before anyone revoked or rotated it.
	Expired,
}

/// Durable record describing one issued refresh token.
///
/// Records are never deleted during normal operation; rotation only stamps the revocation
/// fields and the `replaced_by` link, which together form a one-way chain.
#[derive(Clone, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
	/// Surrogate identifier.
	pub id: Uuid,
	/// Opaque token value; unique across the store.
	pub token: TokenSecret,
	/// Owner of the token.
	pub user_id: UserId,
	/// Issued-at instant.
	pub issued_at: OffsetDateTime,
	/// Expiry instant.
	pub expires_at: OffsetDateTime,
	/// Revocation instant, if any.
	pub revoked_at: Option<OffsetDateTime>,
	/// Address of the client that revoked or rotated the token.
	pub revoked_by_ip: Option<IpAddr>,
	/// Successor token value; set at most once.
	pub replaced_by: Option<TokenSecret>,
	/// Address of the client the token was issued to.
	pub created_by_ip: Option<IpAddr>,
}
impl RefreshTokenRecord {
	/// Creates an unrevoked record for a freshly minted token value.
	pub fn new(
		token: TokenSecret,
		user_id: UserId,
		issued_at: OffsetDateTime,
		expires_at: OffsetDateTime,
		created_by_ip: Option<IpAddr>,
	) -> Self {
		Self {
			id: Uuid::new_v4(),
			token,
			user_id,
			issued_at,
			expires_at,
			revoked_at: None,
			revoked_by_ip: None,
			replaced_by: None,
			created_by_ip,
		}
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> RefreshTokenStatus {
		match (self.revoked_at, &self.replaced_by) {
			(Some(_), Some(_)) => RefreshTokenStatus::Rotated,
			(Some(_), None) => RefreshTokenStatus::Revoked,
			(None, _) if instant >= self.expires_at => RefreshTokenStatus::Expired,
			(None, _) => RefreshTokenStatus::Active,
		}
	}

	/// Convenience helper that checks the status using the current UTC instant.
	pub fn status(&self) -> RefreshTokenStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the record is unrevoked and unexpired at `instant`.
	pub fn is_active_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), RefreshTokenStatus::Active)
	}

	/// Returns `true` if the record is currently active.
	pub fn is_active(&self) -> bool {
		self.is_active_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the record has been revoked, with or without a successor.
	pub fn is_revoked(&self) -> bool {
		self.revoked_at.is_some()
	}

	/// Marks the record as revoked without a successor. Earlier revocations win.
	pub fn revoke(&mut self, instant: OffsetDateTime, by_ip: Option<IpAddr>) {
		if self.revoked_at.is_none() {
			self.revoked_at = Some(instant);
			self.revoked_by_ip = by_ip;
		}
	}
}
impl Debug for RefreshTokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshTokenRecord")
			.field("id", &self.id)
			.field("token", &self.token.fingerprint())
			.field("user_id", &self.user_id)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.field("revoked_at", &self.revoked_at)
			.field("revoked_by_ip", &self.revoked_by_ip)
			.field("replaced_by", &self.replaced_by.as_ref().map(TokenSecret::fingerprint))
			.field("created_by_ip", &self.created_by_ip)
			.finish()
	}
}
