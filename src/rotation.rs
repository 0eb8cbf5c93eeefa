//! Server-side refresh-token rotation with replay containment.
//!
//! [`RotationPolicy`] is the only component that decides whether a presented refresh token is
//! honored. Each successful refresh consumes the presented token and links it to a freshly
//! minted successor in a single [`RefreshTokenStore::rotate`] call. Presenting a consumed token
//! again, or losing a concurrent rotation race on it, is treated as theft: every descendant
//! reachable from that token is revoked so the whole chain must re-authenticate.
//!
//! Callers only ever see [`Error::Unauthorized`] for a refused token; the concrete reason is
//! logged and counted but never returned.

mod metrics;

pub use metrics::RotationMetrics;

// self
use crate::{
	_prelude::*,
	auth::{IssuedTokens, RefreshTokenRecord, RefreshTokenStatus, RoleSet, TokenSecret, UserId},
	directory::SubjectDirectory,
	issuer::TokenIssuer,
	obs::{self, FlowKind, SecurityEvent},
	store::{RefreshTokenStore, Revocation, RotateOutcome},
};

/// Why a refresh token was refused. Never leaves this module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RejectReason {
	Unknown,
	Expired,
	Revoked,
	Replayed,
	SubjectMissing,
}
impl RejectReason {
	const fn as_str(self) -> &'static str {
		match self {
			RejectReason::Unknown => "unknown",
			RejectReason::Expired => "expired",
			RejectReason::Revoked => "revoked",
			RejectReason::Replayed => "replayed",
			RejectReason::SubjectMissing => "subject_missing",
		}
	}
}

/// Validates, rotates, and revokes refresh tokens on behalf of the token endpoint.
#[derive(Clone)]
pub struct RotationPolicy {
	store: Arc<dyn RefreshTokenStore>,
	directory: Arc<dyn SubjectDirectory>,
	issuer: TokenIssuer,
	metrics: Arc<RotationMetrics>,
}
impl RotationPolicy {
	/// Creates a policy over the provided store, user directory, and issuer.
	pub fn new(
		store: Arc<dyn RefreshTokenStore>,
		directory: Arc<dyn SubjectDirectory>,
		issuer: TokenIssuer,
	) -> Self {
		Self { store, directory, issuer, metrics: Default::default() }
	}

	/// Issuer used to mint (and verify) access credentials.
	pub fn issuer(&self) -> &TokenIssuer {
		&self.issuer
	}

	/// Shared counters for this policy.
	pub fn metrics(&self) -> Arc<RotationMetrics> {
		self.metrics.clone()
	}

	/// Starts a new rotation chain for an authenticated user (sign-in or registration).
	pub async fn issue(&self, user: &UserId, client_ip: Option<IpAddr>) -> Result<IssuedTokens> {
		self.issue_at(user, client_ip, OffsetDateTime::now_utc()).await
	}

	/// [`issue`](Self::issue) with an explicit clock reading.
	pub async fn issue_at(
		&self,
		user: &UserId,
		client_ip: Option<IpAddr>,
		now: OffsetDateTime,
	) -> Result<IssuedTokens> {
		obs::observe_flow(FlowKind::Issue, "issue", async move {
			let Some(roles) = self.directory.roles(user).await? else {
				// Nothing was presented, so there is no fingerprint to log.
				self.metrics.record_rejection();

				return Err(Error::Unauthorized);
			};
			let (issued, record) = self.mint(user, roles, now, client_ip)?;

			self.store.insert(record).await?;
			self.metrics.record_issued();

			Ok(issued)
		})
		.await
	}

	/// Returns the stored record if `token` is active right now.
	///
	/// Presenting a rotated token revokes its descendants before the rejection is returned.
	pub async fn validate(&self, token: &str) -> Result<RefreshTokenRecord> {
		self.validate_at(token, OffsetDateTime::now_utc()).await
	}

	/// [`validate`](Self::validate) with an explicit clock reading.
	pub async fn validate_at(
		&self,
		token: &str,
		now: OffsetDateTime,
	) -> Result<RefreshTokenRecord> {
		obs::observe_flow(FlowKind::Rotate, "validate", self.check(token, now, None)).await
	}

	/// Exchanges an active refresh token for a new access credential and a successor token.
	pub async fn refresh(&self, token: &str, client_ip: Option<IpAddr>) -> Result<IssuedTokens> {
		self.refresh_at(token, client_ip, OffsetDateTime::now_utc()).await
	}

	/// [`refresh`](Self::refresh) with an explicit clock reading.
	pub async fn refresh_at(
		&self,
		token: &str,
		client_ip: Option<IpAddr>,
		now: OffsetDateTime,
	) -> Result<IssuedTokens> {
		obs::observe_flow(FlowKind::Rotate, "refresh", async move {
			let current = self.check(token, now, client_ip).await?;
			let Some(roles) = self.directory.roles(&current.user_id).await? else {
				return Err(self.reject(token, RejectReason::SubjectMissing));
			};
			let (issued, successor) = self.mint(&current.user_id, roles, now, client_ip)?;

			match self.store.rotate(token, successor, Revocation::new(now, client_ip)).await? {
				RotateOutcome::Rotated => {
					self.metrics.record_rotation();

					Ok(issued)
				},
				// Lost the race against a concurrent rotation of the same token.
				RotateOutcome::AlreadyRotated =>
					Err(self.contain_replay(&current, now, client_ip).await),
				RotateOutcome::Revoked => Err(self.reject(token, RejectReason::Revoked)),
				RotateOutcome::Expired => Err(self.reject(token, RejectReason::Expired)),
				RotateOutcome::Missing => Err(self.reject(token, RejectReason::Unknown)),
			}
		})
		.await
	}

	/// Revokes one refresh token without a successor (single-session logout).
	///
	/// Returns `true` if an active token was revoked by this call; unknown or already inactive
	/// tokens yield `false`.
	pub async fn revoke(&self, token: &str, client_ip: Option<IpAddr>) -> Result<bool> {
		self.revoke_at(token, client_ip, OffsetDateTime::now_utc()).await
	}

	/// [`revoke`](Self::revoke) with an explicit clock reading.
	pub async fn revoke_at(
		&self,
		token: &str,
		client_ip: Option<IpAddr>,
		now: OffsetDateTime,
	) -> Result<bool> {
		obs::observe_flow(FlowKind::Revoke, "revoke", async move {
			let Some(record) = self.store.fetch(token).await? else {
				return Ok(false);
			};

			if !record.is_active_at(now) {
				return Ok(false);
			}

			let revocation = Revocation::new(now, client_ip);
			let revoked = self.store.revoke(token, revocation).await?.is_some();

			if revoked {
				self.metrics.record_revocations(1);
			}

			Ok(revoked)
		})
		.await
	}

	/// Revokes every active refresh token of `user` (logout everywhere, administrative action).
	pub async fn revoke_all(&self, user: &UserId, client_ip: Option<IpAddr>) -> Result<usize> {
		self.revoke_all_at(user, client_ip, OffsetDateTime::now_utc()).await
	}

	/// [`revoke_all`](Self::revoke_all) with an explicit clock reading.
	pub async fn revoke_all_at(
		&self,
		user: &UserId,
		client_ip: Option<IpAddr>,
		now: OffsetDateTime,
	) -> Result<usize> {
		obs::observe_flow(FlowKind::Revoke, "revoke_all", async move {
			let revoked = self.store.revoke_all(user, Revocation::new(now, client_ip)).await?;

			self.metrics.record_revocations(revoked);
			obs::emit(SecurityEvent::RevokedAll { user: user.to_string(), revoked });

			Ok(revoked)
		})
		.await
	}

	/// Deletes records that expired more than `retention` ago. Negative retention is treated as
	/// zero.
	pub async fn purge_expired(&self, retention: Duration) -> Result<usize> {
		self.purge_expired_at(retention, OffsetDateTime::now_utc()).await
	}

	/// [`purge_expired`](Self::purge_expired) with an explicit clock reading.
	pub async fn purge_expired_at(
		&self,
		retention: Duration,
		now: OffsetDateTime,
	) -> Result<usize> {
		let retention = if retention.is_negative() { Duration::ZERO } else { retention };

		obs::observe_flow(FlowKind::Revoke, "purge_expired", async move {
			Ok(self.store.purge_expired(now - retention).await?)
		})
		.await
	}

	async fn check(
		&self,
		token: &str,
		now: OffsetDateTime,
		client_ip: Option<IpAddr>,
	) -> Result<RefreshTokenRecord> {
		let Some(record) = self.store.fetch(token).await? else {
			return Err(self.reject(token, RejectReason::Unknown));
		};

		match record.status_at(now) {
			RefreshTokenStatus::Active => Ok(record),
			RefreshTokenStatus::Rotated => Err(self.contain_replay(&record, now, client_ip).await),
			RefreshTokenStatus::Revoked => Err(self.reject(token, RejectReason::Revoked)),
			RefreshTokenStatus::Expired => Err(self.reject(token, RejectReason::Expired)),
		}
	}

	fn mint(
		&self,
		user: &UserId,
		roles: RoleSet,
		now: OffsetDateTime,
		client_ip: Option<IpAddr>,
	) -> Result<(IssuedTokens, RefreshTokenRecord)> {
		let access = self.issuer.issue_access_token_at(user, &roles, now)?;
		let (refresh_token, refresh_expires_at) = self.issuer.issue_refresh_token_at(now);
		let record = RefreshTokenRecord::new(
			refresh_token.clone(),
			user.clone(),
			now,
			refresh_expires_at,
			client_ip,
		);

		Ok((IssuedTokens { access, refresh_token, refresh_expires_at, roles }, record))
	}

	/// Revokes every descendant of a replayed token and returns the opaque rejection.
	async fn contain_replay(
		&self,
		record: &RefreshTokenRecord,
		now: OffsetDateTime,
		client_ip: Option<IpAddr>,
	) -> Error {
		self.metrics.record_replay();

		let revoked = match self
			.store
			.revoke_descendants(record.token.expose(), Revocation::new(now, client_ip))
			.await
		{
			Ok(revoked) => revoked,
			Err(e) => {
				self.metrics.record_rejection();

				return e.into();
			},
		};

		self.metrics.record_revocations(revoked);
		obs::emit(SecurityEvent::ReplayDetected {
			user: record.user_id.to_string(),
			token: record.token.fingerprint(),
			revoked,
		});

		self.reject(record.token.expose(), RejectReason::Replayed)
	}

	fn reject(&self, token: &str, reason: RejectReason) -> Error {
		self.metrics.record_rejection();
		obs::emit(SecurityEvent::RefreshRefused {
			token: TokenSecret::new(token).fingerprint(),
			reason: reason.as_str(),
		});

		Error::Unauthorized
	}
}
impl Debug for RotationPolicy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RotationPolicy")
			.field("issuer", &self.issuer)
			.field("metrics", &self.metrics)
			.finish_non_exhaustive()
	}
}
