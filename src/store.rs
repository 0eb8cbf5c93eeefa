//! Storage contracts and built-in store implementations for refresh-token records.
//!
//! Every mutation that the rotation chain depends on is a single call on
//! [`RefreshTokenStore`], so backends can map each one onto one transaction: `rotate` revokes
//! the predecessor, links it to its successor, and inserts the successor atomically, guarded by
//! a compare-and-swap on the predecessor still being unrevoked.

pub mod file;
pub mod memory;

mod ledger;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{RefreshTokenRecord, UserId},
};

/// Boxed future returned by every [`RefreshTokenStore`] operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by refresh-token stores.
pub trait RefreshTokenStore
where
	Self: Send + Sync,
{
	/// Inserts a new record; fails with [`StoreError::DuplicateToken`] if the value exists.
	fn insert(&self, record: RefreshTokenRecord) -> StoreFuture<'_, ()>;

	/// Fetches the record with the provided token value, if present.
	fn fetch<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<RefreshTokenRecord>>;

	/// Fetches every record issued to the user, newest first.
	fn fetch_for_user<'a>(&'a self, user: &'a UserId)
	-> StoreFuture<'a, Vec<RefreshTokenRecord>>;

	/// Atomically consumes `expected` and inserts `successor` in its place.
	///
	/// Succeeds only if `expected` exists, is unrevoked, and has not expired at `rotation.at`.
	fn rotate<'a>(
		&'a self,
		expected: &'a str,
		successor: RefreshTokenRecord,
		rotation: Revocation,
	) -> StoreFuture<'a, RotateOutcome>;

	/// Revokes one record without a successor; returns the record if it exists.
	fn revoke<'a>(
		&'a self,
		token: &'a str,
		revocation: Revocation,
	) -> StoreFuture<'a, Option<RefreshTokenRecord>>;

	/// Revokes every unrevoked descendant reachable through `replaced_by` from `token`.
	///
	/// The starting record itself is left untouched. Returns the number of records revoked.
	fn revoke_descendants<'a>(
		&'a self,
		token: &'a str,
		revocation: Revocation,
	) -> StoreFuture<'a, usize>;

	/// Revokes every active record owned by `user`. Returns the number of records revoked.
	fn revoke_all<'a>(&'a self, user: &'a UserId, revocation: Revocation)
	-> StoreFuture<'a, usize>;

	/// Deletes records whose expiry lies before `cutoff`. Returns the number removed.
	fn purge_expired(&self, cutoff: OffsetDateTime) -> StoreFuture<'_, usize>;
}

/// Who revoked a record and when.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Revocation {
	/// Revocation instant.
	pub at: OffsetDateTime,
	/// Client address that triggered the revocation.
	pub by_ip: Option<IpAddr>,
}
impl Revocation {
	/// Creates a revocation stamp.
	pub fn new(at: OffsetDateTime, by_ip: Option<IpAddr>) -> Self {
		Self { at, by_ip }
	}
}

/// Result of a [`RefreshTokenStore::rotate`] attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotateOutcome {
	/// The predecessor was consumed and the successor inserted.
	Rotated,
	/// The predecessor was already consumed by a rotation: a replay.
	AlreadyRotated,
	/// The predecessor was revoked without a successor.
	Revoked,
	/// The predecessor outlived its expiry.
	Expired,
	/// No record carries the expected token value.
	Missing,
}

/// Error type produced by [`RefreshTokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// The unique index on token values rejected an insert.
	#[error("A refresh token with the same value already exists.")]
	DuplicateToken,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn rotate_outcome_can_be_serialized() {
		let payload = serde_json::to_string(&RotateOutcome::AlreadyRotated)
			.expect("RotateOutcome should serialize to JSON.");

		assert_eq!(payload, "\"AlreadyRotated\"");
	}
}
