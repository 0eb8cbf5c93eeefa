//! Thread-safe in-memory [`RefreshTokenStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{RefreshTokenRecord, UserId},
	store::{RefreshTokenStore, Revocation, RotateOutcome, StoreFuture, ledger::Ledger},
};

type SharedLedger = Arc<RwLock<Ledger>>;

/// Thread-safe storage backend that keeps records in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(SharedLedger);
impl MemoryStore {
	/// Number of records currently held, including revoked ones.
	pub fn len(&self) -> usize {
		self.0.read().records().count()
	}

	/// Returns true if the store holds no records.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
impl RefreshTokenStore for MemoryStore {
	fn insert(&self, record: RefreshTokenRecord) -> StoreFuture<'_, ()> {
		let ledger = self.0.clone();

		Box::pin(async move { ledger.write().insert(record) })
	}

	fn fetch<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<RefreshTokenRecord>> {
		let ledger = self.0.clone();

		Box::pin(async move { Ok(ledger.read().fetch(token)) })
	}

	fn fetch_for_user<'a>(
		&'a self,
		user: &'a UserId,
	) -> StoreFuture<'a, Vec<RefreshTokenRecord>> {
		let ledger = self.0.clone();

		Box::pin(async move { Ok(ledger.read().fetch_for_user(user)) })
	}

	fn rotate<'a>(
		&'a self,
		expected: &'a str,
		successor: RefreshTokenRecord,
		rotation: Revocation,
	) -> StoreFuture<'a, RotateOutcome> {
		let ledger = self.0.clone();

		Box::pin(async move { ledger.write().rotate(expected, successor, rotation) })
	}

	fn revoke<'a>(
		&'a self,
		token: &'a str,
		revocation: Revocation,
	) -> StoreFuture<'a, Option<RefreshTokenRecord>> {
		let ledger = self.0.clone();

		Box::pin(async move { Ok(ledger.write().revoke(token, revocation)) })
	}

	fn revoke_descendants<'a>(
		&'a self,
		token: &'a str,
		revocation: Revocation,
	) -> StoreFuture<'a, usize> {
		let ledger = self.0.clone();

		Box::pin(async move { Ok(ledger.write().revoke_descendants(token, revocation)) })
	}

	fn revoke_all<'a>(
		&'a self,
		user: &'a UserId,
		revocation: Revocation,
	) -> StoreFuture<'a, usize> {
		let ledger = self.0.clone();

		Box::pin(async move { Ok(ledger.write().revoke_all(user, revocation)) })
	}

	fn purge_expired(&self, cutoff: OffsetDateTime) -> StoreFuture<'_, usize> {
		let ledger = self.0.clone();

		Box::pin(async move { Ok(ledger.write().purge_expired(cutoff)) })
	}
}
