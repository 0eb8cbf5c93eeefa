//! In-process record table shared by the built-in stores.
//!
//! All methods run under the caller's write lock, which is what makes each of them atomic with
//! respect to the others.

// self
use crate::{
	_prelude::*,
	auth::{RefreshTokenRecord, RefreshTokenStatus, UserId},
	store::{Revocation, RotateOutcome, StoreError},
};

/// Records keyed by token value; the map key doubles as the unique index.
#[derive(Clone, Debug, Default)]
pub(crate) struct Ledger {
	records: HashMap<String, RefreshTokenRecord>,
}
impl Ledger {
	pub(crate) fn from_records(
		records: impl IntoIterator<Item = RefreshTokenRecord>,
	) -> Result<Self, StoreError> {
		let mut ledger = Self::default();

		for record in records {
			ledger.insert(record)?;
		}

		Ok(ledger)
	}

	pub(crate) fn records(&self) -> impl Iterator<Item = &RefreshTokenRecord> {
		self.records.values()
	}

	pub(crate) fn insert(&mut self, record: RefreshTokenRecord) -> Result<(), StoreError> {
		let key = record.token.expose().to_owned();

		if self.records.contains_key(&key) {
			return Err(StoreError::DuplicateToken);
		}

		self.records.insert(key, record);

		Ok(())
	}

	pub(crate) fn fetch(&self, token: &str) -> Option<RefreshTokenRecord> {
		self.records.get(token).cloned()
	}

	pub(crate) fn fetch_for_user(&self, user: &UserId) -> Vec<RefreshTokenRecord> {
		let mut owned = self
			.records
			.values()
			.filter(|record| &record.user_id == user)
			.cloned()
			.collect::<Vec<_>>();

		owned.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));

		owned
	}

	pub(crate) fn rotate(
		&mut self,
		expected: &str,
		successor: RefreshTokenRecord,
		rotation: Revocation,
	) -> Result<RotateOutcome, StoreError> {
		if self.records.contains_key(successor.token.expose()) {
			return Err(StoreError::DuplicateToken);
		}

		let Some(current) = self.records.get_mut(expected) else {
			return Ok(RotateOutcome::Missing);
		};
		let outcome = match current.status_at(rotation.at) {
			RefreshTokenStatus::Active => {
				current.revoke(rotation.at, rotation.by_ip);
				current.replaced_by = Some(successor.token.clone());

				RotateOutcome::Rotated
			},
			RefreshTokenStatus::Rotated => RotateOutcome::AlreadyRotated,
			RefreshTokenStatus::Revoked => RotateOutcome::Revoked,
			RefreshTokenStatus::Expired => RotateOutcome::Expired,
		};

		if matches!(outcome, RotateOutcome::Rotated) {
			self.records.insert(successor.token.expose().to_owned(), successor);
		}

		Ok(outcome)
	}

	pub(crate) fn revoke(
		&mut self,
		token: &str,
		revocation: Revocation,
	) -> Option<RefreshTokenRecord> {
		let record = self.records.get_mut(token)?;

		record.revoke(revocation.at, revocation.by_ip);

		Some(record.clone())
	}

	pub(crate) fn revoke_descendants(&mut self, token: &str, revocation: Revocation) -> usize {
		let mut visited = BTreeSet::new();
		let mut next = self.records.get(token).and_then(|record| record.replaced_by.clone());
		let mut revoked = 0;

		visited.insert(token.to_owned());

		while let Some(successor) = next {
			if !visited.insert(successor.expose().to_owned()) {
				break;
			}

			let Some(record) = self.records.get_mut(successor.expose()) else {
				break;
			};

			if record.revoked_at.is_none() {
				record.revoke(revocation.at, revocation.by_ip);

				revoked += 1;
			}

			next = record.replaced_by.clone();
		}

		revoked
	}

	pub(crate) fn revoke_all(&mut self, user: &UserId, revocation: Revocation) -> usize {
		let mut revoked = 0;

		for record in self.records.values_mut() {
			if &record.user_id == user && record.is_active_at(revocation.at) {
				record.revoke(revocation.at, revocation.by_ip);

				revoked += 1;
			}
		}

		revoked
	}

	pub(crate) fn purge_expired(&mut self, cutoff: OffsetDateTime) -> usize {
		let before = self.records.len();

		self.records.retain(|_, record| record.expires_at >= cutoff);

		before - self.records.len()
	}
}
