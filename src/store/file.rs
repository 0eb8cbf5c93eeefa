//! Simple file-backed [`RefreshTokenStore`] for single-node deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{RefreshTokenRecord, UserId},
	store::{
		RefreshTokenStore, Revocation, RotateOutcome, StoreError, StoreFuture, ledger::Ledger,
	},
};

/// Persists refresh-token records to a JSON file after each mutation.
///
/// The write lock is held while the snapshot is written, so a mutation is visible to readers
/// only once it is durable.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Ledger>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let ledger = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(ledger)) })
	}

	fn load_snapshot(path: &Path) -> Result<Ledger, StoreError> {
		if !path.exists() {
			return Ok(Ledger::default());
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(Ledger::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
		let records: Vec<RefreshTokenRecord> =
			serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
				StoreError::Serialization {
					message: format!("Failed to parse {} at {}: {e}", path.display(), e.path()),
				}
			})?;

		Ledger::from_records(records)
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, ledger: &Ledger) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let mut snapshot = ledger.records().collect::<Vec<_>>();

		snapshot.sort_by_key(|record| (record.issued_at, record.id));

		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	/// Applies `mutate` to a copy of the ledger and swaps it in only once the copy is on disk.
	fn mutate<T>(
		&self,
		mutate: impl FnOnce(&mut Ledger) -> Result<T, StoreError>,
	) -> Result<T, StoreError> {
		let mut guard = self.inner.write();
		let mut staged = guard.clone();
		let value = mutate(&mut staged)?;

		self.persist_locked(&staged)?;
		*guard = staged;

		Ok(value)
	}
}
impl RefreshTokenStore for FileStore {
	fn insert(&self, record: RefreshTokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.mutate(|ledger| ledger.insert(record)) })
	}

	fn fetch<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<RefreshTokenRecord>> {
		Box::pin(async move { Ok(self.inner.read().fetch(token)) })
	}

	fn fetch_for_user<'a>(
		&'a self,
		user: &'a UserId,
	) -> StoreFuture<'a, Vec<RefreshTokenRecord>> {
		Box::pin(async move { Ok(self.inner.read().fetch_for_user(user)) })
	}

	fn rotate<'a>(
		&'a self,
		expected: &'a str,
		successor: RefreshTokenRecord,
		rotation: Revocation,
	) -> StoreFuture<'a, RotateOutcome> {
		Box::pin(async move { self.mutate(|ledger| ledger.rotate(expected, successor, rotation)) })
	}

	fn revoke<'a>(
		&'a self,
		token: &'a str,
		revocation: Revocation,
	) -> StoreFuture<'a, Option<RefreshTokenRecord>> {
		Box::pin(async move { self.mutate(|ledger| Ok(ledger.revoke(token, revocation))) })
	}

	fn revoke_descendants<'a>(
		&'a self,
		token: &'a str,
		revocation: Revocation,
	) -> StoreFuture<'a, usize> {
		Box::pin(
			async move { self.mutate(|ledger| Ok(ledger.revoke_descendants(token, revocation))) },
		)
	}

	fn revoke_all<'a>(
		&'a self,
		user: &'a UserId,
		revocation: Revocation,
	) -> StoreFuture<'a, usize> {
		Box::pin(async move { self.mutate(|ledger| Ok(ledger.revoke_all(user, revocation))) })
	}

	fn purge_expired(&self, cutoff: OffsetDateTime) -> StoreFuture<'_, usize> {
		Box::pin(async move { self.mutate(|ledger| Ok(ledger.purge_expired(cutoff))) })
	}
}
