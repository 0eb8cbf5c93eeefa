//! Client-side holder of the current access credential.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use parking_lot::ReentrantMutex;
// self
use crate::{
	_prelude::*,
	auth::{AccessCredential, RoleSet, UserId},
};

type Observer = Arc<dyn Fn(&AuthState) + Send + Sync>;

/// Authentication status derived from the held credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthState {
	/// No credential, or one whose claims cannot be decoded.
	Anonymous,
	/// A credential with readable claims is held.
	Authenticated {
		/// Subject of the access token.
		subject: UserId,
		/// Roles embedded in the access token.
		roles: RoleSet,
		/// Expiry of the access token.
		expires_at: OffsetDateTime,
	},
}
impl AuthState {
	/// Derives the state from a credential without verifying its signature.
	pub fn from_credential(credential: Option<&AccessCredential>) -> Self {
		let Some(credential) = credential else {
			return Self::Anonymous;
		};

		match credential.claims() {
			Ok(claims) => Self::Authenticated {
				subject: claims.sub,
				roles: claims.roles,
				expires_at: credential.expires_at,
			},
			Err(_) => Self::Anonymous,
		}
	}

	/// Returns true for [`AuthState::Authenticated`].
	pub fn is_authenticated(&self) -> bool {
		matches!(self, Self::Authenticated { .. })
	}
}

/// Handle returned by [`TokenState::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Debug, Default)]
struct Slot {
	credential: Option<AccessCredential>,
	generation: u64,
}

/// Single source of truth for the client's access credential.
///
/// Every `set`/`clear` bumps a generation counter and then notifies observers synchronously,
/// after the new value is readable and before the call returns. Concurrent updates are
/// delivered in generation order, so the last notification always describes the held state.
#[derive(Default)]
pub struct TokenState {
	slot: RwLock<Slot>,
	// Held across a write and its notifications; reentrant so observers may update the state.
	notify: ReentrantMutex<()>,
	observers: RwLock<Vec<(ObserverId, Observer)>>,
	next_observer: AtomicU64,
}
impl TokenState {
	/// Creates an empty (anonymous) state.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a state already holding `credential`.
	pub fn with_credential(credential: AccessCredential) -> Self {
		let state = Self::default();

		state.slot.write().credential = Some(credential);

		state
	}

	/// Replaces the current credential and notifies observers.
	pub fn set(&self, credential: AccessCredential) {
		self.replace(Some(credential));
	}

	/// Removes the current credential and notifies observers.
	pub fn clear(&self) {
		self.replace(None);
	}

	/// Returns a copy of the current credential.
	pub fn current(&self) -> Option<AccessCredential> {
		self.slot.read().credential.clone()
	}

	/// Number of `set`/`clear` calls so far.
	pub fn generation(&self) -> u64 {
		self.slot.read().generation
	}

	/// Returns true if a credential is held and `now >= expires_at - margin`.
	pub fn is_expiring_within(&self, margin: Duration) -> bool {
		self.is_expiring_within_at(margin, OffsetDateTime::now_utc())
	}

	/// [`is_expiring_within`](Self::is_expiring_within) with an explicit clock reading.
	pub fn is_expiring_within_at(&self, margin: Duration, now: OffsetDateTime) -> bool {
		self.slot
			.read()
			.credential
			.as_ref()
			.is_some_and(|credential| credential.is_expiring_within_at(margin, now))
	}

	/// Returns the credential if it can be attached outside the refresh margin.
	///
	/// Yields [`Error::CredentialAbsent`] for an anonymous state and [`Error::CredentialExpired`]
	/// once the margin is reached, so callers without a coordinator know to renew first.
	pub fn usable(&self, margin: Duration) -> Result<AccessCredential> {
		self.usable_at(margin, OffsetDateTime::now_utc())
	}

	/// [`usable`](Self::usable) with an explicit clock reading.
	pub fn usable_at(&self, margin: Duration, now: OffsetDateTime) -> Result<AccessCredential> {
		let slot = self.slot.read();
		let credential = slot.credential.as_ref().ok_or(Error::CredentialAbsent)?;

		if credential.is_expiring_within_at(margin, now) {
			return Err(Error::CredentialExpired);
		}

		Ok(credential.clone())
	}

	/// Derives the authentication state from the held credential.
	pub fn auth_state(&self) -> AuthState {
		AuthState::from_credential(self.slot.read().credential.as_ref())
	}

	/// Registers a callback invoked after every `set`/`clear`.
	pub fn subscribe<F>(&self, observer: F) -> ObserverId
	where
		F: 'static + Fn(&AuthState) + Send + Sync,
	{
		let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));

		self.observers.write().push((id, Arc::new(observer)));

		id
	}

	/// Removes a callback; returns false if it was not registered.
	pub fn unsubscribe(&self, id: ObserverId) -> bool {
		let mut observers = self.observers.write();
		let before = observers.len();

		observers.retain(|(registered, _)| *registered != id);

		observers.len() != before
	}

	pub(crate) fn snapshot(&self) -> (Option<AccessCredential>, u64) {
		let slot = self.slot.read();

		(slot.credential.clone(), slot.generation)
	}

	fn replace(&self, credential: Option<AccessCredential>) {
		let _notify = self.notify.lock();
		let auth_state = {
			let mut slot = self.slot.write();

			slot.credential = credential;
			slot.generation += 1;

			AuthState::from_credential(slot.credential.as_ref())
		};
		// Observers may read the state, so neither lock is held while they run.
		let observers =
			self.observers.read().iter().map(|(_, observer)| observer.clone()).collect::<Vec<_>>();

		for observer in observers {
			observer(&auth_state);
		}
	}
}
impl Debug for TokenState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let slot = self.slot.read();

		f.debug_struct("TokenState")
			.field("credential", &slot.credential)
			.field("generation", &slot.generation)
			.field("observers", &self.observers.read().len())
			.finish()
	}
}
