//! Subject lookups performed while minting access credentials.
//!
//! The rotation policy never trusts the roles it embedded last time; every issuance asks the
//! directory again so revoked roles and disabled accounts take effect at the next refresh.

// self
use crate::{
	_prelude::*,
	auth::{RoleSet, UserId},
};

/// Boxed future returned by [`SubjectDirectory::roles`].
pub type DirectoryFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// User directory consulted for the roles embedded into access tokens.
pub trait SubjectDirectory
where
	Self: Send + Sync,
{
	/// Returns the user's current roles, or `None` if the user is unknown or disabled.
	fn roles<'a>(&'a self, user: &'a UserId) -> DirectoryFuture<'a, Option<RoleSet>>;
}

/// Fixed in-memory directory for tests, demos, and service accounts.
#[derive(Debug, Default)]
pub struct StaticDirectory(RwLock<HashMap<UserId, RoleSet>>);
impl StaticDirectory {
	/// Registers or replaces a user.
	pub fn insert(&self, user: UserId, roles: RoleSet) {
		self.0.write().insert(user, roles);
	}

	/// Removes a user, as if the account had been disabled.
	pub fn remove(&self, user: &UserId) -> Option<RoleSet> {
		self.0.write().remove(user)
	}
}
impl SubjectDirectory for StaticDirectory {
	fn roles<'a>(&'a self, user: &'a UserId) -> DirectoryFuture<'a, Option<RoleSet>> {
		Box::pin(async move { Ok(self.0.read().get(user).cloned()) })
	}
}
