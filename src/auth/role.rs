//! Role set modeling used by access-token claims.

// self
use crate::{_prelude::*, auth::Role};

/// Normalized set of roles granted to a subject.
///
/// Roles are deduplicated and sorted so equality and the serialized claim order stay stable no
/// matter how the directory returned them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);
impl RoleSet {
	/// Creates a normalized role set from any iterator of roles.
	pub fn new<I>(roles: I) -> Self
	where
		I: IntoIterator<Item = Role>,
	{
		Self(roles.into_iter().collect())
	}

	/// Number of distinct roles.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no roles are granted.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if the set grants the provided role name.
	pub fn contains(&self, role: &str) -> bool {
		self.0.contains(role)
	}

	/// Iterator over role names in sorted order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(|role| role.as_ref())
	}
}
impl FromIterator<Role> for RoleSet {
	fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
		Self::new(iter)
	}
}
