//! Strongly typed identifiers for token subjects and their roles.

// std
use std::borrow::Borrow;
// self
use crate::_prelude::*;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (user, role).
		kind: &'static str,
	},
	/// The identifier contains a character its kind does not allow.
	#[error("{kind} identifier contains the disallowed character {found:?}.")]
	InvalidCharacter {
		/// Kind of identifier (user, role).
		kind: &'static str,
		/// First offending character.
		found: char,
	},
	/// The identifier exceeded the allowed byte length.
	#[error("{kind} identifier exceeds {max} bytes.")]
	TooLong {
		/// Kind of identifier (user, role).
		kind: &'static str,
		/// Maximum permitted length in bytes.
		max: usize,
	},
}

// Each identifier kind names itself, its length cap, and the characters it accepts.
macro_rules! identifier {
	($(#[$meta:meta])* $name:ident, $kind:literal, $max:expr, $allowed:expr) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Longest accepted value in bytes.
			pub const MAX_LEN: usize = $max;

			/// Validates and wraps `value`.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				let value = value.into();

				check($kind, &value, Self::MAX_LEN, $allowed)?;

				Ok(Self(value))
			}

			/// Borrows the raw value.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

identifier! {
	/// Stable identifier of the user a token pair is issued to.
	///
	/// Any printable value is accepted (GUIDs, e-mail addresses, numeric keys), as long as it
	/// carries no whitespace or control characters that would corrupt logs or claims.
	UserId, "User", 128, |c: char| !c.is_whitespace() && !c.is_control()
}
identifier! {
	/// Role name embedded into access-token claims.
	Role, "Role", 64, |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

fn check(
	kind: &'static str,
	value: &str,
	max: usize,
	allowed: impl Fn(char) -> bool,
) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if value.len() > max {
		return Err(IdentifierError::TooLong { kind, max });
	}
	if let Some(found) = value.chars().find(|c| !allowed(*c)) {
		return Err(IdentifierError::InvalidCharacter { kind, found });
	}

	Ok(())
}
