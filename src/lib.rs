//! Rotating refresh-token lifecycle engine: single-flight client renewal, replay-detecting
//! rotation chains, and CAS-safe token stores in one crate built for production.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod directory;
pub mod error;
pub mod http;
pub mod issuer;
pub mod obs;
pub mod rotation;
pub mod store;
pub mod wire;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{Role, RoleSet, UserId},
		directory::{StaticDirectory, SubjectDirectory},
		issuer::{IssuerConfig, TokenIssuer},
		rotation::RotationPolicy,
		store::{MemoryStore, RefreshTokenStore},
	};

	/// Signing key shared by every test fixture; long enough for HS256 validation.
	pub const TEST_SIGNING_KEY: &str = "test-signing-key-with-at-least-32-bytes!";

	/// Builds the issuer configuration used across tests.
	pub fn test_issuer_config() -> IssuerConfig {
		IssuerConfig::builder(TEST_SIGNING_KEY)
			.issuer("https://auth.test.local")
			.audience("test-api")
			.build()
			.expect("Failed to build issuer configuration for tests.")
	}

	/// Builds a token issuer backed by [`test_issuer_config`].
	pub fn test_issuer() -> TokenIssuer {
		TokenIssuer::new(test_issuer_config())
	}

	/// Parses a user identifier fixture.
	pub fn user(id: &str) -> UserId {
		UserId::new(id).expect("User identifier fixture should be valid.")
	}

	/// Builds a role set fixture.
	pub fn roles(values: &[&str]) -> RoleSet {
		RoleSet::new(
			values.iter().map(|value| Role::new(*value).expect("Role fixture should be valid.")),
		)
	}

	/// Constructs a [`RotationPolicy`] backed by an in-memory store and a static directory that
	/// knows the provided users.
	pub fn build_memory_policy(
		users: &[(&str, &[&str])],
	) -> (RotationPolicy, Arc<MemoryStore>, Arc<StaticDirectory>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn RefreshTokenStore> = store_backend.clone();
		let directory_backend = Arc::new(StaticDirectory::default());

		for (id, granted) in users {
			directory_backend.insert(user(id), roles(granted));
		}

		let directory: Arc<dyn SubjectDirectory> = directory_backend.clone();
		let policy = RotationPolicy::new(store, directory, test_issuer());

		(policy, store_backend, directory_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeSet, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		net::IpAddr,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use ::http as http_types;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
