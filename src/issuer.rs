//! Access-token signing, refresh-token minting, and the issuer configuration they share.
//!
//! [`TokenIssuer`] is pure: it never touches storage. Access tokens are HS256 JWTs binding the
//! subject, roles, issuer, and audience to a short lifetime; refresh tokens are 512 random bits
//! encoded as base64url and carry no claims at all, so they mean nothing without a store lookup.

mod config;

pub use config::*;

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use uuid::Uuid;
// self
use crate::{
	_prelude::*,
	auth::{AccessClaims, AccessCredential, RoleSet, TokenSecret, UserId},
	error::{ConfigError, TokenError},
};

const REFRESH_TOKEN_BYTES: usize = 64;
const VERIFY_LEEWAY_SECS: u64 = 5;

/// Mints access credentials and opaque refresh tokens for one issuer/audience pair.
#[derive(Clone)]
pub struct TokenIssuer {
	config: IssuerConfig,
	encoding_key: EncodingKey,
	decoding_key: DecodingKey,
	validation: Validation,
}
impl TokenIssuer {
	/// Creates an issuer from validated configuration.
	pub fn new(config: IssuerConfig) -> Self {
		let secret = config.signing_key.expose().as_bytes();
		let encoding_key = EncodingKey::from_secret(secret);
		let decoding_key = DecodingKey::from_secret(secret);
		let mut validation = Validation::new(Algorithm::HS256);

		validation.set_issuer(&[config.issuer.as_str()]);
		validation.set_audience(&[config.audience.as_str()]);
		validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
		validation.leeway = VERIFY_LEEWAY_SECS;

		Self { config, encoding_key, decoding_key, validation }
	}

	/// Validates host-provided settings and creates an issuer from them.
	pub fn from_settings(settings: IssuerSettings) -> Result<Self> {
		let config = IssuerConfig::try_from(settings).map_err(ConfigError::from)?;

		Ok(Self::new(config))
	}

	/// Configuration the issuer was built from.
	pub fn config(&self) -> &IssuerConfig {
		&self.config
	}

	/// Signs an access token for `subject` valid from `now` for the configured lifetime.
	pub fn issue_access_token_at(
		&self,
		subject: &UserId,
		roles: &RoleSet,
		now: OffsetDateTime,
	) -> Result<AccessCredential, TokenError> {
		let expires_at = now + self.config.access_lifetime;
		let claims = AccessClaims {
			sub: subject.clone(),
			roles: roles.clone(),
			iss: self.config.issuer.clone(),
			aud: self.config.audience.clone(),
			iat: now.unix_timestamp(),
			exp: expires_at.unix_timestamp(),
			jti: Uuid::new_v4().to_string(),
		};
		let token =
			jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
				.map_err(TokenError::Signing)?;

		Ok(AccessCredential::new(token, expires_at))
	}

	/// Signs an access token using the current clock.
	pub fn issue_access_token(
		&self,
		subject: &UserId,
		roles: &RoleSet,
	) -> Result<AccessCredential, TokenError> {
		self.issue_access_token_at(subject, roles, OffsetDateTime::now_utc())
	}

	/// Mints a fresh opaque refresh token and the instant it stops being usable.
	pub fn issue_refresh_token_at(&self, now: OffsetDateTime) -> (TokenSecret, OffsetDateTime) {
		let mut bytes = [0_u8; REFRESH_TOKEN_BYTES];

		rand::rng().fill_bytes(&mut bytes);

		(TokenSecret::new(URL_SAFE_NO_PAD.encode(bytes)), now + self.config.refresh_lifetime)
	}

	/// Mints a refresh token using the current clock.
	pub fn issue_refresh_token(&self) -> (TokenSecret, OffsetDateTime) {
		self.issue_refresh_token_at(OffsetDateTime::now_utc())
	}

	/// Verifies signature, issuer, audience, and expiry of a bearer token.
	pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
		jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
			.map(|data| data.claims)
			.map_err(TokenError::Verification)
	}
}
impl Debug for TokenIssuer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenIssuer").field("config", &self.config).finish()
	}
}
