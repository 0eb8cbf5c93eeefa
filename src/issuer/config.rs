// self
use crate::{_prelude::*, auth::TokenSecret};

const MIN_SIGNING_KEY_BYTES: usize = 32;
const DEFAULT_ACCESS_LIFETIME: Duration = Duration::minutes(15);
const DEFAULT_REFRESH_LIFETIME: Duration = Duration::days(7);
const MAX_ACCESS_LIFETIME: Duration = Duration::minutes(60);
const MIN_REFRESH_LIFETIME: Duration = Duration::days(1);
const MAX_REFRESH_LIFETIME: Duration = Duration::days(90);

/// Errors raised while constructing or validating issuer configuration.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum IssuerConfigError {
	/// HS256 keys shorter than the digest size are trivially brute-forced.
	#[error("Signing key must be at least {min} bytes long.")]
	WeakSigningKey {
		/// Minimum accepted key length in bytes.
		min: usize,
	},
	/// Issuer claim is required.
	#[error("Issuer cannot be empty.")]
	EmptyIssuer,
	/// Audience claim is required.
	#[error("Audience cannot be empty.")]
	EmptyAudience,
	/// Access tokens must be short-lived.
	#[error("Access token lifetime must be between 1 and 60 minutes.")]
	AccessLifetimeOutOfRange,
	/// Refresh tokens must outlive access tokens but stay bounded.
	#[error("Refresh token lifetime must be between 1 and 90 days.")]
	RefreshLifetimeOutOfRange,
}

/// Validated issuer configuration.
#[derive(Clone)]
pub struct IssuerConfig {
	/// HMAC signing key; its confidentiality is a precondition for everything else.
	pub signing_key: TokenSecret,
	/// Value of the `iss` claim.
	pub issuer: String,
	/// Value of the `aud` claim.
	pub audience: String,
	/// Lifetime of access tokens.
	pub access_lifetime: Duration,
	/// Lifetime of refresh tokens.
	pub refresh_lifetime: Duration,
}
impl IssuerConfig {
	/// Returns a builder seeded with the signing key and default lifetimes.
	pub fn builder(signing_key: impl Into<String>) -> IssuerConfigBuilder {
		IssuerConfigBuilder::new(signing_key)
	}

	fn validate(&self) -> Result<(), IssuerConfigError> {
		if self.signing_key.expose().len() < MIN_SIGNING_KEY_BYTES {
			return Err(IssuerConfigError::WeakSigningKey { min: MIN_SIGNING_KEY_BYTES });
		}
		if self.issuer.trim().is_empty() {
			return Err(IssuerConfigError::EmptyIssuer);
		}
		if self.audience.trim().is_empty() {
			return Err(IssuerConfigError::EmptyAudience);
		}
		if self.access_lifetime < Duration::minutes(1) || self.access_lifetime > MAX_ACCESS_LIFETIME
		{
			return Err(IssuerConfigError::AccessLifetimeOutOfRange);
		}
		if self.refresh_lifetime < MIN_REFRESH_LIFETIME
			|| self.refresh_lifetime > MAX_REFRESH_LIFETIME
		{
			return Err(IssuerConfigError::RefreshLifetimeOutOfRange);
		}

		Ok(())
	}
}
impl Debug for IssuerConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IssuerConfig")
			.field("signing_key", &"<redacted>")
			.field("issuer", &self.issuer)
			.field("audience", &self.audience)
			.field("access_lifetime", &self.access_lifetime)
			.field("refresh_lifetime", &self.refresh_lifetime)
			.finish()
	}
}

/// Builder for [`IssuerConfig`] values.
#[derive(Debug)]
pub struct IssuerConfigBuilder {
	config: IssuerConfig,
}
impl IssuerConfigBuilder {
	fn new(signing_key: impl Into<String>) -> Self {
		Self {
			config: IssuerConfig {
				signing_key: TokenSecret::new(signing_key),
				issuer: String::new(),
				audience: String::new(),
				access_lifetime: DEFAULT_ACCESS_LIFETIME,
				refresh_lifetime: DEFAULT_REFRESH_LIFETIME,
			},
		}
	}

	/// Sets the `iss` claim.
	pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
		self.config.issuer = issuer.into();

		self
	}

	/// Sets the `aud` claim.
	pub fn audience(mut self, audience: impl Into<String>) -> Self {
		self.config.audience = audience.into();

		self
	}

	/// Overrides the access-token lifetime (defaults to 15 minutes).
	pub fn access_lifetime(mut self, lifetime: Duration) -> Self {
		self.config.access_lifetime = lifetime;

		self
	}

	/// Overrides the refresh-token lifetime (defaults to 7 days).
	pub fn refresh_lifetime(mut self, lifetime: Duration) -> Self {
		self.config.refresh_lifetime = lifetime;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<IssuerConfig, IssuerConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

/// Issuer settings as they appear in a host's configuration file.
#[derive(Clone, Deserialize)]
pub struct IssuerSettings {
	/// HMAC signing key.
	pub key: String,
	/// Value of the `iss` claim.
	pub issuer: String,
	/// Value of the `aud` claim.
	pub audience: String,
	/// Access-token lifetime in minutes.
	#[serde(default = "IssuerSettings::default_access_minutes")]
	pub access_token_minutes: i64,
	/// Refresh-token lifetime in days.
	#[serde(default = "IssuerSettings::default_refresh_days")]
	pub refresh_token_days: i64,
}
impl IssuerSettings {
	fn default_access_minutes() -> i64 {
		DEFAULT_ACCESS_LIFETIME.whole_minutes()
	}

	fn default_refresh_days() -> i64 {
		DEFAULT_REFRESH_LIFETIME.whole_days()
	}
}
impl Debug for IssuerSettings {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IssuerSettings")
			.field("key", &"<redacted>")
			.field("issuer", &self.issuer)
			.field("audience", &self.audience)
			.field("access_token_minutes", &self.access_token_minutes)
			.field("refresh_token_days", &self.refresh_token_days)
			.finish()
	}
}
impl TryFrom<IssuerSettings> for IssuerConfig {
	type Error = IssuerConfigError;

	fn try_from(settings: IssuerSettings) -> Result<Self, Self::Error> {
		IssuerConfig::builder(settings.key)
			.issuer(settings.issuer)
			.audience(settings.audience)
			.access_lifetime(Duration::minutes(settings.access_token_minutes))
			.refresh_lifetime(Duration::days(settings.refresh_token_days))
			.build()
	}
}
