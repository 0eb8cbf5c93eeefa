//! Transport primitives for protected API calls and refresh calls.
//!
//! The module exposes [`ApiTransport`] so downstream crates can plug in any HTTP stack; the
//! coordinator only needs to send a buffered [`HttpRequest`], read the status of the
//! [`HttpResponse`], and replay a clone of the request. With the `reqwest` feature,
//! [`ReqwestTransport`] and [`ReqwestRefresher`] provide ready-made implementations.

// crates.io
use ::http::{
	HeaderValue, Request, Response,
	header::{AUTHORIZATION, HeaderMap},
};
#[cfg(feature = "reqwest")]
use ::http::{
	StatusCode,
	header::{ACCEPT, CONTENT_TYPE},
};
// self
use crate::{_prelude::*, auth::AccessCredential, error::ConfigError};
#[cfg(feature = "reqwest")]
use crate::{
	auth::TokenSecret,
	client::{CredentialRefresher, RefreshFailure, RefreshFuture},
	wire::{RefreshRequest, RefreshResponse},
};

/// Buffered outbound request; the body is kept so the request can be replayed.
pub type HttpRequest = Request<Vec<u8>>;
/// Buffered response.
pub type HttpResponse = Response<Vec<u8>>;
/// Boxed future returned by [`ApiTransport::send`].
pub type TransportFuture<'a, E> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, E>> + 'a + Send>>;

/// Abstraction over HTTP stacks able to execute protected API calls.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared across every
/// in-flight request pipeline of a client.
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type Error: 'static + Send + Sync + StdError;

	/// Sends the request and buffers the full response.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_, Self::Error>;
}

/// Copies method, URI, version, headers, and body of a buffered request.
///
/// Extensions are not carried over.
pub fn clone_request(request: &HttpRequest) -> HttpRequest {
	let mut clone = Request::new(request.body().clone());

	*clone.method_mut() = request.method().clone();
	*clone.uri_mut() = request.uri().clone();
	*clone.version_mut() = request.version();
	*clone.headers_mut() = request.headers().clone();

	clone
}

/// Replaces the `Authorization` header with a bearer credential, or removes it for `None`.
pub fn attach_bearer(
	request: &mut HttpRequest,
	credential: Option<&AccessCredential>,
) -> Result<(), ConfigError> {
	set_bearer(request.headers_mut(), credential)
}

fn set_bearer(
	headers: &mut HeaderMap,
	credential: Option<&AccessCredential>,
) -> Result<(), ConfigError> {
	let Some(credential) = credential else {
		headers.remove(AUTHORIZATION);

		return Ok(());
	};
	let mut value = HeaderValue::try_from(format!("Bearer {}", credential.token.expose()))
		.map_err(|source| ConfigError::InvalidHeader { header: "authorization", source })?;

	value.set_sensitive(true);
	headers.insert(AUTHORIZATION, value);

	Ok(())
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestTransport {
	type Error = ReqwestError;

	fn send(&self, request: HttpRequest) -> TransportFuture<'_, Self::Error> {
		Box::pin(async move {
			let response = self.0.execute(request.try_into()?).await?;
			let status = response.status();
			let version = response.version();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.version_mut() = version;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// The one field of a refresh body that must survive a partially unreadable response.
#[cfg(feature = "reqwest")]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RotatedToken {
	refresh_token: Option<String>,
}

/// Calls a JSON refresh endpoint with reqwest.
///
/// Under body delivery the refresh token is sent in [`RefreshRequest`] and the rotated token from
/// each [`RefreshResponse`] replaces it. Under cookie delivery, pass a cookie-enabled client and
/// no token; the body then stays empty and the cookie jar carries the rotation.
#[cfg(feature = "reqwest")]
#[derive(Debug)]
pub struct ReqwestRefresher {
	client: ReqwestClient,
	endpoint: Url,
	refresh_token: Mutex<Option<TokenSecret>>,
}
#[cfg(feature = "reqwest")]
impl ReqwestRefresher {
	/// Creates a refresher posting to `endpoint`.
	pub fn new(client: ReqwestClient, endpoint: Url) -> Self {
		Self { client, endpoint, refresh_token: Mutex::new(None) }
	}

	/// Seeds the refresh token used by the next call (body delivery).
	pub fn with_refresh_token(self, token: TokenSecret) -> Self {
		*self.refresh_token.lock() = Some(token);

		self
	}

	/// Replaces the stored refresh token, e.g. after a fresh sign-in.
	pub fn set_refresh_token(&self, token: Option<TokenSecret>) {
		*self.refresh_token.lock() = token;
	}

	/// Returns the refresh token the next call will present.
	pub fn refresh_token(&self) -> Option<TokenSecret> {
		self.refresh_token.lock().clone()
	}

	/// Refresh endpoint URL.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	async fn call(&self) -> Result<AccessCredential, RefreshFailure> {
		let body = RefreshRequest {
			refresh_token: self.refresh_token().map(|token| token.expose().to_owned()),
		};
		let payload = serde_json::to_vec(&body)
			.map_err(|e| RefreshFailure::Malformed { reason: e.to_string() })?;
		let response = self
			.client
			.post(self.endpoint.clone())
			.header(CONTENT_TYPE, "application/json")
			.header(ACCEPT, "application/json")
			.body(payload)
			.send()
			.await
			.map_err(|e| RefreshFailure::Unreachable { reason: e.to_string() })?;
		let status = response.status();

		if matches!(
			status,
			StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
		) {
			self.set_refresh_token(None);

			return Err(RefreshFailure::Rejected);
		}
		if !status.is_success() {
			return Err(RefreshFailure::Unreachable {
				reason: format!("refresh endpoint answered with status {status}"),
			});
		}

		let bytes = response
			.bytes()
			.await
			.map_err(|e| RefreshFailure::Unreachable { reason: e.to_string() })?;
		// The server has already consumed the presented token; keep its successor even if the
		// rest of the body turns out to be unusable, or the next call would be a replay.
		if let Ok(RotatedToken { refresh_token: Some(rotated) }) = serde_json::from_slice(&bytes) {
			self.set_refresh_token(Some(TokenSecret::new(rotated)));
		}

		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
		let parsed: RefreshResponse = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|e| RefreshFailure::Malformed { reason: e.to_string() })?;

		Ok(AccessCredential::new(parsed.access_token, parsed.expires_at))
	}
}
#[cfg(feature = "reqwest")]
impl CredentialRefresher for ReqwestRefresher {
	fn refresh(&self) -> RefreshFuture<'_> {
		Box::pin(self.call())
	}
}
