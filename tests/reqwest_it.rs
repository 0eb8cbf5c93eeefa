#![cfg(feature = "reqwest")]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde_json::json;
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use token_rotor::{
	auth::{AccessCredential, TokenSecret},
	client::{CredentialRefresher, RefreshCoordinator, RefreshFailure, TokenState},
	error::Error,
	http::{HttpRequest, ReqwestRefresher, ReqwestTransport},
	reqwest::Client,
	wire::RefreshResponse,
};

fn refresher(server: &MockServer, token: &str) -> ReqwestRefresher {
	let endpoint = Url::parse(&server.url("/auth/refresh"))
		.expect("Mock refresh endpoint should parse successfully.");

	ReqwestRefresher::new(Client::new(), endpoint).with_refresh_token(TokenSecret::new(token))
}

fn refresh_body(access: &str, refresh: &str) -> String {
	let response = RefreshResponse {
		access_token: access.into(),
		expires_at: OffsetDateTime::now_utc() + Duration::minutes(15),
		refresh_token: Some(refresh.into()),
		roles: Default::default(),
	};

	serde_json::to_string(&response).expect("Refresh response fixture should serialize.")
}

fn get(server: &MockServer, path: &str) -> HttpRequest {
	http::Request::builder()
		.method("GET")
		.uri(server.url(path))
		.body(Vec::new())
		.expect("Request fixture should build.")
}

#[tokio::test]
async fn refresher_posts_token_and_keeps_rotated_one() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/refresh")
				.header("content-type", "application/json")
				.json_body(json!({ "refreshToken": "r1" }));
			then.status(200)
				.header("content-type", "application/json")
				.body(refresh_body("access-new", "r2"));
		})
		.await;
	let refresher = refresher(&server, "r1");
	let credential = refresher.refresh().await.expect("Refresh call should succeed.");

	mock.assert_async().await;

	assert_eq!(credential.token.expose(), "access-new");
	assert!(!credential.is_expiring_within(Duration::minutes(14)));
	assert_eq!(refresher.refresh_token(), Some(TokenSecret::new("r2")));
}

#[tokio::test]
async fn refresher_maps_statuses_and_garbage() {
	let server = MockServer::start_async().await;
	let rejected = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").json_body(json!({ "refreshToken": "stolen" }));
			then.status(401);
		})
		.await;
	let garbage = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").json_body(json!({ "refreshToken": "odd" }));
			then.status(200).header("content-type", "application/json").body("{\"token\":1}");
		})
		.await;
	let broken = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").json_body(json!({ "refreshToken": "boom" }));
			then.status(503);
		})
		.await;
	let stolen = refresher(&server, "stolen");

	assert_eq!(stolen.refresh().await, Err(RefreshFailure::Rejected));
	assert_eq!(stolen.refresh_token(), None);
	assert!(matches!(
		refresher(&server, "odd").refresh().await,
		Err(RefreshFailure::Malformed { .. })
	));
	assert!(matches!(
		refresher(&server, "boom").refresh().await,
		Err(RefreshFailure::Unreachable { .. })
	));

	rejected.assert_calls_async(1).await;
	garbage.assert_calls_async(1).await;
	broken.assert_calls_async(1).await;
}

#[tokio::test]
async fn coordinator_renews_and_replays_over_http() {
	let server = MockServer::start_async().await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/menus").header("authorization", "Bearer stale");
			then.status(401);
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/menus").header("authorization", "Bearer access-new");
			then.status(200).header("content-type", "application/json").body("[\"brunch\"]");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").json_body(json!({ "refreshToken": "r1" }));
			then.status(200)
				.header("content-type", "application/json")
				.body(refresh_body("access-new", "r2"));
		})
		.await;
	let state = Arc::new(TokenState::with_credential(AccessCredential::new(
		"stale",
		OffsetDateTime::now_utc() + Duration::minutes(10),
	)));
	let refresher = Arc::new(refresher(&server, "r1"));
	let coordinator = RefreshCoordinator::new(
		Arc::new(ReqwestTransport::default()),
		refresher.clone(),
		state.clone(),
	);
	let response = coordinator.send(get(&server, "/menus")).await.expect("Request should succeed.");

	assert_eq!(response.status(), http::StatusCode::OK);
	assert_eq!(response.body().as_slice(), b"[\"brunch\"]");
	assert_eq!(refresher.refresh_token(), Some(TokenSecret::new("r2")));
	assert_eq!(
		state.current().map(|credential| credential.token.expose().to_owned()),
		Some("access-new".to_owned())
	);

	stale.assert_calls_async(1).await;
	fresh.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn rejected_session_requires_sign_in() {
	let server = MockServer::start_async().await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(401);
		})
		.await;
	let state = Arc::new(TokenState::new());
	let coordinator = RefreshCoordinator::new(
		Arc::new(ReqwestTransport::default()),
		Arc::new(refresher(&server, "expired-chain")),
		state.clone(),
	);
	let err = coordinator.refresh().await.expect_err("Rejected refresh must fail.");

	assert!(matches!(err, Error::RefreshRejected));
	assert!(state.current().is_none());

	refresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn free_form_role_names_do_not_break_renewal() {
	let server = MockServer::start_async().await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").json_body(json!({ "refreshToken": "r1" }));
			then.status(200).header("content-type", "application/json").json_body(json!({
				"accessToken": "a.b.c",
				"expiresAt": "2099-01-01T00:00:00Z",
				"refreshToken": "r2",
				"roles": ["Menu Manager", "Kitchen Staff"],
			}));
		})
		.await;
	let state = Arc::new(TokenState::new());
	let refresher = Arc::new(refresher(&server, "r1"));
	let coordinator = RefreshCoordinator::new(
		Arc::new(ReqwestTransport::default()),
		refresher.clone(),
		state.clone(),
	);
	let credential = coordinator.refresh().await.expect("Renewal should succeed.");

	assert_eq!(credential.token.expose(), "a.b.c");
	assert_eq!(refresher.refresh_token(), Some(TokenSecret::new("r2")));
	assert!(state.current().is_some());

	refresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn rotated_token_is_kept_when_the_rest_of_the_body_is_unusable() {
	let server = MockServer::start_async().await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").json_body(json!({ "refreshToken": "r1" }));
			then.status(200).header("content-type", "application/json").json_body(json!({
				"accessToken": 42,
				"expiresAt": "yesterday",
				"refreshToken": "r2",
			}));
		})
		.await;
	let refresher = refresher(&server, "r1");

	assert!(matches!(refresher.refresh().await, Err(RefreshFailure::Malformed { .. })));
	// The server consumed r1, so presenting it again would be a replay.
	assert_eq!(refresher.refresh_token(), Some(TokenSecret::new("r2")));

	refresh.assert_calls_async(1).await;
}
