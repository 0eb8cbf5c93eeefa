// std
use std::{
	collections::HashSet,
	io,
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use http::{Request, Response, StatusCode, header::AUTHORIZATION};
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};
// self
use token_rotor::{
	auth::AccessCredential,
	client::{
		AuthState, CoordinatorConfig, CredentialRefresher, RefreshCoordinator, RefreshFailure,
		RefreshFuture, TokenState,
	},
	error::{Error, TransportError},
	http::{ApiTransport, HttpRequest, TransportFuture},
};

type Hook = Box<dyn FnOnce() + Send>;

/// Protected API that accepts a fixed set of bearer tokens and echoes the request body.
#[derive(Default)]
struct FakeApi {
	accepted: Mutex<HashSet<String>>,
	seen: Mutex<Vec<Option<String>>>,
	offline: AtomicBool,
	reject_all: AtomicBool,
	before_reject: Mutex<Option<Hook>>,
}
impl FakeApi {
	fn accept(&self, token: &str) {
		self.accepted.lock().insert(token.to_owned());
	}

	fn seen(&self) -> Vec<Option<String>> {
		self.seen.lock().clone()
	}
}
impl ApiTransport for FakeApi {
	type Error = io::Error;

	fn send(&self, request: HttpRequest) -> TransportFuture<'_, Self::Error> {
		Box::pin(async move {
			let bearer = request
				.headers()
				.get(AUTHORIZATION)
				.and_then(|value| value.to_str().ok())
				.and_then(|value| value.strip_prefix("Bearer "))
				.map(str::to_owned);

			self.seen.lock().push(bearer.clone());

			if self.offline.load(Ordering::SeqCst) {
				return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "api offline"));
			}

			let accepted = !self.reject_all.load(Ordering::SeqCst)
				&& bearer.as_ref().is_some_and(|token| self.accepted.lock().contains(token));

			if !accepted {
				let hook = self.before_reject.lock().take();

				if let Some(hook) = hook {
					hook();
				}
			}

			let status = if accepted { StatusCode::OK } else { StatusCode::UNAUTHORIZED };

			Ok(Response::builder()
				.status(status)
				.body(request.into_body())
				.expect("Fake response should build."))
		})
	}
}

/// Refresh endpoint that mints `access-N` tokens and registers them with the API.
struct FakeRefresher {
	api: Arc<FakeApi>,
	calls: AtomicUsize,
	delay: StdDuration,
	failure: Mutex<Option<RefreshFailure>>,
}
impl FakeRefresher {
	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl CredentialRefresher for FakeRefresher {
	fn refresh(&self) -> RefreshFuture<'_> {
		Box::pin(async move {
			let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

			if !self.delay.is_zero() {
				tokio::time::sleep(self.delay).await;
			}

			let failure = self.failure.lock().clone();

			if let Some(failure) = failure {
				return Err(failure);
			}

			let token = format!("access-{call}");

			self.api.accept(&token);

			Ok(AccessCredential::new(token, OffsetDateTime::now_utc() + Duration::minutes(15)))
		})
	}
}

struct Harness {
	api: Arc<FakeApi>,
	refresher: Arc<FakeRefresher>,
	state: Arc<TokenState>,
	coordinator: RefreshCoordinator<FakeApi, FakeRefresher>,
}

fn harness(delay_ms: u64, failure: Option<RefreshFailure>) -> Harness {
	let api = Arc::new(FakeApi::default());
	let refresher = Arc::new(FakeRefresher {
		api: api.clone(),
		calls: AtomicUsize::new(0),
		delay: StdDuration::from_millis(delay_ms),
		failure: Mutex::new(failure),
	});
	let state = Arc::new(TokenState::new());
	let coordinator = RefreshCoordinator::new(api.clone(), refresher.clone(), state.clone());

	Harness { api, refresher, state, coordinator }
}

fn request() -> HttpRequest {
	Request::builder()
		.method("POST")
		.uri("https://api.test.local/menus")
		.header("content-type", "application/json")
		.body(br#"{"name":"brunch"}"#.to_vec())
		.expect("Request fixture should build.")
}

/// A credential issued 14m30s ago with a 15-minute lifetime.
fn nearly_expired(token: &str) -> AccessCredential {
	AccessCredential::new(token, OffsetDateTime::now_utc() + Duration::seconds(30))
}

fn fresh(token: &str) -> AccessCredential {
	AccessCredential::new(token, OffsetDateTime::now_utc() + Duration::minutes(10))
}

#[tokio::test]
async fn near_expiry_credential_is_refreshed_before_sending() {
	let h = harness(0, None);

	h.api.accept("initial");
	h.state.set(nearly_expired("initial"));

	let response = h.coordinator.send(request()).await.expect("Request should succeed.");
	let renewed = h.state.current().expect("State should hold the renewed credential.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(h.refresher.calls(), 1);
	assert_eq!(h.api.seen(), vec![Some("access-1".to_owned())]);
	assert_eq!(renewed.token.expose(), "access-1");
	assert!(renewed.expires_at - OffsetDateTime::now_utc() > Duration::minutes(14));
}

#[tokio::test]
async fn simultaneous_requests_share_one_refresh_call() {
	let h = harness(50, None);

	h.state.set(nearly_expired("initial"));

	let (first, second) =
		tokio::join!(h.coordinator.send(request()), h.coordinator.send(request()));

	assert_eq!(first.expect("First request should succeed.").status(), StatusCode::OK);
	assert_eq!(second.expect("Second request should succeed.").status(), StatusCode::OK);
	assert_eq!(h.refresher.calls(), 1);
	assert_eq!(h.coordinator.metrics().attempts(), 1);
	assert_eq!(h.coordinator.metrics().coalesced(), 1);
	assert_eq!(h.api.seen(), vec![Some("access-1".to_owned()); 2]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_unauthorized_responses_share_one_refresh_call() {
	let h = Arc::new(harness(50, None));

	// Looks fresh locally, but the server has revoked it.
	h.state.set(fresh("revoked-server-side"));

	let mut handles = Vec::new();

	for _ in 0..8 {
		let h = h.clone();

		handles.push(tokio::spawn(async move { h.coordinator.send(request()).await }));
	}

	for handle in handles {
		let response = handle
			.await
			.expect("Request task should not panic.")
			.expect("Every request should succeed after the shared renewal.");

		assert_eq!(response.status(), StatusCode::OK);
	}

	assert_eq!(h.refresher.calls(), 1);
	assert_eq!(h.coordinator.metrics().attempts(), 1);
	assert_eq!(
		h.state.current().map(|credential| credential.token.expose().to_owned()),
		Some("access-1".to_owned())
	);
}

#[tokio::test]
async fn unauthorized_response_is_retried_once_with_the_new_credential() {
	let h = harness(0, None);

	h.state.set(fresh("revoked-server-side"));

	let response = h.coordinator.send(request()).await.expect("Retried request should succeed.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(response.body(), br#"{"name":"brunch"}"#);
	assert_eq!(h.refresher.calls(), 1);
	assert_eq!(
		h.api.seen(),
		vec![Some("revoked-server-side".to_owned()), Some("access-1".to_owned())]
	);
}

#[tokio::test]
async fn second_unauthorized_is_returned_without_a_third_attempt() {
	let h = harness(0, None);

	h.state.set(fresh("initial"));
	h.api.reject_all.store(true, Ordering::SeqCst);

	let response = h.coordinator.send(request()).await.expect("Retry result is returned as is.");

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(h.api.seen(), vec![Some("initial".to_owned()), Some("access-1".to_owned())]);
	assert_eq!(h.refresher.calls(), 1);
	assert_eq!(h.coordinator.metrics().attempts(), 1);
}

#[tokio::test]
async fn failed_refresh_clears_state_and_reports_unauthorized() {
	let h = harness(0, Some(RefreshFailure::Rejected));
	let notifications = Arc::new(Mutex::new(Vec::new()));
	let sink = notifications.clone();

	h.state.set(fresh("initial"));
	h.state.subscribe(move |auth: &AuthState| sink.lock().push(auth.clone()));

	let err = h.coordinator.send(request()).await.expect_err("Refresh failure must surface.");

	assert!(matches!(err, Error::Unauthorized));
	assert!(h.state.current().is_none());
	assert_eq!(*notifications.lock(), vec![AuthState::Anonymous]);
	assert_eq!(h.api.seen().len(), 1);
	assert_eq!(h.coordinator.metrics().failures(), 1);
}

#[tokio::test]
async fn failed_proactive_refresh_sends_anonymously_and_never_refreshes_twice() {
	let h = harness(0, Some(RefreshFailure::Unreachable { reason: "dns".into() }));

	h.state.set(nearly_expired("initial"));

	let err = h.coordinator.send(request()).await.expect_err("Anonymous request is refused.");

	assert!(matches!(err, Error::Unauthorized));
	assert_eq!(h.refresher.calls(), 1);
	assert_eq!(h.api.seen(), vec![None]);
	assert!(h.state.current().is_none());
}

#[tokio::test]
async fn transport_errors_of_the_original_request_are_not_retried() {
	let h = harness(0, None);

	h.state.set(fresh("initial"));
	h.api.offline.store(true, Ordering::SeqCst);

	let err = h.coordinator.send(request()).await.expect_err("Offline API must fail.");

	match err {
		Error::Transport(TransportError::Network { source }) => {
			let io = source.downcast_ref::<io::Error>().expect("Source should be the I/O error.");

			assert_eq!(io.kind(), io::ErrorKind::ConnectionRefused);
		},
		other => panic!("Unexpected error: {other:?}"),
	}

	assert_eq!(h.refresher.calls(), 0);
	assert_eq!(h.api.seen().len(), 1);
	assert_eq!(
		h.state.current().map(|credential| credential.token.expose().to_owned()),
		Some("initial".to_owned())
	);
}

#[tokio::test]
async fn refresh_timeout_fails_closed() {
	let mut h = harness(500, None);

	h.coordinator = h
		.coordinator
		.with_config(CoordinatorConfig::default().with_refresh_timeout(Duration::milliseconds(50)));
	h.state.set(fresh("initial"));

	let err = h.coordinator.refresh().await.expect_err("Slow refresh must time out.");

	assert!(matches!(err, Error::RefreshUnreachable { .. }));
	assert!(h.state.current().is_none());
	assert_eq!(h.coordinator.metrics().failures(), 1);
}

#[tokio::test]
async fn abandoning_a_waiter_does_not_cancel_the_refresh() {
	let h = harness(100, None);
	let abandoned =
		tokio::time::timeout(StdDuration::from_millis(10), h.coordinator.refresh()).await;

	assert!(abandoned.is_err(), "The waiter should give up before the refresh finishes.");

	tokio::time::sleep(StdDuration::from_millis(300)).await;

	assert_eq!(h.refresher.calls(), 1);
	assert_eq!(
		h.state.current().map(|credential| credential.token.expose().to_owned()),
		Some("access-1".to_owned())
	);
	assert_eq!(h.coordinator.metrics().successes(), 1);
}

#[tokio::test]
async fn unauthorized_after_a_concurrent_renewal_reuses_the_newer_credential() {
	let h = harness(0, None);
	let state = h.state.clone();

	h.api.accept("renewed-elsewhere");
	h.state.set(fresh("initial"));
	// Another pipeline renews the credential while this request is in flight.
	*h.api.before_reject.lock() = Some(Box::new(move || state.set(fresh("renewed-elsewhere"))));

	let response = h.coordinator.send(request()).await.expect("Retry should succeed.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(h.refresher.calls(), 0);
	assert_eq!(
		h.api.seen(),
		vec![Some("initial".to_owned()), Some("renewed-elsewhere".to_owned())]
	);
}
