//! Single-flight refresh orchestration around protected requests.
//!
//! [`RefreshCoordinator::send`] attaches the current access credential, refreshes it ahead of
//! time when it is inside the configured margin, and replays a request that came back `401`
//! exactly once after a successful refresh. Every refresh, proactive or reactive, goes through
//! one process-wide slot: the first caller spawns the refresh call onto the runtime and every
//! concurrent caller awaits the same shared outcome. Because the call runs in its own task,
//! dropping any waiter never cancels it; the configured deadline is the only way it ends early,
//! and a timeout fails closed like any other refresh failure.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use ::http::StatusCode;
use futures::future::{self, BoxFuture, FutureExt, Shared};
// self
use crate::{
	_prelude::*,
	auth::AccessCredential,
	client::{CoordinatorConfig, CredentialRefresher, RefreshFailure, RefreshMetrics, TokenState},
	error::TransportError,
	http::{ApiTransport, HttpRequest, HttpResponse, attach_bearer, clone_request},
	obs::{self, FlowKind, SecurityEvent},
};

type RefreshOutcome = Result<AccessCredential, RefreshFailure>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

#[derive(Default)]
struct RefreshSlot {
	inflight: Mutex<Option<(u64, SharedRefresh)>>,
	next_id: AtomicU64,
}
impl RefreshSlot {
	fn release(&self, id: u64) {
		let mut inflight = self.inflight.lock();

		if inflight.as_ref().is_some_and(|(current, _)| *current == id) {
			*inflight = None;
		}
	}
}

/// Wraps protected requests with credential attachment, proactive refresh, and one retry.
pub struct RefreshCoordinator<T, R>
where
	T: ?Sized + ApiTransport,
	R: ?Sized + CredentialRefresher,
{
	transport: Arc<T>,
	refresher: Arc<R>,
	state: Arc<TokenState>,
	config: CoordinatorConfig,
	metrics: Arc<RefreshMetrics>,
	slot: Arc<RefreshSlot>,
}
impl<T, R> RefreshCoordinator<T, R>
where
	T: ?Sized + ApiTransport,
	R: ?Sized + CredentialRefresher,
{
	/// Creates a coordinator with default timing.
	pub fn new(transport: Arc<T>, refresher: Arc<R>, state: Arc<TokenState>) -> Self {
		Self {
			transport,
			refresher,
			state,
			config: CoordinatorConfig::default(),
			metrics: Default::default(),
			slot: Default::default(),
		}
	}

	/// Overrides the refresh margin and deadline.
	pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
		self.config = config;

		self
	}

	/// Credential holder shared with the rest of the application.
	pub fn state(&self) -> &Arc<TokenState> {
		&self.state
	}

	/// Active timing configuration.
	pub fn config(&self) -> &CoordinatorConfig {
		&self.config
	}

	/// Shared refresh counters.
	pub fn metrics(&self) -> Arc<RefreshMetrics> {
		self.metrics.clone()
	}

	/// Refreshes the credential now, joining a refresh that is already in flight.
	///
	/// Useful at start-up to restore a session from a refresh token before any request is made.
	pub async fn refresh(&self) -> Result<AccessCredential> {
		obs::observe_flow(FlowKind::Refresh, "refresh", async {
			self.join_refresh(self.state.generation()).await.map_err(Error::from)
		})
		.await
	}

	/// Sends a protected request.
	///
	/// Transport errors of the request itself are returned unchanged and never retried. A `401`
	/// triggers at most one refresh and one replay; the replayed response is returned whatever
	/// its status. If no fresh credential can be obtained the result is [`Error::Unauthorized`]
	/// and the state is left cleared.
	pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
		obs::observe_flow(FlowKind::Request, "send", self.dispatch(request)).await
	}

	async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse> {
		let (held, observed) = self.state.snapshot();
		let renewal_failed = match held {
			Some(held) if held.is_expiring_within(self.config.refresh_margin) =>
				self.join_refresh(observed).await.is_err(),
			_ => false,
		};
		let (credential, generation) = self.state.snapshot();
		let mut first = clone_request(&request);

		attach_bearer(&mut first, credential.as_ref())?;

		let response = self.transport.send(first).await.map_err(TransportError::network)?;

		if response.status() != StatusCode::UNAUTHORIZED {
			return Ok(response);
		}

		drop(response);

		// A renewal already failed during this call; the state is cleared.
		if renewal_failed {
			return Err(Error::Unauthorized);
		}

		let credential = self.join_refresh(generation).await.map_err(|_| Error::Unauthorized)?;
		let mut retry = request;

		attach_bearer(&mut retry, Some(&credential))?;

		Ok(self.transport.send(retry).await.map_err(TransportError::network)?)
	}

	/// Returns the in-flight refresh, starting one if none is running.
	///
	/// `observed` is the state generation the caller based its decision on. If the state moved
	/// on since then, the credential was renewed (or the session ended) while the caller was not
	/// looking, and that outcome is reused instead of starting another refresh.
	fn join_refresh(&self, observed: u64) -> SharedRefresh {
		let mut inflight = self.slot.inflight.lock();

		if let Some((_, refresh)) = inflight.as_ref() {
			self.metrics.record_coalesced();

			return refresh.clone();
		}

		// A refresh settles the state before it releases the slot, so this read is current.
		let (current, generation) = self.state.snapshot();

		if generation != observed {
			self.metrics.record_coalesced();

			return future::ready(current.ok_or(RefreshFailure::Rejected)).boxed().shared();
		}

		self.metrics.record_attempt();

		let id = self.slot.next_id.fetch_add(1, Ordering::Relaxed);
		let refresher = self.refresher.clone();
		let state = self.state.clone();
		let metrics = self.metrics.clone();
		let slot = self.slot.clone();
		let deadline = self.config.refresh_deadline();
		let task = tokio::spawn(async move {
			let outcome = match tokio::time::timeout(deadline, refresher.refresh()).await {
				Ok(outcome) => outcome,
				Err(_) => Err(RefreshFailure::TimedOut),
			};

			settle(&state, &metrics, &outcome);
			slot.release(id);

			outcome
		});
		let state = self.state.clone();
		let metrics = self.metrics.clone();
		let slot = self.slot.clone();
		let refresh = async move {
			match task.await {
				Ok(outcome) => outcome,
				// The refresher panicked; settle on its behalf.
				Err(e) => {
					let reason = format!("refresh task failed: {e}");
					let outcome = Err(RefreshFailure::Unreachable { reason });

					settle(&state, &metrics, &outcome);
					slot.release(id);

					outcome
				},
			}
		}
		.boxed()
		.shared();

		*inflight = Some((id, refresh.clone()));

		refresh
	}
}
impl<T, R> Debug for RefreshCoordinator<T, R>
where
	T: ?Sized + ApiTransport,
	R: ?Sized + CredentialRefresher,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("state", &self.state)
			.field("config", &self.config)
			.field("metrics", &self.metrics)
			.finish_non_exhaustive()
	}
}

/// Publishes a refresh outcome: new credential on success, cleared state on any failure.
fn settle(state: &TokenState, metrics: &RefreshMetrics, outcome: &RefreshOutcome) {
	match outcome {
		Ok(credential) => {
			metrics.record_success();
			state.set(credential.clone());
		},
		Err(failure) => {
			metrics.record_failure();
			state.clear();
			obs::emit(match failure {
				RefreshFailure::Rejected => SecurityEvent::ClientRefreshRejected,
				RefreshFailure::TimedOut => SecurityEvent::ClientRefreshTimedOut,
				RefreshFailure::Unreachable { reason } | RefreshFailure::Malformed { reason } =>
					SecurityEvent::ClientRefreshUnreachable { reason: reason.clone() },
			});
		},
	}
}
