//! 401 recovery: auth-endpoint exclusion, single-flight refresh, and replay-once.
//!
//! A 401 on a request that has not been replayed yet joins the client's
//! [`RefreshGate`](crate::client::RefreshGate). The leader reads the stored refresh token,
//! calls the refresh endpoint, persists the new pair, and only then releases its followers.
//! Every terminal path clears the stored credential and notifies the
//! [`SessionObserver`](crate::session::SessionObserver) once per cascade, while the originating
//! callers still receive an error.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{Credential, RefreshRequest, TokenPair, TokenSecret},
	client::{GateRole, RefreshOutcome, SessionClient},
	config::PersistencePolicy,
	http::{ApiHttpClient, ApiRequest, ApiResponse},
	obs::{self, CallKind, CallOutcome, CallSpan},
	session::{ExpiryReason, SessionExpired},
};

impl<C> SessionClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	pub(crate) async fn recover_unauthorized(
		&self,
		request: ApiRequest,
		url: Url,
		stale: Option<TokenSecret>,
		response: ApiResponse,
	) -> Result<ApiResponse> {
		if request.is_retried() {
			return response.error_for_status();
		}
		if self.config.is_auth_endpoint(&url) {
			self.expire_session(ExpiryReason::AuthEndpointRejected {
				endpoint: url.path().to_owned(),
			})
			.await;

			return response.error_for_status();
		}

		let replay = request.into_replay();

		// A remembered failure only stands while the slot still lacks a refresh token.
		if stale.is_some() && self.stored_refresh_token().await.is_some() {
			self.gate.discard_failure();
		}

		let (role, outcome) = self.gate.acquire(stale.as_ref(), || self.run_refresh()).await;

		if role != GateRole::Leader {
			self.refresh_metrics.record_coalesced();
		}

		let fresh = outcome?;

		self.replay(&replay, &url, &fresh).await
	}

	/// Runs one refresh cascade as leader, performing every side effect before returning.
	pub(crate) async fn run_refresh(&self) -> RefreshOutcome {
		const KIND: CallKind = CallKind::Refresh;

		let span = CallSpan::new(KIND, "run_refresh");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let outcome = span
			.instrument(async {
				self.refresh_metrics.record_attempt();

				let Some(refresh_token) = self.stored_refresh_token().await else {
					return self.fail_cascade(ExpiryReason::MissingRefreshToken).await;
				};
				let pair = match self.request_refresh(&refresh_token).await {
					Ok(pair) => pair,
					Err(reason) => return self.fail_cascade(reason).await,
				};
				let credential = Credential::from(pair);
				let Some(access_token) = credential.access_token.clone() else {
					return self
						.fail_cascade(ExpiryReason::RefreshFailed {
							message: "the refresh endpoint returned an empty access token".into(),
						})
						.await;
				};

				if let Err(e) = self.store.save(credential).await {
					match self.config.persistence {
						PersistencePolicy::BestEffort => obs::record_warning("save_credential", &e),
						PersistencePolicy::Strict =>
							return self
								.fail_cascade(ExpiryReason::PersistenceFailed {
									message: e.to_string(),
								})
								.await,
					}
				}

				self.refresh_metrics.record_success();

				Ok(access_token)
			})
			.await;

		match &outcome {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		outcome
	}

	async fn stored_refresh_token(&self) -> Option<TokenSecret> {
		match self.store.load().await {
			Ok(credential) => credential.and_then(|credential| credential.refresh_token),
			Err(e) => {
				obs::record_warning("load_refresh_token", &e);

				None
			},
		}
	}

	// The refresh call bypasses the 401 handler: any failure here is terminal.
	async fn request_refresh(&self, refresh_token: &TokenSecret) -> Result<TokenPair, ExpiryReason> {
		let refresh_failed = |message: String| ExpiryReason::RefreshFailed { message };
		let path = &self.config.endpoints.refresh;
		let url = self.config.endpoint(path).map_err(|e| refresh_failed(e.to_string()))?;
		let request = ApiRequest::post(path.as_str())
			.json(&RefreshRequest { refresh_token: refresh_token.expose() })
			.map_err(|e| refresh_failed(e.to_string()))?;
		let response =
			self.dispatch(&request, &url, None).await.map_err(|e| refresh_failed(e.to_string()))?;

		if !response.is_success() {
			return Err(ExpiryReason::RefreshRejected { status: response.status.as_u16() });
		}

		response.json::<TokenPair>().map_err(|e| match e {
			Error::ResponseParse { source, .. } => refresh_failed(source.to_string()),
			other => refresh_failed(other.to_string()),
		})
	}

	async fn replay(&self, request: &ApiRequest, url: &Url, token: &TokenSecret) -> Result<ApiResponse> {
		const KIND: CallKind = CallKind::Replay;

		let span = CallSpan::new(KIND, "replay");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async { self.dispatch(request, url, Some(token)).await?.error_for_status() })
			.await;

		match &result {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		result
	}

	async fn fail_cascade(&self, reason: ExpiryReason) -> RefreshOutcome {
		self.refresh_metrics.record_failure();
		self.expire_session(reason.clone()).await;

		Err(reason)
	}

	/// Clears the stored credential and notifies the observer.
	pub(crate) async fn expire_session(&self, reason: ExpiryReason) {
		if let Err(e) = self.store.clear().await {
			obs::record_warning("clear_credential", &e);
		}

		self.observer
			.on_session_expired(&SessionExpired::new(reason, self.config.login_route.as_str()));
	}
}
