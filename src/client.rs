//! Authenticated client: bearer attachment, 401 recovery, and REST helpers.

pub mod gate;
pub mod refresh;

mod account;

pub use gate::*;
pub use refresh::*;

// crates.io
use oauth2::{AsyncHttpClient, http::StatusCode};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::ClientConfig,
	http::{self, ApiHttpClient, ApiRequest, ApiResponse},
	obs::{self, CallKind, CallOutcome, CallSpan},
	session::{LogObserver, SessionObserver},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestSessionClient = SessionClient<ReqwestHttpClient>;

/// HTTP client that attaches the stored access token to every call and transparently
/// refreshes it when the backend answers 401.
///
/// Clones share the transport, credential store, observer, and refresh gate, so every clone
/// participates in the same single-flight refresh.
pub struct SessionClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// HTTP transport used for every outbound call.
	pub http_client: Arc<C>,
	/// Persisted credential slot.
	pub store: Arc<dyn CredentialStore>,
	/// Receives a notification whenever a session cannot be recovered.
	pub observer: Arc<dyn SessionObserver>,
	/// Validated client configuration.
	pub config: ClientConfig,
	/// Shared counters for refresh cascades.
	pub refresh_metrics: Arc<RefreshMetrics>,
	gate: Arc<RefreshGate>,
}
impl<C> SessionClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_http_client(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			store,
			observer: Arc::new(LogObserver),
			config,
			refresh_metrics: Default::default(),
			gate: Default::default(),
		}
	}

	/// Replaces the session observer.
	pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
		self.observer = observer;

		self
	}

	/// Refresh coordinator shared by all clones of this client.
	pub fn gate(&self) -> &RefreshGate {
		&self.gate
	}

	/// Sends `request`, recovering from a 401 with a single-flight refresh and one replay.
	///
	/// Non-2xx responses other than a recoverable 401 surface as [`Error::Status`].
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: CallKind = CallKind::Request;

		let span = CallSpan::new(KIND, "send");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let url = self.config.endpoint(&request.path)?;
				let token = self.current_access_token().await;
				let response = self.dispatch(&request, &url, token.as_ref()).await?;

				if response.status != StatusCode::UNAUTHORIZED {
					return response.error_for_status();
				}

				self.recover_unauthorized(request, url, token, response).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		result
	}

	/// Sends a `GET` and parses the JSON body.
	pub async fn get_json<T>(&self, path: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.send(ApiRequest::get(path)).await?.json()
	}

	/// Sends a `POST` with a JSON body and parses the JSON response.
	pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.send(ApiRequest::post(path).json(body)?).await?.json()
	}

	/// Sends a `PUT` with a JSON body and parses the JSON response.
	pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.send(ApiRequest::put(path).json(body)?).await?.json()
	}

	/// Sends a `PATCH` with a JSON body and parses the JSON response.
	pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.send(ApiRequest::patch(path).json(body)?).await?.json()
	}

	/// Sends a `DELETE`, discarding the response body.
	pub async fn delete(&self, path: &str) -> Result<()> {
		self.send(ApiRequest::delete(path)).await.map(|_| ())
	}

	// Pre-send hook: an unreadable or malformed slot means "no token", never an error.
	async fn current_access_token(&self) -> Option<TokenSecret> {
		match self.store.load().await {
			Ok(credential) => credential.and_then(|credential| credential.access_token),
			Err(e) => {
				obs::record_warning("load_credential", &e);

				None
			},
		}
	}

	async fn dispatch(
		&self,
		request: &ApiRequest,
		url: &Url,
		token: Option<&TokenSecret>,
	) -> Result<ApiResponse> {
		let wire = request.to_http(url, token)?;
		let handle = self.http_client.handle();
		let response = handle.call(wire).await.map_err(|e| http::map_client_error(url, e))?;

		Ok(ApiResponse::from(response))
	}
}
#[cfg(feature = "reqwest")]
impl SessionClient<ReqwestHttpClient> {
	/// Creates a client backed by a default reqwest transport.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Self {
		Self::with_http_client(config, store, ReqwestHttpClient::default())
	}
}
impl<C> Clone for SessionClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			store: self.store.clone(),
			observer: self.observer.clone(),
			config: self.config.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			gate: self.gate.clone(),
		}
	}
}
impl<C> Debug for SessionClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionClient")
			.field("config", &self.config)
			.field("gate", &self.gate)
			.finish()
	}
}
