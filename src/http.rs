//! Transport primitives: the pluggable HTTP seam plus replayable request/response values.
//!
//! [`ApiHttpClient`] is the client's only dependency on an HTTP stack. It hands out
//! [`AsyncHttpClient`] handles from the `oauth2` crate, so any transport that already speaks
//! that trait plugs in unchanged. Requests are kept as [`ApiRequest`] values (method, path,
//! headers, buffered body) so a 401 can be replayed byte-for-byte with a new token.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, TransportError},
};

/// Abstraction over HTTP transports able to execute API calls.
///
/// Implementations must be `Send + Sync + 'static` so one transport can back many clients,
/// and the handles they return must own whatever state the request future needs so that
/// future stays `Send` while a refresh or replay is in flight.
pub trait ApiHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle used for a single call.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle for the next call.
	fn handle(&self) -> Self::Handle;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn handle(&self) -> Self::Handle {
		ReqwestHandle(self.0.clone())
	}
}

/// Handle returned by [`ReqwestHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHandle(ReqwestClient);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.0.clone();

		Box::pin(async move {
			let response =
				client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Replayable description of an API call.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path (or absolute URL) resolved against the configured base URL.
	pub path: String,
	/// Caller-supplied headers. `Authorization` is always overwritten by the client.
	pub headers: HeaderMap,
	/// Buffered request body.
	pub body: Vec<u8>,
	retried: bool,
}
impl ApiRequest {
	/// Creates a request with an empty body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		let mut headers = HeaderMap::new();

		headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

		Self { method, path: path.into(), headers, body: Vec::new(), retried: false }
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Serializes `body` as JSON and sets the content type.
	pub fn json<T>(mut self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = serde_json::to_vec(body).map_err(ConfigError::RequestBody)?;
		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Sets a header, replacing previous values with the same name.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Returns `true` if this request is the replay of an earlier 401.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	pub(crate) fn into_replay(mut self) -> Self {
		self.retried = true;

		self
	}

	/// Builds the wire request for `url`, attaching `token` as a bearer header when usable.
	pub(crate) fn to_http(
		&self,
		url: &Url,
		token: Option<&TokenSecret>,
	) -> Result<HttpRequest, ConfigError> {
		let mut request = Request::builder().method(self.method.clone()).uri(url.as_str());

		if let Some(headers) = request.headers_mut() {
			headers.extend(self.headers.clone());
			headers.remove(AUTHORIZATION);

			if let Some(value) = token.and_then(TokenSecret::bearer_header) {
				headers.insert(AUTHORIZATION, value);
			}
		}

		Ok(request.body(self.body.clone())?)
	}
}

/// Buffered API response.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Returns the body lossily decoded as UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Parses the body as JSON, reporting the failing path on mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::ResponseParse { source, status: self.status.as_u16() })
	}

	/// Converts non-2xx responses into [`Error::Status`].
	pub fn error_for_status(self) -> Result<Self> {
		if self.is_success() {
			Ok(self)
		} else {
			Err(Error::Status { status: self.status.as_u16(), body: self.text() })
		}
	}
}
impl From<HttpResponse> for ApiResponse {
	fn from(response: HttpResponse) -> Self {
		let (parts, body) = response.into_parts();

		Self { status: parts.status, headers: parts.headers, body }
	}
}

/// Maps transport failures into client errors.
pub(crate) fn map_client_error<E>(url: &Url, err: HttpClientError<E>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => TransportError::network(url, *inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) =>
			TransportError::Other { url: url.to_string(), message }.into(),
		other => TransportError::Other { url: url.to_string(), message: format!("{other:?}") }
			.into(),
	}
}
