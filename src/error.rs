//! Client-level error types shared across the transport, credential stores, and refresh flow.

// self
use crate::{_prelude::*, session::ExpiryReason};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Backend answered with a non-success status that the client does not recover from.
	#[error("Request failed with HTTP {status}.")]
	Status {
		/// HTTP status code returned by the backend.
		status: u16,
		/// Response body, lossily decoded as UTF-8.
		body: String,
	},
	/// Response body did not match the expected JSON shape.
	#[error("Response body could not be parsed.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// The session could not be recovered.
	///
	/// Credentials were cleared and the observer was notified, except for
	/// [`ExpiryReason::Abandoned`], where the refreshing caller went away and the session is
	/// left untouched.
	#[error("Session expired: {reason}")]
	SessionExpired {
		/// Why the session could not be recovered.
		reason: ExpiryReason,
	},
}
impl Error {
	/// Returns the HTTP status attached to the error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } | Self::ResponseParse { status, .. } => Some(*status),
			_ => None,
		}
	}

	/// Returns `true` when the error ended the session.
	pub fn is_session_expired(&self) -> bool {
		matches!(self, Self::SessionExpired { reason } if !reason.is_retryable())
	}
}
impl From<ExpiryReason> for Error {
	fn from(reason: ExpiryReason) -> Self {
		Self::SessionExpired { reason }
	}
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Client configuration failed validation.
	#[error(transparent)]
	Client(#[from] crate::config::ClientConfigError),
	/// A request path could not be resolved against the base URL.
	#[error("Path `{path}` cannot be resolved against the base URL.")]
	InvalidPath {
		/// Offending request path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	RequestBody(#[source] serde_json::Error),
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Request URL that failed.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
	/// Transport reported a failure without a typed source.
	#[error("HTTP client error occurred while calling {url}: {message}.")]
	Other {
		/// Request URL that failed.
		url: String,
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: &Url, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { url: url.to_string(), source: Box::new(src) }
	}
}
