//! Session-expiry port: why a session ended and who gets told about it.
//!
//! Browsers navigate to the login screen when a session cannot be recovered; this crate
//! models that side effect as a [`SessionObserver`] so callers decide what "go to login"
//! means in their environment (close a UI, prompt on a terminal, flip a flag in tests).

// self
use crate::{_prelude::*, obs};

/// Reason a session could not be recovered.
///
/// The same value is handed to the refresh leader and to every follower waiting on it, so it
/// stays cheap to clone and carries no transport-specific error objects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpiryReason {
	/// The persisted credential has no refresh token.
	MissingRefreshToken,
	/// The login or refresh endpoint itself answered 401.
	AuthEndpointRejected {
		/// Path of the endpoint that rejected the call.
		endpoint: String,
	},
	/// The refresh endpoint answered with a non-success status.
	RefreshRejected {
		/// HTTP status returned by the refresh endpoint.
		status: u16,
	},
	/// The refresh call failed before a usable response arrived.
	RefreshFailed {
		/// Human-readable failure summary.
		message: String,
	},
	/// New credentials could not be persisted while strict persistence is enabled.
	PersistenceFailed {
		/// Human-readable failure summary.
		message: String,
	},
	/// The refreshing caller was dropped before its cascade settled.
	///
	/// Nothing was cleared and no observer was notified; the request may be retried.
	Abandoned,
}
impl ExpiryReason {
	/// Returns `true` if the session itself is intact and the request can be sent again.
	pub const fn is_retryable(&self) -> bool {
		matches!(self, Self::Abandoned)
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::MissingRefreshToken => "missing_refresh_token",
			Self::AuthEndpointRejected { .. } => "auth_endpoint_rejected",
			Self::RefreshRejected { .. } => "refresh_rejected",
			Self::RefreshFailed { .. } => "refresh_failed",
			Self::PersistenceFailed { .. } => "persistence_failed",
			Self::Abandoned => "abandoned",
		}
	}
}
impl Display for ExpiryReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::MissingRefreshToken => f.write_str("no refresh token is stored."),
			Self::AuthEndpointRejected { endpoint } =>
				write!(f, "authentication endpoint {endpoint} answered 401."),
			Self::RefreshRejected { status } =>
				write!(f, "refresh endpoint answered HTTP {status}."),
			Self::RefreshFailed { message } => write!(f, "refresh call failed: {message}."),
			Self::PersistenceFailed { message } =>
				write!(f, "refreshed credentials could not be stored: {message}."),
			Self::Abandoned => f.write_str("the refresh was abandoned before it settled."),
		}
	}
}

/// Notification emitted once per failure cascade.
#[derive(Clone, Debug)]
pub struct SessionExpired {
	/// Why the session ended.
	pub reason: ExpiryReason,
	/// Route the user should be sent to in order to sign in again.
	pub login_route: String,
	/// Instant the session was declared expired.
	pub occurred_at: OffsetDateTime,
}
impl SessionExpired {
	pub(crate) fn new(reason: ExpiryReason, login_route: impl Into<String>) -> Self {
		Self { reason, login_route: login_route.into(), occurred_at: OffsetDateTime::now_utc() }
	}
}

/// Receives session-expiry notifications.
///
/// Implementations must not block; they run on the task that observed the failure.
pub trait SessionObserver
where
	Self: Send + Sync,
{
	/// Called after credentials were cleared because the session cannot be recovered.
	fn on_session_expired(&self, event: &SessionExpired);
}
impl<F> SessionObserver for F
where
	F: Fn(&SessionExpired) + Send + Sync,
{
	fn on_session_expired(&self, event: &SessionExpired) {
		self(event)
	}
}

/// Default observer that only logs the expiry.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;
impl SessionObserver for LogObserver {
	fn on_session_expired(&self, event: &SessionExpired) {
		obs::record_warning("session_expired", &format_args!(
			"{} Sign in again at {}.",
			event.reason, event.login_route
		));
	}
}
