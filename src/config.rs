//! Client configuration: base URL, auth endpoint paths, and persistence policy.

// self
use crate::{_prelude::*, error::ConfigError};

/// Errors raised while constructing or validating a [`ClientConfig`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ClientConfigError {
	/// Base URL must use HTTP or HTTPS.
	#[error("The base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Base URL cannot have relative paths joined onto it.
	#[error("The base URL cannot be used as a base: {url}.")]
	InvalidBaseUrl {
		/// Base URL that failed validation.
		url: String,
	},
	/// An endpoint path was blank.
	#[error("The {endpoint} endpoint path must not be empty.")]
	EmptyPath {
		/// Which endpoint failed validation.
		endpoint: &'static str,
	},
	/// Login route must be an absolute in-app route.
	#[error("The login route must start with `/`: {route}.")]
	InvalidLoginRoute {
		/// Route that failed validation.
		route: String,
	},
}

/// What to do when refreshed credentials cannot be written back to storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistencePolicy {
	/// Log the failure and continue with the in-memory token.
	#[default]
	BestEffort,
	/// Treat the failure as session-terminal.
	Strict,
}

/// Paths of the authentication endpoints, relative to the base URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEndpoints {
	/// Credential-issuing login endpoint.
	pub login: String,
	/// Token refresh endpoint.
	pub refresh: String,
	/// Account registration endpoint.
	pub register: String,
	/// Current-user endpoint.
	pub me: String,
}
impl Default for AuthEndpoints {
	fn default() -> Self {
		Self {
			login: "/auth/login".into(),
			refresh: "/auth/refresh".into(),
			register: "/auth/register".into(),
			me: "/auth/me".into(),
		}
	}
}

/// Validated client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Base URL every request path is resolved against. Always ends with `/`.
	pub base_url: Url,
	/// Authentication endpoint paths.
	pub endpoints: AuthEndpoints,
	/// Extra paths whose 401 responses are terminal instead of triggering a refresh.
	pub excluded_paths: Vec<String>,
	/// Route reported to the session observer when the user must sign in again.
	pub login_route: String,
	/// Handling of persistence failures after a successful refresh.
	pub persistence: PersistencePolicy,
}
impl ClientConfig {
	/// Returns a builder seeded with the default endpoint layout.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Resolves a request path (or absolute URL) against the base URL.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		self.base_url
			.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })
	}

	/// Returns `true` if a 401 from `url` must never trigger a refresh.
	pub fn is_auth_endpoint(&self, url: &Url) -> bool {
		[&self.endpoints.login, &self.endpoints.refresh]
			.into_iter()
			.chain(self.excluded_paths.iter())
			.filter_map(|path| self.endpoint(path).ok())
			.any(|endpoint| endpoint.path() == url.path())
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL for the backend API.
	pub base_url: Url,
	/// Authentication endpoint paths.
	pub endpoints: AuthEndpoints,
	/// Extra excluded paths.
	pub excluded_paths: Vec<String>,
	/// Login route reported on expiry.
	pub login_route: String,
	/// Persistence policy after refresh.
	pub persistence: PersistencePolicy,
}
impl ClientConfigBuilder {
	/// Creates a builder for the provided base URL.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			endpoints: AuthEndpoints::default(),
			excluded_paths: Vec::new(),
			login_route: "/login".into(),
			persistence: PersistencePolicy::default(),
		}
	}

	/// Overrides the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.login = path.into();

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.refresh = path.into();

		self
	}

	/// Overrides the registration endpoint path.
	pub fn register_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.register = path.into();

		self
	}

	/// Overrides the current-user endpoint path.
	pub fn me_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.me = path.into();

		self
	}

	/// Adds a path whose 401 responses are terminal.
	pub fn exclude_path(mut self, path: impl Into<String>) -> Self {
		self.excluded_paths.push(path.into());

		self
	}

	/// Overrides the route reported to the session observer.
	pub fn login_route(mut self, route: impl Into<String>) -> Self {
		self.login_route = route.into();

		self
	}

	/// Overrides the persistence policy.
	pub fn persistence(mut self, policy: PersistencePolicy) -> Self {
		self.persistence = policy;

		self
	}

	/// Validates the builder and returns a [`ClientConfig`].
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		let Self { mut base_url, endpoints, excluded_paths, login_route, persistence } = self;

		if !matches!(base_url.scheme(), "http" | "https") {
			return Err(ClientConfigError::UnsupportedScheme { url: base_url.to_string() });
		}
		if base_url.cannot_be_a_base() {
			return Err(ClientConfigError::InvalidBaseUrl { url: base_url.to_string() });
		}
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		for (endpoint, path) in [
			("login", &endpoints.login),
			("refresh", &endpoints.refresh),
			("register", &endpoints.register),
			("me", &endpoints.me),
		] {
			if path.trim().is_empty() {
				return Err(ClientConfigError::EmptyPath { endpoint });
			}
		}
		if excluded_paths.iter().any(|path| path.trim().is_empty()) {
			return Err(ClientConfigError::EmptyPath { endpoint: "excluded" });
		}
		if !login_route.starts_with('/') {
			return Err(ClientConfigError::InvalidLoginRoute { route: login_route });
		}

		Ok(ClientConfig { base_url, endpoints, excluded_paths, login_route, persistence })
	}
}
