//! Persisted credential pair and the JSON payloads exchanged with the `/auth` endpoints.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access/refresh token pair read before every request and rewritten after every refresh.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential {
	/// Short-lived bearer token attached to API calls.
	pub access_token: Option<TokenSecret>,
	/// Longer-lived token exchanged for a new access token.
	pub refresh_token: Option<TokenSecret>,
}
impl Credential {
	/// Creates a credential holding both tokens.
	pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::non_empty(access_token),
			refresh_token: TokenSecret::non_empty(refresh_token),
		}
	}

	/// Creates a credential that carries only an access token.
	pub fn access_only(access_token: impl Into<String>) -> Self {
		Self { access_token: TokenSecret::non_empty(access_token), refresh_token: None }
	}

	/// Returns `true` if neither token is present.
	pub fn is_empty(&self) -> bool {
		self.access_token.is_none() && self.refresh_token.is_none()
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Successful body of the login and refresh endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenPair {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Newly issued refresh token.
	pub refresh_token: TokenSecret,
	/// Token type advertised by the backend.
	#[serde(default = "TokenPair::default_token_type")]
	pub token_type: String,
}
impl TokenPair {
	fn default_token_type() -> String {
		"bearer".into()
	}
}
impl From<TokenPair> for Credential {
	fn from(pair: TokenPair) -> Self {
		Self::new(pair.access_token.expose(), pair.refresh_token.expose())
	}
}

/// Body of `POST /auth/refresh`.
#[derive(Clone, Debug, Serialize)]
pub struct RefreshRequest<'a> {
	/// Refresh token to exchange.
	pub refresh_token: &'a str,
}

/// Body of `POST /auth/login`.
#[derive(Clone, Debug, Serialize)]
pub struct LoginRequest<'a> {
	/// Account email.
	pub email: &'a str,
	/// Account password.
	pub password: &'a str,
}

/// Body of `POST /auth/register`.
#[derive(Clone, Debug, Serialize)]
pub struct RegisterRequest<'a> {
	/// Account email.
	pub email: &'a str,
	/// Account password.
	pub password: &'a str,
	/// Optional display name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<&'a str>,
}
