//! Redacting wrapper for bearer and refresh tokens.

// crates.io
use oauth2::http::HeaderValue;
// self
use crate::_prelude::*;

/// Token secret that keeps sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Wraps `value` unless it is empty or whitespace.
	pub fn non_empty(value: impl Into<String>) -> Option<Self> {
		let value = value.into();

		if value.trim().is_empty() { None } else { Some(Self(value)) }
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Builds a sensitive `Authorization: Bearer` header value.
	///
	/// Returns `None` when the token contains bytes that cannot appear in a header.
	pub fn bearer_header(&self) -> Option<HeaderValue> {
		let mut value = HeaderValue::from_str(&format!("Bearer {}", self.0)).ok()?;

		value.set_sensitive(true);

		Some(value)
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
