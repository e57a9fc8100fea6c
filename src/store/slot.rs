//! JSON layout of the persisted credential slot.
//!
//! The slot mirrors the layout web front-ends persist for their auth store:
//! `{ "state": { "token": "...", "refreshToken": "...", ... }, "version": 0 }`. Fields the
//! client does not understand are carried through rewrites untouched.

// crates.io
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenSecret},
	store::StoreError,
};

/// Top-level persisted document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSlot {
	/// Persisted auth state.
	#[serde(default)]
	pub state: PersistedState,
	/// Schema version written by the owning application.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<u32>,
	/// Unrecognized top-level fields.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// Auth state nested under `state`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
	/// Access token.
	#[serde(default)]
	pub token: Option<String>,
	/// Refresh token.
	#[serde(default)]
	pub refresh_token: Option<String>,
	/// Unrecognized state fields (user profile, flags, ...).
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl PersistedSlot {
	/// Parses raw slot text.
	pub fn parse(raw: &str) -> Result<Self, StoreError> {
		let mut de = serde_json::Deserializer::from_str(raw);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|e| StoreError::Serialization { message: format!("Malformed slot: {e}") })
	}

	/// Serializes the slot back to text.
	pub fn render(&self) -> Result<String, StoreError> {
		serde_json::to_string(self).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize slot: {e}"),
		})
	}

	/// Extracts the credential, treating blank tokens as absent.
	pub fn credential(&self) -> Option<Credential> {
		let credential = Credential {
			access_token: self.state.token.clone().and_then(TokenSecret::non_empty),
			refresh_token: self.state.refresh_token.clone().and_then(TokenSecret::non_empty),
		};

		(!credential.is_empty()).then_some(credential)
	}

	/// Overwrites both tokens with the values in `credential`.
	pub fn apply(&mut self, credential: &Credential) {
		self.state.token = credential.access_token.as_ref().map(|s| s.expose().to_owned());
		self.state.refresh_token = credential.refresh_token.as_ref().map(|s| s.expose().to_owned());
	}
}

/// Decodes raw slot text into a credential.
pub fn decode(raw: &str) -> Result<Option<Credential>, StoreError> {
	if raw.trim().is_empty() {
		return Ok(None);
	}

	Ok(PersistedSlot::parse(raw)?.credential())
}

/// Produces new slot text holding `credential`, preserving whatever else `previous` stored.
///
/// A malformed `previous` document is replaced wholesale.
pub fn encode(previous: Option<&str>, credential: &Credential) -> Result<String, StoreError> {
	let mut slot = previous
		.filter(|raw| !raw.trim().is_empty())
		.and_then(|raw| PersistedSlot::parse(raw).ok())
		.unwrap_or_default();

	slot.apply(credential);
	slot.render()
}
