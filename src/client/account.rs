//! Account endpoints that create, read, and destroy the stored credential.

// self
use crate::{
	_prelude::*,
	auth::{Credential, LoginRequest, RegisterRequest, TokenPair},
	client::SessionClient,
	http::{ApiHttpClient, ApiRequest},
};

impl<C> SessionClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Exchanges email + password for a token pair and stores it.
	///
	/// A 401 here never triggers a refresh; it clears any stored credential and notifies the
	/// observer like every other terminal authentication failure.
	pub async fn login(&self, email: &str, password: &str) -> Result<Credential> {
		let request = ApiRequest::post(self.config.endpoints.login.as_str())
			.json(&LoginRequest { email, password })?;
		let pair: TokenPair = self.send(request).await?.json()?;
		let credential = Credential::from(pair);

		self.store.save(credential.clone()).await?;
		self.gate.reset();

		Ok(credential)
	}

	/// Creates an account. The backend answers with a flat string map (e.g. the new user id).
	pub async fn register(
		&self,
		email: &str,
		password: &str,
		name: Option<&str>,
	) -> Result<BTreeMap<String, String>> {
		self.post_json(&self.config.endpoints.register, &RegisterRequest { email, password, name })
			.await
	}

	/// Fetches the signed-in user's profile.
	pub async fn me(&self) -> Result<BTreeMap<String, serde_json::Value>> {
		self.get_json(&self.config.endpoints.me).await
	}

	/// Deletes the stored credential without notifying the observer.
	pub async fn logout(&self) -> Result<()> {
		self.store.clear().await?;
		self.gate.reset();

		Ok(())
	}
}
