//! Demonstrates plugging a non-reqwest transport into the client.
//!
//! 1. Implement [`ApiHttpClient`] so the client can ask for a fresh [`AsyncHttpClient`] handle.
//! 2. Return [`HttpClientError`] values from the handle; the client maps them into
//!    [`Error::Transport`].
//! 3. Pass the transport to [`SessionClient::with_http_client`].

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::Arc,
};
// crates.io
use color_eyre::Result;
use url::Url;
// self
use bearer_session::{
	auth::Credential,
	client::SessionClient,
	config::ClientConfig,
	error::Error,
	http::ApiHttpClient,
	oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http::StatusCode},
	store::{CredentialStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ClientConfig::builder(Url::parse("https://api.example.com/")?).build()?;
	let store: Arc<dyn CredentialStore> =
		Arc::new(MemoryStore::with_credential(&Credential::new("demo-access", "demo-refresh"))?);
	let client: SessionClient<CannedHttpClient> = SessionClient::with_http_client(
		config.clone(),
		Arc::clone(&store),
		CannedHttpClient::Online,
	);
	let response = client.get_json::<serde_json::Value>("/entries").await?;

	println!("Canned transport answered: {response}.");

	let offline: SessionClient<CannedHttpClient> =
		SessionClient::with_http_client(config, store, CannedHttpClient::Offline);

	match offline.get_json::<serde_json::Value>("/entries").await {
		Err(Error::Transport(e)) => println!("Offline transport surfaced: {e}"),
		other => println!("Unexpected offline result: {other:?}."),
	}

	Ok(())
}

#[derive(Debug)]
struct OfflineError;
impl Display for OfflineError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("network is unreachable")
	}
}
impl StdError for OfflineError {}

#[derive(Clone, Copy)]
enum CannedHttpClient {
	Online,
	Offline,
}
impl ApiHttpClient for CannedHttpClient {
	type Handle = CannedHandle;
	type TransportError = OfflineError;

	fn handle(&self) -> Self::Handle {
		CannedHandle(*self)
	}
}

struct CannedHandle(CannedHttpClient);
impl<'c> AsyncHttpClient<'c> for CannedHandle {
	type Error = HttpClientError<OfflineError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let mode = self.0;

		Box::pin(async move {
			match mode {
				CannedHttpClient::Online => {
					let body = format!("{{\"path\":\"{}\"}}", request.uri().path());
					let mut response = HttpResponse::new(body.into_bytes());

					*response.status_mut() = StatusCode::OK;

					Ok(response)
				},
				CannedHttpClient::Offline => Err(HttpClientError::Reqwest(Box::new(OfflineError))),
			}
		})
	}
}
