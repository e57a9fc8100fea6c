//! Demonstrates signing in, calling an authenticated endpoint, and recovering from an expired
//! access token with the default reqwest transport and in-memory credential slot.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::{Value, json};
use url::Url;
// self
use bearer_session::{
	client::ReqwestSessionClient,
	config::ClientConfig,
	session::SessionExpired,
	store::{CredentialStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/login");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "access_token": "expired", "refresh_token": "demo-refresh" }));
		})
		.await;
	let _expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/entries").header("authorization", "Bearer expired");
			then.status(401);
		})
		.await;
	let entries = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/entries").header("authorization", "Bearer rotated");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!([{ "id": 1, "title": "Hello, feeds." }]));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "access_token": "rotated", "refresh_token": "demo-refresh-2" }));
		})
		.await;
	let config = ClientConfig::builder(Url::parse(&server.url("/api"))?).build()?;
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
	let observer = |event: &SessionExpired| {
		println!("Sign in again at {}: {}", event.login_route, event.reason);
	};
	let client = ReqwestSessionClient::new(config, store).with_observer(Arc::new(observer));

	client.login("demo@example.com", "demo-password").await?;

	let items: Vec<Value> = client.get_json("entries").await?;

	println!(
		"Fetched {} entries after {} refresh.",
		items.len(),
		client.refresh_metrics.successes()
	);

	login.assert_async().await;
	refresh.assert_async().await;
	entries.assert_async().await;

	Ok(())
}
