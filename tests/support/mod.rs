//! Fixtures shared by the integration suites.

#![allow(dead_code, unused_imports)]

// std
use std::sync::Arc;
// crates.io
#[cfg(feature = "reqwest")] use httpmock::MockServer;
use parking_lot::Mutex;
// self
#[cfg(feature = "reqwest")] use bearer_session::client::ReqwestSessionClient;
use bearer_session::{
	auth::Credential,
	config::{ClientConfig, ClientConfigBuilder},
	session::{ExpiryReason, SessionExpired, SessionObserver},
	store::{CredentialStore, MemoryStore},
	url::Url,
};

/// Observer that keeps every expiry notification for later assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
	events: Mutex<Vec<SessionExpired>>,
}
impl RecordingObserver {
	pub fn calls(&self) -> usize {
		self.events.lock().len()
	}

	pub fn reasons(&self) -> Vec<ExpiryReason> {
		self.events.lock().iter().map(|event| event.reason.clone()).collect()
	}

	pub fn events(&self) -> Vec<SessionExpired> {
		self.events.lock().clone()
	}
}
impl SessionObserver for RecordingObserver {
	fn on_session_expired(&self, event: &SessionExpired) {
		self.events.lock().push(event.clone());
	}
}

pub fn config_builder(base_url: &str) -> ClientConfigBuilder {
	ClientConfig::builder(Url::parse(base_url).expect("Mock base URL should parse."))
}

pub fn seeded_store(access: &str, refresh: &str) -> MemoryStore {
	MemoryStore::with_credential(&Credential::new(access, refresh))
		.expect("Credential fixture should encode.")
}

#[cfg(feature = "reqwest")]
pub fn build_client(
	server: &MockServer,
	store_backend: MemoryStore,
) -> (ReqwestSessionClient, Arc<MemoryStore>, Arc<RecordingObserver>) {
	let config = config_builder(&server.base_url()).build().expect("Mock config should build.");

	build_client_with(config, store_backend)
}

#[cfg(feature = "reqwest")]
pub fn build_client_with(
	config: ClientConfig,
	store_backend: MemoryStore,
) -> (ReqwestSessionClient, Arc<MemoryStore>, Arc<RecordingObserver>) {
	let store_backend = Arc::new(store_backend);
	let store: Arc<dyn CredentialStore> = store_backend.clone();
	let observer = Arc::new(RecordingObserver::default());
	let client = ReqwestSessionClient::new(config, store).with_observer(observer.clone());

	(client, store_backend, observer)
}

pub async fn stored(store: &MemoryStore) -> Option<Credential> {
	store.load().await.expect("Store fixture should decode.")
}
