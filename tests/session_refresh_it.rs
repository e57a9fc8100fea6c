#![cfg(feature = "reqwest")]

mod support;

// std
use std::time::Duration;
// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use bearer_session::{
	auth::{Credential, TokenSecret},
	error::Error,
	http::ApiRequest,
	session::ExpiryReason,
	store::{CredentialStore, MemoryStore},
};
use support::*;

fn exposed(secret: Option<&TokenSecret>) -> Option<&str> {
	secret.map(TokenSecret::expose)
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
	let server = MockServer::start_async().await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/items").header("authorization", "Bearer old");
			then.status(401);
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/items").header("authorization", "Bearer new");
			then.status(200).header("content-type", "application/json").json_body(json!({ "ok": true }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").json_body(json!({ "refresh_token": "r1" }));
			then.status(200)
				.header("content-type", "application/json")
				.delay(Duration::from_millis(200))
				.json_body(json!({ "access_token": "new", "refresh_token": "r2" }));
		})
		.await;
	let (client, store, observer) = build_client(&server, seeded_store("old", "r1"));
	let (first, second) =
		tokio::join!(client.get_json::<Value>("/items"), client.get_json::<Value>("/items"));

	assert_eq!(first.expect("First request should succeed after the refresh."), json!({ "ok": true }));
	assert_eq!(second.expect("Second request should succeed after the refresh."), json!({ "ok": true }));

	refresh.assert_calls_async(1).await;
	stale.assert_calls_async(2).await;
	fresh.assert_calls_async(2).await;

	let credential = stored(&store).await.expect("Refreshed credential should be stored.");

	assert_eq!(exposed(credential.access_token.as_ref()), Some("new"));
	assert_eq!(exposed(credential.refresh_token.as_ref()), Some("r2"));
	assert_eq!(observer.calls(), 0);
	assert_eq!(client.refresh_metrics.attempts(), 1);
	assert_eq!(client.refresh_metrics.successes(), 1);
	assert_eq!(client.refresh_metrics.coalesced(), 1);
	assert!(!client.gate().is_refreshing());
}

#[tokio::test]
async fn rejected_refresh_clears_credentials_and_notifies_once() {
	let server = MockServer::start_async().await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/items").header("authorization", "Bearer old");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(401).body("{\"detail\":\"refresh token revoked\"}");
		})
		.await;
	let (client, store, observer) = build_client(&server, seeded_store("old", "r1"));
	let err = client
		.get_json::<Value>("/items")
		.await
		.expect_err("Request should fail once the refresh is rejected.");

	assert!(
		matches!(err, Error::SessionExpired { reason: ExpiryReason::RefreshRejected { status: 401 } }),
		"Unexpected error: {err:?}."
	);

	stale.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;

	assert!(store.raw().is_none());
	assert_eq!(observer.calls(), 1);

	let event = observer.events().remove(0);

	assert_eq!(event.login_route, "/login");
	assert_eq!(event.reason, ExpiryReason::RefreshRejected { status: 401 });
}

#[tokio::test]
async fn replay_is_attempted_only_once() {
	let server = MockServer::start_async().await;
	let protected = server
		.mock_async(|when, then| {
			when.method(GET).path("/items");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "access_token": "new", "refresh_token": "r2" }));
		})
		.await;
	let (client, _store, observer) = build_client(&server, seeded_store("old", "r1"));
	let err = client
		.get_json::<Value>("/items")
		.await
		.expect_err("A replay that still answers 401 should fail.");

	assert_eq!(err.status(), Some(401));

	protected.assert_calls_async(2).await;
	refresh.assert_calls_async(1).await;

	assert_eq!(observer.calls(), 0);
}

#[tokio::test]
async fn missing_refresh_token_expires_without_network_refresh() {
	let server = MockServer::start_async().await;
	let protected = server
		.mock_async(|when, then| {
			when.method(GET).path("/items").header("authorization", "Bearer t1");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200);
		})
		.await;
	let (client, store, observer) =
		build_client(&server, MemoryStore::with_raw("{\"state\":{\"token\":\"t1\"}}"));
	let err = client
		.get_json::<Value>("/items")
		.await
		.expect_err("Request should fail without a refresh token.");

	assert!(err.is_session_expired());

	protected.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert!(store.raw().is_none());
	assert_eq!(observer.reasons(), vec![ExpiryReason::MissingRefreshToken]);
}

#[tokio::test]
async fn repeated_anonymous_unauthorized_requests_notify_each_time() {
	let server = MockServer::start_async().await;
	let anonymous = server
		.mock_async(|when, then| {
			when.method(GET).path("/items").header_missing("authorization");
			then.status(401);
		})
		.await;
	let (client, _store, observer) = build_client(&server, MemoryStore::default());

	for expected_calls in 1..=2 {
		let err = client
			.get_json::<Value>("/items")
			.await
			.expect_err("Anonymous request should fail without a refresh token.");

		assert!(
			matches!(err, Error::SessionExpired { reason: ExpiryReason::MissingRefreshToken }),
			"Unexpected error: {err:?}."
		);
		assert_eq!(observer.calls(), expected_calls);
	}

	anonymous.assert_calls_async(2).await;

	assert_eq!(client.refresh_metrics.attempts(), 2);
	assert_eq!(client.refresh_metrics.coalesced(), 0);
}

#[tokio::test]
async fn anonymous_unauthorized_refreshes_once_a_refresh_token_is_stored() {
	let server = MockServer::start_async().await;
	let _anonymous = server
		.mock_async(|when, then| {
			when.method(GET).path("/items").header_missing("authorization");
			then.status(401);
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/items").header("authorization", "Bearer new");
			then.status(200).header("content-type", "application/json").json_body(json!({}));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").json_body(json!({ "refresh_token": "r1" }));
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "access_token": "new", "refresh_token": "r2" }));
		})
		.await;
	let (client, store, observer) = build_client(&server, MemoryStore::default());

	client.get_json::<Value>("/items").await.expect_err("First request has nothing to refresh.");

	assert_eq!(observer.reasons(), vec![ExpiryReason::MissingRefreshToken]);

	// Another component writes a refresh token into the shared slot.
	store
		.save(Credential { access_token: None, refresh_token: Some(TokenSecret::new("r1")) })
		.await
		.expect("Refresh token should be stored.");

	client.get_json::<Value>("/items").await.expect("Request should succeed after the refresh.");

	refresh.assert_calls_async(1).await;
	fresh.assert_calls_async(1).await;

	assert_eq!(observer.calls(), 1);
}

#[tokio::test]
async fn refresh_endpoint_is_called_without_a_bearer_header() {
	let server = MockServer::start_async().await;
	let _stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/items").header("authorization", "Bearer old");
			then.status(401);
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/items").header("authorization", "Bearer new");
			then.status(200).header("content-type", "application/json").json_body(json!([]));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").header_missing("authorization");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "access_token": "new", "refresh_token": "r2" }));
		})
		.await;
	let (client, _store, _observer) = build_client(&server, seeded_store("old", "r1"));
	let items: Vec<Value> =
		client.get_json("/items").await.expect("Request should succeed after the refresh.");

	assert!(items.is_empty());

	refresh.assert_calls_async(1).await;
	fresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn malformed_refresh_body_ends_the_session() {
	let server = MockServer::start_async().await;
	let _stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/items");
			then.status(401);
		})
		.await;
	let _refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).header("content-type", "application/json").body("{\"token\":1}");
		})
		.await;
	let (client, store, observer) = build_client(&server, seeded_store("old", "r1"));
	let err = client
		.get_json::<Value>("/items")
		.await
		.expect_err("A malformed refresh body should end the session.");

	assert!(
		matches!(err, Error::SessionExpired { reason: ExpiryReason::RefreshFailed { .. } }),
		"Unexpected error: {err:?}."
	);
	assert!(store.raw().is_none());
	assert_eq!(observer.calls(), 1);
}

#[tokio::test]
async fn refreshed_slot_keeps_unrelated_state() {
	let server = MockServer::start_async().await;
	let _stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/items").header("authorization", "Bearer old");
			then.status(401);
		})
		.await;
	let _fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/items").header("authorization", "Bearer new");
			then.status(204);
		})
		.await;
	let _refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "access_token": "new", "refresh_token": "r2" }));
		})
		.await;
	let raw = json!({
		"state": { "token": "old", "refreshToken": "r1", "user": { "id": 7 } },
		"version": 0
	});
	let (client, store, _observer) = build_client(&server, MemoryStore::with_raw(raw.to_string()));

	let response =
		client.send(ApiRequest::get("/items")).await.expect("Replay should succeed after the refresh.");

	assert_eq!(response.status.as_u16(), 204);

	let slot: Value = serde_json::from_str(&store.raw().expect("Slot should still exist."))
		.expect("Slot should stay valid JSON.");

	assert_eq!(slot["state"]["token"], "new");
	assert_eq!(slot["state"]["refreshToken"], "r2");
	assert_eq!(slot["state"]["user"]["id"], 7);
	assert_eq!(slot["version"], 0);
}
