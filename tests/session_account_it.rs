#![cfg(feature = "reqwest")]

mod support;

// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use bearer_session::{
	auth::TokenSecret, error::Error, session::ExpiryReason, store::MemoryStore,
};
use support::*;

#[tokio::test]
async fn login_stores_the_issued_pair_and_attaches_it() {
	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/login")
				.header_missing("authorization")
				.json_body(json!({ "email": "ada@example.com", "password": "hunter2" }));
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "access_token": "a1", "refresh_token": "r1", "token_type": "bearer" }));
		})
		.await;
	let me = server
		.mock_async(|when, then| {
			when.method(GET).path("/auth/me").header("authorization", "Bearer a1");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "id": 1, "email": "ada@example.com" }));
		})
		.await;
	let (client, store, observer) = build_client(&server, MemoryStore::default());
	let credential =
		client.login("ada@example.com", "hunter2").await.expect("Login should succeed.");

	assert_eq!(credential.access_token.as_ref().map(TokenSecret::expose), Some("a1"));

	let profile = client.me().await.expect("Profile request should succeed.");

	assert_eq!(profile.get("email"), Some(&json!("ada@example.com")));

	login.assert_calls_async(1).await;
	me.assert_calls_async(1).await;

	let persisted = stored(&store).await.expect("Login should persist the credential.");

	assert_eq!(persisted.refresh_token.as_ref().map(TokenSecret::expose), Some("r1"));
	assert_eq!(observer.calls(), 0);
}

#[tokio::test]
async fn rejected_login_never_refreshes() {
	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/login");
			then.status(401).body("{\"detail\":\"bad credentials\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200);
		})
		.await;
	let (client, store, observer) = build_client(&server, seeded_store("old", "r1"));
	let err = client
		.login("ada@example.com", "wrong")
		.await
		.expect_err("Login with bad credentials should fail.");

	match err {
		Error::Status { status, body } => {
			assert_eq!(status, 401);
			assert!(body.contains("bad credentials"));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	login.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert!(store.raw().is_none());
	assert_eq!(observer.reasons(), vec![ExpiryReason::AuthEndpointRejected {
		endpoint: "/auth/login".into()
	}]);
}

#[tokio::test]
async fn excluded_paths_fail_without_refreshing() {
	let server = MockServer::start_async().await;
	let _hook = server
		.mock_async(|when, then| {
			when.method(POST).path("/hooks/verify");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200);
		})
		.await;
	let config = config_builder(&server.base_url())
		.exclude_path("/hooks/verify")
		.login_route("/signin")
		.build()
		.expect("Config with an excluded path should build.");
	let (client, _store, observer) = build_client_with(config, seeded_store("old", "r1"));
	let err = client
		.post_json::<_, Value>("/hooks/verify", &json!({ "code": "123" }))
		.await
		.expect_err("Excluded endpoint should fail with 401.");

	assert_eq!(err.status(), Some(401));

	refresh.assert_calls_async(0).await;

	assert_eq!(observer.events()[0].login_route, "/signin");
}

#[tokio::test]
async fn register_posts_optional_name() {
	let server = MockServer::start_async().await;
	let register = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/register")
				.json_body(json!({ "email": "ada@example.com", "password": "hunter2" }));
			then.status(201)
				.header("content-type", "application/json")
				.json_body(json!({ "id": "u-1" }));
		})
		.await;
	let (client, _store, _observer) = build_client(&server, MemoryStore::default());
	let created = client
		.register("ada@example.com", "hunter2", None)
		.await
		.expect("Registration should succeed.");

	assert_eq!(created.get("id").map(String::as_str), Some("u-1"));

	register.assert_calls_async(1).await;
}

#[tokio::test]
async fn logout_clears_without_notifying() {
	let server = MockServer::start_async().await;
	let (client, store, observer) = build_client(&server, seeded_store("a1", "r1"));

	client.logout().await.expect("Logout should succeed.");

	assert!(store.raw().is_none());
	assert_eq!(observer.calls(), 0);
}

#[tokio::test]
async fn unreadable_slot_sends_without_authorization() {
	let server = MockServer::start_async().await;
	let anonymous = server
		.mock_async(|when, then| {
			when.method(GET).path("/public").header_missing("authorization");
			then.status(200).header("content-type", "application/json").json_body(json!({}));
		})
		.await;
	let (client, _store, _observer) = build_client(&server, MemoryStore::with_raw("{not json"));
	let _: Value = client.get_json("/public").await.expect("Anonymous request should succeed.");

	anonymous.assert_calls_async(1).await;
}

#[tokio::test]
async fn non_unauthorized_failures_pass_through() {
	let server = MockServer::start_async().await;
	let _missing = server
		.mock_async(|when, then| {
			when.method(PATCH).path("/items/9");
			then.status(404).body("no such item");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200);
		})
		.await;
	let (client, store, observer) = build_client(&server, seeded_store("a1", "r1"));
	let err = client
		.patch_json::<_, Value>("/items/9", &json!({ "done": true }))
		.await
		.expect_err("Missing item should fail.");

	assert!(matches!(err, Error::Status { status: 404, ref body } if body == "no such item"));

	refresh.assert_calls_async(0).await;

	assert!(store.raw().is_some());
	assert_eq!(observer.calls(), 0);
}
