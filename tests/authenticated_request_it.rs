mod common;

// std
use std::sync::Arc;
// crates.io
use serde_json::json;
use time::{Duration, OffsetDateTime};
// self
use common::*;
use secure_token_manager::{
	auth::TokenRecord,
	error::{Error, RefreshError},
	http::{
		HttpRequest,
		http::{Method, StatusCode, header::AUTHORIZATION},
	},
	request::AuthenticatedRequestHelper,
};

const API_URL: &str = "https://api.example.com/v1/me";

fn api_request() -> HttpRequest {
	let mut request = HttpRequest::new(Vec::new());

	*request.method_mut() = Method::GET;
	*request.uri_mut() = API_URL.parse().expect("API URI should parse.");

	request
}

async fn signed_in() -> (Harness, AuthenticatedRequestHelper<ScriptedTransport>) {
	let h = harness();

	h.manager
		.store_tokens(&record("A", Some("R"), Duration::hours(1)))
		.await
		.expect("Seeding tokens should succeed.");

	let helper = AuthenticatedRequestHelper::new(Arc::clone(&h.manager));

	(h, helper)
}

#[tokio::test]
async fn unauthorized_responses_refresh_once_and_retry() {
	let (h, helper) = signed_in().await;

	h.transport
		.push_status(401)
		.push_json(200, json!({ "accessToken": "B", "expiresIn": 3600 }))
		.push_body(200, "hello");

	let response = helper.call(api_request()).await.expect("The retried call should succeed.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(response.body().as_slice(), b"hello");

	let requests = h.transport.requests();

	assert_eq!(requests.len(), 3);
	assert_eq!(requests[0].uri, API_URL);
	assert_eq!(requests[0].authorization.as_deref(), Some("Bearer A"));
	assert_eq!(requests[1].uri, REFRESH_ENDPOINT);
	assert_eq!(requests[1].method, "POST");
	assert_eq!(requests[2].uri, API_URL);
	assert_eq!(requests[2].method, "GET");
	assert_eq!(requests[2].authorization.as_deref(), Some("Bearer B"));
}

#[tokio::test]
async fn short_lived_refreshed_tokens_are_used_for_the_retry() {
	let (h, helper) = signed_in().await;

	h.transport
		.push_status(401)
		.push_json(200, json!({ "accessToken": "B", "expiresIn": 120 }))
		.push_body(200, "hello");

	let response = helper.call(api_request()).await.expect("The retried call should succeed.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(response.body().as_slice(), b"hello");

	let requests = h.transport.requests();

	assert_eq!(requests.len(), 3);
	assert_eq!(requests[1].uri, REFRESH_ENDPOINT);
	assert_eq!(requests[2].uri, API_URL);
	assert_eq!(requests[2].authorization.as_deref(), Some("Bearer B"));
	assert_eq!(h.manager.refresh_metrics().network_calls(), 1);
}

#[tokio::test]
async fn failed_refresh_clears_the_session() {
	let (h, helper) = signed_in().await;

	h.transport.push_status(401).push_status(500);

	let err = helper.call(api_request()).await.expect_err("A failed refresh should end the call.");

	assert_eq!(err.to_string(), "Authentication failed");
	assert!(matches!(
		err,
		Error::Authentication { source: Some(RefreshError::Status { status: 500, .. }) }
	));
	assert_eq!(h.transport.calls(), 2);
	assert!(!h.manager.is_authenticated().await);
	assert_eq!(h.telemetry.count("tokens_cleared"), 1);
}

#[tokio::test]
async fn repeated_unauthorized_clears_the_session() {
	let (h, helper) = signed_in().await;

	h.transport
		.push_status(401)
		.push_json(200, json!({ "accessToken": "B", "expiresIn": 3600 }))
		.push_status(401);

	let err = helper.call(api_request()).await.expect_err("A second 401 should end the call.");

	assert!(matches!(err, Error::Authentication { source: None }));
	assert_eq!(h.transport.calls(), 3);
	assert!(!h.manager.is_authenticated().await);
}

#[tokio::test]
async fn other_statuses_pass_through_untouched() {
	let (h, helper) = signed_in().await;

	h.transport.push_body(404, "missing").push_status(500);

	let response = helper.call(api_request()).await.expect("A 404 is a response, not an error.");

	assert_eq!(response.status(), StatusCode::NOT_FOUND);

	let response = helper.call(api_request()).await.expect("A 500 is a response, not an error.");

	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(h.transport.calls(), 2);
	assert!(h.manager.is_authenticated().await);
}

#[tokio::test]
async fn transport_failures_surface_without_clearing() {
	let (h, helper) = signed_in().await;

	h.transport.push_failure("dns lookup failed");

	let err = helper.call(api_request()).await.expect_err("Transport failures should surface.");

	assert!(matches!(err, Error::Transport(_)));
	assert!(h.manager.is_authenticated().await);
}

#[tokio::test]
async fn auth_header_reflects_the_current_token() {
	let (h, helper) = signed_in().await;
	let headers = helper.build_auth_header().await.expect("Header should build.");

	assert_eq!(
		headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()),
		Some("Bearer A")
	);

	h.manager.clear_tokens().await.expect("Clearing should succeed.");

	let headers = helper.build_auth_header().await.expect("Header should build.");

	assert!(headers.is_empty());

	let issued = OffsetDateTime::now_utc() - Duration::hours(2);
	let expired = TokenRecord::builder()
		.access_token("A")
		.issued_at(issued)
		.expires_at(issued + Duration::hours(1))
		.build()
		.expect("Expired record fixture should build.");

	h.manager.store_tokens(&expired).await.expect("Storing tokens should succeed.");

	assert!(helper.build_auth_header().await.expect("Header should build.").is_empty());
}

#[tokio::test]
async fn signed_out_calls_go_out_without_authorization() {
	let h = harness();
	let helper = AuthenticatedRequestHelper::new(Arc::clone(&h.manager));
	let mut request = api_request();

	request.headers_mut().insert(AUTHORIZATION, "Bearer stale".parse().expect("Header value."));
	h.transport.push_body(200, "public");

	let response = helper.call(request).await.expect("Anonymous call should succeed.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(h.transport.requests()[0].authorization, None);
}
