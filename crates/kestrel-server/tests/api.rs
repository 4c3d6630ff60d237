// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end tests over the router.
//!
//! Requests are driven through the full middleware stack with
//! `tower::ServiceExt::oneshot`; the TLS layer is bypassed by injecting
//! the peer identity as a request extension, exactly as the identity
//! middleware would after a handshake.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{header, HeaderName, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use chrono::Utc;
use http_body_util::BodyExt;
use kestrel_audit::{AuditService, QueueOverflowPolicy};
use kestrel_auth::{Identity, IdentityInfo, IdentitySet, MemIdentitySet, MemPolicySet, Policy, PolicySet};
use kestrel_keystore::{KeyEngine, MemKeyStore};
use kestrel_server::{create_router, AppState, ProxySettings};
use kestrel_vault::{Enclave, StatelessVault, Vault};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestServer {
	app: Router,
	admin: Identity,
	user: Identity,
	proxy: Identity,
}

fn b64(bytes: &[u8]) -> String {
	STANDARD.encode(bytes)
}

async fn setup() -> TestServer {
	let admin = Identity::new("a1".repeat(32));
	let user = Identity::new("b2".repeat(32));
	let proxy = Identity::new("c3".repeat(32));

	let policies = Arc::new(MemPolicySet::new());
	let identities = Arc::new(MemIdentitySet::new());

	identities
		.assign(
			admin.clone(),
			IdentityInfo {
				policy: String::new(),
				is_admin: true,
				created_at: Utc::now(),
				created_by: Identity::unknown(),
			},
		)
		.await
		.unwrap();

	policies
		.set(
			"ops",
			Policy::new(
				vec![
					"/v1/status".to_string(),
					"/v1/key/*/*".to_string(),
					"/v1/identity/self/describe".to_string(),
				],
				vec!["/v1/key/list/my-*".to_string()],
			),
			admin.clone(),
		)
		.await
		.unwrap();
	identities
		.assign(
			user.clone(),
			IdentityInfo {
				policy: "ops".to_string(),
				is_admin: false,
				created_at: Utc::now(),
				created_by: admin.clone(),
			},
		)
		.await
		.unwrap();

	let enclave = Enclave::new(
		"",
		KeyEngine::new(Arc::new(MemKeyStore::new())),
		policies,
		identities,
	);
	let vault: Arc<dyn Vault> = Arc::new(StatelessVault::new(enclave, admin.clone()));

	let state = AppState {
		vault,
		audit: Arc::new(AuditService::new(
			1000,
			QueueOverflowPolicy::DropNewest,
			Vec::new(),
		)),
		metrics: PrometheusBuilder::new().build_recorder().handle(),
		proxy: Some(ProxySettings {
			identities: vec![proxy.clone()],
			header: HeaderName::from_static("x-forwarded-identity"),
		}),
		started_at: Instant::now(),
	};

	TestServer {
		app: create_router(state),
		admin,
		user,
		proxy,
	}
}

fn request(
	method: &str,
	path: &str,
	identity: Option<&Identity>,
	body: Option<Value>,
) -> Request<Body> {
	let mut builder = Request::builder().method(method).uri(path);
	if let Some(identity) = identity {
		builder = builder.extension(identity.clone());
	}
	match body {
		Some(json) => builder
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(json.to_string()))
			.unwrap(),
		None => builder.body(Body::empty()).unwrap(),
	}
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Bytes) {
	let response = app.clone().oneshot(req).await.unwrap();
	let status = response.status();
	let headers = response.headers().clone();
	let body = response.into_body().collect().await.unwrap().to_bytes();
	(status, headers, body)
}

fn json_body(body: &Bytes) -> Value {
	serde_json::from_slice(body).unwrap()
}

fn ndjson_records(body: &Bytes) -> Vec<Value> {
	std::str::from_utf8(body)
		.unwrap()
		.lines()
		.filter(|line| !line.is_empty())
		.map(|line| serde_json::from_str(line).unwrap())
		.collect()
}

#[tokio::test]
async fn version_is_unauthenticated() {
	let server = setup().await;
	let (status, _, body) = send(&server.app, request("GET", "/version", None, None)).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(
		json_body(&body)["version"],
		env!("CARGO_PKG_VERSION").to_string()
	);
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
	let server = setup().await;
	let (status, _, body) = send(&server.app, request("GET", "/v1/status", None, None)).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(json_body(&body)["message"], "not authorized");

	let stranger = Identity::new("d4".repeat(32));
	let (status, _, _) = send(
		&server.app,
		request("GET", "/v1/status", Some(&stranger), None),
	)
	.await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn encrypt_decrypt_round_trip_with_context() {
	let server = setup().await;
	let user = Some(&server.user);

	let (status, _, _) = send(
		&server.app,
		request("POST", "/v1/key/create/t", user, None),
	)
	.await;
	assert_eq!(status, StatusCode::OK);

	let (status, _, body) = send(
		&server.app,
		request(
			"POST",
			"/v1/key/encrypt/t",
			user,
			Some(json!({"plaintext": b64(b"Hello World"), "context": b64(b"ctx")})),
		),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	let ciphertext = json_body(&body)["ciphertext"].as_str().unwrap().to_string();

	let (status, _, body) = send(
		&server.app,
		request(
			"POST",
			"/v1/key/decrypt/t",
			user,
			Some(json!({"ciphertext": ciphertext, "context": b64(b"ctx")})),
		),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(
		json_body(&body)["plaintext"].as_str().unwrap(),
		b64(b"Hello World")
	);
}

#[tokio::test]
async fn decrypt_with_wrong_context_is_not_authentic() {
	let server = setup().await;
	let user = Some(&server.user);

	send(&server.app, request("POST", "/v1/key/create/t", user, None)).await;
	let (_, _, body) = send(
		&server.app,
		request(
			"POST",
			"/v1/key/encrypt/t",
			user,
			Some(json!({"plaintext": b64(b"Hello World"), "context": b64(b"ctx")})),
		),
	)
	.await;
	let ciphertext = json_body(&body)["ciphertext"].as_str().unwrap().to_string();

	let (status, _, body) = send(
		&server.app,
		request(
			"POST",
			"/v1/key/decrypt/t",
			user,
			Some(json!({"ciphertext": ciphertext, "context": b64(b"ctx2")})),
		),
	)
	.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json_body(&body)["message"], "ciphertext is not authentic");
}

// The published interop vector: a zero key decrypting a known envelope
// to 32 zero bytes.
#[tokio::test]
async fn imported_key_decrypts_published_vector() {
	let server = setup().await;
	let user = Some(&server.user);

	let (status, _, _) = send(
		&server.app,
		request(
			"POST",
			"/v1/key/import/t",
			user,
			Some(json!({"bytes": b64(&[0u8; 32])})),
		),
	)
	.await;
	assert_eq!(status, StatusCode::OK);

	let envelope = "eyJhZWFkIjoiQUVTLTI1Ni1HQ00tSE1BQy1TSEEtMjU2IiwiaXYiOiJ1SUlmSG1OanY2MGRBbUlRL0haT3JBPT0iLCJub25jZSI6IlNEdi8wTlpWaG02R1lGS0wiLCJieXRlcyI6InBqU204UDkyRXlzZE5GZW4rQWdJUEQxeWl4KzNmWTZvUkE0SGdXYzdlZ1J5ckZtNzJ0Z1dYUitFTVlrRHZxYmUifQ==";
	let (status, _, body) = send(
		&server.app,
		request(
			"POST",
			"/v1/key/decrypt/t",
			user,
			Some(json!({"ciphertext": envelope})),
		),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(json_body(&body)["plaintext"].as_str().unwrap(), b64(&[0u8; 32]));
}

#[tokio::test]
async fn second_create_conflicts() {
	let server = setup().await;
	let user = Some(&server.user);

	let (status, _, _) = send(&server.app, request("POST", "/v1/key/create/k", user, None)).await;
	assert_eq!(status, StatusCode::OK);
	let (status, _, body) = send(&server.app, request("POST", "/v1/key/create/k", user, None)).await;
	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(json_body(&body)["message"], "key already exists");
}

#[tokio::test]
async fn delete_is_idempotent_over_http() {
	let server = setup().await;
	let user = Some(&server.user);

	send(&server.app, request("POST", "/v1/key/create/k", user, None)).await;
	let (status, _, _) = send(&server.app, request("DELETE", "/v1/key/delete/k", user, None)).await;
	assert_eq!(status, StatusCode::OK);
	let (status, _, _) = send(&server.app, request("DELETE", "/v1/key/delete/k", user, None)).await;
	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn generate_data_key_round_trips() {
	let server = setup().await;
	let user = Some(&server.user);

	send(&server.app, request("POST", "/v1/key/create/master", user, None)).await;
	let (status, _, body) = send(
		&server.app,
		request(
			"POST",
			"/v1/key/generate/master",
			user,
			Some(json!({"context": b64(b"app")})),
		),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	let generated = json_body(&body);
	let plaintext = generated["plaintext"].as_str().unwrap();
	let ciphertext = generated["ciphertext"].as_str().unwrap();
	assert_eq!(STANDARD.decode(plaintext).unwrap().len(), 32);

	let (status, _, body) = send(
		&server.app,
		request(
			"POST",
			"/v1/key/decrypt/master",
			user,
			Some(json!({"ciphertext": ciphertext, "context": b64(b"app")})),
		),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(json_body(&body)["plaintext"].as_str().unwrap(), plaintext);
}

#[tokio::test]
async fn list_keys_filters_by_pattern() {
	let server = setup().await;
	let admin = Some(&server.admin);

	for name in ["my-key", "my-key1", "my-key2", "my-key3"] {
		let path = format!("/v1/key/create/{name}");
		let (status, _, _) = send(&server.app, request("POST", &path, admin, None)).await;
		assert_eq!(status, StatusCode::OK);
	}

	// `?` must be percent-encoded in a URL path.
	let (status, headers, body) = send(
		&server.app,
		request("GET", "/v1/key/list/my-key%3F", admin, None),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(
		headers.get(header::CONTENT_TYPE).unwrap(),
		"application/x-ndjson"
	);
	let mut names: Vec<String> = ndjson_records(&body)
		.into_iter()
		.map(|r| r["name"].as_str().unwrap().to_string())
		.collect();
	names.sort();
	assert_eq!(names, ["my-key1", "my-key2", "my-key3"]);
}

#[tokio::test]
async fn empty_listing_is_200_with_empty_body() {
	let server = setup().await;
	let (status, _, body) = send(
		&server.app,
		request("GET", "/v1/key/list/nothing-%2A", Some(&server.admin), None),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	assert!(body.is_empty());
}

#[tokio::test]
async fn policy_deny_takes_precedence_over_allow() {
	let server = setup().await;
	let user = Some(&server.user);

	// Allowed by "/v1/key/*/*", not matched by the deny pattern.
	let (status, _, _) = send(&server.app, request("GET", "/v1/key/list/other", user, None)).await;
	assert_eq!(status, StatusCode::OK);

	// Denied by "/v1/key/list/my-*".
	let (status, _, body) = send(
		&server.app,
		request("GET", "/v1/key/list/my-foo", user, None),
	)
	.await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(json_body(&body)["message"], "prohibited by policy");

	// Percent-encoding must not dodge a deny pattern.
	let (status, _, _) = send(
		&server.app,
		request("GET", "/v1/key/list/%6Dy-foo", user, None),
	)
	.await;
	assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn proxy_header_is_honored_only_from_the_trusted_proxy() {
	let server = setup().await;

	// Trusted proxy forwards the user's identity: effective identity is
	// the user.
	let req = Request::builder()
		.method("GET")
		.uri("/v1/identity/self/describe")
		.extension(server.proxy.clone())
		.header("x-forwarded-identity", server.user.as_str())
		.body(Body::empty())
		.unwrap();
	let (status, _, body) = send(&server.app, req).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(json_body(&body)["identity"], server.user.as_str());

	// The same header from a non-proxy peer is ignored.
	let req = Request::builder()
		.method("GET")
		.uri("/v1/identity/self/describe")
		.extension(server.user.clone())
		.header("x-forwarded-identity", server.admin.as_str())
		.body(Body::empty())
		.unwrap();
	let (status, _, body) = send(&server.app, req).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(json_body(&body)["identity"], server.user.as_str());

	// The proxy itself is not an assigned identity.
	let req = Request::builder()
		.method("GET")
		.uri("/v1/identity/self/describe")
		.extension(server.proxy.clone())
		.body(Body::empty())
		.unwrap();
	let (status, _, _) = send(&server.app, req).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_bypasses_policy_but_cannot_be_deleted() {
	let server = setup().await;
	let admin = Some(&server.admin);

	// No policy grants this; the admin does it anyway.
	let (status, _, _) = send(
		&server.app,
		request("DELETE", "/v1/key/delete/any", admin, None),
	)
	.await;
	assert_eq!(status, StatusCode::OK);

	let path = format!("/v1/identity/delete/{}", server.admin.as_str());
	let (status, _, body) = send(&server.app, request("DELETE", &path, admin, None)).await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(
		json_body(&body)["message"],
		"cannot delete the admin identity"
	);
}

#[tokio::test]
async fn sealed_vault_gates_everything_but_status_and_unseal() {
	let server = setup().await;
	let admin = Some(&server.admin);
	let user = Some(&server.user);

	// Only the operator may seal.
	let (status, _, _) = send(&server.app, request("POST", "/v1/sys/seal", user, None)).await;
	assert_eq!(status, StatusCode::FORBIDDEN);

	let (status, _, _) = send(&server.app, request("POST", "/v1/sys/seal", admin, None)).await;
	assert_eq!(status, StatusCode::OK);

	// Everything else fails with Sealed.
	let (status, _, body) = send(
		&server.app,
		request("GET", "/v1/key/list/other", user, None),
	)
	.await;
	assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(json_body(&body)["message"], "vault is sealed");

	let (status, _, _) = send(&server.app, request("POST", "/v1/key/create/x", admin, None)).await;
	assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

	// Status still answers and reports the seal state.
	let (status, _, body) = send(&server.app, request("GET", "/v1/status", user, None)).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(json_body(&body)["sealed"], true);

	// Unseal restores service.
	let (status, _, _) = send(&server.app, request("POST", "/v1/sys/unseal", admin, None)).await;
	assert_eq!(status, StatusCode::OK);
	let (status, _, _) = send(
		&server.app,
		request("GET", "/v1/key/list/other", user, None),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn wrong_method_advertises_the_permitted_one() {
	let server = setup().await;
	let (status, headers, body) = send(
		&server.app,
		request("GET", "/v1/key/create/foo", Some(&server.admin), None),
	)
	.await;
	assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
	assert_eq!(headers.get(header::ACCEPT).unwrap(), "POST");
	assert_eq!(json_body(&body)["message"], "method not allowed");
}

#[tokio::test]
async fn declared_oversize_body_is_rejected_before_any_work() {
	let server = setup().await;
	let req = Request::builder()
		.method("POST")
		.uri("/v1/key/encrypt/t")
		.extension(server.user.clone())
		.header(header::CONTENT_TYPE, "application/json")
		.header(header::CONTENT_LENGTH, (2 * 1024 * 1024).to_string())
		.body(Body::empty())
		.unwrap();
	let (status, _, body) = send(&server.app, req).await;
	assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
	assert_eq!(json_body(&body)["message"], "request body too large");
}

#[tokio::test]
async fn oversize_streaming_body_is_rejected() {
	let server = setup().await;
	send(
		&server.app,
		request("POST", "/v1/key/create/t", Some(&server.user), None),
	)
	.await;

	// No Content-Length; the body-limit layer has to catch it during
	// extraction.
	let oversize = vec![b'0'; 1024 * 1024 + 64];
	let req = Request::builder()
		.method("POST")
		.uri("/v1/key/encrypt/t")
		.extension(server.user.clone())
		.header(header::CONTENT_TYPE, "application/json")
		.body(Body::from(oversize))
		.unwrap();
	let (status, _, body) = send(&server.app, req).await;
	assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
	assert_eq!(json_body(&body)["message"], "request body too large");
}

#[tokio::test]
async fn policy_crud_and_assignment() {
	let server = setup().await;
	let admin = Some(&server.admin);

	let (status, _, _) = send(
		&server.app,
		request(
			"POST",
			"/v1/policy/create/backup",
			admin,
			Some(json!({"allow": ["/v1/key/encrypt/*"], "deny": []})),
		),
	)
	.await;
	assert_eq!(status, StatusCode::OK);

	let (status, _, body) = send(
		&server.app,
		request("GET", "/v1/policy/read/backup", admin, None),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(json_body(&body)["allow"][0], "/v1/key/encrypt/*");

	let (status, _, body) = send(
		&server.app,
		request("GET", "/v1/policy/list/%2A", admin, None),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	let names: Vec<String> = ndjson_records(&body)
		.into_iter()
		.map(|r| r["name"].as_str().unwrap().to_string())
		.collect();
	assert!(names.contains(&"backup".to_string()));
	assert!(names.contains(&"ops".to_string()));

	// Assign the new policy to a fresh identity.
	let newcomer = "e5".repeat(32);
	let (status, _, _) = send(
		&server.app,
		request(
			"POST",
			"/v1/policy/assign/backup",
			admin,
			Some(json!({"identity": newcomer})),
		),
	)
	.await;
	assert_eq!(status, StatusCode::OK);

	let path = format!("/v1/identity/describe/{newcomer}");
	let (status, _, body) = send(&server.app, request("GET", &path, admin, None)).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(json_body(&body)["policy"], "backup");

	// Neither self-assignment nor demoting the admin is allowed.
	let (status, _, _) = send(
		&server.app,
		request(
			"POST",
			"/v1/policy/assign/backup",
			admin,
			Some(json!({"identity": server.admin.as_str()})),
		),
	)
	.await;
	assert_eq!(status, StatusCode::FORBIDDEN);

	// Deleting the policy leaves the identity dangling and unauthorized.
	let (status, _, _) = send(
		&server.app,
		request("DELETE", "/v1/policy/delete/backup", admin, None),
	)
	.await;
	assert_eq!(status, StatusCode::OK);

	let newcomer_identity = Identity::new(newcomer);
	let (status, _, _) = send(
		&server.app,
		request(
			"POST",
			"/v1/key/encrypt/t",
			Some(&newcomer_identity),
			Some(json!({"plaintext": b64(b"x")})),
		),
	)
	.await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn self_describe_inlines_the_policy() {
	let server = setup().await;
	let (status, _, body) = send(
		&server.app,
		request("GET", "/v1/identity/self/describe", Some(&server.user), None),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	let described = json_body(&body);
	assert_eq!(described["identity"], server.user.as_str());
	assert_eq!(described["admin"], false);
	assert_eq!(described["policy_name"], "ops");
	assert!(described["policy"]["allow"]
		.as_array()
		.unwrap()
		.contains(&json!("/v1/key/*/*")));
}

#[tokio::test]
async fn identity_listing_matches_pattern() {
	let server = setup().await;
	let (status, _, body) = send(
		&server.app,
		request("GET", "/v1/identity/list/%2A", Some(&server.admin), None),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	let identities: Vec<String> = ndjson_records(&body)
		.into_iter()
		.map(|r| r["identity"].as_str().unwrap().to_string())
		.collect();
	assert!(identities.contains(&server.admin.as_str().to_string()));
	assert!(identities.contains(&server.user.as_str().to_string()));
}

#[tokio::test]
async fn unknown_route_is_a_json_404() {
	let server = setup().await;
	let (status, _, body) = send(
		&server.app,
		request("GET", "/v1/nope", Some(&server.admin), None),
	)
	.await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(json_body(&body)["message"], "resource not found");
}

#[tokio::test]
async fn invalid_names_and_patterns_are_400s() {
	let server = setup().await;
	let admin = Some(&server.admin);

	let (status, _, _) = send(
		&server.app,
		request("POST", "/v1/key/create/bad%20name", admin, None),
	)
	.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);

	let (status, _, _) = send(
		&server.app,
		request("GET", "/v1/key/list/bad%2Fpattern", admin, None),
	)
	.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
}
