// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The route table and router assembly.
//!
//! Every route is described once, up front, by an [`Api`] record; the
//! router is built from those records at startup. Paths, body caps, and
//! timeouts are a stable external contract.

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, MethodRouter};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;

use crate::error::ApiError;
use crate::handlers::{identities, keys, policies, system};
use crate::middleware;
use crate::AppState;

/// One route's contract: method, path, request body cap, and deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Api {
	pub method: &'static str,
	pub path: &'static str,
	pub max_body: usize,
	pub timeout: Duration,
}

impl Api {
	const fn new(method: &'static str, path: &'static str, max_body: usize, timeout_secs: u64) -> Self {
		Self {
			method,
			path,
			max_body,
			timeout: Duration::from_secs(timeout_secs),
		}
	}
}

const MIB: usize = 1024 * 1024;
const KIB: usize = 1024;

pub const VERSION: Api = Api::new("GET", "/version", 0, 15);
pub const STATUS: Api = Api::new("GET", "/v1/status", 0, 15);
pub const METRICS: Api = Api::new("GET", "/v1/metrics", 0, 15);

pub const KEY_CREATE: Api = Api::new("POST", "/v1/key/create/{name}", 0, 15);
pub const KEY_IMPORT: Api = Api::new("POST", "/v1/key/import/{name}", MIB, 15);
pub const KEY_DELETE: Api = Api::new("DELETE", "/v1/key/delete/{name}", 0, 15);
pub const KEY_GENERATE: Api = Api::new("POST", "/v1/key/generate/{name}", MIB, 15);
pub const KEY_ENCRYPT: Api = Api::new("POST", "/v1/key/encrypt/{name}", MIB, 15);
pub const KEY_DECRYPT: Api = Api::new("POST", "/v1/key/decrypt/{name}", MIB, 15);
pub const KEY_LIST: Api = Api::new("GET", "/v1/key/list/{pattern}", 0, 15);

pub const POLICY_CREATE: Api = Api::new("POST", "/v1/policy/create/{name}", MIB, 15);
pub const POLICY_READ: Api = Api::new("GET", "/v1/policy/read/{name}", 0, 15);
pub const POLICY_DELETE: Api = Api::new("DELETE", "/v1/policy/delete/{name}", 0, 15);
pub const POLICY_LIST: Api = Api::new("GET", "/v1/policy/list/{pattern}", 0, 15);
pub const POLICY_ASSIGN: Api = Api::new("POST", "/v1/policy/assign/{policy}", KIB, 15);

pub const IDENTITY_DESCRIBE: Api = Api::new("GET", "/v1/identity/describe/{id}", 0, 15);
pub const IDENTITY_SELF: Api = Api::new("GET", "/v1/identity/self/describe", 0, 15);
pub const IDENTITY_DELETE: Api = Api::new("DELETE", "/v1/identity/delete/{id}", 0, 15);
pub const IDENTITY_LIST: Api = Api::new("GET", "/v1/identity/list/{pattern}", 0, 15);

pub const SYS_SEAL: Api = Api::new("POST", "/v1/sys/seal", 0, 15);
pub const SYS_UNSEAL: Api = Api::new("POST", "/v1/sys/unseal", 0, 15);

/// Every route the server exposes.
pub const APIS: &[Api] = &[
	VERSION,
	STATUS,
	METRICS,
	KEY_CREATE,
	KEY_IMPORT,
	KEY_DELETE,
	KEY_GENERATE,
	KEY_ENCRYPT,
	KEY_DECRYPT,
	KEY_LIST,
	POLICY_CREATE,
	POLICY_READ,
	POLICY_DELETE,
	POLICY_LIST,
	POLICY_ASSIGN,
	IDENTITY_DESCRIBE,
	IDENTITY_SELF,
	IDENTITY_DELETE,
	IDENTITY_LIST,
	SYS_SEAL,
	SYS_UNSEAL,
];

/// Applies the per-route stages: body cap and deadline.
fn wrap(api: Api, handler: MethodRouter<AppState>) -> MethodRouter<AppState> {
	handler
		.layer(axum::middleware::from_fn_with_state(
			api.timeout,
			middleware::deadline,
		))
		.layer::<_, std::convert::Infallible>(axum::middleware::from_fn_with_state(
			api.max_body,
			middleware::enforce_max_body,
		))
		.layer(DefaultBodyLimit::max(api.max_body))
}

/// Builds the router once, at startup.
pub fn create_router(state: AppState) -> Router {
	// Reachable while sealed: version, status, unseal.
	let open = Router::new()
		.route(VERSION.path, wrap(VERSION, get(system::version)))
		.route(STATUS.path, wrap(STATUS, get(system::status)))
		.route(SYS_UNSEAL.path, wrap(SYS_UNSEAL, post(system::unseal)));

	let gated = Router::new()
		.route(METRICS.path, wrap(METRICS, get(system::metrics)))
		.route(SYS_SEAL.path, wrap(SYS_SEAL, post(system::seal)))
		.route(KEY_CREATE.path, wrap(KEY_CREATE, post(keys::create)))
		.route(KEY_IMPORT.path, wrap(KEY_IMPORT, post(keys::import)))
		.route(KEY_DELETE.path, wrap(KEY_DELETE, delete(keys::delete)))
		.route(KEY_GENERATE.path, wrap(KEY_GENERATE, post(keys::generate)))
		.route(KEY_ENCRYPT.path, wrap(KEY_ENCRYPT, post(keys::encrypt)))
		.route(KEY_DECRYPT.path, wrap(KEY_DECRYPT, post(keys::decrypt)))
		.route(KEY_LIST.path, wrap(KEY_LIST, get(keys::list)))
		.route(POLICY_CREATE.path, wrap(POLICY_CREATE, post(policies::create)))
		.route(POLICY_READ.path, wrap(POLICY_READ, get(policies::read)))
		.route(POLICY_DELETE.path, wrap(POLICY_DELETE, delete(policies::delete)))
		.route(POLICY_LIST.path, wrap(POLICY_LIST, get(policies::list)))
		.route(POLICY_ASSIGN.path, wrap(POLICY_ASSIGN, post(policies::assign)))
		.route(
			IDENTITY_DESCRIBE.path,
			wrap(IDENTITY_DESCRIBE, get(identities::describe)),
		)
		.route(
			IDENTITY_SELF.path,
			wrap(IDENTITY_SELF, get(identities::self_describe)),
		)
		.route(
			IDENTITY_DELETE.path,
			wrap(IDENTITY_DELETE, delete(identities::delete)),
		)
		.route(IDENTITY_LIST.path, wrap(IDENTITY_LIST, get(identities::list)))
		.layer(axum::middleware::from_fn_with_state(
			state.clone(),
			middleware::seal_gate,
		));

	// Global stages, inner to outer: response normalization, audit,
	// proxy unwrap, identity extraction, metrics, panic catch.
	Router::new()
		.merge(open)
		.merge(gated)
		.fallback(fallback)
		.layer(axum::middleware::from_fn(middleware::normalize_responses))
		.layer(axum::middleware::from_fn_with_state(
			state.clone(),
			middleware::audit_wrap,
		))
		.layer(axum::middleware::from_fn_with_state(
			state.clone(),
			middleware::proxy_unwrap,
		))
		.layer(axum::middleware::from_fn(middleware::identify))
		.layer(axum::middleware::from_fn(middleware::metrics_wrap))
		.layer(CatchPanicLayer::custom(middleware::handle_panic))
		.with_state(state)
}

async fn fallback() -> ApiError {
	ApiError::NotFound("resource")
}
