// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The request pipeline.
//!
//! Stages are ordinary axum middleware, applied outer to inner: panic
//! catch, metrics, identity extraction, proxy unwrap, audit, response
//! normalization, then per-route seal gate, deadline, and body cap.
//! Authorization itself is an extractor ([`crate::auth::Verified`]) so it
//! runs after routing, with the route's path in hand.

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderName, Response as HttpResponse, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use kestrel_audit::AuditEvent;
use kestrel_auth::Identity;
use metrics::{counter, gauge, histogram};
use subtle::ConstantTimeEq;
use tracing::{debug, error, warn};

use crate::error::ApiError;
use crate::tls::PeerCertificate;
use crate::AppState;

/// Trusted-proxy settings resolved at startup.
#[derive(Debug, Clone)]
pub struct ProxySettings {
	pub identities: Vec<Identity>,
	pub header: HeaderName,
}

/// Derives the request identity from the TLS peer certificate.
///
/// A request that already carries an [`Identity`] extension keeps it;
/// extensions cannot be set by clients, so this is only reachable from
/// in-process callers (tests).
pub async fn identify(mut req: Request, next: Next) -> Response {
	if req.extensions().get::<Identity>().is_none() {
		let identity = req
			.extensions()
			.get::<PeerCertificate>()
			.and_then(|peer| peer.0.as_ref())
			.and_then(|der| match Identity::from_certificate(der) {
				Ok(identity) => Some(identity),
				Err(e) => {
					debug!(error = %e, "failed to parse peer certificate");
					None
				}
			})
			.unwrap_or_else(Identity::unknown);
		req.extensions_mut().insert(identity);
	}
	next.run(req).await
}

/// Substitutes the forwarded identity when the TLS peer is a trusted
/// proxy.
///
/// The forwarding header is honored only when the peer identity matches a
/// configured proxy identity; otherwise it is silently ignored.
pub async fn proxy_unwrap(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
	let Some(proxy) = &state.proxy else {
		return next.run(req).await;
	};

	let peer = req
		.extensions()
		.get::<Identity>()
		.cloned()
		.unwrap_or_default();
	if !peer.is_unknown() && proxy.identities.iter().any(|p| identity_eq(p, &peer)) {
		let forwarded = req
			.headers()
			.get(&proxy.header)
			.and_then(|v| v.to_str().ok())
			.map(str::trim)
			.filter(|v| is_hex_identity(v))
			.map(Identity::new);
		if let Some(forwarded) = forwarded {
			req.extensions_mut().insert(forwarded);
		}
	}
	next.run(req).await
}

fn identity_eq(a: &Identity, b: &Identity) -> bool {
	let a = a.as_str().as_bytes();
	let b = b.as_str().as_bytes();
	a.len() == b.len() && bool::from(a.ct_eq(b))
}

fn is_hex_identity(value: &str) -> bool {
	!value.is_empty()
		&& value
			.chars()
			.all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

/// Fails every request with `Sealed` while the vault is sealed.
///
/// Applied to all routes except status and unseal. One atomic load.
pub async fn seal_gate(State(state): State<AppState>, req: Request, next: Next) -> Response {
	if state.vault.is_sealed() {
		return ApiError::Sealed.into_response();
	}
	next.run(req).await
}

/// Installs the per-route deadline.
///
/// On expiry the handler future is dropped, which cancels any work it
/// spawned through the request's scope, and the client receives 504.
pub async fn deadline(State(timeout): State<Duration>, req: Request, next: Next) -> Response {
	match tokio::time::timeout(timeout, next.run(req)).await {
		Ok(response) => response,
		Err(_) => {
			warn!("request deadline exceeded");
			ApiError::Timeout.into_response()
		}
	}
}

/// Rejects declared-oversize bodies before any handler-visible work.
///
/// Bodies without a Content-Length are bounded by the per-route
/// `DefaultBodyLimit` at extraction time.
pub async fn enforce_max_body(State(max): State<usize>, req: Request, next: Next) -> Response {
	let declared = req
		.headers()
		.get(header::CONTENT_LENGTH)
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.parse::<u64>().ok());
	if let Some(declared) = declared {
		if declared > max as u64 {
			return ApiError::TooLarge.into_response();
		}
	}
	next.run(req).await
}

/// Normalizes framework-generated error responses to the JSON error
/// shape: 405 gains an `Accept` header naming the permitted method, 413
/// from body-limit enforcement gains the JSON body.
pub async fn normalize_responses(req: Request, next: Next) -> Response {
	let response = next.run(req).await;
	match response.status() {
		StatusCode::METHOD_NOT_ALLOWED => {
			let allow = response.headers().get(header::ALLOW).cloned();
			let mut normalized = ApiError::MethodNotAllowed.into_response();
			if let Some(allow) = allow {
				normalized.headers_mut().insert(header::ACCEPT, allow);
			}
			normalized
		}
		StatusCode::PAYLOAD_TOO_LARGE if !is_json(&response) => ApiError::TooLarge.into_response(),
		_ => response,
	}
}

fn is_json(response: &Response) -> bool {
	response
		.headers()
		.get(header::CONTENT_TYPE)
		.and_then(|v| v.to_str().ok())
		.is_some_and(|v| v.starts_with("application/json"))
}

/// Emits one audit record per request, keyed to the final status.
///
/// Runs inside identity extraction and proxy unwrap, so the recorded
/// identity is the effective one. The record is queued when the response
/// status is known; the audit pipeline serializes writers.
pub async fn audit_wrap(State(state): State<AppState>, req: Request, next: Next) -> Response {
	let start = Instant::now();
	let identity = req
		.extensions()
		.get::<Identity>()
		.cloned()
		.unwrap_or_default();
	let method = req.method().to_string();
	let path = req.uri().path().to_string();

	let response = next.run(req).await;

	state.audit.log(AuditEvent {
		time: Utc::now(),
		identity: identity.to_string(),
		method,
		path,
		status: response.status().as_u16(),
		latency_ms: start.elapsed().as_millis() as u64,
	});
	response
}

/// Counts requests by status class and records the latency histogram.
pub async fn metrics_wrap(req: Request, next: Next) -> Response {
	let start = Instant::now();
	gauge!("kestrel_http_request_active").increment(1.0);

	let response = next.run(req).await;

	gauge!("kestrel_http_request_active").decrement(1.0);
	let status = response.status();
	let name = if status.is_server_error() {
		"kestrel_http_request_failure"
	} else if status.is_client_error() {
		"kestrel_http_request_error"
	} else {
		"kestrel_http_request_success"
	};
	counter!(name).increment(1);
	histogram!("kestrel_http_response_latency_seconds").record(start.elapsed().as_secs_f64());
	response
}

/// Converts a handler panic into a plain 500 without leaking its message.
pub fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> HttpResponse<Body> {
	let detail: &str = if let Some(s) = err.downcast_ref::<String>() {
		s
	} else if let Some(s) = err.downcast_ref::<&str>() {
		s
	} else {
		"unknown panic"
	};
	error!(panic = detail, "handler panicked");

	ApiError::Internal.into_response()
}
