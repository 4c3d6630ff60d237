// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Version, status, metrics, and the seal lifecycle.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::info;

use crate::auth::{Authenticated, Verified};
use crate::error::ApiError;
use crate::AppState;

#[derive(Serialize)]
pub struct VersionResponse {
	version: &'static str,
}

/// The only unauthenticated route. Leaks nothing but the version string.
pub async fn version() -> Json<VersionResponse> {
	Json(VersionResponse {
		version: env!("CARGO_PKG_VERSION"),
	})
}

#[derive(Serialize)]
pub struct StatusResponse {
	version: &'static str,
	uptime_secs: u64,
	sealed: bool,
}

/// Policy-checked but exempt from the seal gate, so operators can always
/// see the seal state.
pub async fn status(
	State(state): State<AppState>,
	_verified: Verified,
) -> Json<StatusResponse> {
	Json(StatusResponse {
		version: env!("CARGO_PKG_VERSION"),
		uptime_secs: state.started_at.elapsed().as_secs(),
		sealed: state.vault.is_sealed(),
	})
}

pub async fn metrics(State(state): State<AppState>, _verified: Verified) -> Response {
	(
		[(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
		state.metrics.render(),
	)
		.into_response()
}

pub async fn seal(
	State(state): State<AppState>,
	authenticated: Authenticated,
) -> Result<StatusCode, ApiError> {
	require_admin(&state, &authenticated).await?;
	state.vault.seal().await?;
	info!(identity = %authenticated.identity, "vault sealed by operator");
	Ok(StatusCode::OK)
}

pub async fn unseal(
	State(state): State<AppState>,
	authenticated: Authenticated,
) -> Result<StatusCode, ApiError> {
	require_admin(&state, &authenticated).await?;
	state.vault.unseal().await?;
	info!(identity = %authenticated.identity, "vault unsealed by operator");
	Ok(StatusCode::OK)
}

/// Seal and unseal are operator actions: the vault operator or the
/// enclave admin qualify, policies do not apply.
async fn require_admin(state: &AppState, authenticated: &Authenticated) -> Result<(), ApiError> {
	if authenticated.identity.is_unknown() {
		return Err(ApiError::NotAuthorized);
	}
	if authenticated.identity == *state.vault.operator() {
		return Ok(());
	}
	match authenticated.enclave.get_identity(&authenticated.identity).await {
		Ok(info) if info.is_admin => Ok(()),
		Ok(_) => Err(ApiError::Forbidden("admin privileges required")),
		Err(_) => Err(ApiError::NotAuthorized),
	}
}
