// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy API handlers.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use kestrel_auth::{matches, validate_pattern, Identity, IdentityInfo, Policy};
use kestrel_keystore::{is_valid_name, is_valid_pattern};
use serde::{Deserialize, Serialize};

use super::parse_json;
use crate::auth::Verified;
use crate::error::ApiError;
use crate::ndjson;

#[derive(Deserialize)]
struct CreatePolicyRequest {
	#[serde(default)]
	allow: Vec<String>,
	#[serde(default)]
	deny: Vec<String>,
}

pub async fn create(
	Path(name): Path<String>,
	verified: Verified,
	body: Bytes,
) -> Result<StatusCode, ApiError> {
	if !is_valid_name(&name) {
		return Err(ApiError::Invalid("invalid name"));
	}
	let request: CreatePolicyRequest = parse_json(&body)?;
	for pattern in request.allow.iter().chain(request.deny.iter()) {
		validate_pattern(pattern)?;
	}
	verified
		.enclave
		.set_policy(
			&name,
			Policy::new(request.allow, request.deny),
			verified.identity.clone(),
		)
		.await?;
	Ok(StatusCode::OK)
}

#[derive(Serialize)]
pub struct ReadPolicyResponse {
	allow: Vec<String>,
	deny: Vec<String>,
}

pub async fn read(
	Path(name): Path<String>,
	verified: Verified,
) -> Result<Json<ReadPolicyResponse>, ApiError> {
	if !is_valid_name(&name) {
		return Err(ApiError::Invalid("invalid name"));
	}
	let info = verified.enclave.get_policy(&name).await?;
	Ok(Json(ReadPolicyResponse {
		allow: info.policy.allow,
		deny: info.policy.deny,
	}))
}

pub async fn delete(Path(name): Path<String>, verified: Verified) -> Result<StatusCode, ApiError> {
	if !is_valid_name(&name) {
		return Err(ApiError::Invalid("invalid name"));
	}
	verified.enclave.delete_policy(&name).await?;
	Ok(StatusCode::OK)
}

#[derive(Serialize)]
struct PolicyRecord {
	name: String,
	created_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Identity::is_unknown")]
	created_by: Identity,
}

pub async fn list(Path(pattern): Path<String>, verified: Verified) -> Result<Response, ApiError> {
	if !is_valid_pattern(&pattern) {
		return Err(ApiError::Invalid("invalid pattern"));
	}
	let mut records = Vec::new();
	for (name, info) in verified.enclave.list_policies().await? {
		if matches(&pattern, &name)? {
			records.push(PolicyRecord {
				name,
				created_at: info.created_at,
				created_by: info.created_by,
			});
		}
	}
	Ok(ndjson::response_from_records(&records))
}

#[derive(Deserialize)]
struct AssignPolicyRequest {
	identity: Identity,
}

/// Assigns the named policy to an identity.
///
/// Callers cannot reassign themselves, and the admin identity cannot be
/// demoted to a policy-bound one. The policy itself may not exist yet.
pub async fn assign(
	Path(policy): Path<String>,
	verified: Verified,
	body: Bytes,
) -> Result<StatusCode, ApiError> {
	if !is_valid_name(&policy) {
		return Err(ApiError::Invalid("invalid name"));
	}
	let request: AssignPolicyRequest = parse_json(&body)?;
	if request.identity.is_unknown() {
		return Err(ApiError::Invalid("invalid identity"));
	}
	if request.identity == verified.identity {
		return Err(ApiError::Forbidden("cannot assign policy to self"));
	}
	if let Ok(existing) = verified.enclave.get_identity(&request.identity).await {
		if existing.is_admin {
			return Err(ApiError::Forbidden("cannot assign policy to the admin identity"));
		}
	}
	verified
		.enclave
		.assign_identity(
			request.identity,
			IdentityInfo {
				policy,
				is_admin: false,
				created_at: Utc::now(),
				created_by: verified.identity.clone(),
			},
		)
		.await?;
	Ok(StatusCode::OK)
}
