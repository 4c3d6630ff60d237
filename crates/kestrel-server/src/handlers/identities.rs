// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity API handlers.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use kestrel_auth::{matches, AclError, Identity};
use kestrel_keystore::{is_valid_name, is_valid_pattern};
use serde::Serialize;

use crate::auth::{Authenticated, Verified};
use crate::error::ApiError;
use crate::ndjson;

#[derive(Serialize)]
pub struct DescribeIdentityResponse {
	#[serde(skip_serializing_if = "std::ops::Not::not")]
	admin: bool,
	policy: String,
	created_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Identity::is_unknown")]
	created_by: Identity,
}

pub async fn describe(
	Path(id): Path<String>,
	verified: Verified,
) -> Result<Json<DescribeIdentityResponse>, ApiError> {
	if !is_valid_name(&id) {
		return Err(ApiError::Invalid("invalid identity"));
	}
	let info = verified.enclave.get_identity(&Identity::new(id)).await?;
	Ok(Json(DescribeIdentityResponse {
		admin: info.is_admin,
		policy: info.policy,
		created_at: info.created_at,
		created_by: info.created_by,
	}))
}

#[derive(Serialize)]
pub struct InlinePolicy {
	allow: Vec<String>,
	deny: Vec<String>,
}

#[derive(Serialize)]
pub struct SelfDescribeResponse {
	identity: Identity,
	admin: bool,
	#[serde(skip_serializing_if = "String::is_empty")]
	policy_name: String,
	created_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Identity::is_unknown")]
	created_by: Identity,
	policy: InlinePolicy,
}

/// Describes the caller itself, including its resolved policy inline.
///
/// Authenticated but not policy-checked: an identity may always ask what
/// it is allowed to do.
pub async fn self_describe(
	authenticated: Authenticated,
) -> Result<Json<SelfDescribeResponse>, ApiError> {
	let info = match authenticated
		.enclave
		.get_identity(&authenticated.identity)
		.await
	{
		Ok(info) => info,
		Err(AclError::IdentityNotFound) => return Err(ApiError::NotAuthorized),
		Err(e) => return Err(e.into()),
	};
	let policy = if info.is_admin {
		InlinePolicy {
			allow: Vec::new(),
			deny: Vec::new(),
		}
	} else {
		let policy = authenticated.enclave.get_policy(&info.policy).await?.policy;
		InlinePolicy {
			allow: policy.allow,
			deny: policy.deny,
		}
	};
	Ok(Json(SelfDescribeResponse {
		identity: authenticated.identity,
		admin: info.is_admin,
		policy_name: info.policy,
		created_at: info.created_at,
		created_by: info.created_by,
		policy,
	}))
}

pub async fn delete(Path(id): Path<String>, verified: Verified) -> Result<StatusCode, ApiError> {
	if !is_valid_name(&id) {
		return Err(ApiError::Invalid("invalid identity"));
	}
	verified.enclave.delete_identity(&Identity::new(id)).await?;
	Ok(StatusCode::OK)
}

#[derive(Serialize)]
struct IdentityRecord {
	identity: Identity,
	admin: bool,
	policy: String,
	created_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Identity::is_unknown")]
	created_by: Identity,
}

pub async fn list(Path(pattern): Path<String>, verified: Verified) -> Result<Response, ApiError> {
	if !is_valid_pattern(&pattern) {
		return Err(ApiError::Invalid("invalid pattern"));
	}
	let mut records = Vec::new();
	for (identity, info) in verified.enclave.list_identities().await? {
		if matches(&pattern, identity.as_str())? {
			records.push(IdentityRecord {
				identity,
				admin: info.is_admin,
				policy: info.policy,
				created_at: info.created_at,
				created_by: info.created_by,
			});
		}
	}
	Ok(ndjson::response_from_records(&records))
}
