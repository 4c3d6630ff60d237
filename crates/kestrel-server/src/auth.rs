// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization extractors.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use kestrel_auth::Identity;
use kestrel_vault::Enclave;

use crate::error::ApiError;
use crate::AppState;

/// The stateless vault serves its single enclave under the empty name.
const DEFAULT_ENCLAVE: &str = "";

/// A request that passed policy evaluation.
///
/// Extracting this runs the full verification sequence: effective
/// identity → enclave lookup → identity lookup → policy evaluation
/// against the request path. Admins short-circuit the policy step.
pub struct Verified {
	pub enclave: Arc<Enclave>,
	pub identity: Identity,
}

impl FromRequestParts<AppState> for Verified {
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
		let identity = parts
			.extensions
			.get::<Identity>()
			.cloned()
			.unwrap_or_default();
		let enclave = state.vault.get_enclave(DEFAULT_ENCLAVE).await?;
		// Policies see the decoded path; an encoded octet must not dodge
		// a deny pattern.
		let path = percent_encoding::percent_decode_str(parts.uri.path())
			.decode_utf8()
			.map_err(|_| ApiError::Invalid("invalid path encoding"))?;
		enclave.verify(&identity, &path).await?;
		Ok(Self { enclave, identity })
	}
}

/// A request with an enclave and an effective identity but no policy
/// decision. Used by routes that answer questions about the caller
/// itself.
pub struct Authenticated {
	pub enclave: Arc<Enclave>,
	pub identity: Identity,
}

impl FromRequestParts<AppState> for Authenticated {
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
		let identity = parts
			.extensions
			.get::<Identity>()
			.cloned()
			.unwrap_or_default();
		let enclave = state.vault.get_enclave(DEFAULT_ENCLAVE).await?;
		Ok(Self { enclave, identity })
	}
}
