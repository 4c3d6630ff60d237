// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The API error surface.
//!
//! Every domain error converges here and maps onto the stable status
//! table. Non-streaming errors respond with a JSON `{"message": ...}`
//! body; messages never carry key material or internal detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kestrel_auth::AclError;
use kestrel_crypto::CryptoError;
use kestrel_keystore::KeyError;
use kestrel_vault::VaultError;
use serde::Serialize;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ApiError {
	#[error("{0}")]
	Invalid(&'static str),

	#[error("ciphertext is not authentic")]
	NotAuthentic,

	#[error("not authorized")]
	NotAuthorized,

	#[error("{0}")]
	Forbidden(&'static str),

	#[error("{0} not found")]
	NotFound(&'static str),

	#[error("method not allowed")]
	MethodNotAllowed,

	#[error("{0} already exists")]
	Exists(&'static str),

	#[error("request body too large")]
	TooLarge,

	#[error("internal server error")]
	Internal,

	#[error("{0}")]
	NotImplemented(&'static str),

	#[error("vault is sealed")]
	Sealed,

	#[error("backend unreachable")]
	Unreachable,

	#[error("request timed out")]
	Timeout,
}

impl ApiError {
	pub fn status(&self) -> StatusCode {
		match self {
			ApiError::Invalid(_) | ApiError::NotAuthentic => StatusCode::BAD_REQUEST,
			ApiError::NotAuthorized => StatusCode::UNAUTHORIZED,
			ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
			ApiError::NotFound(_) => StatusCode::NOT_FOUND,
			ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
			ApiError::Exists(_) => StatusCode::CONFLICT,
			ApiError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
			ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
			ApiError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
			ApiError::Sealed | ApiError::Unreachable => StatusCode::SERVICE_UNAVAILABLE,
			ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
		}
	}
}

#[derive(Serialize)]
struct ErrorBody {
	message: String,
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody {
			message: self.to_string(),
		};
		(self.status(), Json(body)).into_response()
	}
}

impl From<KeyError> for ApiError {
	fn from(err: KeyError) -> Self {
		match err {
			KeyError::Exists => ApiError::Exists("key"),
			KeyError::NotFound => ApiError::NotFound("key"),
			KeyError::InvalidName => ApiError::Invalid("invalid name"),
			KeyError::InvalidKey => ApiError::Invalid("invalid key material"),
			KeyError::PlaintextTooLarge => ApiError::Invalid("plaintext too large"),
			KeyError::Crypto(e) => e.into(),
			KeyError::Unreachable(_) => ApiError::Unreachable,
		}
	}
}

impl From<CryptoError> for ApiError {
	fn from(err: CryptoError) -> Self {
		match err {
			CryptoError::NotAuthentic => ApiError::NotAuthentic,
			CryptoError::MalformedEnvelope => ApiError::Invalid("malformed envelope"),
			CryptoError::ContextTooLarge => ApiError::Invalid("context too large"),
			CryptoError::InvalidKeySize { .. } => ApiError::Invalid("invalid key material"),
			CryptoError::SealFailed => ApiError::Internal,
		}
	}
}

impl From<AclError> for ApiError {
	fn from(err: AclError) -> Self {
		match err {
			AclError::NotAuthorized | AclError::InvalidCertificate(_) => ApiError::NotAuthorized,
			AclError::Forbidden => ApiError::Forbidden("prohibited by policy"),
			AclError::AdminProtected => ApiError::Forbidden("cannot delete the admin identity"),
			AclError::AdminExists => ApiError::Exists("admin identity"),
			AclError::InvalidPattern => ApiError::Invalid("invalid pattern"),
			AclError::PolicyNotFound => ApiError::NotFound("policy"),
			AclError::IdentityNotFound => ApiError::NotFound("identity"),
		}
	}
}

impl From<VaultError> for ApiError {
	fn from(err: VaultError) -> Self {
		match err {
			VaultError::Sealed => ApiError::Sealed,
			VaultError::EnclaveNotFound => ApiError::NotFound("enclave"),
			VaultError::NotImplemented(msg) => ApiError::NotImplemented(msg),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_table() {
		assert_eq!(ApiError::Invalid("x").status(), StatusCode::BAD_REQUEST);
		assert_eq!(ApiError::NotAuthentic.status(), StatusCode::BAD_REQUEST);
		assert_eq!(ApiError::NotAuthorized.status(), StatusCode::UNAUTHORIZED);
		assert_eq!(ApiError::Forbidden("x").status(), StatusCode::FORBIDDEN);
		assert_eq!(ApiError::NotFound("x").status(), StatusCode::NOT_FOUND);
		assert_eq!(
			ApiError::MethodNotAllowed.status(),
			StatusCode::METHOD_NOT_ALLOWED
		);
		assert_eq!(ApiError::Exists("x").status(), StatusCode::CONFLICT);
		assert_eq!(ApiError::TooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
		assert_eq!(ApiError::Sealed.status(), StatusCode::SERVICE_UNAVAILABLE);
		assert_eq!(ApiError::Unreachable.status(), StatusCode::SERVICE_UNAVAILABLE);
		assert_eq!(ApiError::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
		assert_eq!(
			ApiError::NotImplemented("x").status(),
			StatusCode::NOT_IMPLEMENTED
		);
	}

	#[test]
	fn decrypt_failure_maps_to_bad_request() {
		let err: ApiError = KeyError::Crypto(CryptoError::NotAuthentic).into();
		assert_eq!(err, ApiError::NotAuthentic);
	}

	#[test]
	fn admin_deletion_maps_to_forbidden() {
		let err: ApiError = AclError::AdminProtected.into();
		assert_eq!(err.status(), StatusCode::FORBIDDEN);
	}
}
