// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use kestrel_crypto::CryptoError;
use thiserror::Error;

/// Failures of a [`crate::KeyStore`] backend.
///
/// `Unreachable` is the only retriable variant; `Exists` and `NotFound`
/// are terminal. The engine never retries on its own.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
	#[error("key already exists")]
	Exists,

	#[error("key not found")]
	NotFound,

	#[error("key store unreachable: {0}")]
	Unreachable(String),
}

/// Failures of the key engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
	#[error("key already exists")]
	Exists,

	#[error("key not found")]
	NotFound,

	#[error("invalid key name")]
	InvalidName,

	#[error("invalid key material")]
	InvalidKey,

	#[error("plaintext exceeds the maximum size")]
	PlaintextTooLarge,

	#[error(transparent)]
	Crypto(#[from] CryptoError),

	#[error("key store unreachable: {0}")]
	Unreachable(String),
}

impl From<StoreError> for KeyError {
	fn from(err: StoreError) -> Self {
		match err {
			StoreError::Exists => KeyError::Exists,
			StoreError::NotFound => KeyError::NotFound,
			StoreError::Unreachable(msg) => KeyError::Unreachable(msg),
		}
	}
}
