// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
	#[error("invalid key size: expected {expected} bytes, got {actual}")]
	InvalidKeySize { expected: usize, actual: usize },

	#[error("context exceeds the maximum size")]
	ContextTooLarge,

	#[error("malformed envelope")]
	MalformedEnvelope,

	#[error("ciphertext is not authentic")]
	NotAuthentic,

	#[error("encryption failed")]
	SealFailed,
}
