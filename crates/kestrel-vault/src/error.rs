// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaultError {
	#[error("vault is sealed")]
	Sealed,

	#[error("enclave not found")]
	EnclaveNotFound,

	#[error("{0}")]
	NotImplemented(&'static str),
}
