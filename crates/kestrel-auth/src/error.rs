// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AclError {
	/// No identity, an unknown identity, or an identity whose policy
	/// assignment dangles. Fails closed.
	#[error("not authorized")]
	NotAuthorized,

	/// A known identity whose policy denies the request.
	#[error("prohibited by policy")]
	Forbidden,

	/// The admin identity cannot be deleted.
	#[error("cannot delete the admin identity")]
	AdminProtected,

	/// An identity set admits at most one admin.
	#[error("an admin identity is already assigned")]
	AdminExists,

	#[error("invalid pattern")]
	InvalidPattern,

	#[error("invalid certificate: {0}")]
	InvalidCertificate(String),

	#[error("policy not found")]
	PolicyNotFound,

	#[error("identity not found")]
	IdentityNotFound,
}
