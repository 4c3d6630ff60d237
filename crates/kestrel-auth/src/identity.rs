// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client identities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use x509_parser::prelude::FromDer;
use x509_parser::certificate::X509Certificate;

use crate::error::AclError;

/// A client identity: the lowercase hex SHA-256 of a certificate's
/// DER-encoded SubjectPublicKeyInfo.
///
/// Two certificates with the same public key have the same identity. The
/// empty identity is reserved for unauthenticated peers and never
/// authorizes anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
	pub fn new(hex: impl Into<String>) -> Self {
		Self(hex.into())
	}

	/// The reserved unauthenticated identity.
	pub fn unknown() -> Self {
		Self(String::new())
	}

	/// Computes the identity of a DER-encoded leaf certificate.
	pub fn from_certificate(der: &[u8]) -> Result<Self, AclError> {
		let (_, cert) = X509Certificate::from_der(der)
			.map_err(|e| AclError::InvalidCertificate(e.to_string()))?;
		let digest = Sha256::digest(cert.public_key().raw);
		Ok(Self(hex::encode(digest)))
	}

	pub fn is_unknown(&self) -> bool {
		self.0.is_empty()
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Display for Identity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

/// What an identity set records about an assigned identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityInfo {
	/// Name of the assigned policy. May dangle; lookups fail closed.
	pub policy: String,
	pub is_admin: bool,
	pub created_at: DateTime<Utc>,
	pub created_by: Identity,
}

#[cfg(test)]
mod tests {
	use super::*;
	use rcgen::{CertificateParams, KeyPair};

	fn certificate_der(key: &KeyPair) -> Vec<u8> {
		CertificateParams::new(vec!["client.example".to_string()])
			.unwrap()
			.self_signed(key)
			.unwrap()
			.der()
			.to_vec()
	}

	#[test]
	fn identity_is_64_hex_chars() {
		let key = KeyPair::generate().unwrap();
		let identity = Identity::from_certificate(&certificate_der(&key)).unwrap();
		assert_eq!(identity.as_str().len(), 64);
		assert!(identity
			.as_str()
			.chars()
			.all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
	}

	#[test]
	fn same_public_key_same_identity() {
		// Two distinct certificates over one key pair share the SPKI.
		let key = KeyPair::generate().unwrap();
		let first = Identity::from_certificate(&certificate_der(&key)).unwrap();
		let second = Identity::from_certificate(&certificate_der(&key)).unwrap();
		assert_eq!(first, second);
	}

	#[test]
	fn different_public_key_different_identity() {
		let first =
			Identity::from_certificate(&certificate_der(&KeyPair::generate().unwrap())).unwrap();
		let second =
			Identity::from_certificate(&certificate_der(&KeyPair::generate().unwrap())).unwrap();
		assert_ne!(first, second);
	}

	#[test]
	fn garbage_is_an_invalid_certificate() {
		assert!(matches!(
			Identity::from_certificate(b"not a certificate"),
			Err(AclError::InvalidCertificate(_))
		));
	}

	#[test]
	fn unknown_identity_is_empty() {
		assert!(Identity::unknown().is_unknown());
		assert!(!Identity::new("abc123").is_unknown());
	}
}
