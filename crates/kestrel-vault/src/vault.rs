// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The vault: enclave lookup and the seal gate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use kestrel_auth::Identity;
use tracing::info;

use crate::enclave::Enclave;
use crate::error::VaultError;

/// Owner of enclaves and the process-wide seal flag.
///
/// The seal flag is a single atomic read on the hot path; the request
/// pipeline checks it before any other work.
#[async_trait]
pub trait Vault: Send + Sync {
	/// Whether the vault is sealed.
	fn is_sealed(&self) -> bool;

	async fn seal(&self) -> Result<(), VaultError>;

	async fn unseal(&self) -> Result<(), VaultError>;

	/// The operator identity configured for this vault.
	fn operator(&self) -> &Identity;

	async fn create_enclave(&self, name: &str) -> Result<Arc<Enclave>, VaultError>;

	/// Looks up an enclave. The stateless vault serves its single default
	/// enclave under the empty name.
	async fn get_enclave(&self, name: &str) -> Result<Arc<Enclave>, VaultError>;

	async fn delete_enclave(&self, name: &str) -> Result<(), VaultError>;
}

/// A vault with exactly one enclave and no enclave management.
///
/// Begins unsealed. Seal and unseal flip the atomic gate; they do not
/// touch key material.
pub struct StatelessVault {
	enclave: Arc<Enclave>,
	operator: Identity,
	sealed: AtomicBool,
}

impl StatelessVault {
	pub fn new(enclave: Enclave, operator: Identity) -> Self {
		Self {
			enclave: Arc::new(enclave),
			operator,
			sealed: AtomicBool::new(false),
		}
	}
}

#[async_trait]
impl Vault for StatelessVault {
	fn is_sealed(&self) -> bool {
		self.sealed.load(Ordering::Relaxed)
	}

	async fn seal(&self) -> Result<(), VaultError> {
		self.sealed.store(true, Ordering::Relaxed);
		info!("vault sealed");
		Ok(())
	}

	async fn unseal(&self) -> Result<(), VaultError> {
		self.sealed.store(false, Ordering::Relaxed);
		info!("vault unsealed");
		Ok(())
	}

	fn operator(&self) -> &Identity {
		&self.operator
	}

	async fn create_enclave(&self, _name: &str) -> Result<Arc<Enclave>, VaultError> {
		Err(VaultError::NotImplemented(
			"creating enclaves is not supported",
		))
	}

	async fn get_enclave(&self, name: &str) -> Result<Arc<Enclave>, VaultError> {
		if name.is_empty() {
			return Ok(Arc::clone(&self.enclave));
		}
		Err(VaultError::EnclaveNotFound)
	}

	async fn delete_enclave(&self, _name: &str) -> Result<(), VaultError> {
		Err(VaultError::NotImplemented(
			"deleting enclaves is not supported",
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kestrel_auth::{MemIdentitySet, MemPolicySet};
	use kestrel_keystore::{KeyEngine, MemKeyStore};

	fn vault() -> StatelessVault {
		let enclave = Enclave::new(
			"",
			KeyEngine::new(Arc::new(MemKeyStore::new())),
			Arc::new(MemPolicySet::new()),
			Arc::new(MemIdentitySet::new()),
		);
		StatelessVault::new(enclave, Identity::new("operator"))
	}

	#[tokio::test]
	async fn begins_unsealed_and_transitions() {
		let vault = vault();
		assert!(!vault.is_sealed());
		vault.seal().await.unwrap();
		assert!(vault.is_sealed());
		vault.unseal().await.unwrap();
		assert!(!vault.is_sealed());
	}

	#[tokio::test]
	async fn default_enclave_lives_under_the_empty_name() {
		let vault = vault();
		assert!(vault.get_enclave("").await.is_ok());
		assert_eq!(
			vault.get_enclave("other").await.err(),
			Some(VaultError::EnclaveNotFound)
		);
	}

	#[tokio::test]
	async fn enclave_management_is_not_implemented() {
		let vault = vault();
		assert!(matches!(
			vault.create_enclave("x").await,
			Err(VaultError::NotImplemented(_))
		));
		assert!(matches!(
			vault.delete_enclave("x").await,
			Err(VaultError::NotImplemented(_))
		));
	}
}
