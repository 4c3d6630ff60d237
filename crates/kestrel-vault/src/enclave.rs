// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The enclave: one authorization namespace.

use std::sync::Arc;

use kestrel_auth::{AclError, Identity, IdentityInfo, IdentitySet, Policy, PolicyInfo, PolicySet};
use kestrel_keystore::{DataKey, KeyEngine, KeyError, KeyIter};

/// One namespace bundling a key engine, a policy set, and an identity
/// set.
///
/// The enclave owns its stores; handlers share it read-only behind an
/// `Arc`. Stores never reference the enclave back.
pub struct Enclave {
	name: String,
	engine: KeyEngine,
	policies: Arc<dyn PolicySet>,
	identities: Arc<dyn IdentitySet>,
}

impl Enclave {
	pub fn new(
		name: impl Into<String>,
		engine: KeyEngine,
		policies: Arc<dyn PolicySet>,
		identities: Arc<dyn IdentitySet>,
	) -> Self {
		Self {
			name: name.into(),
			engine,
			policies,
			identities,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Authorizes a request path for an identity.
	///
	/// Unknown identities and dangling policy assignments fail closed
	/// with [`AclError::NotAuthorized`]; a policy decision against the
	/// request fails with [`AclError::Forbidden`]. Admins bypass policy
	/// evaluation.
	pub async fn verify(&self, identity: &Identity, path: &str) -> Result<(), AclError> {
		if identity.is_unknown() {
			return Err(AclError::NotAuthorized);
		}
		let info = match self.identities.get(identity).await {
			Ok(info) => info,
			Err(AclError::IdentityNotFound) => return Err(AclError::NotAuthorized),
			Err(e) => return Err(e),
		};
		if info.is_admin {
			return Ok(());
		}
		let policy = match self.policies.get(&info.policy).await {
			Ok(info) => info.policy,
			Err(AclError::PolicyNotFound) => return Err(AclError::NotAuthorized),
			Err(e) => return Err(e),
		};
		policy.verify(path)
	}

	// Key operations.

	pub async fn create_key(&self, name: &str) -> Result<(), KeyError> {
		self.engine.create_key(name).await
	}

	pub async fn import_key(&self, name: &str, bytes: &[u8]) -> Result<(), KeyError> {
		self.engine.import_key(name, bytes).await
	}

	pub async fn delete_key(&self, name: &str) -> Result<(), KeyError> {
		self.engine.delete_key(name).await
	}

	pub async fn generate_data_key(
		&self,
		name: &str,
		context: Option<&[u8]>,
	) -> Result<DataKey, KeyError> {
		self.engine.generate_data_key(name, context).await
	}

	pub async fn encrypt(
		&self,
		name: &str,
		plaintext: &[u8],
		context: Option<&[u8]>,
	) -> Result<Vec<u8>, KeyError> {
		self.engine.encrypt(name, plaintext, context).await
	}

	pub async fn decrypt(
		&self,
		name: &str,
		ciphertext: &[u8],
		context: Option<&[u8]>,
	) -> Result<Vec<u8>, KeyError> {
		self.engine.decrypt(name, ciphertext, context).await
	}

	pub async fn list_keys(&self) -> Result<Box<dyn KeyIter>, KeyError> {
		self.engine.list_keys().await
	}

	// Policy operations.

	pub async fn set_policy(
		&self,
		name: &str,
		policy: Policy,
		created_by: Identity,
	) -> Result<(), AclError> {
		self.policies.set(name, policy, created_by).await
	}

	pub async fn get_policy(&self, name: &str) -> Result<PolicyInfo, AclError> {
		self.policies.get(name).await
	}

	pub async fn delete_policy(&self, name: &str) -> Result<(), AclError> {
		self.policies.delete(name).await
	}

	pub async fn list_policies(&self) -> Result<Vec<(String, PolicyInfo)>, AclError> {
		self.policies.list().await
	}

	// Identity operations.

	pub async fn assign_identity(
		&self,
		identity: Identity,
		info: IdentityInfo,
	) -> Result<(), AclError> {
		self.identities.assign(identity, info).await
	}

	pub async fn get_identity(&self, identity: &Identity) -> Result<IdentityInfo, AclError> {
		self.identities.get(identity).await
	}

	pub async fn delete_identity(&self, identity: &Identity) -> Result<(), AclError> {
		self.identities.delete(identity).await
	}

	pub async fn list_identities(&self) -> Result<Vec<(Identity, IdentityInfo)>, AclError> {
		self.identities.list().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use kestrel_auth::{MemIdentitySet, MemPolicySet};
	use kestrel_keystore::MemKeyStore;

	fn enclave() -> Enclave {
		Enclave::new(
			"",
			KeyEngine::new(Arc::new(MemKeyStore::new())),
			Arc::new(MemPolicySet::new()),
			Arc::new(MemIdentitySet::new()),
		)
	}

	fn info(policy: &str, is_admin: bool) -> IdentityInfo {
		IdentityInfo {
			policy: policy.to_string(),
			is_admin,
			created_at: Utc::now(),
			created_by: Identity::new("test"),
		}
	}

	#[tokio::test]
	async fn unknown_identity_is_not_authorized() {
		let enclave = enclave();
		assert_eq!(
			enclave.verify(&Identity::unknown(), "/v1/status").await,
			Err(AclError::NotAuthorized)
		);
		assert_eq!(
			enclave.verify(&Identity::new("stranger"), "/v1/status").await,
			Err(AclError::NotAuthorized)
		);
	}

	#[tokio::test]
	async fn admin_bypasses_policy_evaluation() {
		let enclave = enclave();
		enclave
			.assign_identity(Identity::new("root"), info("does-not-exist", true))
			.await
			.unwrap();
		assert_eq!(
			enclave.verify(&Identity::new("root"), "/v1/key/delete/any").await,
			Ok(())
		);
	}

	#[tokio::test]
	async fn dangling_policy_assignment_fails_closed() {
		let enclave = enclave();
		enclave
			.assign_identity(Identity::new("user"), info("ops", false))
			.await
			.unwrap();
		// Policy "ops" was never created.
		assert_eq!(
			enclave.verify(&Identity::new("user"), "/v1/status").await,
			Err(AclError::NotAuthorized)
		);

		// Creating it later makes the same assignment work.
		enclave
			.set_policy(
				"ops",
				Policy::new(vec!["/v1/status".to_string()], vec![]),
				Identity::new("root"),
			)
			.await
			.unwrap();
		assert_eq!(
			enclave.verify(&Identity::new("user"), "/v1/status").await,
			Ok(())
		);
	}

	#[tokio::test]
	async fn deleting_a_policy_revokes_without_deleting_identities() {
		let enclave = enclave();
		enclave
			.set_policy(
				"ops",
				Policy::new(vec!["/v1/status".to_string()], vec![]),
				Identity::new("root"),
			)
			.await
			.unwrap();
		enclave
			.assign_identity(Identity::new("user"), info("ops", false))
			.await
			.unwrap();
		assert_eq!(
			enclave.verify(&Identity::new("user"), "/v1/status").await,
			Ok(())
		);

		enclave.delete_policy("ops").await.unwrap();
		// The identity survives but no longer authorizes anything.
		assert!(enclave.get_identity(&Identity::new("user")).await.is_ok());
		assert_eq!(
			enclave.verify(&Identity::new("user"), "/v1/status").await,
			Err(AclError::NotAuthorized)
		);
	}

	#[tokio::test]
	async fn policy_decision_applies_to_non_admins() {
		let enclave = enclave();
		enclave
			.set_policy(
				"keys-only",
				Policy::new(
					vec!["/v1/key/list/*".to_string()],
					vec!["/v1/key/list/my-*".to_string()],
				),
				Identity::new("root"),
			)
			.await
			.unwrap();
		enclave
			.assign_identity(Identity::new("user"), info("keys-only", false))
			.await
			.unwrap();

		assert_eq!(
			enclave.verify(&Identity::new("user"), "/v1/key/list/other").await,
			Ok(())
		);
		assert_eq!(
			enclave.verify(&Identity::new("user"), "/v1/key/list/my-foo").await,
			Err(AclError::Forbidden)
		);
		assert_eq!(
			enclave.verify(&Identity::new("user"), "/v1/policy/list/*").await,
			Err(AclError::Forbidden)
		);
	}
}
