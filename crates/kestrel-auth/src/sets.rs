// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy and identity sets.
//!
//! Both sets allow concurrent readers and exclusive writers; a mutation
//! publishes atomically from a reader's perspective. Identity→policy is a
//! name lookup, never an owning reference: deleting a policy leaves
//! assigned identities pointing at a name that resolves to nothing, and
//! requests by those identities fail closed.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::AclError;
use crate::identity::{Identity, IdentityInfo};
use crate::policy::Policy;

/// A stored policy with its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyInfo {
	pub policy: Policy,
	pub created_at: DateTime<Utc>,
	pub created_by: Identity,
}

/// Mapping from policy name to policy.
#[async_trait]
pub trait PolicySet: Send + Sync {
	/// Creates or replaces the named policy.
	async fn set(&self, name: &str, policy: Policy, created_by: Identity)
		-> Result<(), AclError>;

	async fn get(&self, name: &str) -> Result<PolicyInfo, AclError>;

	/// Removes the named policy. Removing a missing policy succeeds;
	/// identities assigned to it keep their dangling reference.
	async fn delete(&self, name: &str) -> Result<(), AclError>;

	/// Snapshot of all policies.
	async fn list(&self) -> Result<Vec<(String, PolicyInfo)>, AclError>;
}

/// Mapping from identity to its assignment.
#[async_trait]
pub trait IdentitySet: Send + Sync {
	/// Assigns or reassigns an identity.
	///
	/// Assigning an unknown policy name is permitted (forward reference).
	/// Assigning a second admin fails with [`AclError::AdminExists`].
	async fn assign(&self, identity: Identity, info: IdentityInfo) -> Result<(), AclError>;

	async fn get(&self, identity: &Identity) -> Result<IdentityInfo, AclError>;

	/// Removes an identity. The admin identity cannot be removed.
	async fn delete(&self, identity: &Identity) -> Result<(), AclError>;

	/// Snapshot of all identities.
	async fn list(&self) -> Result<Vec<(Identity, IdentityInfo)>, AclError>;
}

/// In-memory [`PolicySet`].
#[derive(Default)]
pub struct MemPolicySet {
	policies: RwLock<HashMap<String, PolicyInfo>>,
}

impl MemPolicySet {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl PolicySet for MemPolicySet {
	async fn set(
		&self,
		name: &str,
		policy: Policy,
		created_by: Identity,
	) -> Result<(), AclError> {
		let info = PolicyInfo {
			policy,
			created_at: Utc::now(),
			created_by,
		};
		self.policies.write().await.insert(name.to_string(), info);
		Ok(())
	}

	async fn get(&self, name: &str) -> Result<PolicyInfo, AclError> {
		self.policies
			.read()
			.await
			.get(name)
			.cloned()
			.ok_or(AclError::PolicyNotFound)
	}

	async fn delete(&self, name: &str) -> Result<(), AclError> {
		self.policies.write().await.remove(name);
		Ok(())
	}

	async fn list(&self) -> Result<Vec<(String, PolicyInfo)>, AclError> {
		Ok(self
			.policies
			.read()
			.await
			.iter()
			.map(|(name, info)| (name.clone(), info.clone()))
			.collect())
	}
}

/// In-memory [`IdentitySet`].
#[derive(Default)]
pub struct MemIdentitySet {
	identities: RwLock<HashMap<Identity, IdentityInfo>>,
}

impl MemIdentitySet {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl IdentitySet for MemIdentitySet {
	async fn assign(&self, identity: Identity, info: IdentityInfo) -> Result<(), AclError> {
		let mut identities = self.identities.write().await;
		if info.is_admin
			&& identities
				.iter()
				.any(|(id, existing)| existing.is_admin && *id != identity)
		{
			return Err(AclError::AdminExists);
		}
		identities.insert(identity, info);
		Ok(())
	}

	async fn get(&self, identity: &Identity) -> Result<IdentityInfo, AclError> {
		self.identities
			.read()
			.await
			.get(identity)
			.cloned()
			.ok_or(AclError::IdentityNotFound)
	}

	async fn delete(&self, identity: &Identity) -> Result<(), AclError> {
		let mut identities = self.identities.write().await;
		if identities.get(identity).is_some_and(|info| info.is_admin) {
			return Err(AclError::AdminProtected);
		}
		identities.remove(identity);
		Ok(())
	}

	async fn list(&self) -> Result<Vec<(Identity, IdentityInfo)>, AclError> {
		Ok(self
			.identities
			.read()
			.await
			.iter()
			.map(|(id, info)| (id.clone(), info.clone()))
			.collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn info(policy: &str, is_admin: bool) -> IdentityInfo {
		IdentityInfo {
			policy: policy.to_string(),
			is_admin,
			created_at: Utc::now(),
			created_by: Identity::new("creator"),
		}
	}

	#[tokio::test]
	async fn policy_set_round_trip() {
		let set = MemPolicySet::new();
		let policy = Policy::new(vec!["/version".to_string()], vec![]);
		set.set("ops", policy.clone(), Identity::new("admin"))
			.await
			.unwrap();
		assert_eq!(set.get("ops").await.unwrap().policy, policy);
	}

	#[tokio::test]
	async fn policy_delete_is_idempotent() {
		let set = MemPolicySet::new();
		set.set("ops", Policy::default(), Identity::new("admin"))
			.await
			.unwrap();
		set.delete("ops").await.unwrap();
		set.delete("ops").await.unwrap();
		assert_eq!(set.get("ops").await, Err(AclError::PolicyNotFound));
	}

	#[tokio::test]
	async fn forward_policy_references_are_permitted() {
		let set = MemIdentitySet::new();
		set.assign(Identity::new("a"), info("not-yet-created", false))
			.await
			.unwrap();
		assert_eq!(
			set.get(&Identity::new("a")).await.unwrap().policy,
			"not-yet-created"
		);
	}

	#[tokio::test]
	async fn at_most_one_admin() {
		let set = MemIdentitySet::new();
		set.assign(Identity::new("a"), info("ops", true)).await.unwrap();
		assert_eq!(
			set.assign(Identity::new("b"), info("ops", true)).await,
			Err(AclError::AdminExists)
		);
		// Reassigning the same admin is fine.
		set.assign(Identity::new("a"), info("other", true))
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn admin_cannot_be_deleted() {
		let set = MemIdentitySet::new();
		set.assign(Identity::new("a"), info("ops", true)).await.unwrap();
		assert_eq!(
			set.delete(&Identity::new("a")).await,
			Err(AclError::AdminProtected)
		);

		set.assign(Identity::new("b"), info("ops", false))
			.await
			.unwrap();
		set.delete(&Identity::new("b")).await.unwrap();
		set.delete(&Identity::new("b")).await.unwrap();
	}
}
