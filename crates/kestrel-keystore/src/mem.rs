// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory key store.

use std::collections::HashMap;

use async_trait::async_trait;
use kestrel_crypto::SecretKey;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::{KeyIter, KeyStore};

/// A [`KeyStore`] backed by process memory.
///
/// The reference implementation of the store contract and the backend of
/// the stateless server. Contents vanish with the process.
#[derive(Default)]
pub struct MemKeyStore {
	keys: RwLock<HashMap<String, SecretKey>>,
}

impl MemKeyStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl KeyStore for MemKeyStore {
	async fn create(&self, name: &str, key: SecretKey) -> Result<(), StoreError> {
		let mut keys = self.keys.write().await;
		if keys.contains_key(name) {
			return Err(StoreError::Exists);
		}
		keys.insert(name.to_string(), key);
		Ok(())
	}

	async fn get(&self, name: &str) -> Result<SecretKey, StoreError> {
		self.keys
			.read()
			.await
			.get(name)
			.cloned()
			.ok_or(StoreError::NotFound)
	}

	async fn delete(&self, name: &str) -> Result<(), StoreError> {
		self.keys.write().await.remove(name);
		Ok(())
	}

	async fn list(&self) -> Result<Box<dyn KeyIter>, StoreError> {
		// Snapshot under the read lock; the iterator does not observe
		// concurrent mutations.
		let names: Vec<String> = self.keys.read().await.keys().cloned().collect();
		Ok(Box::new(MemIter {
			names: names.into_iter(),
		}))
	}
}

struct MemIter {
	names: std::vec::IntoIter<String>,
}

#[async_trait]
impl KeyIter for MemIter {
	async fn next(&mut self) -> Option<Result<String, StoreError>> {
		self.names.next().map(Ok)
	}

	async fn close(self: Box<Self>) -> Result<(), StoreError> {
		Ok(())
	}
}
