// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The key-store contract.

use async_trait::async_trait;
use kestrel_crypto::SecretKey;

use crate::error::StoreError;

/// Durable mapping from key name to key material.
///
/// Implementations must serialize create/delete per key name: after a
/// successful `create`, a later `get` observes the value unless an
/// intervening `delete` removed it. No ordering is guaranteed across
/// distinct names.
#[async_trait]
pub trait KeyStore: Send + Sync {
	/// Stores `key` under `name` if absent. Fails with
	/// [`StoreError::Exists`] when the name is taken.
	async fn create(&self, name: &str, key: SecretKey) -> Result<(), StoreError>;

	/// Returns the key stored under `name`.
	async fn get(&self, name: &str) -> Result<SecretKey, StoreError>;

	/// Removes `name`. Deleting a missing key succeeds.
	async fn delete(&self, name: &str) -> Result<(), StoreError>;

	/// Lists all key names. The iterator is lazy and must be assumed
	/// non-restartable; callers close it even when abandoning it early.
	async fn list(&self) -> Result<Box<dyn KeyIter>, StoreError>;
}

/// Pull-style iterator over key names.
#[async_trait]
pub trait KeyIter: Send {
	/// The next name, `None` when exhausted. An `Err` item ends the
	/// iteration; only `close` may be called afterwards.
	async fn next(&mut self) -> Option<Result<String, StoreError>>;

	/// Releases backend resources. Required even after an error or an
	/// early abandon.
	async fn close(self: Box<Self>) -> Result<(), StoreError>;
}
