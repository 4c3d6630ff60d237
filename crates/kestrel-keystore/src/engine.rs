// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The key engine.
//!
//! Orchestrates key lifecycle and envelope operations over an arbitrary
//! [`KeyStore`]. The engine holds no state of its own; everything durable
//! lives in the store, everything cryptographic in `kestrel-crypto`.

use std::sync::Arc;

use kestrel_crypto::SecretKey;
use tracing::debug;

use crate::error::KeyError;
use crate::store::{KeyIter, KeyStore};
use crate::validate::is_valid_name;

/// Maximum plaintext size accepted by encrypt and decrypt, in bytes.
pub const MAX_PLAINTEXT_SIZE: usize = 1024 * 1024;

/// A freshly generated data key: the plaintext and its sealed form under
/// the master key it was requested for.
pub struct DataKey {
	pub plaintext: Vec<u8>,
	pub ciphertext: Vec<u8>,
}

pub struct KeyEngine {
	store: Arc<dyn KeyStore>,
}

impl KeyEngine {
	pub fn new(store: Arc<dyn KeyStore>) -> Self {
		Self { store }
	}

	/// Creates a new key with fresh random material.
	pub async fn create_key(&self, name: &str) -> Result<(), KeyError> {
		if !is_valid_name(name) {
			return Err(KeyError::InvalidName);
		}
		self.store.create(name, SecretKey::generate()).await?;
		debug!(key = name, "created key");
		Ok(())
	}

	/// Imports caller-supplied key material. `bytes` must be exactly 32
	/// bytes.
	pub async fn import_key(&self, name: &str, bytes: &[u8]) -> Result<(), KeyError> {
		if !is_valid_name(name) {
			return Err(KeyError::InvalidName);
		}
		let key = SecretKey::from_bytes(bytes).map_err(|_| KeyError::InvalidKey)?;
		self.store.create(name, key).await?;
		debug!(key = name, "imported key");
		Ok(())
	}

	/// Deletes a key. Deleting a missing key succeeds.
	pub async fn delete_key(&self, name: &str) -> Result<(), KeyError> {
		if !is_valid_name(name) {
			return Err(KeyError::InvalidName);
		}
		self.store.delete(name).await?;
		debug!(key = name, "deleted key");
		Ok(())
	}

	/// Generates a fresh 32-byte data key and returns it together with
	/// its envelope sealed under `name`, with `context` bound.
	pub async fn generate_data_key(
		&self,
		name: &str,
		context: Option<&[u8]>,
	) -> Result<DataKey, KeyError> {
		if !is_valid_name(name) {
			return Err(KeyError::InvalidName);
		}
		let master = self.store.get(name).await?;
		let data_key = SecretKey::generate();
		let plaintext = data_key.expose().to_vec();
		let ciphertext = master.seal(&plaintext, context)?;
		Ok(DataKey {
			plaintext,
			ciphertext,
		})
	}

	/// Seals `plaintext` under the named key.
	pub async fn encrypt(
		&self,
		name: &str,
		plaintext: &[u8],
		context: Option<&[u8]>,
	) -> Result<Vec<u8>, KeyError> {
		if !is_valid_name(name) {
			return Err(KeyError::InvalidName);
		}
		if plaintext.len() > MAX_PLAINTEXT_SIZE {
			return Err(KeyError::PlaintextTooLarge);
		}
		let master = self.store.get(name).await?;
		Ok(master.seal(plaintext, context)?)
	}

	/// Opens `ciphertext` with the named key. The context must equal the
	/// one bound at seal time or the envelope fails authentication.
	pub async fn decrypt(
		&self,
		name: &str,
		ciphertext: &[u8],
		context: Option<&[u8]>,
	) -> Result<Vec<u8>, KeyError> {
		if !is_valid_name(name) {
			return Err(KeyError::InvalidName);
		}
		let master = self.store.get(name).await?;
		Ok(master.open(ciphertext, context)?)
	}

	/// Lists all key names in the store.
	pub async fn list_keys(&self) -> Result<Box<dyn KeyIter>, KeyError> {
		Ok(self.store.list().await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mem::MemKeyStore;
	use kestrel_crypto::CryptoError;

	fn engine() -> KeyEngine {
		KeyEngine::new(Arc::new(MemKeyStore::new()))
	}

	#[tokio::test]
	async fn encrypt_decrypt_round_trip() {
		let engine = engine();
		engine.create_key("t").await.unwrap();
		let ciphertext = engine
			.encrypt("t", b"Hello World", Some(b"ctx"))
			.await
			.unwrap();
		let plaintext = engine.decrypt("t", &ciphertext, Some(b"ctx")).await.unwrap();
		assert_eq!(plaintext, b"Hello World");
	}

	#[tokio::test]
	async fn decrypt_with_different_context_fails() {
		let engine = engine();
		engine.create_key("t").await.unwrap();
		let ciphertext = engine
			.encrypt("t", b"Hello World", Some(b"ctx"))
			.await
			.unwrap();
		assert_eq!(
			engine.decrypt("t", &ciphertext, Some(b"ctx2")).await,
			Err(KeyError::Crypto(CryptoError::NotAuthentic))
		);
	}

	#[tokio::test]
	async fn second_create_fails_with_exists() {
		let engine = engine();
		engine.create_key("k").await.unwrap();
		assert_eq!(engine.create_key("k").await, Err(KeyError::Exists));
	}

	#[tokio::test]
	async fn delete_twice_succeeds() {
		let engine = engine();
		engine.create_key("k").await.unwrap();
		engine.delete_key("k").await.unwrap();
		engine.delete_key("k").await.unwrap();
	}

	#[tokio::test]
	async fn import_requires_32_bytes() {
		let engine = engine();
		assert_eq!(
			engine.import_key("k", &[0u8; 16]).await,
			Err(KeyError::InvalidKey)
		);
		engine.import_key("k", &[0u8; 32]).await.unwrap();
	}

	#[tokio::test]
	async fn imported_key_is_used_verbatim() {
		let engine = engine();
		engine.import_key("k", &[7u8; 32]).await.unwrap();
		let ciphertext = engine.encrypt("k", b"data", None).await.unwrap();

		let key = SecretKey::from_bytes(&[7u8; 32]).unwrap();
		assert_eq!(key.open(&ciphertext, None).unwrap(), b"data");
	}

	#[tokio::test]
	async fn generated_data_key_decrypts_under_the_master() {
		let engine = engine();
		engine.create_key("master").await.unwrap();
		let data_key = engine
			.generate_data_key("master", Some(b"ctx"))
			.await
			.unwrap();
		assert_eq!(data_key.plaintext.len(), 32);
		let plaintext = engine
			.decrypt("master", &data_key.ciphertext, Some(b"ctx"))
			.await
			.unwrap();
		assert_eq!(plaintext, data_key.plaintext);
	}

	#[tokio::test]
	async fn invalid_names_are_rejected_before_store_io() {
		let engine = engine();
		assert_eq!(engine.create_key("bad name").await, Err(KeyError::InvalidName));
		assert_eq!(engine.delete_key("bad/name").await, Err(KeyError::InvalidName));
		assert_eq!(
			engine.encrypt("", b"x", None).await,
			Err(KeyError::InvalidName)
		);
	}

	#[tokio::test]
	async fn encrypt_missing_key_is_not_found() {
		let engine = engine();
		assert_eq!(
			engine.encrypt("ghost", b"x", None).await,
			Err(KeyError::NotFound)
		);
	}

	#[tokio::test]
	async fn oversize_plaintext_is_rejected() {
		let engine = engine();
		engine.create_key("k").await.unwrap();
		let plaintext = vec![0u8; MAX_PLAINTEXT_SIZE + 1];
		assert_eq!(
			engine.encrypt("k", &plaintext, None).await,
			Err(KeyError::PlaintextTooLarge)
		);
	}
}
