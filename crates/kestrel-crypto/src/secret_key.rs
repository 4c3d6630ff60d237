// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The 256-bit master key type.

use aes_gcm::aead::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Size of a master key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// A symmetric master key.
///
/// Key material is zeroized when the value is dropped and is redacted from
/// `Debug` output. It never leaves the process through any API response;
/// only envelope ciphertexts derived from it do.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_SIZE]);

impl SecretKey {
	/// Generates a fresh random key from the OS CSPRNG.
	pub fn generate() -> Self {
		let mut key = [0u8; KEY_SIZE];
		OsRng.fill_bytes(&mut key);
		Self(key)
	}

	/// Constructs a key from raw bytes. The slice must be exactly 32 bytes.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
		let key: [u8; KEY_SIZE] = bytes
			.try_into()
			.map_err(|_| CryptoError::InvalidKeySize {
				expected: KEY_SIZE,
				actual: bytes.len(),
			})?;
		Ok(Self(key))
	}

	/// Exposes the raw key material.
	///
	/// Callers must not let the bytes escape into logs or responses; the
	/// only legitimate consumers are the envelope codec and data-key
	/// generation.
	pub fn expose(&self) -> &[u8; KEY_SIZE] {
		&self.0
	}
}

impl std::fmt::Debug for SecretKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("SecretKey(REDACTED)")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn generate_produces_unique_keys() {
		let key1 = SecretKey::generate();
		let key2 = SecretKey::generate();
		assert_ne!(key1, key2);
	}

	#[test]
	fn from_bytes_requires_exactly_32_bytes() {
		assert!(SecretKey::from_bytes(&[0u8; 32]).is_ok());
		assert_eq!(
			SecretKey::from_bytes(&[0u8; 16]),
			Err(CryptoError::InvalidKeySize {
				expected: 32,
				actual: 16
			})
		);
		assert_eq!(
			SecretKey::from_bytes(&[0u8; 33]),
			Err(CryptoError::InvalidKeySize {
				expected: 32,
				actual: 33
			})
		);
	}

	#[test]
	fn debug_redacts_key_material() {
		let key = SecretKey::from_bytes(&[0xAB; 32]).unwrap();
		let rendered = format!("{key:?}");
		assert!(!rendered.contains("ab"));
		assert!(rendered.contains("REDACTED"));
	}
}
