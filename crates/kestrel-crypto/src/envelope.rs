// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The AEAD envelope codec.
//!
//! A sealed envelope is JSON with base64 binary fields:
//!
//! ```json
//! {"aead":"<algorithm>","iv":"<b64>","nonce":"<b64>","bytes":"<b64>"}
//! ```
//!
//! The layout is an external contract; existing envelopes must keep
//! opening across releases. Each seal draws a fresh 16-byte IV and a fresh
//! 12-byte nonce from the OS CSPRNG and derives a per-message sealing key
//! from the master key and the IV:
//!
//! - `AES-256-GCM-HMAC-SHA-256`: sealing key = HMAC-SHA-256(master, IV)
//! - `ChaCha20-Poly1305`: sealing key = HChaCha20(master, IV)
//!
//! The optional context is bound as associated data and must match
//! byte-for-byte when opening.

use aes_gcm::aead::{Aead as _, KeyInit, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use chacha20::hchacha;
use chacha20poly1305::ChaCha20Poly1305;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::secret_key::SecretKey;
use crate::fips_mode;

/// Size of the key-derivation IV in bytes.
pub const IV_SIZE: usize = 16;

/// Size of the AEAD nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Maximum size of the context (associated data) in bytes.
pub const MAX_CONTEXT_SIZE: usize = 512 * 1024;

/// The AEAD algorithms an envelope can be sealed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aead {
	#[serde(rename = "AES-256-GCM-HMAC-SHA-256")]
	Aes256GcmHmacSha256,
	#[serde(rename = "ChaCha20-Poly1305")]
	ChaCha20Poly1305,
}

impl Aead {
	/// The algorithm new envelopes are sealed with.
	///
	/// AES when the CPU has hardware AES support or FIPS mode is enabled,
	/// ChaCha20-Poly1305 otherwise. Deterministic per process.
	pub fn preferred() -> Self {
		if fips_mode() || aes_hw_support() {
			Aead::Aes256GcmHmacSha256
		} else {
			Aead::ChaCha20Poly1305
		}
	}

	fn derive_sealing_key(
		self,
		master: &SecretKey,
		iv: &[u8; IV_SIZE],
	) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
		match self {
			Aead::Aes256GcmHmacSha256 => {
				let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(master.expose())
					.map_err(|_| CryptoError::SealFailed)?;
				mac.update(iv);
				Ok(Zeroizing::new(mac.finalize().into_bytes().into()))
			}
			Aead::ChaCha20Poly1305 => {
				let key = chacha20::Key::from_slice(master.expose());
				// U10 selects the 20-round (10 double-round) variant.
				let subkey = hchacha::<chacha20::cipher::consts::U10>(key, iv.into());
				Ok(Zeroizing::new(subkey.into()))
			}
		}
	}
}

#[cfg(target_arch = "x86_64")]
fn aes_hw_support() -> bool {
	std::arch::is_x86_feature_detected!("aes")
}

#[cfg(target_arch = "aarch64")]
fn aes_hw_support() -> bool {
	std::arch::is_aarch64_feature_detected!("aes")
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn aes_hw_support() -> bool {
	false
}

/// The parsed form of a sealed envelope.
///
/// Field order matters: serialization must produce the documented layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
	#[serde(rename = "aead")]
	pub algorithm: Aead,
	#[serde(with = "base64_bytes")]
	pub iv: Vec<u8>,
	#[serde(with = "base64_bytes")]
	pub nonce: Vec<u8>,
	#[serde(with = "base64_bytes")]
	pub bytes: Vec<u8>,
}

impl Envelope {
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
		serde_json::from_slice(bytes).map_err(|_| CryptoError::MalformedEnvelope)
	}

	pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
		serde_json::to_vec(self).map_err(|_| CryptoError::SealFailed)
	}
}

impl SecretKey {
	/// Seals `plaintext`, binding `context` as associated data.
	///
	/// Returns the serialized envelope. `None` and an empty context are
	/// equivalent.
	pub fn seal(&self, plaintext: &[u8], context: Option<&[u8]>) -> Result<Vec<u8>, CryptoError> {
		let context = context.unwrap_or_default();
		if context.len() > MAX_CONTEXT_SIZE {
			return Err(CryptoError::ContextTooLarge);
		}

		let mut iv = [0u8; IV_SIZE];
		OsRng.fill_bytes(&mut iv);
		let mut nonce = [0u8; NONCE_SIZE];
		OsRng.fill_bytes(&mut nonce);

		let algorithm = Aead::preferred();
		let sealing_key = algorithm.derive_sealing_key(self, &iv)?;
		let payload = Payload {
			msg: plaintext,
			aad: context,
		};
		let bytes = match algorithm {
			Aead::Aes256GcmHmacSha256 => {
				let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(sealing_key.as_ref()));
				cipher
					.encrypt(Nonce::from_slice(&nonce), payload)
					.map_err(|_| CryptoError::SealFailed)?
			}
			Aead::ChaCha20Poly1305 => {
				let cipher =
					ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(sealing_key.as_ref()));
				cipher
					.encrypt(chacha20poly1305::Nonce::from_slice(&nonce), payload)
					.map_err(|_| CryptoError::SealFailed)?
			}
		};

		Envelope {
			algorithm,
			iv: iv.to_vec(),
			nonce: nonce.to_vec(),
			bytes,
		}
		.to_bytes()
	}

	/// Opens a serialized envelope, verifying `context`.
	///
	/// Fails with [`CryptoError::NotAuthentic`] when the ciphertext or the
	/// context fails authentication, and with
	/// [`CryptoError::MalformedEnvelope`] when `sealed` does not parse.
	pub fn open(&self, sealed: &[u8], context: Option<&[u8]>) -> Result<Vec<u8>, CryptoError> {
		let context = context.unwrap_or_default();
		if context.len() > MAX_CONTEXT_SIZE {
			return Err(CryptoError::ContextTooLarge);
		}

		let envelope = Envelope::from_bytes(sealed)?;
		let iv: &[u8; IV_SIZE] = envelope
			.iv
			.as_slice()
			.try_into()
			.map_err(|_| CryptoError::MalformedEnvelope)?;
		if envelope.nonce.len() != NONCE_SIZE {
			return Err(CryptoError::MalformedEnvelope);
		}
		if fips_mode() && envelope.algorithm == Aead::ChaCha20Poly1305 {
			return Err(CryptoError::NotAuthentic);
		}

		let sealing_key = envelope
			.algorithm
			.derive_sealing_key(self, iv)
			.map_err(|_| CryptoError::NotAuthentic)?;
		let payload = Payload {
			msg: &envelope.bytes,
			aad: context,
		};
		match envelope.algorithm {
			Aead::Aes256GcmHmacSha256 => {
				let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(sealing_key.as_ref()));
				cipher
					.decrypt(Nonce::from_slice(&envelope.nonce), payload)
					.map_err(|_| CryptoError::NotAuthentic)
			}
			Aead::ChaCha20Poly1305 => {
				let cipher =
					ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(sealing_key.as_ref()));
				cipher
					.decrypt(chacha20poly1305::Nonce::from_slice(&envelope.nonce), payload)
					.map_err(|_| CryptoError::NotAuthentic)
			}
		}
	}
}

mod base64_bytes {
	use base64::engine::general_purpose::STANDARD;
	use base64::Engine as _;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&STANDARD.encode(bytes))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
		let encoded = String::deserialize(deserializer)?;
		STANDARD.decode(encoded).map_err(serde::de::Error::custom)
	}
}
