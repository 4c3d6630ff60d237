// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cryptographic primitives for the Kestrel key-management service.
//!
//! This crate owns the two things every other crate builds on:
//!
//! - [`SecretKey`] — a 256-bit master key, generated from the OS CSPRNG,
//!   zeroized on drop and never printed.
//! - The envelope codec — [`SecretKey::seal`] / [`SecretKey::open`]
//!   produce and consume self-describing AEAD envelopes that bind an
//!   optional context (associated data) into the ciphertext.
//!
//! The AEAD algorithm is chosen once per process: AES-256-GCM when the CPU
//! has hardware AES support or FIPS mode is enabled, ChaCha20-Poly1305
//! otherwise. Both are always accepted when opening, except that FIPS mode
//! rejects ChaCha20-Poly1305 envelopes.

pub mod envelope;
pub mod error;
pub mod secret_key;

pub use envelope::{Aead, Envelope, MAX_CONTEXT_SIZE};
pub use error::CryptoError;
pub use secret_key::SecretKey;

use std::sync::atomic::{AtomicBool, Ordering};

static FIPS_MODE: AtomicBool = AtomicBool::new(false);

/// Enables or disables FIPS mode for the whole process.
///
/// Must be called before any key is sealed; flipping it mid-flight only
/// affects envelopes sealed afterwards.
pub fn set_fips_mode(enabled: bool) {
	FIPS_MODE.store(enabled, Ordering::Relaxed);
}

/// Whether FIPS mode is enabled.
pub fn fips_mode() -> bool {
	FIPS_MODE.load(Ordering::Relaxed)
}
