// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key storage and the key engine.
//!
//! [`KeyStore`] is the durable-mapping contract the engine consumes:
//! create-if-absent, get, idempotent delete, and a lazy listing iterator.
//! [`MemKeyStore`] is the in-memory reference implementation the stateless
//! server runs on. [`KeyEngine`] layers the key operations on top of an
//! arbitrary store: create, import, delete, data-key generation, and
//! envelope encrypt/decrypt.

pub mod engine;
pub mod error;
pub mod mem;
pub mod store;
pub mod validate;

pub use engine::{DataKey, KeyEngine, MAX_PLAINTEXT_SIZE};
pub use error::{KeyError, StoreError};
pub use mem::MemKeyStore;
pub use store::{KeyIter, KeyStore};
pub use validate::{is_valid_name, is_valid_pattern};
