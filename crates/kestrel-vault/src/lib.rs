// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Enclaves and the vault.
//!
//! An [`Enclave`] is one authorization namespace: a key engine, a policy
//! set, and an identity set that only ever reference each other by name.
//! The [`Vault`] owns enclaves and the process-wide seal gate; while
//! sealed, every operation except status and unseal fails.

pub mod enclave;
pub mod error;
pub mod vault;

pub use enclave::Enclave;
pub use error::VaultError;
pub use vault::{StatelessVault, Vault};
