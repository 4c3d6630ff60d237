// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Route handlers.
//!
//! Handlers parse their bodies by hand rather than through `Json` so
//! malformed input maps onto the API error shape, and binary fields ride
//! as base64 strings.

pub mod identities;
pub mod keys;
pub mod policies;
pub mod system;

use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
	serde_json::from_slice(body).map_err(|_| ApiError::Invalid("malformed request body"))
}

/// Like [`parse_json`], but an empty body means "all defaults". Routes
/// with optional bodies (generate, encrypt) accept both.
pub(crate) fn parse_json_or_default<T: DeserializeOwned + Default>(
	body: &[u8],
) -> Result<T, ApiError> {
	if body.is_empty() {
		return Ok(T::default());
	}
	parse_json(body)
}

pub(crate) mod b64 {
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

pub(crate) mod b64_opt {
	use base64::engine::general_purpose::STANDARD;
	use base64::Engine as _;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(
		bytes: &Option<Vec<u8>>,
		serializer: S,
	) -> Result<S::Ok, S::Error> {
		match bytes {
			Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(
		deserializer: D,
	) -> Result<Option<Vec<u8>>, D::Error> {
		Option::<String>::deserialize(deserializer)?
			.map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
			.transpose()
	}
}
