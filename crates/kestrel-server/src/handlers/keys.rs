// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key API handlers.

use std::convert::Infallible;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use bytes::Bytes;
use kestrel_keystore::{is_valid_pattern, KeyError};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;

use super::{b64, b64_opt, parse_json, parse_json_or_default};
use crate::auth::Verified;
use crate::error::ApiError;
use crate::ndjson;

pub async fn create(Path(name): Path<String>, verified: Verified) -> Result<StatusCode, ApiError> {
	verified.enclave.create_key(&name).await?;
	Ok(StatusCode::OK)
}

#[derive(Deserialize)]
struct ImportKeyRequest {
	#[serde(with = "b64")]
	bytes: Vec<u8>,
}

pub async fn import(
	Path(name): Path<String>,
	verified: Verified,
	body: Bytes,
) -> Result<StatusCode, ApiError> {
	let request: ImportKeyRequest = parse_json(&body)?;
	verified.enclave.import_key(&name, &request.bytes).await?;
	Ok(StatusCode::OK)
}

pub async fn delete(Path(name): Path<String>, verified: Verified) -> Result<StatusCode, ApiError> {
	verified.enclave.delete_key(&name).await?;
	Ok(StatusCode::OK)
}

#[derive(Deserialize, Default)]
struct GenerateKeyRequest {
	#[serde(default, with = "b64_opt")]
	context: Option<Vec<u8>>,
}

#[derive(Serialize)]
pub struct GenerateKeyResponse {
	#[serde(with = "b64")]
	plaintext: Vec<u8>,
	#[serde(with = "b64")]
	ciphertext: Vec<u8>,
}

pub async fn generate(
	Path(name): Path<String>,
	verified: Verified,
	body: Bytes,
) -> Result<Json<GenerateKeyResponse>, ApiError> {
	let request: GenerateKeyRequest = parse_json_or_default(&body)?;
	let data_key = verified
		.enclave
		.generate_data_key(&name, request.context.as_deref())
		.await?;
	Ok(Json(GenerateKeyResponse {
		plaintext: data_key.plaintext,
		ciphertext: data_key.ciphertext,
	}))
}

#[derive(Deserialize, Default)]
struct EncryptRequest {
	#[serde(default, with = "b64_opt")]
	plaintext: Option<Vec<u8>>,
	#[serde(default, with = "b64_opt")]
	context: Option<Vec<u8>>,
}

#[derive(Serialize)]
pub struct EncryptResponse {
	#[serde(with = "b64")]
	ciphertext: Vec<u8>,
}

pub async fn encrypt(
	Path(name): Path<String>,
	verified: Verified,
	body: Bytes,
) -> Result<Json<EncryptResponse>, ApiError> {
	let request: EncryptRequest = parse_json_or_default(&body)?;
	let ciphertext = verified
		.enclave
		.encrypt(
			&name,
			request.plaintext.as_deref().unwrap_or_default(),
			request.context.as_deref(),
		)
		.await?;
	Ok(Json(EncryptResponse { ciphertext }))
}

#[derive(Deserialize)]
struct DecryptRequest {
	#[serde(with = "b64")]
	ciphertext: Vec<u8>,
	#[serde(default, with = "b64_opt")]
	context: Option<Vec<u8>>,
}

#[derive(Serialize)]
pub struct DecryptResponse {
	#[serde(with = "b64")]
	plaintext: Vec<u8>,
}

pub async fn decrypt(
	Path(name): Path<String>,
	verified: Verified,
	body: Bytes,
) -> Result<Json<DecryptResponse>, ApiError> {
	let request: DecryptRequest = parse_json(&body)?;
	let plaintext = verified
		.enclave
		.decrypt(&name, &request.ciphertext, request.context.as_deref())
		.await?;
	Ok(Json(DecryptResponse { plaintext }))
}

#[derive(Serialize)]
struct KeyRecord {
	name: String,
}

/// Streams the names matching `pattern`, one NDJSON record per line.
///
/// The first match is pulled before the response commits, so listing
/// failures before any write surface as ordinary HTTP errors; later
/// failures fold into a trailing `{"error"}` record.
pub async fn list(Path(pattern): Path<String>, verified: Verified) -> Result<Response, ApiError> {
	if !is_valid_pattern(&pattern) {
		return Err(ApiError::Invalid("invalid pattern"));
	}
	let mut iter = verified.enclave.list_keys().await?;

	let first = loop {
		match iter.next().await {
			Some(Ok(name)) => match kestrel_auth::matches(&pattern, &name) {
				Ok(true) => break Some(name),
				Ok(false) => continue,
				Err(e) => {
					let _ = iter.close().await;
					return Err(e.into());
				}
			},
			Some(Err(e)) => {
				let _ = iter.close().await;
				return Err(KeyError::from(e).into());
			}
			None => break None,
		}
	};
	let Some(first) = first else {
		iter.close().await.map_err(KeyError::from)?;
		return Ok(ndjson::response_from_records::<KeyRecord>(&[]));
	};

	let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, Infallible>>(16);
	tokio::spawn(async move {
		// A failed send means the client went away; close the iterator
		// and stop.
		if tx
			.send(Ok(ndjson::line(&KeyRecord { name: first })))
			.await
			.is_err()
		{
			let _ = iter.close().await;
			return;
		}
		loop {
			match iter.next().await {
				Some(Ok(name)) => match kestrel_auth::matches(&pattern, &name) {
					Ok(true) => {
						if tx
							.send(Ok(ndjson::line(&KeyRecord { name })))
							.await
							.is_err()
						{
							break;
						}
					}
					Ok(false) => continue,
					Err(_) => {
						let _ = tx.send(Ok(ndjson::error_line("invalid pattern"))).await;
						break;
					}
				},
				Some(Err(e)) => {
					let _ = tx.send(Ok(ndjson::error_line(&e.to_string()))).await;
					break;
				}
				None => break,
			}
		}
		let _ = iter.close().await;
	});
	Ok(ndjson::response_from_stream(ReceiverStream::new(rx)))
}
