// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Newline-delimited JSON responses for list endpoints.
//!
//! One record per line. A failure after the first record was written is
//! folded in-band as a trailing `{"error": "..."}` record; before the
//! first write the caller returns an ordinary HTTP error instead.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use serde::Serialize;

pub const CONTENT_TYPE: &str = "application/x-ndjson";

/// Serializes one record to its NDJSON line.
pub fn line<T: Serialize>(record: &T) -> Bytes {
	match serde_json::to_string(record) {
		Ok(json) => Bytes::from(format!("{json}\n")),
		// Serialization of our own record types cannot fail; fold the
		// failure in-band if it ever does.
		Err(e) => error_line(&e.to_string()),
	}
}

/// The in-band trailing error record.
pub fn error_line(message: &str) -> Bytes {
	#[derive(Serialize)]
	struct ErrorRecord<'a> {
		error: &'a str,
	}
	let json = serde_json::to_string(&ErrorRecord { error: message })
		.unwrap_or_else(|_| r#"{"error":"error"}"#.to_string());
	Bytes::from(format!("{json}\n"))
}

/// A complete NDJSON response from pre-collected records. An empty list
/// is a 200 with an empty body and no content type, matching the wire
/// behavior of the streaming path.
pub fn response_from_records<T: Serialize>(records: &[T]) -> Response {
	if records.is_empty() {
		return Response::new(Body::empty());
	}
	let mut body = Vec::new();
	for record in records {
		body.extend_from_slice(&line(record));
	}
	streaming_headers(Response::new(Body::from(body)))
}

/// A streaming NDJSON response.
pub fn response_from_stream<S>(stream: S) -> Response
where
	S: futures::Stream<Item = Result<Bytes, std::convert::Infallible>> + Send + 'static,
{
	streaming_headers(Response::new(Body::from_stream(stream)))
}

fn streaming_headers(mut response: Response) -> Response {
	*response.status_mut() = StatusCode::OK;
	response
		.headers_mut()
		.insert(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE));
	response
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Serialize)]
	struct Record {
		name: &'static str,
	}

	#[test]
	fn lines_are_terminated() {
		assert_eq!(line(&Record { name: "k" }), Bytes::from("{\"name\":\"k\"}\n"));
		assert_eq!(
			error_line("store unreachable"),
			Bytes::from("{\"error\":\"store unreachable\"}\n")
		);
	}

	#[test]
	fn empty_listing_has_no_content_type() {
		let response = response_from_records::<Record>(&[]);
		assert_eq!(response.status(), StatusCode::OK);
		assert!(response.headers().get(header::CONTENT_TYPE).is_none());
	}

	#[test]
	fn populated_listing_is_ndjson() {
		let response = response_from_records(&[Record { name: "a" }, Record { name: "b" }]);
		assert_eq!(
			response.headers().get(header::CONTENT_TYPE).unwrap(),
			CONTENT_TYPE
		);
	}
}
