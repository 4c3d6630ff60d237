// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One request, as the audit trail sees it.
///
/// Recorded when the response status is first written, so the status and
/// latency are always the final ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
	pub time: DateTime<Utc>,
	/// Effective identity after proxy unwrapping; empty when the peer was
	/// unauthenticated.
	pub identity: String,
	pub method: String,
	pub path: String,
	pub status: u16,
	pub latency_ms: u64,
}
