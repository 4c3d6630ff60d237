// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit sinks.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::AuditSinkError;
use crate::event::AuditEvent;

/// A destination for audit events.
///
/// Publish failures are logged by the pipeline and never surface to the
/// request that produced the event.
#[async_trait]
pub trait AuditSink: Send + Sync {
	fn name(&self) -> &str;

	async fn publish(&self, event: Arc<AuditEvent>) -> Result<(), AuditSinkError>;
}

/// Emits audit events as structured `tracing` events.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
	fn name(&self) -> &str {
		"tracing"
	}

	async fn publish(&self, event: Arc<AuditEvent>) -> Result<(), AuditSinkError> {
		info!(
			target: "kestrel::audit",
			identity = %event.identity,
			method = %event.method,
			path = %event.path,
			status = event.status,
			latency_ms = event.latency_ms,
			"request"
		);
		Ok(())
	}
}

/// Appends audit events to a file, one JSON object per line.
pub struct FileAuditSink {
	path: String,
	file: Mutex<Option<File>>,
}

impl FileAuditSink {
	pub fn new(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			file: Mutex::new(None),
		}
	}
}

#[async_trait]
impl AuditSink for FileAuditSink {
	fn name(&self) -> &str {
		"file"
	}

	async fn publish(&self, event: Arc<AuditEvent>) -> Result<(), AuditSinkError> {
		let json = serde_json::to_string(event.as_ref())
			.map_err(|e| AuditSinkError::Permanent(format!("serialization failed: {e}")))?;
		let line = format!("{json}\n");

		let mut guard = self.file.lock().await;
		if guard.is_none() {
			let file = OpenOptions::new()
				.create(true)
				.append(true)
				.open(&self.path)
				.await
				.map_err(|e| AuditSinkError::Transient(format!("failed to open file: {e}")))?;
			*guard = Some(file);
		}
		let file = guard
			.as_mut()
			.ok_or_else(|| AuditSinkError::Permanent("file handle not initialized".to_string()))?;

		file.write_all(line.as_bytes())
			.await
			.map_err(|e| AuditSinkError::Transient(format!("failed to write: {e}")))?;
		file.flush()
			.await
			.map_err(|e| AuditSinkError::Transient(format!("failed to flush: {e}")))?;
		Ok(())
	}
}
