// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use kestrel_config::QueueOverflowPolicy;
use tokio::sync::mpsc;
use tracing::warn;

use crate::event::AuditEvent;
use crate::sink::AuditSink;

/// The audit pipeline.
///
/// Requests enqueue events without blocking; one background task drains
/// the queue and fans each event out to every sink. The queue is the
/// single serialization point, so sinks observe events in completion
/// order.
pub struct AuditService {
	tx: mpsc::Sender<AuditEvent>,
	overflow_policy: QueueOverflowPolicy,
}

impl AuditService {
	pub fn new(
		queue_capacity: usize,
		overflow_policy: QueueOverflowPolicy,
		sinks: Vec<Arc<dyn AuditSink>>,
	) -> Self {
		let (tx, rx) = mpsc::channel(queue_capacity);
		tokio::spawn(Self::background_task(rx, sinks));
		Self {
			tx,
			overflow_policy,
		}
	}

	async fn background_task(mut rx: mpsc::Receiver<AuditEvent>, sinks: Vec<Arc<dyn AuditSink>>) {
		while let Some(event) = rx.recv().await {
			let event = Arc::new(event);
			for sink in &sinks {
				if let Err(e) = sink.publish(Arc::clone(&event)).await {
					warn!(sink = sink.name(), error = %e, "audit sink publish failed");
				}
			}
		}
	}

	/// Enqueues an audit event.
	///
	/// Returns `true` if the event was queued, `false` if it was dropped
	/// because the queue was full under the `drop_newest` policy.
	pub fn log(&self, event: AuditEvent) -> bool {
		match self.overflow_policy {
			QueueOverflowPolicy::Block => {
				let tx = self.tx.clone();
				tokio::spawn(async move {
					let _ = tx.send(event).await;
				});
				true
			}
			QueueOverflowPolicy::DropNewest => self.tx.try_send(event).is_ok(),
		}
	}
}
