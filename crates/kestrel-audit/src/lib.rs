// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Append-only audit trail for the Kestrel server.
//!
//! Every request produces one [`AuditEvent`] when its response status is
//! written. Events flow through a bounded queue into a single background
//! task that fans out to the configured sinks; a slow or failing sink
//! never blocks a request, and events reach sinks in completion order.

pub mod error;
pub mod event;
pub mod pipeline;
pub mod sink;

pub use error::AuditSinkError;
pub use event::AuditEvent;
pub use pipeline::AuditService;
pub use sink::{AuditSink, FileAuditSink, TracingAuditSink};

pub use kestrel_config::{AuditConfig, QueueOverflowPolicy};
