// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Prometheus metrics surface.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Installs the process-wide Prometheus recorder and returns the handle
/// `/v1/metrics` renders from. Call once, at startup.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
	let handle = PrometheusBuilder::new().install_recorder()?;
	describe();
	Ok(handle)
}

fn describe() {
	describe_counter!(
		"kestrel_http_request_success",
		"Requests that completed with a 2xx or 3xx status."
	);
	describe_counter!(
		"kestrel_http_request_error",
		"Requests that completed with a 4xx status."
	);
	describe_counter!(
		"kestrel_http_request_failure",
		"Requests that completed with a 5xx status."
	);
	describe_gauge!("kestrel_http_request_active", "Requests currently in flight.");
	describe_histogram!(
		"kestrel_http_response_latency_seconds",
		"Response latency in seconds."
	);
}
