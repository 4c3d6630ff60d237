// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The Kestrel key-management server.
//!
//! Wires the vault, audit pipeline, and metrics into an axum router
//! served over mutual TLS. See [`routes`] for the route contract and
//! [`middleware`] for the request pipeline.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod ndjson;
pub mod routes;
pub mod tls;

pub use error::ApiError;
pub use middleware::ProxySettings;
pub use routes::create_router;

use std::sync::Arc;
use std::time::Instant;

use axum::http::HeaderName;
use chrono::Utc;
use kestrel_audit::{AuditService, AuditSink, FileAuditSink, TracingAuditSink};
use kestrel_auth::{
	AclError, Identity, IdentityInfo, IdentitySet, MemIdentitySet, MemPolicySet, Policy, PolicySet,
};
use kestrel_config::ServerConfig;
use kestrel_keystore::{KeyEngine, MemKeyStore};
use kestrel_vault::{Enclave, StatelessVault, Vault};
use metrics_exporter_prometheus::PrometheusHandle;
use thiserror::Error;
use tracing::warn;

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
	pub vault: Arc<dyn Vault>,
	pub audit: Arc<AuditService>,
	pub metrics: PrometheusHandle,
	pub proxy: Option<ProxySettings>,
	pub started_at: Instant,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
	#[error("invalid proxy header name '{0}'")]
	InvalidProxyHeader(String),

	#[error(transparent)]
	Acl(#[from] AclError),
}

/// Builds the application state from resolved configuration: seeds the
/// admin identity and the bootstrap policies, then assembles the
/// stateless vault, the audit pipeline, and the proxy settings.
pub async fn build_state(
	config: &ServerConfig,
	metrics: PrometheusHandle,
) -> Result<AppState, BootstrapError> {
	kestrel_crypto::set_fips_mode(config.fips);

	let policies = Arc::new(MemPolicySet::new());
	let identities = Arc::new(MemIdentitySet::new());
	let admin = Identity::new(config.admin.identity.clone());

	if admin.is_unknown() {
		warn!("no admin identity configured; seal and unseal are unavailable");
	} else {
		identities
			.assign(
				admin.clone(),
				IdentityInfo {
					policy: String::new(),
					is_admin: true,
					created_at: Utc::now(),
					created_by: Identity::unknown(),
				},
			)
			.await?;
	}

	for policy in &config.policy {
		policies
			.set(
				&policy.name,
				Policy::new(policy.allow.clone(), policy.deny.clone()),
				admin.clone(),
			)
			.await?;
		for identity in &policy.identities {
			identities
				.assign(
					Identity::new(identity.clone()),
					IdentityInfo {
						policy: policy.name.clone(),
						is_admin: false,
						created_at: Utc::now(),
						created_by: admin.clone(),
					},
				)
				.await?;
		}
	}

	let engine = KeyEngine::new(Arc::new(MemKeyStore::new()));
	let enclave = Enclave::new("", engine, policies, identities);
	let vault: Arc<dyn Vault> = Arc::new(StatelessVault::new(enclave, admin));

	let mut sinks: Vec<Arc<dyn AuditSink>> = Vec::new();
	if config.audit.enabled {
		sinks.push(Arc::new(TracingAuditSink));
		if let Some(path) = &config.audit.file {
			sinks.push(Arc::new(FileAuditSink::new(path.clone())));
		}
	}
	let audit = Arc::new(AuditService::new(
		config.audit.queue_capacity,
		config.audit.overflow_policy,
		sinks,
	));

	let proxy = config
		.proxy
		.as_ref()
		.map(|proxy| {
			Ok::<_, BootstrapError>(ProxySettings {
				identities: proxy.identities.iter().cloned().map(Identity::new).collect(),
				header: HeaderName::from_bytes(proxy.header.as_bytes())
					.map_err(|_| BootstrapError::InvalidProxyHeader(proxy.header.clone()))?,
			})
		})
		.transpose()?;

	Ok(AppState {
		vault,
		audit,
		metrics,
		proxy,
		started_at: Instant::now(),
	})
}
