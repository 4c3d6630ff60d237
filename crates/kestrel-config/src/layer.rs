// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The merged, partial form of the whole configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sections::{
	AdminConfigLayer, AuditConfigLayer, HttpConfigLayer, LoggingConfigLayer, PolicyConfig,
	ProxyConfigLayer, TlsConfigLayer,
};
use crate::ServerConfig;

/// One source's contribution to the configuration. Later sources override
/// earlier ones field by field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerConfigLayer {
	pub http: Option<HttpConfigLayer>,
	pub tls: Option<TlsConfigLayer>,
	pub admin: Option<AdminConfigLayer>,
	pub proxy: Option<ProxyConfigLayer>,
	pub policy: Option<Vec<PolicyConfig>>,
	pub audit: Option<AuditConfigLayer>,
	pub logging: Option<LoggingConfigLayer>,
	pub fips: Option<bool>,
}

impl ServerConfigLayer {
	pub fn merge(&mut self, other: Self) {
		merge_section(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_section(&mut self.tls, other.tls, TlsConfigLayer::merge);
		merge_section(&mut self.admin, other.admin, AdminConfigLayer::merge);
		merge_section(&mut self.proxy, other.proxy, ProxyConfigLayer::merge);
		if other.policy.is_some() {
			self.policy = other.policy;
		}
		merge_section(&mut self.audit, other.audit, AuditConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		if other.fips.is_some() {
			self.fips = other.fips;
		}
	}

	pub fn finalize(self) -> Result<ServerConfig, ConfigError> {
		let config = ServerConfig {
			http: self.http.unwrap_or_default().finalize(),
			tls: self.tls.unwrap_or_default().finalize(),
			admin: self.admin.unwrap_or_default().finalize(),
			proxy: self.proxy.unwrap_or_default().finalize(),
			policy: self.policy.unwrap_or_default(),
			audit: self.audit.unwrap_or_default().finalize(),
			logging: self.logging.unwrap_or_default().finalize(),
			fips: self.fips.unwrap_or(false),
		};
		for policy in &config.policy {
			if policy.name.is_empty() {
				return Err(ConfigError::MissingField("policy.name".to_string()));
			}
		}
		Ok(config)
	}
}

fn merge_section<T>(target: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	match (target.as_mut(), other) {
		(Some(current), Some(other)) => merge(current, other),
		(None, Some(other)) => *target = Some(other),
		(_, None) => {}
	}
}
