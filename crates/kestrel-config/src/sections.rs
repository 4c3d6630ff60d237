// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections and their layered (partial) forms.
//!
//! Every section comes in two shapes: the `*Layer` struct with optional
//! fields, merged across sources, and the resolved struct produced by
//! `finalize`.

use serde::{Deserialize, Serialize};

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
	/// Socket address the server binds, e.g. `0.0.0.0:7373`.
	pub addr: String,
}

impl Default for HttpConfig {
	fn default() -> Self {
		Self {
			addr: "0.0.0.0:7373".to_string(),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HttpConfigLayer {
	pub addr: Option<String>,
}

impl HttpConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.addr.is_some() {
			self.addr = other.addr;
		}
	}

	pub fn finalize(self) -> HttpConfig {
		let defaults = HttpConfig::default();
		HttpConfig {
			addr: self.addr.unwrap_or(defaults.addr),
		}
	}
}

/// TLS material. All paths; the server reads and parses them at startup.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
	/// Server certificate chain, PEM.
	pub cert: String,
	/// Server private key, PEM.
	pub key: String,
	/// Trusted client CA bundle, PEM. Empty disables client-cert
	/// verification entirely (development only).
	pub client_ca: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TlsConfigLayer {
	pub cert: Option<String>,
	pub key: Option<String>,
	pub client_ca: Option<String>,
}

impl TlsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.cert.is_some() {
			self.cert = other.cert;
		}
		if other.key.is_some() {
			self.key = other.key;
		}
		if other.client_ca.is_some() {
			self.client_ca = other.client_ca;
		}
	}

	pub fn finalize(self) -> TlsConfig {
		TlsConfig {
			cert: self.cert.unwrap_or_default(),
			key: self.key.unwrap_or_default(),
			client_ca: self.client_ca,
		}
	}
}

/// The operator identity. Bypasses policy evaluation and owns seal/unseal.
#[derive(Debug, Clone, Default)]
pub struct AdminConfig {
	/// Hex identity of the admin client certificate.
	pub identity: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdminConfigLayer {
	pub identity: Option<String>,
}

impl AdminConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.identity.is_some() {
			self.identity = other.identity;
		}
	}

	pub fn finalize(self) -> AdminConfig {
		AdminConfig {
			identity: self.identity.unwrap_or_default(),
		}
	}
}

/// Trusted forwarding proxies.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyConfig {
	/// Identities of TLS peers trusted to forward client identities.
	pub identities: Vec<String>,
	/// Header carrying the forwarded hex identity.
	pub header: String,
}

pub const DEFAULT_PROXY_HEADER: &str = "X-Forwarded-Identity";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProxyConfigLayer {
	pub identities: Option<Vec<String>>,
	pub header: Option<String>,
}

impl ProxyConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.identities.is_some() {
			self.identities = other.identities;
		}
		if other.header.is_some() {
			self.header = other.header;
		}
	}

	pub fn finalize(self) -> Option<ProxyConfig> {
		let identities = self.identities.unwrap_or_default();
		if identities.is_empty() {
			return None;
		}
		Some(ProxyConfig {
			identities,
			header: self
				.header
				.unwrap_or_else(|| DEFAULT_PROXY_HEADER.to_string()),
		})
	}
}

/// A bootstrap policy: patterns plus the identities assigned to it at
/// startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PolicyConfig {
	pub name: String,
	#[serde(default)]
	pub allow: Vec<String>,
	#[serde(default)]
	pub deny: Vec<String>,
	#[serde(default)]
	pub identities: Vec<String>,
}

/// Audit pipeline settings.
#[derive(Debug, Clone)]
pub struct AuditConfig {
	pub enabled: bool,
	pub queue_capacity: usize,
	pub overflow_policy: QueueOverflowPolicy,
	/// Append-only JSON-lines file; `None` keeps the tracing sink only.
	pub file: Option<String>,
}

impl Default for AuditConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			queue_capacity: DEFAULT_QUEUE_CAPACITY,
			overflow_policy: QueueOverflowPolicy::default(),
			file: None,
		}
	}
}

const DEFAULT_QUEUE_CAPACITY: usize = 10000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueueOverflowPolicy {
	#[default]
	DropNewest,
	Block,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditConfigLayer {
	pub enabled: Option<bool>,
	pub queue_capacity: Option<usize>,
	pub overflow_policy: Option<QueueOverflowPolicy>,
	pub file: Option<String>,
}

impl AuditConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.queue_capacity.is_some() {
			self.queue_capacity = other.queue_capacity;
		}
		if other.overflow_policy.is_some() {
			self.overflow_policy = other.overflow_policy;
		}
		if other.file.is_some() {
			self.file = other.file;
		}
	}

	pub fn finalize(self) -> AuditConfig {
		let defaults = AuditConfig::default();
		AuditConfig {
			enabled: self.enabled.unwrap_or(defaults.enabled),
			queue_capacity: self.queue_capacity.unwrap_or(defaults.queue_capacity),
			overflow_policy: self.overflow_policy.unwrap_or(defaults.overflow_policy),
			file: self.file,
		}
	}
}

/// Logging settings.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
	/// Default tracing filter, overridable with `RUST_LOG`.
	pub level: String,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfigLayer {
	pub level: Option<String>,
}

impl LoggingConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.level.is_some() {
			self.level = other.level;
		}
	}

	pub fn finalize(self) -> LoggingConfig {
		let defaults = LoggingConfig::default();
		LoggingConfig {
			level: self.level.unwrap_or(defaults.level),
		}
	}
}
