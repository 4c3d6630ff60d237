// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML files, environment variables.

use std::path::PathBuf;

use tracing::debug;

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AdminConfigLayer, AuditConfigLayer, HttpConfigLayer, LoggingConfigLayer, ProxyConfigLayer,
	QueueOverflowPolicy, TlsConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/kestrel/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})
	}
}

/// Environment variable source.
///
/// Convention: `KESTREL_SERVER_<SECTION>_<FIELD>`.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		Ok(ServerConfigLayer {
			http: Some(HttpConfigLayer {
				addr: env_var("KESTREL_SERVER_HTTP_ADDR"),
			}),
			tls: Some(TlsConfigLayer {
				cert: env_var("KESTREL_SERVER_TLS_CERT"),
				key: env_var("KESTREL_SERVER_TLS_KEY"),
				client_ca: env_var("KESTREL_SERVER_TLS_CLIENT_CA"),
			}),
			admin: Some(AdminConfigLayer {
				identity: env_var("KESTREL_SERVER_ADMIN_IDENTITY"),
			}),
			proxy: Some(ProxyConfigLayer {
				identities: env_var("KESTREL_SERVER_PROXY_IDENTITIES")
					.map(|v| v.split(',').map(|s| s.trim().to_string()).collect()),
				header: env_var("KESTREL_SERVER_PROXY_HEADER"),
			}),
			policy: None,
			audit: Some(AuditConfigLayer {
				enabled: parse_env("KESTREL_SERVER_AUDIT_ENABLED")?,
				queue_capacity: parse_env("KESTREL_SERVER_AUDIT_QUEUE_CAPACITY")?,
				overflow_policy: match env_var("KESTREL_SERVER_AUDIT_OVERFLOW_POLICY").as_deref() {
					None => None,
					Some("drop_newest") => Some(QueueOverflowPolicy::DropNewest),
					Some("block") => Some(QueueOverflowPolicy::Block),
					Some(other) => {
						return Err(ConfigError::InvalidValue {
							field: "audit.overflow_policy".to_string(),
							message: format!("unknown policy '{other}'"),
						})
					}
				},
				file: env_var("KESTREL_SERVER_AUDIT_FILE"),
			}),
			logging: Some(LoggingConfigLayer {
				level: env_var("KESTREL_SERVER_LOG_LEVEL"),
			}),
			fips: parse_env("KESTREL_SERVER_FIPS")?,
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		None => Ok(None),
		Some(value) => value.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			field: name.to_string(),
			message: format!("cannot parse '{value}'"),
		}),
	}
}
