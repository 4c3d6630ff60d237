// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for the Kestrel server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file,
//!   environment)
//! - Type-safe configuration with validation at finalize time
//! - Consistent environment variable naming (`KESTREL_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! let config = kestrel_config::load_config(Some("/etc/kestrel/server.toml"))?;
//! println!("listening on {}", config.http.addr);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::debug;

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub tls: TlsConfig,
	pub admin: AdminConfig,
	pub proxy: Option<ProxyConfig>,
	pub policy: Vec<PolicyConfig>,
	pub audit: AuditConfig,
	pub logging: LoggingConfig,
	pub fips: bool,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`KESTREL_SERVER_*`)
/// 2. Config file (given path, or `/etc/kestrel/server.toml`)
/// 3. Built-in defaults
pub fn load_config(path: Option<&str>) -> Result<ServerConfig, ConfigError> {
	let toml_source = match path {
		Some(path) => TomlSource::new(path),
		None => TomlSource::system(),
	};
	let mut sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(toml_source),
		Box::new(EnvSource),
	];

	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	merged.finalize()
}
