// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Kestrel key-management server binary.

use clap::{Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Kestrel - mutually-authenticated key-management server.
#[derive(Parser, Debug)]
#[command(
	name = "kestrel-server",
	about = "Kestrel key-management server",
	version
)]
struct Args {
	/// Path to the server configuration file.
	#[arg(long)]
	config: Option<String>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("kestrel-server {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = kestrel_config::load_config(args.config.as_deref())?;

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	if config.tls.cert.is_empty() || config.tls.key.is_empty() {
		return Err("tls.cert and tls.key must be configured".into());
	}

	let metrics = kestrel_server::metrics::install_recorder()?;
	let state = kestrel_server::build_state(&config, metrics).await?;
	let app = kestrel_server::create_router(state).layer(TraceLayer::new_for_http());

	let tls = kestrel_server::tls::server_config(&config.tls)?;
	let listener = tokio::net::TcpListener::bind(&config.http.addr).await?;

	tracing::info!(
		addr = %config.http.addr,
		fips = config.fips,
		"starting kestrel-server"
	);

	tokio::select! {
		result = kestrel_server::tls::serve(listener, tls, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("received shutdown signal");
		}
	}

	tracing::info!("server shutdown complete");
	Ok(())
}
