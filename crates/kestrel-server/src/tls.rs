// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mutual-TLS serving.
//!
//! axum does not terminate TLS, so the accept loop lives here: each
//! connection is handshaken with rustls, the peer's leaf certificate is
//! stashed as a request extension, and the connection is served by hyper
//! over the router. Client certificates are verified against the
//! configured CA set; peers without a certificate stay connected but
//! unauthenticated, which only ever reaches the version route.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use axum::Router;
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use rustls::pki_types::CertificateDer;
use rustls::server::WebPkiClientVerifier;
use rustls::RootCertStore;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tower::util::ServiceExt;
use tracing::{debug, info};

use kestrel_config::TlsConfig;

/// The peer's leaf certificate, as presented during the handshake.
/// `None` when the peer did not authenticate.
#[derive(Clone)]
pub struct PeerCertificate(pub Option<CertificateDer<'static>>);

#[derive(Debug, Error)]
pub enum TlsError {
	#[error("failed to read {path}: {source}")]
	Io {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("no private key found in {0}")]
	NoPrivateKey(String),

	#[error("invalid client CA bundle: {0}")]
	InvalidClientCa(String),

	#[error(transparent)]
	Rustls(#[from] rustls::Error),
}

/// Builds the rustls server configuration from PEM files on disk.
pub fn server_config(config: &TlsConfig) -> Result<rustls::ServerConfig, TlsError> {
	let certs = read_certs(&config.cert)?;
	let key = rustls_pemfile::private_key(&mut pem_reader(&config.key)?)
		.map_err(|e| TlsError::Io {
			path: config.key.clone(),
			source: e,
		})?
		.ok_or_else(|| TlsError::NoPrivateKey(config.key.clone()))?;

	let builder = rustls::ServerConfig::builder();
	let tls = match &config.client_ca {
		Some(ca_path) => {
			let mut roots = RootCertStore::empty();
			for cert in read_certs(ca_path)? {
				roots
					.add(cert)
					.map_err(|e| TlsError::InvalidClientCa(e.to_string()))?;
			}
			// Unauthenticated peers are admitted at the TLS layer and
			// rejected by policy; only `/version` answers them.
			let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
				.allow_unauthenticated()
				.build()
				.map_err(|e| TlsError::InvalidClientCa(e.to_string()))?;
			builder
				.with_client_cert_verifier(verifier)
				.with_single_cert(certs, key)?
		}
		None => builder.with_no_client_auth().with_single_cert(certs, key)?,
	};
	Ok(tls)
}

fn pem_reader(path: &str) -> Result<BufReader<File>, TlsError> {
	File::open(path)
		.map(BufReader::new)
		.map_err(|e| TlsError::Io {
			path: path.to_string(),
			source: e,
		})
}

fn read_certs(path: &str) -> Result<Vec<CertificateDer<'static>>, TlsError> {
	rustls_pemfile::certs(&mut pem_reader(path)?)
		.collect::<Result<Vec<_>, _>>()
		.map_err(|e| TlsError::Io {
			path: path.to_string(),
			source: e,
		})
}

/// Accepts connections forever, one task per connection.
pub async fn serve(
	listener: TcpListener,
	tls: rustls::ServerConfig,
	app: Router,
) -> std::io::Result<()> {
	let acceptor = TlsAcceptor::from(Arc::new(tls));
	info!(addr = %listener.local_addr()?, "https server ready");

	loop {
		let (stream, remote) = listener.accept().await?;
		let acceptor = acceptor.clone();
		let app = app.clone();

		tokio::spawn(async move {
			let tls_stream = match acceptor.accept(stream).await {
				Ok(stream) => stream,
				Err(e) => {
					debug!(remote = %remote, error = %e, "TLS handshake failed");
					return;
				}
			};
			let peer = PeerCertificate(
				tls_stream
					.get_ref()
					.1
					.peer_certificates()
					.and_then(|chain| chain.first())
					.map(|cert| cert.clone().into_owned()),
			);

			let service = hyper::service::service_fn(move |mut req: Request<Incoming>| {
				req.extensions_mut().insert(peer.clone());
				let app = app.clone();
				async move { app.oneshot(req).await }
			});

			if let Err(e) = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
				.serve_connection_with_upgrades(TokioIo::new(tls_stream), service)
				.await
			{
				debug!(remote = %remote, error = %e, "connection closed with error");
			}
		});
	}
}
