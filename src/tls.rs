// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TLS termination for the HTTP server.
//!
//! TLS is optional: with `TLS_CERT_PATH` and `TLS_KEY_PATH` set the server
//! speaks HTTPS, otherwise plain HTTP (for deployments behind a proxy).

use axum_server::tls_rustls::RustlsConfig;
use tracing::info;

use crate::config::TlsPaths;

#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("failed to install rustls crypto provider")]
    Provider,

    #[error("failed to load TLS material from {cert_path} / {key_path}: {source}")]
    Load {
        cert_path: String,
        key_path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Install the ring crypto provider for rustls.
///
/// Must run before any TLS configuration is built. Installing twice is not
/// an error.
pub fn install_crypto_provider() -> Result<(), TlsError> {
    match rustls::crypto::ring::default_provider().install_default() {
        Ok(()) => Ok(()),
        Err(_) if rustls::crypto::CryptoProvider::get_default().is_some() => Ok(()),
        Err(_) => Err(TlsError::Provider),
    }
}

/// Load the PEM certificate chain and private key.
pub async fn load_rustls_config(paths: &TlsPaths) -> Result<RustlsConfig, TlsError> {
    install_crypto_provider()?;
    let config = RustlsConfig::from_pem_file(&paths.cert_path, &paths.key_path)
        .await
        .map_err(|source| TlsError::Load {
            cert_path: paths.cert_path.clone(),
            key_path: paths.key_path.clone(),
            source,
        })?;
    info!(cert = %paths.cert_path, "Loaded TLS certificate");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_install_is_idempotent() {
        install_crypto_provider().unwrap();
        install_crypto_provider().unwrap();
    }

    #[tokio::test]
    async fn missing_files_are_reported() {
        let paths = TlsPaths {
            cert_path: "/nonexistent/cert.pem".to_string(),
            key_path: "/nonexistent/key.pem".to_string(),
        };
        let err = load_rustls_config(&paths).await.unwrap_err();
        assert!(matches!(err, TlsError::Load { .. }));
        assert!(err.to_string().contains("/nonexistent/cert.pem"));
    }
}
