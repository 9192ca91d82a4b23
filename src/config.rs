// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! typed configuration loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `WALRUS_NETWORK` | `testnet` or `mainnet` | `testnet` |
//! | `WALRUS_PUBLISHER_URL` | Publisher base URL (writes) | per network |
//! | `WALRUS_AGGREGATOR_URL` | Aggregator base URL (reads) | per network |
//! | `WALRUS_EPOCHS` | Retention epochs requested per upload | `5` |
//! | `SUI_FULLNODE_URL` | Sui JSON-RPC endpoint used at client init | per network |
//! | `WALRUS_HTTP_TIMEOUT_SECS` | Whole-request timeout; requests end only on cancellation when unset | Optional |
//! | `WALRUS_SIGNER_ADDRESS` | Address receiving signed-write blob objects | Optional |
//! | `WALRUS_JWT_SECRET` | Secret shared with an authenticated publisher | Optional |
//! | `STORAGE_BACKEND` | `walrus` or `memory` | `walrus` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM certificate chain and key | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const WALRUS_NETWORK_ENV: &str = "WALRUS_NETWORK";
pub const WALRUS_PUBLISHER_URL_ENV: &str = "WALRUS_PUBLISHER_URL";
pub const WALRUS_AGGREGATOR_URL_ENV: &str = "WALRUS_AGGREGATOR_URL";
pub const WALRUS_EPOCHS_ENV: &str = "WALRUS_EPOCHS";
pub const SUI_FULLNODE_URL_ENV: &str = "SUI_FULLNODE_URL";
pub const WALRUS_HTTP_TIMEOUT_ENV: &str = "WALRUS_HTTP_TIMEOUT_SECS";
pub const WALRUS_SIGNER_ADDRESS_ENV: &str = "WALRUS_SIGNER_ADDRESS";
pub const WALRUS_JWT_SECRET_ENV: &str = "WALRUS_JWT_SECRET";
pub const STORAGE_BACKEND_ENV: &str = "STORAGE_BACKEND";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default retention requested for each upload.
pub const DEFAULT_EPOCHS: u32 = 5;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set together with {1}")]
    Incomplete(&'static str, &'static str),
}

fn invalid(name: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Walrus deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }

    pub fn default_publisher_url(&self) -> &'static str {
        match self {
            Network::Testnet => "https://publisher.walrus-testnet.walrus.space",
            Network::Mainnet => "https://publisher.walrus-mainnet.walrus.space",
        }
    }

    pub fn default_aggregator_url(&self) -> &'static str {
        match self {
            Network::Testnet => "https://aggregator.walrus-testnet.walrus.space",
            Network::Mainnet => "https://aggregator.walrus-mainnet.walrus.space",
        }
    }

    pub fn default_fullnode_url(&self) -> &'static str {
        match self {
            Network::Testnet => "https://fullnode.testnet.sui.io",
            Network::Mainnet => "https://fullnode.mainnet.sui.io",
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            _ => Err("expected testnet or mainnet".to_string()),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which [`crate::transport::BlobStore`] backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Walrus,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "walrus" => Ok(StorageBackend::Walrus),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err("expected walrus or memory".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Walrus endpoints and upload parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalrusConfig {
    pub network: Network,
    pub publisher_url: String,
    pub aggregator_url: String,
    pub fullnode_url: String,
    pub epochs: u32,
    /// Unset means no whole-request deadline; callers cancel instead.
    pub request_timeout: Option<Duration>,
}

impl WalrusConfig {
    /// Defaults for `network`.
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            publisher_url: network.default_publisher_url().to_string(),
            aggregator_url: network.default_aggregator_url().to_string(),
            fullnode_url: network.default_fullnode_url().to_string(),
            epochs: DEFAULT_EPOCHS,
            request_timeout: None,
        }
    }

    /// Point every endpoint at one base URL (local gateways, test servers).
    pub fn with_single_endpoint(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        self.publisher_url = base_url.clone();
        self.aggregator_url = base_url.clone();
        self.fullnode_url = base_url;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_optional)
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let network = match lookup(WALRUS_NETWORK_ENV) {
            Some(raw) => raw
                .parse::<Network>()
                .map_err(|e| invalid(WALRUS_NETWORK_ENV, &raw, e))?,
            None => Network::default(),
        };
        let mut config = Self::for_network(network);

        if let Some(raw) = lookup(WALRUS_PUBLISHER_URL_ENV) {
            config.publisher_url = parse_base_url(WALRUS_PUBLISHER_URL_ENV, &raw)?;
        }
        if let Some(raw) = lookup(WALRUS_AGGREGATOR_URL_ENV) {
            config.aggregator_url = parse_base_url(WALRUS_AGGREGATOR_URL_ENV, &raw)?;
        }
        if let Some(raw) = lookup(SUI_FULLNODE_URL_ENV) {
            config.fullnode_url = parse_base_url(SUI_FULLNODE_URL_ENV, &raw)?;
        }
        if let Some(raw) = lookup(WALRUS_EPOCHS_ENV) {
            config.epochs = match raw.parse::<u32>() {
                Ok(epochs) if epochs > 0 => epochs,
                _ => return Err(invalid(WALRUS_EPOCHS_ENV, &raw, "expected a positive integer")),
            };
        }
        if let Some(raw) = lookup(WALRUS_HTTP_TIMEOUT_ENV) {
            config.request_timeout = match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => {
                    return Err(invalid(
                        WALRUS_HTTP_TIMEOUT_ENV,
                        &raw,
                        "expected a positive number of seconds",
                    ))
                }
            };
        }

        Ok(config)
    }
}

/// Service-held signer for signed writes.
#[derive(Clone, PartialEq, Eq)]
pub struct SignerConfig {
    pub address: String,
    pub jwt_secret: String,
}

impl fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerConfig")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl SignerConfig {
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        match (
            lookup(WALRUS_SIGNER_ADDRESS_ENV),
            lookup(WALRUS_JWT_SECRET_ENV),
        ) {
            (Some(address), Some(jwt_secret)) => Ok(Some(Self {
                address,
                jwt_secret,
            })),
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::Incomplete(
                WALRUS_SIGNER_ADDRESS_ENV,
                WALRUS_JWT_SECRET_ENV,
            )),
            (None, Some(_)) => Err(ConfigError::Incomplete(
                WALRUS_JWT_SECRET_ENV,
                WALRUS_SIGNER_ADDRESS_ENV,
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert_path: String,
    pub key_path: String,
}

/// Everything the server binary needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
    pub backend: StorageBackend,
    pub walrus: WalrusConfig,
    pub signer: Option<SignerConfig>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_optional)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup(PORT_ENV) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| invalid(PORT_ENV, &raw, e.to_string()))?,
            None => DEFAULT_PORT,
        };

        let tls = match (lookup(TLS_CERT_PATH_ENV), lookup(TLS_KEY_PATH_ENV)) {
            (Some(cert_path), Some(key_path)) => Some(TlsPaths {
                cert_path,
                key_path,
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Incomplete(TLS_CERT_PATH_ENV, TLS_KEY_PATH_ENV))
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete(TLS_KEY_PATH_ENV, TLS_CERT_PATH_ENV))
            }
        };

        let log_format = match lookup(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let backend = match lookup(STORAGE_BACKEND_ENV) {
            Some(raw) => raw
                .parse::<StorageBackend>()
                .map_err(|e| invalid(STORAGE_BACKEND_ENV, &raw, e))?,
            None => StorageBackend::default(),
        };

        Ok(Self {
            host: lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            tls,
            log_format,
            backend,
            walrus: WalrusConfig::from_lookup(&lookup)?,
            signer: SignerConfig::from_lookup(&lookup)?,
        })
    }
}

fn parse_base_url(name: &'static str, raw: &str) -> Result<String, ConfigError> {
    let url = url::Url::parse(raw).map_err(|e| invalid(name, raw, e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(name, raw, "expected an http(s) URL"));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Read a variable, treating blank values as unset.
pub fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults_target_testnet() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.backend, StorageBackend::Walrus);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.tls.is_none());
        assert!(config.signer.is_none());
        assert_eq!(config.walrus, WalrusConfig::for_network(Network::Testnet));
        assert_eq!(config.walrus.epochs, 5);
        assert_eq!(config.walrus.request_timeout, None);
        assert_eq!(
            config.walrus.publisher_url,
            "https://publisher.walrus-testnet.walrus.space"
        );
    }

    #[test]
    fn mainnet_switches_every_default_endpoint() {
        let config = WalrusConfig::from_lookup(lookup(&[("WALRUS_NETWORK", "MAINNET")])).unwrap();
        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(
            config.aggregator_url,
            "https://aggregator.walrus-mainnet.walrus.space"
        );
        assert_eq!(config.fullnode_url, "https://fullnode.mainnet.sui.io");
    }

    #[test]
    fn explicit_endpoints_override_defaults() {
        let config = WalrusConfig::from_lookup(lookup(&[
            ("WALRUS_PUBLISHER_URL", "http://localhost:31415/"),
            ("WALRUS_AGGREGATOR_URL", "http://localhost:31416"),
            ("WALRUS_EPOCHS", "12"),
            ("WALRUS_HTTP_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.publisher_url, "http://localhost:31415");
        assert_eq!(config.aggregator_url, "http://localhost:31416");
        assert_eq!(config.epochs, 12);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(WalrusConfig::from_lookup(lookup(&[("WALRUS_NETWORK", "devnet")])).is_err());
        assert!(WalrusConfig::from_lookup(lookup(&[("WALRUS_EPOCHS", "0")])).is_err());
        assert!(WalrusConfig::from_lookup(lookup(&[("WALRUS_PUBLISHER_URL", "ftp://x")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("STORAGE_BACKEND", "s3")])).is_err());
    }

    #[test]
    fn signer_needs_both_variables() {
        assert_eq!(
            SignerConfig::from_lookup(lookup(&[("WALRUS_SIGNER_ADDRESS", "0xabc")])),
            Err(ConfigError::Incomplete(
                "WALRUS_SIGNER_ADDRESS",
                "WALRUS_JWT_SECRET"
            ))
        );
        let signer = SignerConfig::from_lookup(lookup(&[
            ("WALRUS_SIGNER_ADDRESS", "0xabc"),
            ("WALRUS_JWT_SECRET", "s3cret"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(signer.address, "0xabc");
        assert!(!format!("{signer:?}").contains("s3cret"));
    }

    #[test]
    fn tls_needs_both_paths() {
        assert!(ServerConfig::from_lookup(lookup(&[("TLS_CERT_PATH", "/etc/cert.pem")])).is_err());
        let config = ServerConfig::from_lookup(lookup(&[
            ("TLS_CERT_PATH", "/etc/cert.pem"),
            ("TLS_KEY_PATH", "/etc/key.pem"),
            ("LOG_FORMAT", "json"),
            ("STORAGE_BACKEND", "memory"),
        ]))
        .unwrap();
        assert_eq!(config.tls.unwrap().key_path, "/etc/key.pem");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.backend, StorageBackend::Memory);
    }
}
