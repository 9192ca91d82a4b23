// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Walrus integration over the publisher and aggregator HTTP APIs.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | Signed write | `PUT {publisher}/v1/blobs?epochs=n&send_object_to=addr` + bearer JWT |
//! | Anonymous publish | `PUT {publisher}/v1/store?epochs=n` |
//! | Network read | `GET {aggregator}/v1/blobs/{id}` |
//! | Gateway read | `GET {aggregator}/v1/{id}` |
//! | Head probe | `HEAD {aggregator}/v1/{id}` |
//!
//! Connecting asks the Sui fullnode for the chain identifier, which pins the
//! client to one network for its lifetime.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{
    extract_blob_id, BlobId, BlobInfo, BlobStore, Signer, StoredBlob, TransportError,
    WriteRequest,
};
use crate::config::{Network, WalrusConfig};

const OCTET_STREAM: &str = "application/octet-stream";
/// Upper bound on error bodies kept in [`TransportError::Status`].
const MAX_ERROR_BODY: usize = 512;
/// Bounds TCP/TLS setup only; request bodies run until done or cancelled.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Walrus HTTP client bound to one network.
#[derive(Debug, Clone)]
pub struct WalrusClient {
    network: Network,
    chain_id: String,
    publisher_url: String,
    aggregator_url: String,
    http: Client,
}

impl WalrusClient {
    /// Build the HTTP client and discover the chain identifier.
    pub async fn connect(config: &WalrusConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder().connect_timeout(CONNECT_TIMEOUT);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| TransportError::Init(format!("failed to build HTTP client: {e}")))?;

        let chain_id = fetch_chain_identifier(&http, &config.fullnode_url).await?;

        info!(
            network = %config.network,
            chain_id = %chain_id,
            publisher = %config.publisher_url,
            aggregator = %config.aggregator_url,
            "Walrus client initialized"
        );

        Ok(Self {
            network: config.network,
            chain_id,
            publisher_url: config.publisher_url.trim_end_matches('/').to_string(),
            aggregator_url: config.aggregator_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    async fn put_blob(
        &self,
        path: &str,
        bytes: &[u8],
        bearer: Option<String>,
    ) -> Result<StoredBlob, TransportError> {
        let what = format!("PUT {}", strip_query(path));
        let mut request = self
            .http
            .put(format!("{}{}", self.publisher_url, path))
            .header(header::CONTENT_TYPE, OCTET_STREAM)
            .body(bytes.to_vec());
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&what, e))?;

        if !response.status().is_success() {
            return Err(status_error("PUT", strip_query(path), response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(format!("{what} invalid JSON: {e}")))?;

        let blob_id = extract_blob_id(&body)?;
        Ok(StoredBlob {
            blob_id,
            provider_info: body,
        })
    }

    async fn get_blob(&self, path: &str, blob_id: &BlobId) -> Result<Vec<u8>, TransportError> {
        let what = format!("GET {path}");
        let response = self
            .http
            .get(format!("{}{}", self.aggregator_url, path))
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&what, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(TransportError::NotFound(blob_id.to_string())),
            status if status.is_success() => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| TransportError::from_reqwest(&what, e))?;
                Ok(bytes.to_vec())
            }
            _ => Err(status_error("GET", path, response).await),
        }
    }
}

#[async_trait]
impl BlobStore for WalrusClient {
    async fn upload_signed(
        &self,
        bytes: &[u8],
        epochs: u32,
        signer: &dyn Signer,
    ) -> Result<StoredBlob, TransportError> {
        let token = signer
            .authorize_write(&WriteRequest {
                epochs,
                size: bytes.len() as u64,
            })
            .map_err(|e| TransportError::Signer(e.to_string()))?;

        let owner: String =
            url::form_urlencoded::byte_serialize(signer.address().as_bytes()).collect();
        let path = format!("/v1/blobs?epochs={epochs}&send_object_to={owner}");
        debug!(epochs, size = bytes.len(), "Walrus signed write");
        self.put_blob(&path, bytes, Some(token)).await
    }

    async fn upload_anonymous(
        &self,
        bytes: &[u8],
        epochs: u32,
    ) -> Result<StoredBlob, TransportError> {
        let path = format!("/v1/store?epochs={epochs}");
        debug!(epochs, size = bytes.len(), "Walrus anonymous publish");
        self.put_blob(&path, bytes, None).await
    }

    async fn download(&self, blob_id: &BlobId) -> Result<Vec<u8>, TransportError> {
        self.get_blob(&format!("/v1/blobs/{blob_id}"), blob_id).await
    }

    async fn download_via_gateway(&self, blob_id: &BlobId) -> Result<Vec<u8>, TransportError> {
        self.get_blob(&format!("/v1/{blob_id}"), blob_id).await
    }

    async fn head(&self, blob_id: &BlobId) -> Result<BlobInfo, TransportError> {
        let path = format!("/v1/{blob_id}");
        let what = format!("HEAD {path}");
        let response = self
            .http
            .head(format!("{}{}", self.aggregator_url, path))
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&what, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(BlobInfo::missing()),
            status if status.is_success() => Ok(BlobInfo {
                exists: true,
                size: header_str(&response, header::CONTENT_LENGTH)
                    .and_then(|v| v.parse::<u64>().ok()),
                content_type: header_str(&response, header::CONTENT_TYPE).map(str::to_string),
            }),
            _ => Err(status_error("HEAD", &path, response).await),
        }
    }
}

/// Ask the fullnode which chain it serves.
async fn fetch_chain_identifier(http: &Client, fullnode_url: &str) -> Result<String, TransportError> {
    let payload = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "sui_getChainIdentifier",
        "params": []
    });

    let response = http
        .post(fullnode_url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| TransportError::Init(format!("fullnode unreachable: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(TransportError::Init(format!(
            "fullnode returned {status}: {}",
            truncate(&body)
        )));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| TransportError::Init(format!("fullnode returned invalid JSON: {e}")))?;

    chain_identifier_from(&body)
}

fn chain_identifier_from(body: &Value) -> Result<String, TransportError> {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(TransportError::Init(format!("fullnode error: {message}")));
    }

    body.get("result")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| TransportError::Init("fullnode response had no chain identifier".to_string()))
}

async fn status_error(method: &str, path: &str, response: Response) -> TransportError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    TransportError::Status {
        method: method.to_string(),
        path: path.to_string(),
        status,
        body: truncate(&body),
    }
}

fn header_str(response: &Response, name: header::HeaderName) -> Option<&str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

fn strip_query(path: &str) -> &str {
    path.split('?').next().unwrap_or(path)
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
