// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Blob Transport
//!
//! Moves raw bytes to and from a content-addressed blob network.
//!
//! ## Layers
//!
//! - [`BlobStore`] - capability set of one storage provider
//!   (signed write, anonymous publish, network read, gateway read, head)
//! - [`WalrusClient`] - Walrus over HTTP (publisher + aggregator)
//! - [`MemoryNetwork`] - in-process store for local runs and tests
//! - [`LazyClient`] - single-flight construction of the provider client
//! - [`BlobTransport`] - ordered upload strategies, URL derivation and
//!   download source selection on top of a lazily built store

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use serde_json::Value;

pub mod client;
pub mod lazy;
pub mod memory;
pub mod signer;
pub mod walrus;

pub use client::{BlobTransport, UploadAttempt, UploadFailure, UploadReceipt, UploadStrategy};
pub use lazy::LazyClient;
pub use memory::MemoryNetwork;
pub use signer::{JwtSigner, Signer, SignerError, WriteRequest};
pub use walrus::WalrusClient;

/// Error type for transport operations.
///
/// Cloneable so a single failed client initialization can be handed to
/// every caller that waited on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The network does not know the blob (never stored or expired).
    #[error("blob {0} not found")]
    NotFound(String),

    /// The blob id is not syntactically valid.
    #[error("invalid blob id: {0}")]
    InvalidBlobId(String),

    /// The endpoint could not be reached.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request did not complete in time.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The endpoint answered with an unexpected HTTP status.
    #[error("{method} {path} returned {status}: {body}")]
    Status {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    /// The upload was accepted but the response carried no blob id.
    #[error("upload response did not contain a blob id")]
    MissingBlobId,

    /// The response body could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The signer refused to authorize the write.
    #[error("signer failed: {0}")]
    Signer(String),

    /// The provider client could not be constructed.
    #[error("client initialization failed: {0}")]
    Init(String),
}

impl TransportError {
    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Connect(_)
            | TransportError::Timeout(_)
            | TransportError::MissingBlobId
            | TransportError::InvalidResponse(_)
            | TransportError::Init(_) => true,
            TransportError::Status { status, .. } => *status >= 500 || *status == 429,
            TransportError::NotFound(_)
            | TransportError::InvalidBlobId(_)
            | TransportError::Signer(_) => false,
        }
    }

    /// Map a `reqwest` failure for `what` (e.g. `"PUT /v1/store"`).
    pub(crate) fn from_reqwest(what: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(format!("{what}: {e}"))
        } else {
            TransportError::Connect(format!("{what}: {e}"))
        }
    }
}

/// Network-issued identifier of a stored blob.
///
/// Opaque: no assumption is made that it equals a hash of the bytes. Only
/// URL-safe characters are accepted so the id can be placed in a path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(String);

impl BlobId {
    pub fn parse(raw: &str) -> Result<Self, TransportError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TransportError::InvalidBlobId("empty".to_string()));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(TransportError::InvalidBlobId(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller tags attached to an upload for observability.
///
/// Never interpreted by the transport and never carries key material.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadMetadata(BTreeMap<String, String>);

impl UploadMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, String>> for UploadMetadata {
    fn from(tags: BTreeMap<String, String>) -> Self {
        Self(tags)
    }
}

/// A blob accepted by the network.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    pub blob_id: BlobId,
    /// Provider response, passed through for the caller.
    pub provider_info: Value,
}

/// Result of a head probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    pub exists: bool,
    pub size: Option<u64>,
    pub content_type: Option<String>,
}

impl BlobInfo {
    pub fn missing() -> Self {
        Self {
            exists: false,
            size: None,
            content_type: None,
        }
    }
}

/// Where a download reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DownloadSource {
    /// Network read API.
    #[default]
    Network,
    /// Plain HTTP GET on the public gateway URL.
    Gateway,
}

/// Capability set of a blob storage provider.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Authenticated write paid for / authorized by `signer`.
    async fn upload_signed(
        &self,
        bytes: &[u8],
        epochs: u32,
        signer: &dyn Signer,
    ) -> Result<StoredBlob, TransportError>;

    /// Anonymous write through a public publisher.
    async fn upload_anonymous(&self, bytes: &[u8], epochs: u32)
        -> Result<StoredBlob, TransportError>;

    /// Read through the network read API.
    async fn download(&self, blob_id: &BlobId) -> Result<Vec<u8>, TransportError>;

    /// Read through the public gateway URL.
    async fn download_via_gateway(&self, blob_id: &BlobId) -> Result<Vec<u8>, TransportError>;

    /// Existence and metadata probe. Unknown ids yield `exists: false`.
    async fn head(&self, blob_id: &BlobId) -> Result<BlobInfo, TransportError>;
}

#[async_trait]
impl<S: BlobStore + ?Sized> BlobStore for Arc<S> {
    async fn upload_signed(
        &self,
        bytes: &[u8],
        epochs: u32,
        signer: &dyn Signer,
    ) -> Result<StoredBlob, TransportError> {
        (**self).upload_signed(bytes, epochs, signer).await
    }

    async fn upload_anonymous(
        &self,
        bytes: &[u8],
        epochs: u32,
    ) -> Result<StoredBlob, TransportError> {
        (**self).upload_anonymous(bytes, epochs).await
    }

    async fn download(&self, blob_id: &BlobId) -> Result<Vec<u8>, TransportError> {
        (**self).download(blob_id).await
    }

    async fn download_via_gateway(&self, blob_id: &BlobId) -> Result<Vec<u8>, TransportError> {
        (**self).download_via_gateway(blob_id).await
    }

    async fn head(&self, blob_id: &BlobId) -> Result<BlobInfo, TransportError> {
        (**self).head(blob_id).await
    }
}

/// Pull the blob id out of a publisher response.
///
/// The publisher reports either `newlyCreated.blobObject.blobId` or, when
/// the same bytes are already stored, `alreadyCertified.blobId`.
pub fn extract_blob_id(response: &Value) -> Result<BlobId, TransportError> {
    let raw = response
        .pointer("/newlyCreated/blobObject/blobId")
        .and_then(Value::as_str)
        .or_else(|| {
            response
                .pointer("/alreadyCertified/blobId")
                .and_then(Value::as_str)
        })
        .ok_or(TransportError::MissingBlobId)?;
    BlobId::parse(raw).map_err(|_| TransportError::InvalidResponse(format!("bad blob id {raw:?}")))
}
