// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Upload strategies and the transport façade used by the pipeline.
//!
//! Uploads are planned as an ordered list of strategies and evaluated in
//! sequence; the first success wins and every failure is recorded. With a
//! signer the plan is `[SignedWrite, AnonymousPublish]`, without one it is
//! just `[AnonymousPublish]`.

use std::fmt;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    BlobId, BlobInfo, BlobStore, DownloadSource, LazyClient, Signer, StoredBlob, TransportError,
    UploadMetadata,
};

/// One way of getting bytes onto the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    SignedWrite,
    AnonymousPublish,
}

impl UploadStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStrategy::SignedWrite => "signed_write",
            UploadStrategy::AnonymousPublish => "anonymous_publish",
        }
    }

    /// Strategies to try, in order.
    pub fn plan(signer: Option<&dyn Signer>) -> Vec<UploadStrategy> {
        match signer {
            Some(_) => vec![UploadStrategy::SignedWrite, UploadStrategy::AnonymousPublish],
            None => vec![UploadStrategy::AnonymousPublish],
        }
    }
}

impl fmt::Display for UploadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    pub blob_id: BlobId,
    pub strategy: UploadStrategy,
    pub provider_info: Value,
    /// Gateway URL, derived from the blob id.
    pub url: String,
}

/// A failed strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadAttempt {
    pub strategy: UploadStrategy,
    pub error: TransportError,
}

/// Every planned strategy failed (or the client could not be built).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error}")]
pub struct UploadFailure {
    pub attempts: Vec<UploadAttempt>,
    /// The decisive error: the last attempt's, or the init error.
    pub error: TransportError,
}

/// Transport façade over a lazily constructed [`BlobStore`].
pub struct BlobTransport<S> {
    store: LazyClient<S>,
    epochs: u32,
    aggregator_url: String,
}

impl<S: BlobStore + 'static> BlobTransport<S> {
    pub fn new(store: LazyClient<S>, epochs: u32, aggregator_url: impl Into<String>) -> Self {
        Self {
            store,
            epochs,
            aggregator_url: aggregator_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn epochs(&self) -> u32 {
        self.epochs
    }

    /// Public read URL for a blob. Re-derivable at any time.
    pub fn blob_url(&self, blob_id: &BlobId) -> String {
        format!("{}/v1/{}", self.aggregator_url, blob_id)
    }

    /// Whether the underlying client has been constructed.
    pub fn is_ready(&self) -> bool {
        self.store.get_if_ready().is_some()
    }

    /// Construct the underlying client if needed.
    pub async fn ensure_ready(&self) -> Result<(), TransportError> {
        self.store.get().await.map(|_| ())
    }

    /// Upload `bytes`, falling back to anonymous publish if a signed write fails.
    pub async fn upload(
        &self,
        bytes: &[u8],
        metadata: &UploadMetadata,
        signer: Option<&dyn Signer>,
    ) -> Result<UploadReceipt, UploadFailure> {
        let store = self.store.get().await.map_err(|error| UploadFailure {
            attempts: Vec::new(),
            error,
        })?;

        debug!(
            size = bytes.len(),
            epochs = self.epochs,
            tags = ?metadata,
            "Uploading blob"
        );

        let mut attempts = Vec::new();
        for strategy in UploadStrategy::plan(signer) {
            let result = match (strategy, signer) {
                (UploadStrategy::SignedWrite, Some(signer)) => {
                    store.upload_signed(bytes, self.epochs, signer).await
                }
                (UploadStrategy::SignedWrite, None) => continue,
                (UploadStrategy::AnonymousPublish, _) => {
                    store.upload_anonymous(bytes, self.epochs).await
                }
            };

            match result {
                Ok(StoredBlob {
                    blob_id,
                    provider_info,
                }) => {
                    info!(
                        blob_id = %blob_id,
                        strategy = %strategy,
                        size = bytes.len(),
                        failed_attempts = attempts.len(),
                        "Blob uploaded"
                    );
                    return Ok(UploadReceipt {
                        url: self.blob_url(&blob_id),
                        blob_id,
                        strategy,
                        provider_info,
                    });
                }
                Err(error) => {
                    warn!(strategy = %strategy, error = %error, "Upload strategy failed");
                    attempts.push(UploadAttempt { strategy, error });
                }
            }
        }

        let error = attempts
            .last()
            .map(|attempt| attempt.error.clone())
            .unwrap_or(TransportError::MissingBlobId);
        Err(UploadFailure { attempts, error })
    }

    /// Download a blob from the chosen source. Never falls back on its own.
    pub async fn download(
        &self,
        blob_id: &BlobId,
        source: DownloadSource,
    ) -> Result<Vec<u8>, TransportError> {
        let store = self.store.get().await?;
        let bytes = match source {
            DownloadSource::Network => store.download(blob_id).await?,
            DownloadSource::Gateway => store.download_via_gateway(blob_id).await?,
        };
        debug!(blob_id = %blob_id, source = ?source, size = bytes.len(), "Blob downloaded");
        Ok(bytes)
    }

    /// Probe a blob. Unknown ids report `exists: false`; transport failures
    /// are returned for the caller to ignore or surface.
    pub async fn head_info(&self, blob_id: &BlobId) -> Result<BlobInfo, TransportError> {
        let store = self.store.get().await?;
        store.head(blob_id).await
    }
}
