// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Publish / Retrieve Pipeline
//!
//! Composes the codec, the envelope and the blob transport into the two
//! operations the rest of the service calls:
//!
//! ```text
//! publish:  document -> encode -> seal -> upload   -> { blob_id, key, url }
//! retrieve: blob_id  -> download -> open -> decode -> document
//! ```
//!
//! Steps run strictly in order. Codec and envelope failures abort before any
//! network call, so an invalid document never leaves a blob behind. Every
//! network await is raced against a [`CancellationToken`]; a cancelled
//! publish never reports a blob id.

use std::fmt;
use std::future::Future;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::{self, CodecError, Document};
use crate::envelope::{self, EncryptionMode, EnvelopeError, SymmetricKey};
use crate::transport::{
    BlobId, BlobInfo, BlobStore, BlobTransport, DownloadSource, Signer, TransportError,
    UploadFailure, UploadMetadata, UploadStrategy,
};

/// Upload tag naming the blob a republish replaces.
pub const SUPERSEDES_TAG: &str = "supersedes";

/// Step of an operation, carried by errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Encoding,
    Sealing,
    Uploading,
    Downloading,
    Opening,
    Decoding,
    Probing,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Encoding => "encoding",
            Phase::Sealing => "sealing",
            Phase::Uploading => "uploading",
            Phase::Downloading => "downloading",
            Phase::Opening => "opening",
            Phase::Decoding => "decoding",
            Phase::Probing => "probing",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse error category callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidDocument,
    Encryption,
    MalformedInput,
    Decryption,
    Upload,
    Transport,
    NotFound,
    Cancelled,
}

/// Error type for pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The document failed validation or could not be encoded.
    #[error("invalid document: {reason}")]
    InvalidDocument { reason: String },

    /// Sealing failed before anything was uploaded.
    #[error("sealing failed: {0}")]
    Sealing(#[source] EnvelopeError),

    /// Every upload strategy failed.
    #[error("upload failed after {} attempt(s): {failure}", .failure.attempts.len())]
    Publish { failure: UploadFailure },

    /// The network does not know the blob.
    #[error("blob {blob_id} not found")]
    NotFound { blob_id: BlobId },

    #[error("{phase} blob {blob_id} failed: {source}")]
    Transport {
        phase: Phase,
        blob_id: BlobId,
        #[source]
        source: TransportError,
    },

    /// Wrong or missing key, or the envelope was tampered with.
    #[error("cannot open blob {blob_id}: {source}")]
    Decryption {
        blob_id: BlobId,
        #[source]
        source: EnvelopeError,
    },

    /// The (opened) bytes are not a valid document.
    #[error("blob {blob_id} holds a malformed document: {source}")]
    MalformedInput {
        blob_id: BlobId,
        #[source]
        source: CodecError,
    },

    #[error("operation cancelled while {phase}")]
    Cancelled { phase: Phase },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidDocument { .. } => ErrorKind::InvalidDocument,
            PipelineError::Sealing(_) => ErrorKind::Encryption,
            PipelineError::Publish { failure } => match failure.error {
                TransportError::MissingBlobId | TransportError::InvalidResponse(_) => {
                    ErrorKind::Upload
                }
                _ => ErrorKind::Transport,
            },
            PipelineError::NotFound { .. } => ErrorKind::NotFound,
            PipelineError::Transport { .. } => ErrorKind::Transport,
            PipelineError::Decryption { .. } => ErrorKind::Decryption,
            PipelineError::MalformedInput { .. } => ErrorKind::MalformedInput,
            PipelineError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Whether the same call may succeed if repeated unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Publish { failure } => failure.error.is_retryable(),
            PipelineError::Transport { source, .. } => source.is_retryable(),
            PipelineError::Cancelled { .. } => true,
            PipelineError::InvalidDocument { .. }
            | PipelineError::Sealing(_)
            | PipelineError::NotFound { .. }
            | PipelineError::Decryption { .. }
            | PipelineError::MalformedInput { .. } => false,
        }
    }

    /// Phase the operation was in when it failed.
    pub fn phase(&self) -> Phase {
        match self {
            PipelineError::InvalidDocument { .. } => Phase::Encoding,
            PipelineError::Sealing(_) => Phase::Sealing,
            PipelineError::Publish { .. } => Phase::Uploading,
            PipelineError::NotFound { .. } => Phase::Downloading,
            PipelineError::Transport { phase, .. } | PipelineError::Cancelled { phase } => *phase,
            PipelineError::Decryption { .. } => Phase::Opening,
            PipelineError::MalformedInput { .. } => Phase::Decoding,
        }
    }

    /// Blob the failing operation referred to, when one was known.
    pub fn blob_id(&self) -> Option<&BlobId> {
        match self {
            PipelineError::NotFound { blob_id }
            | PipelineError::Transport { blob_id, .. }
            | PipelineError::Decryption { blob_id, .. }
            | PipelineError::MalformedInput { blob_id, .. } => Some(blob_id),
            _ => None,
        }
    }
}

/// Options for [`DocumentPipeline::publish`].
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub encryption: EncryptionMode,
    /// Extra upload tags. Reserved tags written by the pipeline win.
    pub tags: UploadMetadata,
}

impl PublishOptions {
    pub fn encrypted(encrypt: bool) -> Self {
        Self {
            encryption: if encrypt {
                EncryptionMode::Aes256Gcm
            } else {
                EncryptionMode::None
            },
            tags: UploadMetadata::new(),
        }
    }

    pub fn with_tags(mut self, tags: UploadMetadata) -> Self {
        self.tags = tags;
        self
    }
}

/// Result of a completed publish.
#[derive(Debug)]
pub struct PublishReceipt {
    pub blob_id: BlobId,
    /// Key to hand back to the caller; `None` for unencrypted publishes.
    pub key: Option<SymmetricKey>,
    pub url: String,
    pub strategy: UploadStrategy,
    pub provider_info: Value,
}

/// Options for [`DocumentPipeline::retrieve`].
#[derive(Debug, Clone, Default)]
pub struct RetrieveOptions {
    pub key: Option<SymmetricKey>,
    pub source: DownloadSource,
}

/// Document publish/retrieve orchestrator.
pub struct DocumentPipeline<S> {
    transport: BlobTransport<S>,
}

impl<S: BlobStore + 'static> DocumentPipeline<S> {
    pub fn new(transport: BlobTransport<S>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &BlobTransport<S> {
        &self.transport
    }

    /// Encode, optionally seal, and upload a document.
    pub async fn publish<T: Document>(
        &self,
        document: &T,
        options: &PublishOptions,
        signer: Option<&dyn Signer>,
        cancel: &CancellationToken,
    ) -> Result<PublishReceipt, PipelineError> {
        self.publish_tagged(document, options, None, signer, cancel)
            .await
    }

    /// Publish a new version of a document.
    ///
    /// Blobs are immutable: this uploads a new blob and tags it with the id
    /// it supersedes. `previous` itself is left untouched.
    pub async fn republish<T: Document>(
        &self,
        previous: &BlobId,
        document: &T,
        options: &PublishOptions,
        signer: Option<&dyn Signer>,
        cancel: &CancellationToken,
    ) -> Result<PublishReceipt, PipelineError> {
        self.publish_tagged(document, options, Some(previous), signer, cancel)
            .await
    }

    async fn publish_tagged<T: Document>(
        &self,
        document: &T,
        options: &PublishOptions,
        previous: Option<&BlobId>,
        signer: Option<&dyn Signer>,
        cancel: &CancellationToken,
    ) -> Result<PublishReceipt, PipelineError> {
        document
            .validate()
            .map_err(|reason| PipelineError::InvalidDocument { reason })?;

        let plaintext = codec::encode(document).map_err(|e| PipelineError::InvalidDocument {
            reason: e.to_string(),
        })?;

        let sealed = envelope::seal(plaintext, options.encryption, None)
            .map_err(PipelineError::Sealing)?;

        let tags = upload_tags::<T>(options, sealed.key.is_some(), previous);
        let receipt = cancellable(
            cancel,
            Phase::Uploading,
            self.transport.upload(&sealed.bytes, &tags, signer),
        )
        .await?
        .map_err(|failure| PipelineError::Publish { failure })?;

        info!(
            blob_id = %receipt.blob_id,
            kind = T::KIND,
            encrypted = sealed.key.is_some(),
            strategy = %receipt.strategy,
            supersedes = previous.map(|id| id.as_str()),
            "Document published"
        );

        Ok(PublishReceipt {
            blob_id: receipt.blob_id,
            key: sealed.key,
            url: receipt.url,
            strategy: receipt.strategy,
            provider_info: receipt.provider_info,
        })
    }

    /// Download, open and decode a document.
    pub async fn retrieve<T: Document>(
        &self,
        blob_id: &BlobId,
        options: &RetrieveOptions,
        cancel: &CancellationToken,
    ) -> Result<T, PipelineError> {
        let bytes = cancellable(
            cancel,
            Phase::Downloading,
            self.transport.download(blob_id, options.source),
        )
        .await?
        .map_err(|e| match e {
            TransportError::NotFound(_) => PipelineError::NotFound {
                blob_id: blob_id.clone(),
            },
            source => PipelineError::Transport {
                phase: Phase::Downloading,
                blob_id: blob_id.clone(),
                source,
            },
        })?;

        let plaintext = envelope::open(bytes, options.key.as_ref()).map_err(|source| {
            warn!(blob_id = %blob_id, error = %source, "Blob could not be opened");
            PipelineError::Decryption {
                blob_id: blob_id.clone(),
                source,
            }
        })?;

        let document = codec::decode(&plaintext).map_err(|source| PipelineError::MalformedInput {
            blob_id: blob_id.clone(),
            source,
        })?;

        debug!(blob_id = %blob_id, kind = T::KIND, "Document retrieved");
        Ok(document)
    }

    /// Existence probe. Unknown blobs report `exists: false`.
    pub async fn probe(
        &self,
        blob_id: &BlobId,
        cancel: &CancellationToken,
    ) -> Result<BlobInfo, PipelineError> {
        cancellable(cancel, Phase::Probing, self.transport.head_info(blob_id))
            .await?
            .map_err(|source| PipelineError::Transport {
                phase: Phase::Probing,
                blob_id: blob_id.clone(),
                source,
            })
    }
}

fn upload_tags<T: Document>(
    options: &PublishOptions,
    encrypted: bool,
    previous: Option<&BlobId>,
) -> UploadMetadata {
    let mut tags = options.tags.clone();
    tags.insert("type", T::KIND);
    tags.insert("encrypted", encrypted.to_string());
    tags.insert("timestamp", chrono::Utc::now().to_rfc3339());
    if let Some(previous) = previous {
        tags.insert(SUPERSEDES_TAG, previous.as_str());
    }
    tags
}

/// Race `future` against cancellation. Cancellation wins ties.
async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    phase: Phase,
    future: F,
) -> Result<F::Output, PipelineError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(phase = %phase, "Pipeline operation cancelled");
            Err(PipelineError::Cancelled { phase })
        }
        output = future => Ok(output),
    }
}
