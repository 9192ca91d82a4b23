// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process blob network.
//!
//! Behaves like a Walrus deployment with a single publisher and aggregator:
//! ids are derived from content, repeated uploads are reported as
//! `alreadyCertified`, and expired blobs read as not found. Used for
//! `STORAGE_BACKEND=memory` runs and for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use base64ct::{Base64UrlUnpadded, Encoding};
use serde_json::json;
use sha2::{Digest, Sha256};

use super::{
    extract_blob_id, BlobId, BlobInfo, BlobStore, Signer, StoredBlob, TransportError,
    WriteRequest,
};

const CONTENT_TYPE: &str = "application/octet-stream";

/// In-memory blob network.
#[derive(Default)]
pub struct MemoryNetwork {
    blobs: RwLock<HashMap<BlobId, Vec<u8>>>,
    reject_signed: AtomicBool,
    signed_writes: AtomicUsize,
    anonymous_writes: AtomicUsize,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every signed write fail, as a publisher outage would.
    pub fn reject_signed_writes(&self, reject: bool) {
        self.reject_signed.store(reject, Ordering::SeqCst);
    }

    /// Drop a blob, as if its retention period ended.
    pub fn expire(&self, blob_id: &BlobId) -> bool {
        self.blobs
            .write()
            .map(|mut blobs| blobs.remove(blob_id).is_some())
            .unwrap_or(false)
    }

    /// Overwrite stored bytes (to simulate corruption).
    pub fn replace(&self, blob_id: &BlobId, bytes: Vec<u8>) {
        if let Ok(mut blobs) = self.blobs.write() {
            blobs.insert(blob_id.clone(), bytes);
        }
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.read().map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn signed_writes(&self) -> usize {
        self.signed_writes.load(Ordering::SeqCst)
    }

    pub fn anonymous_writes(&self) -> usize {
        self.anonymous_writes.load(Ordering::SeqCst)
    }

    fn store(&self, bytes: &[u8], epochs: u32) -> Result<StoredBlob, TransportError> {
        let digest = Sha256::digest(bytes);
        let blob_id = BlobId::parse(&Base64UrlUnpadded::encode_string(&digest))?;

        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| TransportError::Connect("memory network poisoned".to_string()))?;

        let response = if blobs.contains_key(&blob_id) {
            json!({
                "alreadyCertified": { "blobId": blob_id, "endEpoch": epochs }
            })
        } else {
            blobs.insert(blob_id.clone(), bytes.to_vec());
            json!({
                "newlyCreated": {
                    "blobObject": { "blobId": blob_id, "size": bytes.len() },
                    "endEpoch": epochs
                }
            })
        };

        Ok(StoredBlob {
            blob_id: extract_blob_id(&response)?,
            provider_info: response,
        })
    }

    fn read(&self, blob_id: &BlobId) -> Result<Vec<u8>, TransportError> {
        self.blobs
            .read()
            .map_err(|_| TransportError::Connect("memory network poisoned".to_string()))?
            .get(blob_id)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(blob_id.to_string()))
    }
}

#[async_trait]
impl BlobStore for MemoryNetwork {
    async fn upload_signed(
        &self,
        bytes: &[u8],
        epochs: u32,
        signer: &dyn Signer,
    ) -> Result<StoredBlob, TransportError> {
        signer
            .authorize_write(&WriteRequest {
                epochs,
                size: bytes.len() as u64,
            })
            .map_err(|e| TransportError::Signer(e.to_string()))?;

        if self.reject_signed.load(Ordering::SeqCst) {
            return Err(TransportError::Status {
                method: "PUT".to_string(),
                path: "/v1/blobs".to_string(),
                status: 503,
                body: "publisher unavailable".to_string(),
            });
        }

        self.signed_writes.fetch_add(1, Ordering::SeqCst);
        self.store(bytes, epochs)
    }

    async fn upload_anonymous(
        &self,
        bytes: &[u8],
        epochs: u32,
    ) -> Result<StoredBlob, TransportError> {
        self.anonymous_writes.fetch_add(1, Ordering::SeqCst);
        self.store(bytes, epochs)
    }

    async fn download(&self, blob_id: &BlobId) -> Result<Vec<u8>, TransportError> {
        self.read(blob_id)
    }

    async fn download_via_gateway(&self, blob_id: &BlobId) -> Result<Vec<u8>, TransportError> {
        self.read(blob_id)
    }

    async fn head(&self, blob_id: &BlobId) -> Result<BlobInfo, TransportError> {
        match self.read(blob_id) {
            Ok(bytes) => Ok(BlobInfo {
                exists: true,
                size: Some(bytes.len() as u64),
                content_type: Some(CONTENT_TYPE.to_string()),
            }),
            Err(TransportError::NotFound(_)) => Ok(BlobInfo::missing()),
            Err(e) => Err(e),
        }
    }
}
