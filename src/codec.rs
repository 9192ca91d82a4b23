// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Content Codec
//!
//! Converts application documents to the canonical byte form stored on
//! Walrus and back. The canonical form is compact JSON with struct fields in
//! declaration order, so the same document always encodes to the same bytes.
//!
//! Decoding failures are reported as [`CodecError::MalformedInput`] so the
//! pipeline can tell corrupt data apart from a wrong decryption key.

use serde::{de::DeserializeOwned, Serialize};

/// Error type for codec operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The document could not be serialized.
    #[error("document cannot be encoded: {0}")]
    Encode(String),

    /// The bytes do not parse as the expected document structure.
    #[error("malformed document bytes: {0}")]
    MalformedInput(String),
}

/// A structured record the pipeline can publish.
pub trait Document: Serialize + DeserializeOwned {
    /// Value of the `type` upload tag.
    const KIND: &'static str;

    /// Reject documents that must not be published.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Encode a document to its canonical bytes.
pub fn encode<T: Serialize>(document: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(document).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode canonical bytes back into a document.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::MalformedInput("empty payload".to_string()));
    }
    serde_json::from_slice(bytes).map_err(|e| CodecError::MalformedInput(e.to_string()))
}
