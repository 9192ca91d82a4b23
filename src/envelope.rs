// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Encryption Envelopes
//!
//! Seals document bytes under a per-publish symmetric key before they leave
//! the process. Keys stay with the publishing caller: they are never sent to
//! the storage network, never written into upload metadata and never logged.
//!
//! ## Envelope Layout
//!
//! ```text
//! +-------+---------+-------------+---------------------------+
//! | "RVE" | version | nonce (12B) | ciphertext || GCM tag (16B) |
//! +-------+---------+-------------+---------------------------+
//! ```
//!
//! The 4-byte header is bound as associated data, so a tampered header fails
//! authentication just like a tampered ciphertext.
//!
//! ## Key Format
//!
//! Keys are exchanged as text: `rv1.` followed by the standard Base64
//! encoding of 32 random bytes. The prefix carries the algorithm version.

use std::fmt;

use base64ct::{Base64, Encoding};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};

const MAGIC: &[u8; 3] = b"RVE";
const VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;
const KEY_PREFIX: &str = "rv1.";

/// Error type for envelope operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    /// The key text is not a valid `rv1.` key.
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),

    /// The blob is sealed but no key was supplied.
    #[error("blob is encrypted and no key was supplied")]
    KeyRequired,

    /// A key was supplied but the bytes are not an envelope.
    #[error("blob is not an encrypted envelope")]
    NotAnEnvelope,

    /// The envelope was written by an unknown format version.
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u8),

    /// Wrong key, or the envelope was modified.
    #[error("envelope authentication failed (wrong key or tampered data)")]
    Unauthenticated,

    /// The system random source failed.
    #[error("secure random source unavailable")]
    RandomUnavailable,
}

/// Whether a publish seals the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptionMode {
    /// Upload the encoded bytes as-is.
    None,
    /// Seal under a freshly generated AES-256-GCM key.
    #[default]
    Aes256Gcm,
}

/// Symmetric key owned by the publishing caller.
///
/// `Debug` is redacted so the key cannot leak through tracing fields.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey([u8; KEY_LEN]);

impl SymmetricKey {
    /// Generate a fresh random key.
    pub fn generate() -> Result<Self, EnvelopeError> {
        let mut bytes = [0u8; KEY_LEN];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| EnvelopeError::RandomUnavailable)?;
        Ok(Self(bytes))
    }

    /// Parse the `rv1.` text form.
    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        let encoded = text
            .trim()
            .strip_prefix(KEY_PREFIX)
            .ok_or_else(|| EnvelopeError::InvalidKey("unknown key format".to_string()))?;
        let bytes = Base64::decode_vec(encoded)
            .map_err(|_| EnvelopeError::InvalidKey("key is not valid base64".to_string()))?;
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            EnvelopeError::InvalidKey(format!("key must be {KEY_LEN} bytes"))
        })?;
        Ok(Self(bytes))
    }

    /// Text form handed back to the caller.
    pub fn to_text(&self) -> String {
        format!("{KEY_PREFIX}{}", Base64::encode_string(&self.0))
    }

    fn aead_key(&self) -> Result<LessSafeKey, EnvelopeError> {
        let unbound = UnboundKey::new(&AES_256_GCM, &self.0)
            .map_err(|_| EnvelopeError::InvalidKey("rejected by cipher".to_string()))?;
        Ok(LessSafeKey::new(unbound))
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

/// Output of [`seal`].
#[derive(Debug)]
pub struct Sealed {
    /// Bytes to upload.
    pub bytes: Vec<u8>,
    /// Key needed to open `bytes`; `None` when sealing was a passthrough.
    pub key: Option<SymmetricKey>,
}

/// Returns true if `bytes` start with an envelope header.
pub fn is_envelope(bytes: &[u8]) -> bool {
    bytes.len() >= HEADER_LEN && &bytes[..MAGIC.len()] == MAGIC
}

/// Seal `plaintext` according to `mode`.
///
/// With [`EncryptionMode::Aes256Gcm`] the supplied key is used, or a new one
/// is generated. With [`EncryptionMode::None`] the bytes pass through.
pub fn seal(
    plaintext: Vec<u8>,
    mode: EncryptionMode,
    key: Option<SymmetricKey>,
) -> Result<Sealed, EnvelopeError> {
    if mode == EncryptionMode::None {
        return Ok(Sealed {
            bytes: plaintext,
            key: None,
        });
    }

    let key = match key {
        Some(key) => key,
        None => SymmetricKey::generate()?,
    };

    let mut nonce = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| EnvelopeError::RandomUnavailable)?;

    let header = header();
    let mut in_out = plaintext;
    key.aead_key()?
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce),
            Aad::from(&header),
            &mut in_out,
        )
        .map_err(|_| EnvelopeError::Unauthenticated)?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + NONCE_LEN + in_out.len());
    bytes.extend_from_slice(&header);
    bytes.extend_from_slice(&nonce);
    bytes.extend_from_slice(&in_out);

    Ok(Sealed {
        bytes,
        key: Some(key),
    })
}

/// Open downloaded bytes.
///
/// Without a key the bytes must not be an envelope and are returned as-is.
/// With a key they must be an envelope that authenticates under that key.
pub fn open(bytes: Vec<u8>, key: Option<&SymmetricKey>) -> Result<Vec<u8>, EnvelopeError> {
    let Some(key) = key else {
        if is_envelope(&bytes) {
            return Err(EnvelopeError::KeyRequired);
        }
        return Ok(bytes);
    };

    if !is_envelope(&bytes) {
        return Err(EnvelopeError::NotAnEnvelope);
    }
    let version = bytes[MAGIC.len()];
    if version != VERSION {
        return Err(EnvelopeError::UnsupportedVersion(version));
    }
    if bytes.len() < HEADER_LEN + NONCE_LEN + TAG_LEN {
        return Err(EnvelopeError::Unauthenticated);
    }

    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(&bytes[..HEADER_LEN]);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&bytes[HEADER_LEN..HEADER_LEN + NONCE_LEN]);

    let mut in_out = bytes[HEADER_LEN + NONCE_LEN..].to_vec();
    let plaintext_len = key
        .aead_key()?
        .open_in_place(
            Nonce::assume_unique_for_key(nonce),
            Aad::from(&header),
            &mut in_out,
        )
        .map_err(|_| EnvelopeError::Unauthenticated)?
        .len();
    in_out.truncate(plaintext_len);
    Ok(in_out)
}

fn header() -> [u8; HEADER_LEN] {
    [MAGIC[0], MAGIC[1], MAGIC[2], VERSION]
}
