// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Write authorization for signed uploads.
//!
//! A [`Signer`] is the capability of an identity that may authorize (and pay
//! for) a write to the storage network. Walrus authenticated publishers
//! accept a short-lived JWT naming the address that receives the blob object
//! and the limits of the write.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default lifetime of a write authorization.
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    #[error("signer address must not be empty")]
    EmptyAddress,

    #[error("failed to sign write authorization: {0}")]
    Token(String),
}

/// Parameters of a single write the signer is asked to authorize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRequest {
    pub epochs: u32,
    pub size: u64,
}

/// Capability to authorize signed writes.
pub trait Signer: Send + Sync {
    /// Address that will own the stored blob object.
    fn address(&self) -> &str;

    /// Produce a bearer token authorizing `request`.
    fn authorize_write(&self, request: &WriteRequest) -> Result<String, SignerError>;
}

/// Claims understood by Walrus authenticated publishers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WriteClaims {
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub send_object_to: String,
    pub epochs: u32,
    pub size: u64,
}

/// HS256 JWT signer sharing a secret with the publisher.
#[derive(Clone)]
pub struct JwtSigner {
    address: String,
    key: EncodingKey,
    ttl: Duration,
}

impl JwtSigner {
    pub fn new(address: impl Into<String>, secret: &[u8]) -> Result<Self, SignerError> {
        let address = address.into().trim().to_string();
        if address.is_empty() {
            return Err(SignerError::EmptyAddress);
        }
        Ok(Self {
            address,
            key: EncodingKey::from_secret(secret),
            ttl: DEFAULT_TOKEN_TTL,
        })
    }

    /// Override the token lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSigner")
            .field("address", &self.address)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl Signer for JwtSigner {
    fn address(&self) -> &str {
        &self.address
    }

    fn authorize_write(&self, request: &WriteRequest) -> Result<String, SignerError> {
        let now = Utc::now().timestamp();
        let claims = WriteClaims {
            exp: now + self.ttl.as_secs() as i64,
            iat: now,
            jti: Uuid::new_v4().to_string(),
            send_object_to: self.address.clone(),
            epochs: request.epochs,
            size: request.size,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| SignerError::Token(e.to_string()))
    }
}
