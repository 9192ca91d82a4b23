// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resume Vault - Encrypted Resume Publishing on Walrus
//!
//! This crate seals structured resume documents under per-publish keys and
//! stores them as blobs on the Walrus decentralized storage network. Only the
//! blob id and the key leave the pipeline; holding both is what grants read
//! access.
//!
//! ## Modules
//!
//! - `codec` - Canonical document bytes
//! - `envelope` - AES-256-GCM sealing and key handling
//! - `transport` - Walrus client, upload strategies, single-flight init
//! - `pipeline` - Publish / retrieve orchestration
//! - `api` - HTTP API handlers (Axum)

pub mod api;
pub mod codec;
pub mod config;
pub mod envelope;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod state;
pub mod tls;
pub mod transport;
