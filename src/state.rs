// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{
    ConfigError, ServerConfig, StorageBackend, WalrusConfig, WALRUS_SIGNER_ADDRESS_ENV,
};
use crate::pipeline::DocumentPipeline;
use crate::transport::{
    BlobStore, BlobTransport, JwtSigner, LazyClient, MemoryNetwork, Signer, WalrusClient,
};

/// Pipeline over whichever backend was configured.
pub type ResumePipeline = DocumentPipeline<Arc<dyn BlobStore>>;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ResumePipeline>,
    /// Service signer for signed writes; anonymous publish only when unset.
    pub signer: Option<Arc<dyn Signer>>,
    /// Cancelled on shutdown; in-flight pipeline calls stop at their next
    /// network await.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        pipeline: ResumePipeline,
        signer: Option<Arc<dyn Signer>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            signer,
            shutdown,
        }
    }

    /// Build the pipeline described by `config`.
    ///
    /// The Walrus client is not contacted here; it is constructed on the
    /// first request that needs it.
    pub fn from_config(
        config: &ServerConfig,
        shutdown: CancellationToken,
    ) -> Result<Self, ConfigError> {
        let walrus = config.walrus.clone();
        let store: LazyClient<Arc<dyn BlobStore>> = match config.backend {
            StorageBackend::Walrus => lazy_walrus(walrus.clone()),
            StorageBackend::Memory => {
                LazyClient::ready(Arc::new(MemoryNetwork::new()) as Arc<dyn BlobStore>)
            }
        };
        let transport = BlobTransport::new(store, walrus.epochs, walrus.aggregator_url);

        let signer = match &config.signer {
            Some(signer) => {
                let signer = JwtSigner::new(signer.address.clone(), signer.jwt_secret.as_bytes())
                    .map_err(|e| ConfigError::Invalid {
                        name: WALRUS_SIGNER_ADDRESS_ENV,
                        value: signer.address.clone(),
                        reason: e.to_string(),
                    })?;
                Some(Arc::new(signer) as Arc<dyn Signer>)
            }
            None => None,
        };

        Ok(Self::new(DocumentPipeline::new(transport), signer, shutdown))
    }

    /// State backed by a fresh in-memory network.
    pub fn in_memory(network: Arc<MemoryNetwork>) -> Self {
        let walrus = WalrusConfig::for_network(Default::default());
        let transport = BlobTransport::new(
            LazyClient::ready(network as Arc<dyn BlobStore>),
            walrus.epochs,
            walrus.aggregator_url,
        );
        Self::new(
            DocumentPipeline::new(transport),
            None,
            CancellationToken::new(),
        )
    }

    pub fn signer(&self) -> Option<&dyn Signer> {
        self.signer.as_deref()
    }
}

fn lazy_walrus(config: WalrusConfig) -> LazyClient<Arc<dyn BlobStore>> {
    LazyClient::new(move || {
        let config = config.clone();
        async move {
            let client = WalrusClient::connect(&config).await?;
            Ok(Arc::new(client) as Arc<dyn BlobStore>)
        }
    })
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory(Arc::new(MemoryNetwork::new()))
    }
}
