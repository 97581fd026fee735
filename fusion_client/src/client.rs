use std::sync::Arc;

use async_trait::async_trait;
use fusion_config::FusionConfig;
use reqwest_middleware::ClientWithMiddleware;
use utils::auth::AuthConfig;

use crate::digest::DigestProducer;
use crate::download::{DownloadOrchestrator, DownloadStream};
use crate::error::Result;
use crate::http_client::build_auth_http_client;
use crate::interface::TransferClient;
use crate::request::{DownloadRequest, UploadRequest};
use crate::upload::UploadOrchestrator;

/// Transfers distributions over one authenticated HTTP client.
#[derive(Debug, Clone)]
pub struct FusionClient {
    uploads: UploadOrchestrator,
    downloads: DownloadOrchestrator,
}

impl FusionClient {
    /// Fails with a configuration error when the configured digest algorithm is unknown.
    pub fn new(config: FusionConfig, auth_config: &AuthConfig) -> Result<Self> {
        let client = build_auth_http_client(&config, Some(auth_config))?;
        Self::with_http_client(config, client)
    }

    /// Uses an already built HTTP client.  It must attach the security headers itself.
    pub fn with_http_client(config: FusionConfig, client: ClientWithMiddleware) -> Result<Self> {
        let digest = DigestProducer::from_name(&config.transfer.digest_algorithm)?;
        let config = Arc::new(config);
        Ok(Self {
            uploads: UploadOrchestrator::new(client.clone(), digest, config.clone()),
            downloads: DownloadOrchestrator::new(client, config),
        })
    }
}

#[async_trait]
impl TransferClient for FusionClient {
    async fn upload(&self, request: UploadRequest) -> Result<()> {
        self.uploads.upload(request).await
    }

    async fn download_to_file(&self, request: DownloadRequest) -> Result<()> {
        self.downloads.download_to_file(request).await
    }

    async fn download_to_stream(&self, request: DownloadRequest) -> Result<DownloadStream> {
        self.downloads.download_to_stream(request).await
    }
}
