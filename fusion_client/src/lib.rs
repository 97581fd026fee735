#![cfg_attr(feature = "strict", deny(warnings))]

pub use client::FusionClient;
pub use digest::{DigestAlgorithm, DigestDescriptor, DigestProducer, DigestWriter};
pub use download::{DownloadOrchestrator, DownloadStream};
pub use error::{api_error_message, FusionClientError, Result};
pub use http_client::{build_auth_http_client, Api, AuthMiddleware, DatasetScope, ResponseErrorLogger};
pub use interface::TransferClient;
pub use request::{distribution_api_path, DistributionDates, DownloadRequest, UploadRequest, UploadSource};
pub use transfer_context::{TransferContext, TransferStatus, UploadedPartContext};
pub use upload::UploadOrchestrator;

pub mod chunker;
mod client;
mod digest;
mod download;
mod error;
mod http_client;
mod interface;
mod output_provider;
mod part_io;
mod request;
mod transfer_context;
mod upload;
