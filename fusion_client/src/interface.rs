use async_trait::async_trait;

use crate::download::DownloadStream;
use crate::error::Result;
use crate::request::{DownloadRequest, UploadRequest};

/// A client that moves distributions to and from the Fusion API.
///
/// Each operation either succeeds in full or returns an error; there is no partial result.
#[async_trait]
pub trait TransferClient {
    /// Uploads the request's source, as a single PUT or as a multipart session depending on its
    /// size.  A multipart session that fails is aborted on the server before this returns.
    async fn upload(&self, request: UploadRequest) -> Result<()>;

    /// Writes the distribution to the request's destination file.
    async fn download_to_file(&self, request: DownloadRequest) -> Result<()>;

    /// Returns the distribution as an ordered byte stream.
    async fn download_to_stream(&self, request: DownloadRequest) -> Result<DownloadStream>;
}
