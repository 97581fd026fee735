use std::sync::Arc;

use bytes::Bytes;
use error_printer::ErrorPrinter;
use fusion_types::headers::DIGEST;
use fusion_types::{Head, UploadedPart};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method};
use reqwest::Response;
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use tracing::{debug, warn};
use url::Url;

use crate::digest::DigestProducer;
use crate::error::{FusionClientError, Result};
use crate::http_client::{Api, DatasetScope, ResponseErrorLogger};
use crate::request::TransferTarget;
use crate::transfer_context::UploadedPartContext;

pub(crate) const UPLOAD_SESSION_PATH: &str = "/operationType/upload";
pub(crate) const UPLOAD_OPERATION_PATH: &str = "/operations/upload";
pub(crate) const DOWNLOAD_PATH: &str = "/operationType/download";

pub(crate) fn octet_stream() -> HeaderValue {
    HeaderValue::from_static("application/octet-stream")
}

pub(crate) fn header_value(value: String) -> Result<HeaderValue> {
    HeaderValue::try_from(value).map_err(|e| FusionClientError::InternalError(e.into()))
}

/// One remote distribution, addressed through an authenticated client.  Every request it builds
/// carries the caller's extra headers, the dataset scope and the API name.
#[derive(Debug, Clone)]
pub(crate) struct TransferEndpoint {
    client: ClientWithMiddleware,
    api_path: Arc<str>,
    scope: DatasetScope,
    caller_headers: HeaderMap,
}

impl TransferEndpoint {
    pub fn new(client: ClientWithMiddleware, target: &TransferTarget) -> Self {
        Self {
            client,
            api_path: target.api_path.trim_end_matches('/').into(),
            scope: DatasetScope::new(&target.catalog, &target.dataset),
            caller_headers: target.caller_headers(),
        }
    }

    pub fn url(&self, suffix: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{suffix}", self.api_path))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// `protocol_headers` replace any caller header of the same name.
    pub fn request(&self, method: Method, url: Url, api: &'static str, protocol_headers: HeaderMap) -> RequestBuilder {
        let mut headers = self.caller_headers.clone();
        headers.extend(protocol_headers);
        self.client
            .request(method, url)
            .headers(headers)
            .with_extension(self.scope.clone())
            .with_extension(Api(api))
    }
}

/// Digests and uploads the parts of one multipart upload session.
#[derive(Debug)]
pub(crate) struct PartPusher {
    endpoint: TransferEndpoint,
    digest: DigestProducer,
    operation_id: String,
}

impl PartPusher {
    pub fn new(endpoint: TransferEndpoint, digest: DigestProducer, operation_id: &str) -> Self {
        Self {
            endpoint,
            digest,
            operation_id: operation_id.to_owned(),
        }
    }

    pub async fn push(&self, part_no: u32, chunk: Bytes) -> Result<UploadedPartContext> {
        let descriptor = self.digest.execute(chunk);
        let part_number = part_no.to_string();
        let url = self.endpoint.url(
            UPLOAD_OPERATION_PATH,
            &[("operationId", self.operation_id.as_str()), ("partNumber", part_number.as_str())],
        )?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, octet_stream());
        headers.insert(DIGEST, header_value(self.digest.header_value(&descriptor.checksum))?);

        debug!(part_no, size = descriptor.size, "uploading part");
        let response = self
            .endpoint
            .request(Method::PUT, url, "upload_part", headers)
            .body(descriptor.content)
            .send()
            .await
            .process_error("upload_part")
            .await?;

        let part: UploadedPart = response.json().await.log_error("error json decoding upload_part response")?;
        if part.part_number != part_no {
            warn!(part_no, acknowledged = part.part_number, "server acknowledged a different part number");
        }
        debug!(part_no, part_identifier = %part.part_identifier, "part uploaded");

        Ok(UploadedPartContext {
            part_no,
            digest: descriptor.raw_checksum,
            part,
        })
    }
}

/// One part of a multipart download.
#[derive(Debug)]
pub(crate) struct FetchedPart {
    pub part_no: u32,
    pub head: Head,
    pub data: Bytes,
}

/// Retrieves distribution metadata and content.
#[derive(Debug, Clone)]
pub(crate) struct PartFetcher {
    endpoint: TransferEndpoint,
}

impl PartFetcher {
    pub fn new(endpoint: TransferEndpoint) -> Self {
        Self { endpoint }
    }

    async fn get(&self, part_no: Option<u32>, api: &'static str) -> Result<Response> {
        let part_number = part_no.map(|n| n.to_string());
        let query: Vec<(&str, &str)> = part_number.iter().map(|n| ("downloadPartNumber", n.as_str())).collect();
        let url = self.endpoint.url(DOWNLOAD_PATH, &query)?;

        self.endpoint
            .request(Method::GET, url, api, HeaderMap::new())
            .send()
            .await
            .process_error(api)
            .await
    }

    /// Reads the distribution's metadata.  The body is dropped unread.
    pub async fn probe(&self) -> Result<Head> {
        let response = self.get(None, "probe_download").await?;
        let head = Head::from_headers(response.headers())?;
        debug!(?head, "probed distribution");
        Ok(head)
    }

    /// The whole content of a single-part distribution, as an unread response.
    pub async fn fetch(&self) -> Result<Response> {
        self.get(None, "download").await
    }

    pub async fn fetch_part(&self, part_no: u32) -> Result<FetchedPart> {
        let response = self.get(Some(part_no), "download_part").await?;
        let head = Head::from_headers(response.headers())?;
        let data = response.bytes().await?;
        debug!(part_no, size = data.len(), "fetched part");
        Ok(FetchedPart { part_no, head, data })
    }
}
