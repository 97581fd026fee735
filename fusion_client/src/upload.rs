use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use error_printer::ErrorPrinter;
use fusion_config::FusionConfig;
use fusion_types::headers::DIGEST;
use fusion_types::{CompleteUploadRequest, Operation};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method};
use reqwest_middleware::ClientWithMiddleware;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::chunker::{part_count, ChunkReader};
use crate::digest::DigestProducer;
use crate::error::{FusionClientError, Result};
use crate::http_client::ResponseErrorLogger;
use crate::part_io::{
    header_value, octet_stream, PartPusher, TransferEndpoint, UPLOAD_OPERATION_PATH, UPLOAD_SESSION_PATH,
};
use crate::request::{DistributionDates, UploadRequest, UploadSource};
use crate::transfer_context::{TransferContext, UploadedPartContext};

/// Drives uploads: a single PUT for small payloads, a multipart session for everything else.
#[derive(Debug, Clone)]
pub struct UploadOrchestrator {
    client: ClientWithMiddleware,
    digest: DigestProducer,
    config: Arc<FusionConfig>,
}

/// Parameters of one upload after request overrides and configuration are merged.
struct UploadPlan {
    endpoint: TransferEndpoint,
    dates: DistributionDates,
    source_path: Option<PathBuf>,
    part_size: u64,
    single_part_limit: u64,
    concurrency: usize,
}

impl UploadOrchestrator {
    pub fn new(client: ClientWithMiddleware, digest: DigestProducer, config: Arc<FusionConfig>) -> Self {
        Self { client, digest, config }
    }

    #[instrument(skip_all, fields(api_path = %request.api_path()))]
    pub async fn upload(&self, request: UploadRequest) -> Result<()> {
        request.validate()?;

        let part_size = request
            .part_size_bytes()
            .unwrap_or_else(|| self.config.transfer.upload_part_size.as_u64());
        let single_part_limit = request
            .single_part_size_limit_bytes()
            .unwrap_or_else(|| self.config.transfer.single_part_upload_size_limit.as_u64());
        if part_size == 0 {
            return Err(FusionClientError::ConfigurationError("upload part size must be greater than zero".to_owned()));
        }

        let (target, source, dates) = request.into_parts();
        let mut plan = UploadPlan {
            endpoint: TransferEndpoint::new(self.client.clone(), &target),
            dates,
            source_path: None,
            part_size,
            single_part_limit,
            concurrency: self.config.upload_concurrency(),
        };

        match source {
            UploadSource::File(path) => {
                let read_error = |source| FusionClientError::SourceRead {
                    path: Some(path.clone()),
                    source,
                };
                let file = tokio::fs::File::open(&path).await.map_err(read_error)?;
                let length = file.metadata().await.map_err(read_error)?.len();
                plan.source_path = Some(path.clone());

                info!(path = %path.display(), length, "starting upload");
                if length <= plan.single_part_limit {
                    let mut content = Vec::with_capacity(length as usize);
                    let mut file = file;
                    file.read_to_end(&mut content).await.map_err(read_error)?;
                    self.upload_single_part(&plan, content.into()).await
                } else {
                    self.upload_multipart(&plan, file, Some(length)).await
                }
            },
            UploadSource::Stream(mut reader) => {
                let mut prefix = Vec::new();
                (&mut reader)
                    .take(plan.single_part_limit.saturating_add(1))
                    .read_to_end(&mut prefix)
                    .await
                    .map_err(|source| FusionClientError::SourceRead { path: None, source })?;

                info!(buffered = prefix.len(), "starting stream upload");
                if prefix.len() as u64 <= plan.single_part_limit {
                    self.upload_single_part(&plan, prefix.into()).await
                } else {
                    self.upload_multipart(&plan, Cursor::new(prefix).chain(reader), None).await
                }
            },
        }
    }

    async fn upload_single_part(&self, plan: &UploadPlan, content: Bytes) -> Result<()> {
        let descriptor = self.digest.execute(content);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, octet_stream());
        headers.insert(CONTENT_LENGTH, HeaderValue::from(descriptor.size));
        headers.insert(DIGEST, header_value(self.digest.header_value(&descriptor.checksum))?);
        plan.dates.apply(&mut headers);

        let url = plan.endpoint.url("", &[])?;
        plan.endpoint
            .request(Method::PUT, url, "single_part_upload", headers)
            .body(descriptor.content)
            .send()
            .await
            .process_error("single_part_upload")
            .await?;

        info!(size = descriptor.size, "single-part upload finished");
        Ok(())
    }

    async fn upload_multipart<R>(&self, plan: &UploadPlan, reader: R, length: Option<u64>) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let operation = self.initiate(plan).await?;
        let mut context = TransferContext::started(operation.clone());
        info!(
            operation_id = %operation.operation_id,
            expected_parts = length.map(|l| part_count(l, plan.part_size)),
            "multipart upload initiated"
        );

        let outcome = match self.transfer_parts(plan, &mut context, reader).await {
            Ok(()) => self.complete(plan, &mut context).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                info!(
                    operation_id = %operation.operation_id,
                    parts = context.total_parts_count(),
                    bytes = context.total_bytes_transferred(),
                    "multipart upload finished"
                );
                Ok(())
            },
            Err(cause) => Err(self.abort(plan, &mut context, &operation, cause).await),
        }
    }

    async fn initiate(&self, plan: &UploadPlan) -> Result<Operation> {
        let url = plan.endpoint.url(UPLOAD_SESSION_PATH, &[])?;
        let response = plan
            .endpoint
            .request(Method::POST, url, "initiate_upload", HeaderMap::new())
            .send()
            .await
            .process_error("initiate_upload")
            .await?;

        let operation: Operation = response
            .json()
            .await
            .log_error("error json decoding initiate_upload response")?;
        if operation.operation_id.is_empty() {
            return Err(FusionClientError::FileUpload("initiate returned an empty operation id".to_owned()));
        }
        Ok(operation)
    }

    /// Reads parts and uploads them through a bounded pool.  On the first failure no further
    /// parts are read; parts already in flight run to completion before the failure is returned.
    async fn transfer_parts<R>(&self, plan: &UploadPlan, context: &mut TransferContext, reader: R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        if !context.can_proceed_to_transfer() {
            return Err(FusionClientError::IllegalState(format!(
                "cannot transfer parts of an upload in state {}",
                context.status()
            )));
        }
        let operation_id = context
            .operation()
            .map(|op| op.operation_id.clone())
            .ok_or_else(|| FusionClientError::IllegalState("upload has no operation".to_owned()))?;

        let pusher = Arc::new(PartPusher::new(plan.endpoint.clone(), self.digest, &operation_id));
        let mut chunks = ChunkReader::new(reader, plan.part_size);
        let mut in_flight: JoinSet<Result<UploadedPartContext>> = JoinSet::new();
        let mut total_bytes = 0u64;
        let mut exhausted = false;
        let mut failure: Option<FusionClientError> = None;

        loop {
            while !exhausted && failure.is_none() && in_flight.len() < plan.concurrency {
                match chunks.next_chunk().await {
                    Ok(Some((part_no, chunk))) => {
                        total_bytes += chunk.len() as u64;
                        let pusher = pusher.clone();
                        in_flight.spawn(async move { pusher.push(part_no, chunk).await });
                    },
                    Ok(None) => exhausted = true,
                    Err(source) => {
                        failure = Some(FusionClientError::SourceRead {
                            path: plan.source_path.clone(),
                            source,
                        })
                    },
                }
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            match joined.map_err(FusionClientError::from).and_then(|r| r) {
                Ok(part) => {
                    debug!(part_no = part.part_no, "recording uploaded part");
                    if let Err(e) = context.part_uploaded(part) {
                        failure.get_or_insert(e);
                    }
                },
                Err(e) => {
                    warn!(%operation_id, "part upload failed: {e}");
                    failure.get_or_insert(e);
                },
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }
        context.transferred(plan.part_size, total_bytes, chunks.parts_read())
    }

    async fn complete(&self, plan: &UploadPlan, context: &mut TransferContext) -> Result<()> {
        if !context.can_proceed_to_complete() {
            return Err(FusionClientError::IllegalState(format!(
                "cannot complete an upload in state {} with {} parts",
                context.status(),
                context.parts().len()
            )));
        }
        let Some(operation_id) = context.operation().map(|op| op.operation_id.clone()) else {
            return Err(FusionClientError::IllegalState("upload has no operation".to_owned()));
        };

        let digest_of_digests = self.digest.execute(context.digests().into());
        let body = serde_json::to_vec(&CompleteUploadRequest {
            parts: context.sorted_parts(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(DIGEST, header_value(self.digest.header_value(&digest_of_digests.checksum))?);
        plan.dates.apply(&mut headers);

        let url = plan.endpoint.url(UPLOAD_OPERATION_PATH, &[("operationId", operation_id.as_str())])?;
        plan.endpoint
            .request(Method::POST, url, "complete_upload", headers)
            .body(body)
            .send()
            .await
            .process_error("complete_upload")
            .await?;

        context.completed()
    }

    /// Cancels the remote session and returns the error the caller should see.
    async fn abort(
        &self,
        plan: &UploadPlan,
        context: &mut TransferContext,
        operation: &Operation,
        cause: FusionClientError,
    ) -> FusionClientError {
        warn!(operation_id = %operation.operation_id, "aborting multipart upload: {cause}");

        let result = match plan
            .endpoint
            .url(UPLOAD_OPERATION_PATH, &[("operationId", operation.operation_id.as_str())])
        {
            Ok(url) => plan
                .endpoint
                .request(Method::DELETE, url, "abort_upload", HeaderMap::new())
                .send()
                .await
                .process_error("abort_upload")
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        };

        if let Err(e) = context.aborted() {
            warn!(operation_id = %operation.operation_id, "{e}");
        }

        match result {
            Ok(()) => {
                info!(operation_id = %operation.operation_id, "multipart upload aborted");
                cause
            },
            Err(abort_error) => {
                error!(operation_id = %operation.operation_id, "abort of multipart upload failed: {abort_error}");
                FusionClientError::UploadAborted {
                    operation_id: operation.operation_id.clone(),
                    cause: Box::new(cause),
                    abort_error: Box::new(abort_error),
                }
            },
        }
    }
}
