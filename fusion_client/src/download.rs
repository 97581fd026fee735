use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use fusion_config::FusionConfig;
use fusion_types::Head;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use reqwest_middleware::ClientWithMiddleware;
use tokio_util::io::StreamReader;
use tracing::{debug, info, instrument, warn, Instrument};

use crate::digest::{DigestAlgorithm, DigestWriter};
use crate::error::{FusionClientError, Result};
use crate::output_provider::{FileOutput, SequentialOutput};
use crate::part_io::{FetchedPart, PartFetcher, TransferEndpoint};
use crate::request::DownloadRequest;

/// The content of a distribution, delivered in order.  A failure while the stream is being
/// consumed arrives as its final `Err` item.
pub struct DownloadStream {
    head: Head,
    inner: BoxStream<'static, io::Result<Bytes>>,
}

impl DownloadStream {
    /// Metadata of the distribution being streamed.
    pub fn head(&self) -> &Head {
        &self.head
    }

    pub fn into_reader(self) -> StreamReader<DownloadStream, Bytes> {
        StreamReader::new(self)
    }
}

impl Stream for DownloadStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

/// Checks that parts arrive contiguous and add up to the advertised length.
struct PartAssembler {
    offset: u64,
    expected_total: Option<u64>,
}

impl PartAssembler {
    fn new(expected_total: Option<u64>) -> Self {
        Self {
            offset: 0,
            expected_total,
        }
    }

    fn accept(&mut self, part: &FetchedPart) -> Result<()> {
        let Some(range) = part.head.content_range else {
            return Err(FusionClientError::FileDownload(format!(
                "content range mismatch: part {} has no Content-Range",
                part.part_no
            )));
        };

        let len = part.data.len() as u64;
        let total_conflicts = matches!((range.total, self.expected_total), (Some(t), Some(e)) if t != e);
        if range.is_empty() || range.start != self.offset || range.len() != len || total_conflicts {
            return Err(FusionClientError::FileDownload(format!(
                "content range mismatch: part {} covers {range} with {len} bytes, expected offset {}",
                part.part_no, self.offset
            )));
        }

        self.offset += len;
        Ok(())
    }

    fn finish(self) -> Result<u64> {
        match self.expected_total {
            Some(total) if total != self.offset => Err(FusionClientError::FileDownload(format!(
                "downloaded {} bytes but the distribution is {total} bytes",
                self.offset
            ))),
            _ => Ok(self.offset),
        }
    }
}

/// Fetches parts `1..=part_count` with bounded concurrency and writes them to `output` in part
/// order.  Parts that finish early wait in the buffer until their predecessors are written.
async fn write_parts(
    fetcher: PartFetcher,
    head: &Head,
    concurrency: usize,
    output: &mut SequentialOutput,
) -> Result<u64> {
    let mut assembler = PartAssembler::new(head.content_length);
    let mut parts = futures::stream::iter(1..=head.part_count)
        .map(|part_no| {
            let fetcher = fetcher.clone();
            async move { fetcher.fetch_part(part_no).await }
        })
        .buffered(concurrency);

    while let Some(part) = parts.next().await {
        let part = part?;
        assembler.accept(&part)?;
        output.write(part.data).await?;
    }
    assembler.finish()
}

/// Drives downloads: a probe for the distribution's metadata, then either a single streamed GET
/// or an ordered multipart fetch.
#[derive(Debug, Clone)]
pub struct DownloadOrchestrator {
    client: ClientWithMiddleware,
    config: Arc<FusionConfig>,
}

impl DownloadOrchestrator {
    pub fn new(client: ClientWithMiddleware, config: Arc<FusionConfig>) -> Self {
        Self { client, config }
    }

    fn concurrency(&self, request: &DownloadRequest) -> usize {
        request
            .thread_pool_size()
            .unwrap_or_else(|| self.config.download_concurrency())
            .max(1)
    }

    async fn probe(&self, request: &DownloadRequest) -> Result<(PartFetcher, Head)> {
        request.validate()?;
        let fetcher = PartFetcher::new(TransferEndpoint::new(self.client.clone(), &request.target()));
        let head = fetcher.probe().await?;
        Ok((fetcher, head))
    }

    #[instrument(skip_all, fields(api_path = %request.api_path()))]
    pub async fn download_to_file(&self, request: DownloadRequest) -> Result<()> {
        let Some(destination) = request.destination().map(|d| d.to_path_buf()) else {
            return Err(FusionClientError::InvalidRequest("a file download needs a destination path".to_owned()));
        };
        let (fetcher, head) = self.probe(&request).await?;
        info!(destination = %destination.display(), parts = head.part_count, "starting download");

        let mut output = SequentialOutput::File(FileOutput::create(&destination).await?);
        let result = if head.is_multipart() {
            write_parts(fetcher, &head, self.concurrency(&request), &mut output).await.map(|_| ())
        } else {
            self.write_single_part(&fetcher, &head, &mut output).await
        };
        let finished = output.finish().await;

        result?;
        let bytes = finished?;
        info!(bytes, "download finished");
        Ok(())
    }

    async fn write_single_part(&self, fetcher: &PartFetcher, head: &Head, output: &mut SequentialOutput) -> Result<()> {
        // The server advertises a SHA-256 checksum whatever algorithm the client uploads with.
        let algorithm = DigestAlgorithm::Sha256;
        let expected = head
            .checksum
            .as_deref()
            .filter(|_| self.config.transfer.verify_download_checksum)
            .filter(|checksum| {
                let plain = algorithm.is_plain_checksum(checksum);
                if !plain {
                    debug!(%checksum, "advertised checksum is composite, skipping verification");
                }
                plain
            });
        let mut hasher = expected.map(|_| DigestWriter::new(algorithm));

        let mut response = fetcher.fetch().await?;
        while let Some(chunk) = response.chunk().await? {
            if let Some(hasher) = hasher.as_mut() {
                hasher.update(&chunk);
            }
            output.write(chunk).await?;
        }

        if let (Some(expected), Some(hasher)) = (expected, hasher) {
            let (actual, _) = hasher.finish();
            if actual != expected {
                return Err(FusionClientError::FileDownload(format!(
                    "checksum mismatch: server advertised {expected}, downloaded content hashes to {actual}"
                )));
            }
            debug!(checksum = %actual, "download checksum verified");
        }
        Ok(())
    }

    #[instrument(skip_all, fields(api_path = %request.api_path()))]
    pub async fn download_to_stream(&self, request: DownloadRequest) -> Result<DownloadStream> {
        let (fetcher, head) = self.probe(&request).await?;
        info!(parts = head.part_count, "starting stream download");

        if !head.is_multipart() {
            let response = fetcher.fetch().await?;
            let inner = response.bytes_stream().map(|r| r.map_err(io::Error::other)).boxed();
            return Ok(DownloadStream { head, inner });
        }

        let (sender, stream) = utils::pipe(self.config.transfer.stream_channel_capacity);
        let concurrency = self.concurrency(&request);
        let part_head = head.clone();
        tokio::spawn(
            async move {
                let mut output = SequentialOutput::Channel(sender.clone());
                match write_parts(fetcher, &part_head, concurrency, &mut output).await {
                    Ok(bytes) => info!(bytes, "stream download finished"),
                    Err(e) => {
                        warn!("stream download failed: {e}");
                        let _ = sender.fail(io::Error::other(e)).await;
                    },
                }
            }
            .instrument(tracing::Span::current()),
        );

        Ok(DownloadStream {
            head,
            inner: stream.boxed(),
        })
    }
}
