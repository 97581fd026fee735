use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::pin::Pin;

use chrono::{Local, NaiveDate};
use fusion_types::headers::{
    DIGEST, DISTRIBUTION_CREATED_DATE, DISTRIBUTION_FROM_DATE, DISTRIBUTION_TO_DATE, FUSION_AUTHORIZATION,
};
use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};
use tokio::io::AsyncRead;
use url::Url;

use crate::error::{FusionClientError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Builds the resource URL of one distribution of a dataset series member.
pub fn distribution_api_path(root_url: &str, catalog: &str, dataset: &str, series_member: &str, file_format: &str) -> String {
    format!(
        "{}/catalogs/{catalog}/datasets/{dataset}/datasetseries/{series_member}/distributions/{file_format}",
        root_url.trim_end_matches('/')
    )
}

/// Where the bytes of an upload come from.
pub enum UploadSource {
    File(PathBuf),
    Stream(Pin<Box<dyn AsyncRead + Send>>),
}

impl Debug for UploadSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadSource::File(path) => f.debug_tuple("File").field(path).finish(),
            UploadSource::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// The validity window of the distribution being uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributionDates {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub created_date: NaiveDate,
}

impl Default for DistributionDates {
    fn default() -> Self {
        let today = Local::now().date_naive();
        Self {
            from_date: today,
            to_date: today,
            created_date: today,
        }
    }
}

impl DistributionDates {
    pub(crate) fn apply(&self, headers: &mut HeaderMap) {
        for (name, date) in [
            (DISTRIBUTION_FROM_DATE, self.from_date),
            (DISTRIBUTION_TO_DATE, self.to_date),
            (DISTRIBUTION_CREATED_DATE, self.created_date),
        ] {
            // YYYY-MM-DD is always a valid header value.
            if let Ok(value) = HeaderValue::from_str(&date.format(DATE_FORMAT).to_string()) {
                headers.insert(name, value);
            }
        }
    }
}

/// An upload of one distribution.
#[derive(Debug)]
pub struct UploadRequest {
    api_path: String,
    catalog: String,
    dataset: String,
    source: UploadSource,
    part_size_bytes: Option<u64>,
    single_part_size_limit_bytes: Option<u64>,
    headers: HeaderMap,
    dates: DistributionDates,
}

impl UploadRequest {
    pub fn from_file(api_path: impl Into<String>, catalog: &str, dataset: &str, path: impl AsRef<Path>) -> Self {
        Self::new(api_path.into(), catalog, dataset, UploadSource::File(path.as_ref().to_path_buf()))
    }

    pub fn from_stream(
        api_path: impl Into<String>,
        catalog: &str,
        dataset: &str,
        stream: impl AsyncRead + Send + 'static,
    ) -> Self {
        Self::new(api_path.into(), catalog, dataset, UploadSource::Stream(Box::pin(stream)))
    }

    fn new(api_path: String, catalog: &str, dataset: &str, source: UploadSource) -> Self {
        Self {
            api_path,
            catalog: catalog.to_owned(),
            dataset: dataset.to_owned(),
            source,
            part_size_bytes: None,
            single_part_size_limit_bytes: None,
            headers: HeaderMap::new(),
            dates: DistributionDates::default(),
        }
    }

    /// Overrides the configured multipart part size.
    pub fn with_part_size(mut self, part_size_bytes: u64) -> Self {
        self.part_size_bytes = Some(part_size_bytes);
        self
    }

    /// Overrides the configured single-part upload limit.
    pub fn with_single_part_size_limit(mut self, limit_bytes: u64) -> Self {
        self.single_part_size_limit_bytes = Some(limit_bytes);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_from_date(mut self, date: NaiveDate) -> Self {
        self.dates.from_date = date;
        self
    }

    pub fn with_to_date(mut self, date: NaiveDate) -> Self {
        self.dates.to_date = date;
        self
    }

    pub fn with_created_date(mut self, date: NaiveDate) -> Self {
        self.dates.created_date = date;
        self
    }

    pub fn api_path(&self) -> &str {
        &self.api_path
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn source(&self) -> &UploadSource {
        &self.source
    }

    pub fn part_size_bytes(&self) -> Option<u64> {
        self.part_size_bytes
    }

    pub fn single_part_size_limit_bytes(&self) -> Option<u64> {
        self.single_part_size_limit_bytes
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn dates(&self) -> &DistributionDates {
        &self.dates
    }

    pub fn validate(&self) -> Result<()> {
        validate_target(&self.api_path, &self.catalog, &self.dataset)?;
        if self.part_size_bytes == Some(0) {
            return Err(FusionClientError::InvalidRequest("part size must be greater than zero".to_owned()));
        }
        if let UploadSource::File(path) = &self.source {
            if path.as_os_str().is_empty() {
                return Err(FusionClientError::InvalidRequest("upload source path is empty".to_owned()));
            }
        }
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (TransferTarget, UploadSource, DistributionDates) {
        let target = TransferTarget {
            api_path: self.api_path,
            catalog: self.catalog,
            dataset: self.dataset,
            headers: self.headers,
        };
        (target, self.source, self.dates)
    }
}

/// A download of one distribution, to a file or to a stream.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    api_path: String,
    catalog: String,
    dataset: String,
    destination: Option<PathBuf>,
    headers: HeaderMap,
    thread_pool_size: Option<usize>,
}

impl DownloadRequest {
    pub fn to_file(api_path: impl Into<String>, catalog: &str, dataset: &str, destination: impl AsRef<Path>) -> Self {
        Self {
            destination: Some(destination.as_ref().to_path_buf()),
            ..Self::to_stream(api_path, catalog, dataset)
        }
    }

    pub fn to_stream(api_path: impl Into<String>, catalog: &str, dataset: &str) -> Self {
        Self {
            api_path: api_path.into(),
            catalog: catalog.to_owned(),
            dataset: dataset.to_owned(),
            destination: None,
            headers: HeaderMap::new(),
            thread_pool_size: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Overrides the configured number of parts fetched concurrently.
    pub fn with_thread_pool_size(mut self, thread_pool_size: usize) -> Self {
        self.thread_pool_size = Some(thread_pool_size);
        self
    }

    pub fn api_path(&self) -> &str {
        &self.api_path
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    pub fn thread_pool_size(&self) -> Option<usize> {
        self.thread_pool_size
    }

    pub fn validate(&self) -> Result<()> {
        validate_target(&self.api_path, &self.catalog, &self.dataset)?;
        if self.thread_pool_size == Some(0) {
            return Err(FusionClientError::InvalidRequest("thread pool size must be greater than zero".to_owned()));
        }
        if self.destination.as_ref().is_some_and(|d| d.as_os_str().is_empty()) {
            return Err(FusionClientError::InvalidRequest("download destination path is empty".to_owned()));
        }
        Ok(())
    }

    pub(crate) fn target(&self) -> TransferTarget {
        TransferTarget {
            api_path: self.api_path.clone(),
            catalog: self.catalog.clone(),
            dataset: self.dataset.clone(),
            headers: self.headers.clone(),
        }
    }
}

fn validate_target(api_path: &str, catalog: &str, dataset: &str) -> Result<()> {
    let url = Url::parse(api_path)
        .map_err(|e| FusionClientError::InvalidRequest(format!("api path {api_path:?} is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(FusionClientError::InvalidRequest(format!("api path {api_path:?} is not an http(s) URL")));
    }
    if catalog.is_empty() {
        return Err(FusionClientError::InvalidRequest("catalog must not be empty".to_owned()));
    }
    if dataset.is_empty() {
        return Err(FusionClientError::InvalidRequest("dataset must not be empty".to_owned()));
    }
    Ok(())
}

/// The remote distribution a transfer addresses, with the caller's extra headers.
#[derive(Debug, Clone)]
pub(crate) struct TransferTarget {
    pub api_path: String,
    pub catalog: String,
    pub dataset: String,
    pub headers: HeaderMap,
}

impl TransferTarget {
    /// The caller's headers with every protocol-owned name removed.
    pub fn caller_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        for name in [
            CONTENT_TYPE.as_str(),
            CONTENT_LENGTH.as_str(),
            AUTHORIZATION.as_str(),
            DIGEST,
            FUSION_AUTHORIZATION,
            DISTRIBUTION_FROM_DATE,
            DISTRIBUTION_TO_DATE,
            DISTRIBUTION_CREATED_DATE,
        ] {
            headers.remove(name);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const API: &str = "https://fusion.example.com/api/v1/catalogs/common/datasets/ds/datasetseries/20240101/distributions/csv";

    #[test]
    fn test_distribution_api_path() {
        assert_eq!(distribution_api_path("https://fusion.example.com/api/v1/", "common", "ds", "20240101", "csv"), API);
    }

    #[test]
    fn test_upload_defaults() {
        let request = UploadRequest::from_file(API, "common", "ds", "/tmp/data.csv");
        assert!(request.validate().is_ok());
        assert!(request.part_size_bytes().is_none());

        let today = Local::now().date_naive();
        assert_eq!(request.dates().from_date, today);
        assert_eq!(request.dates().created_date, today);
        assert!(matches!(request.source(), UploadSource::File(p) if p == Path::new("/tmp/data.csv")));
    }

    #[test]
    fn test_invalid_requests() {
        let cases = [
            UploadRequest::from_file("not a url", "common", "ds", "/tmp/x"),
            UploadRequest::from_file("ftp://host/x", "common", "ds", "/tmp/x"),
            UploadRequest::from_file(API, "", "ds", "/tmp/x"),
            UploadRequest::from_file(API, "common", "", "/tmp/x"),
            UploadRequest::from_file(API, "common", "ds", ""),
            UploadRequest::from_stream(API, "common", "ds", tokio::io::empty()).with_part_size(0),
        ];
        for request in cases {
            assert!(matches!(request.validate(), Err(FusionClientError::InvalidRequest(_))), "{request:?}");
        }

        let download = DownloadRequest::to_stream(API, "common", "ds").with_thread_pool_size(0);
        assert!(matches!(download.validate(), Err(FusionClientError::InvalidRequest(_))));
        assert!(DownloadRequest::to_file(API, "common", "ds", "/tmp/out").validate().is_ok());
    }

    #[test]
    fn test_date_headers() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let request = UploadRequest::from_file(API, "common", "ds", "/tmp/x")
            .with_from_date(date)
            .with_to_date(date)
            .with_created_date(date);

        let mut headers = HeaderMap::new();
        request.dates().apply(&mut headers);
        assert_eq!(headers.get(DISTRIBUTION_FROM_DATE).unwrap(), "2024-03-09");
        assert_eq!(headers.get(DISTRIBUTION_TO_DATE).unwrap(), "2024-03-09");
        assert_eq!(headers.get(DISTRIBUTION_CREATED_DATE).unwrap(), "2024-03-09");
    }

    #[test]
    fn test_protocol_headers_stripped_from_caller_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("abc"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.insert(DIGEST, HeaderValue::from_static("SHA-256=forged"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer forged"));

        let request = DownloadRequest::to_stream(API, "common", "ds").with_headers(headers);
        let caller = request.target().caller_headers();
        assert_eq!(caller.len(), 1);
        assert_eq!(caller.get("x-request-id").unwrap(), "abc");
    }
}
