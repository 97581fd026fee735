use std::path::PathBuf;

use anyhow::anyhow;
use fusion_types::HeaderParseError;
use reqwest::StatusCode;
use thiserror::Error;
use tokio::task::JoinError;
use utils::errors::AuthError;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FusionClientError {
    #[error("API call {api} failed with status {status}: {message}")]
    ApiCall {
        api: &'static str,
        status: StatusCode,
        message: String,
    },

    #[error("File upload error: {0}")]
    FileUpload(String),

    #[error("File download error: {0}")]
    FileDownload(String),

    #[error("Failed to read upload source {}: {source}", display_path(.path))]
    SourceRead {
        path: Option<PathBuf>,
        source: std::io::Error,
    },

    #[error("Failed to write download destination {}: {source}", display_path(.path))]
    DestinationWrite {
        path: Option<PathBuf>,
        source: std::io::Error,
    },

    #[error("Configuration Error: {0}")]
    ConfigurationError(String),

    #[error("Invalid transfer request: {0}")]
    InvalidRequest(String),

    #[error("Illegal transfer state: {0}")]
    IllegalState(String),

    #[error("Credential Error: {0}")]
    Credential(#[from] AuthError),

    #[error("Header Parse Error: {0}")]
    HeaderParse(#[from] HeaderParseError),

    #[error("{cause}; aborting upload operation {operation_id} also failed: {abort_error}")]
    UploadAborted {
        operation_id: String,
        #[source]
        cause: Box<FusionClientError>,
        abort_error: Box<FusionClientError>,
    },

    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Other Internal Error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Parse Error: {0}")]
    ParseError(#[from] url::ParseError),

    #[error("Json Error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("ReqwestMiddleware Error: {0}")]
    ReqwestMiddlewareError(#[from] reqwest_middleware::Error),

    #[error("Reqwest Error: {0}")]
    ReqwestError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, FusionClientError>;

impl FusionClientError {
    /// Builds the error for a non-2xx response; `body` is only consulted for 400 responses, which
    /// carry the server's explanation.
    pub fn api_call(api: &'static str, status: StatusCode, body: &str) -> Self {
        FusionClientError::ApiCall {
            api,
            status,
            message: api_error_message(status, body),
        }
    }

    /// The HTTP status when this error came from a non-2xx response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FusionClientError::ApiCall { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Human-readable explanation of an error status returned by the Fusion API.
pub fn api_error_message(status: StatusCode, body: &str) -> String {
    match status.as_u16() {
        400 => {
            let detail = body.trim();
            if detail.is_empty() {
                "The request was malformed or invalid".to_owned()
            } else {
                detail.to_owned()
            }
        },
        401 => "The session or dataset token is missing or invalid".to_owned(),
        403 => "Not permitted to perform this operation on the requested resource".to_owned(),
        404 => "The requested resource does not exist".to_owned(),
        415 => "Unsupported media type".to_owned(),
        500 => "The server encountered an internal error".to_owned(),
        504 => "The request timed out waiting for the server".to_owned(),
        code => format!("Unexpected response status {code}"),
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => p.display().to_string(),
        None => "<stream>".to_owned(),
    }
}

impl PartialEq for FusionClientError {
    fn eq(&self, other: &FusionClientError) -> bool {
        match (self, other) {
            (FusionClientError::ApiCall { status: a, .. }, FusionClientError::ApiCall { status: b, .. }) => a == b,
            (e1, e2) => std::mem::discriminant(e1) == std::mem::discriminant(e2),
        }
    }
}

impl From<JoinError> for FusionClientError {
    fn from(value: JoinError) -> Self {
        FusionClientError::InternalError(anyhow!("{value:?}"))
    }
}
