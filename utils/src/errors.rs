use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Token unavailable: {0}")]
    TokenUnavailable(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),
}
