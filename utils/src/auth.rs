use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::AuthError;

/// Provides the bearer token that authorizes the caller against the Fusion API in general.
///
/// Token acquisition and refresh are the provider's concern; the transfer engine asks for a
/// token on every request and never caches it.
#[async_trait]
pub trait SessionTokenProvider: Debug + Send + Sync {
    async fn session_bearer_token(&self) -> Result<String, AuthError>;
}

/// Provides a bearer token scoped to a single catalog and dataset pairing.
#[async_trait]
pub trait DatasetTokenProvider: Debug + Send + Sync {
    async fn dataset_bearer_token(&self, catalog: &str, dataset: &str) -> Result<String, AuthError>;
}

/// A provider that hands out a fixed token, for both the session and every dataset.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl SessionTokenProvider for StaticTokenProvider {
    async fn session_bearer_token(&self) -> Result<String, AuthError> {
        if self.token.is_empty() {
            return Err(AuthError::TokenUnavailable("session token is empty".to_owned()));
        }
        Ok(self.token.clone())
    }
}

#[async_trait]
impl DatasetTokenProvider for StaticTokenProvider {
    async fn dataset_bearer_token(&self, catalog: &str, dataset: &str) -> Result<String, AuthError> {
        if self.token.is_empty() {
            return Err(AuthError::TokenUnavailable(format!("no dataset token for {catalog}/{dataset}")));
        }
        Ok(self.token.clone())
    }
}

/// Shared configuration for token-based auth
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub session_tokens: Arc<dyn SessionTokenProvider>,
    pub dataset_tokens: Arc<dyn DatasetTokenProvider>,
}

impl AuthConfig {
    pub fn new(session_tokens: Arc<dyn SessionTokenProvider>, dataset_tokens: Arc<dyn DatasetTokenProvider>) -> Self {
        Self {
            session_tokens,
            dataset_tokens,
        }
    }

    /// Uses the same fixed token for the session and for all datasets.
    pub fn from_static_token(token: impl Into<String>) -> Self {
        let provider = Arc::new(StaticTokenProvider::new(token));
        Self {
            session_tokens: provider.clone(),
            dataset_tokens: provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token_provider() {
        let auth = AuthConfig::from_static_token("abc");
        assert_eq!(auth.session_tokens.session_bearer_token().await.unwrap(), "abc");
        assert_eq!(auth.dataset_tokens.dataset_bearer_token("common", "fx").await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_empty_static_token_is_an_error() {
        let provider = StaticTokenProvider::new("");
        let err = provider.dataset_bearer_token("common", "fx").await.unwrap_err();
        assert!(err.to_string().contains("common/fx"));
        assert!(provider.session_bearer_token().await.is_err());
    }
}
