use std::sync::Arc;

use anyhow::anyhow;
use error_printer::OptionPrinter;
use fusion_config::FusionConfig;
use fusion_types::headers::FUSION_AUTHORIZATION;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use tracing::{debug, warn};
use utils::auth::AuthConfig;
use utils::errors::AuthError;

use crate::error::{FusionClientError, Result};

/// Request extension naming the API call, used in logs and error messages.
#[derive(Clone, Copy, Debug)]
pub struct Api(pub &'static str);

/// Request extension naming the catalog and dataset a request operates on.  The auth middleware
/// uses it to obtain the dataset-scoped token.
#[derive(Clone, Debug)]
pub struct DatasetScope {
    catalog: Arc<str>,
    dataset: Arc<str>,
}

impl DatasetScope {
    pub fn new(catalog: &str, dataset: &str) -> Self {
        Self {
            catalog: catalog.into(),
            dataset: dataset.into(),
        }
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }
}

/// builds the client to talk to the Fusion API.
pub fn build_auth_http_client(config: &FusionConfig, auth_config: Option<&AuthConfig>) -> Result<ClientWithMiddleware> {
    let auth_middleware = auth_config.map(AuthMiddleware::from).info_none("Fusion auth disabled");

    let reqwest_client = reqwest::Client::builder()
        .connect_timeout(config.client.connect_timeout)
        .read_timeout(config.client.read_timeout)
        .pool_idle_timeout(config.client.idle_connection_timeout)
        .pool_max_idle_per_host(config.client.max_idle_connections)
        .user_agent(config.client.user_agent.as_str())
        .build()?;

    Ok(ClientBuilder::new(reqwest_client).maybe_with(auth_middleware).build())
}

/// Helper trait to allow the reqwest_middleware client to optionally add a middleware.
trait OptionalMiddleware {
    fn maybe_with<M: Middleware>(self, middleware: Option<M>) -> Self;
}

impl OptionalMiddleware for ClientBuilder {
    fn maybe_with<M: Middleware>(self, middleware: Option<M>) -> Self {
        match middleware {
            Some(m) => self.with(m),
            None => self,
        }
    }
}

/// Adds the session and dataset bearer tokens to every outbound request.
///
/// Tokens are requested from the providers on each call, so refresh stays the providers'
/// concern.  The headers are written after anything the caller supplied and replace any
/// existing value, so a caller header can never override them.
#[derive(Debug)]
pub struct AuthMiddleware {
    config: AuthConfig,
}

impl From<&AuthConfig> for AuthMiddleware {
    fn from(cfg: &AuthConfig) -> Self {
        Self { config: cfg.clone() }
    }
}

fn bearer(token: &str) -> std::result::Result<HeaderValue, AuthError> {
    HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| AuthError::TokenUnavailable("token contains characters not allowed in a header".to_owned()))
}

#[async_trait::async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let scope = extensions
            .get::<DatasetScope>()
            .cloned()
            .ok_or_else(|| reqwest_middleware::Error::Middleware(anyhow!("request is missing its dataset scope")))?;

        let session = self
            .config
            .session_tokens
            .session_bearer_token()
            .await
            .and_then(|t| bearer(&t))
            .map_err(|e| reqwest_middleware::Error::Middleware(e.into()))?;
        let dataset = self
            .config
            .dataset_tokens
            .dataset_bearer_token(scope.catalog(), scope.dataset())
            .await
            .and_then(|t| bearer(&t))
            .map_err(|e| reqwest_middleware::Error::Middleware(e.into()))?;

        let headers = req.headers_mut();
        headers.insert(AUTHORIZATION, session);
        headers.insert(FUSION_AUTHORIZATION, dataset);

        if let Some(Api(api)) = extensions.get::<Api>() {
            debug!(api, method = %req.method(), url = %req.url(), "sending request");
        }
        next.run(req, extensions).await
    }
}

/// Converts a sent request into either a successful response or a [`FusionClientError`],
/// logging failures along the way.
#[async_trait::async_trait]
pub trait ResponseErrorLogger<T> {
    async fn process_error(self, api: &'static str) -> Result<T>;
}

#[async_trait::async_trait]
impl ResponseErrorLogger<Response> for reqwest_middleware::Result<Response> {
    async fn process_error(self, api: &'static str) -> Result<Response> {
        let response = match self {
            Ok(response) => response,
            Err(reqwest_middleware::Error::Middleware(e)) => {
                warn!(api, "request could not be sent: {e:?}");
                return Err(match e.downcast::<AuthError>() {
                    Ok(auth_error) => FusionClientError::Credential(auth_error),
                    Err(e) => FusionClientError::InternalError(e),
                });
            },
            Err(e) => {
                warn!(api, "request failed: {e:?}");
                return Err(e.into());
            },
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().clone();
        let body = response.text().await.unwrap_or_default();
        let err = FusionClientError::api_call(api, status, &body);
        warn!(api, %url, %status, "{err}");
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use utils::auth::{SessionTokenProvider, StaticTokenProvider};
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_tokens_attached_and_not_overridable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer tok"))
            .and(header("fusion-authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = build_auth_http_client(&FusionConfig::default(), Some(&AuthConfig::from_static_token("tok"))).unwrap();
        let response = client
            .get(server.uri())
            .header(AUTHORIZATION, "Bearer forged")
            .header(FUSION_AUTHORIZATION, "Bearer forged")
            .with_extension(DatasetScope::new("common", "ds"))
            .send()
            .await
            .process_error("probe")
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].headers.get_all(AUTHORIZATION).iter().count(), 1);
    }

    #[tokio::test]
    async fn test_missing_scope_is_an_error() {
        let client = build_auth_http_client(&FusionConfig::default(), Some(&AuthConfig::from_static_token("tok"))).unwrap();
        let err = client
            .get("http://127.0.0.1:9/unreachable")
            .send()
            .await
            .process_error("probe")
            .await
            .unwrap_err();
        assert!(matches!(err, FusionClientError::InternalError(_)));
    }

    #[tokio::test]
    async fn test_token_failure_surfaces_as_credential_error() {
        let empty = Arc::new(StaticTokenProvider::new(""));
        assert!(empty.session_bearer_token().await.is_err());

        let auth = AuthConfig::new(empty, Arc::new(StaticTokenProvider::new("tok")));
        let client = build_auth_http_client(&FusionConfig::default(), Some(&auth)).unwrap();
        let err = client
            .get("http://127.0.0.1:9/unreachable")
            .with_extension(DatasetScope::new("common", "ds"))
            .send()
            .await
            .process_error("probe")
            .await
            .unwrap_err();
        assert!(matches!(err, FusionClientError::Credential(AuthError::TokenUnavailable(_))));
    }

    #[tokio::test]
    async fn test_error_status_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("dataset has no such series"))
            .mount(&server)
            .await;

        let client = build_auth_http_client(&FusionConfig::default(), None).unwrap();
        let err = client
            .get(server.uri())
            .send()
            .await
            .process_error("probe")
            .await
            .unwrap_err();
        match err {
            FusionClientError::ApiCall { api, status, message } => {
                assert_eq!(api, "probe");
                assert_eq!(status, 400);
                assert_eq!(message, "dataset has no such series");
            },
            e => panic!("unexpected error {e:?}"),
        }
    }
}
