#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use fusion_client::{distribution_api_path, FusionClient};
use fusion_config::FusionConfig;
use sha2::{Digest, Sha256};
use utils::auth::{AuthConfig, DatasetTokenProvider, SessionTokenProvider};
use utils::errors::AuthError;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const CATALOG: &str = "common";
pub const DATASET: &str = "fx_rates";
pub const SESSION_TOKEN: &str = "session-token";

/// The dataset token handed out for the test catalog and dataset.
pub fn dataset_token() -> String {
    format!("{CATALOG}.{DATASET}")
}

/// Hands out a fixed session token and a token naming the dataset scope it was asked for.
#[derive(Debug)]
pub struct ScopedTokens;

#[async_trait]
impl SessionTokenProvider for ScopedTokens {
    async fn session_bearer_token(&self) -> Result<String, AuthError> {
        Ok(SESSION_TOKEN.to_owned())
    }
}

#[async_trait]
impl DatasetTokenProvider for ScopedTokens {
    async fn dataset_bearer_token(&self, catalog: &str, dataset: &str) -> Result<String, AuthError> {
        Ok(format!("{catalog}.{dataset}"))
    }
}

pub fn config() -> FusionConfig {
    let mut config = FusionConfig::default();
    config.transfer.upload_thread_pool_size = Some(4);
    config.transfer.download_thread_pool_size = Some(4);
    config
}

pub fn client(config: FusionConfig) -> FusionClient {
    let tokens = Arc::new(ScopedTokens);
    FusionClient::new(config, &AuthConfig::new(tokens.clone(), tokens)).unwrap()
}

pub fn api_path(server: &MockServer) -> String {
    distribution_api_path(&server.uri(), CATALOG, DATASET, "20240102", "csv")
}

/// The path component of `api_path`, for path matchers.
pub fn resource_path() -> String {
    format!("/catalogs/{CATALOG}/datasets/{DATASET}/datasetseries/20240102/distributions/csv")
}

pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

pub fn sha256_b64(data: &[u8]) -> String {
    BASE64.encode(Sha256::digest(data))
}

/// The `Digest` header expected on the complete call for parts of `part_size` bytes.
pub fn digest_of_digests(data: &[u8], part_size: usize) -> String {
    let concatenated: Vec<u8> = data.chunks(part_size).flat_map(|c| Sha256::digest(c).to_vec()).collect();
    format!("SHA-256={}", sha256_b64(&concatenated))
}

fn query(request: &Request) -> HashMap<String, String> {
    request.url.query_pairs().into_owned().collect()
}

#[derive(Default)]
struct State {
    stored: Option<Vec<u8>>,
    sessions: HashMap<String, BTreeMap<u32, Vec<u8>>>,
    next_operation: u32,
    completes: Vec<String>,
    aborts: Vec<String>,
}

/// An in-memory implementation of the distribution transfer protocol.
///
/// Uploads (single or multipart) land in one stored blob, which downloads serve back split into
/// parts of `download_part_size` bytes.  Faults and delays are keyed by part number and apply to
/// both part uploads and part downloads.
#[derive(Clone)]
pub struct DistributionServer {
    state: Arc<Mutex<State>>,
    download_part_size: usize,
    delays: HashMap<u32, Duration>,
    failing_parts: HashSet<u32>,
    misaligned_parts: HashSet<u32>,
    fail_complete: bool,
    fail_abort: bool,
    advertised_checksum: Option<String>,
}

impl DistributionServer {
    pub fn new(download_part_size: usize) -> Self {
        Self {
            state: Default::default(),
            download_part_size,
            delays: HashMap::new(),
            failing_parts: HashSet::new(),
            misaligned_parts: HashSet::new(),
            fail_complete: false,
            fail_abort: false,
            advertised_checksum: None,
        }
    }

    pub fn with_content(self, content: &[u8]) -> Self {
        self.state.lock().unwrap().stored = Some(content.to_vec());
        self
    }

    pub fn with_delay(mut self, part_no: u32, delay: Duration) -> Self {
        self.delays.insert(part_no, delay);
        self
    }

    pub fn with_failing_part(mut self, part_no: u32) -> Self {
        self.failing_parts.insert(part_no);
        self
    }

    /// Serves this part with a Content-Range shifted one byte past where it belongs.
    pub fn with_misaligned_part(mut self, part_no: u32) -> Self {
        self.misaligned_parts.insert(part_no);
        self
    }

    pub fn with_failing_complete(mut self) -> Self {
        self.fail_complete = true;
        self
    }

    pub fn with_failing_abort(mut self) -> Self {
        self.fail_abort = true;
        self
    }

    pub fn with_advertised_checksum(mut self, checksum: &str) -> Self {
        self.advertised_checksum = Some(checksum.to_owned());
        self
    }

    pub async fn start(self) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(any()).respond_with(self).mount(&server).await;
        server
    }

    pub fn stored(&self) -> Option<Vec<u8>> {
        self.state.lock().unwrap().stored.clone()
    }

    pub fn completes(&self) -> Vec<String> {
        self.state.lock().unwrap().completes.clone()
    }

    pub fn aborts(&self) -> Vec<String> {
        self.state.lock().unwrap().aborts.clone()
    }

    fn delayed(&self, part_no: u32, response: ResponseTemplate) -> ResponseTemplate {
        match self.delays.get(&part_no) {
            Some(delay) => response.set_delay(*delay),
            None => response,
        }
    }

    fn upload_part(&self, state: &mut State, request: &Request, query: &HashMap<String, String>) -> ResponseTemplate {
        let (Some(operation_id), Some(part_no)) = (
            query.get("operationId"),
            query.get("partNumber").and_then(|n| n.parse::<u32>().ok()),
        ) else {
            return ResponseTemplate::new(400).set_body_string("operationId and partNumber are required");
        };
        if self.failing_parts.contains(&part_no) {
            return self.delayed(part_no, ResponseTemplate::new(500));
        }
        let Some(session) = state.sessions.get_mut(operation_id) else {
            return ResponseTemplate::new(404);
        };

        let checksum = sha256_b64(&request.body);
        let expected_digest = format!("SHA-256={checksum}");
        if request.headers.get("digest").and_then(|v| v.to_str().ok()) != Some(expected_digest.as_str()) {
            return ResponseTemplate::new(400).set_body_string("part digest does not match its content");
        }

        session.insert(part_no, request.body.clone());
        let ack = serde_json::json!({
            "partNumber": part_no,
            "partIdentifier": format!("etag-{operation_id}-{part_no}"),
            "partChecksum": checksum,
        });
        self.delayed(part_no, ResponseTemplate::new(200).set_body_json(ack))
    }

    fn complete(&self, state: &mut State, request: &Request, operation_id: &str) -> ResponseTemplate {
        if self.fail_complete {
            return ResponseTemplate::new(500);
        }
        let Some(session) = state.sessions.remove(operation_id) else {
            return ResponseTemplate::new(404);
        };

        let body: serde_json::Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400).set_body_string("complete body is not JSON"),
        };
        let listed: Vec<u64> = body["parts"]
            .as_array()
            .map(|parts| parts.iter().filter_map(|p| p["partNumber"].as_u64()).collect())
            .unwrap_or_default();
        let uploaded: Vec<u64> = session.keys().map(|n| *n as u64).collect();
        if listed != uploaded {
            return ResponseTemplate::new(400).set_body_string("parts are not listed in order");
        }

        let concatenated: Vec<u8> = session.values().flat_map(|p| Sha256::digest(p).to_vec()).collect();
        let expected_digest = format!("SHA-256={}", sha256_b64(&concatenated));
        if request.headers.get("digest").and_then(|v| v.to_str().ok()) != Some(expected_digest.as_str()) {
            return ResponseTemplate::new(400).set_body_string("digest of digests does not match");
        }

        state.stored = Some(session.into_values().flatten().collect());
        state.completes.push(operation_id.to_owned());
        ResponseTemplate::new(200)
    }

    fn download(&self, state: &State, part_no: Option<u32>) -> ResponseTemplate {
        let Some(content) = state.stored.as_ref() else {
            return ResponseTemplate::new(404);
        };
        let total = content.len();
        let part_size = self.download_part_size.max(1);
        let parts = total.div_ceil(part_size).max(1);

        let Some(part_no) = part_no else {
            let mut response = ResponseTemplate::new(200).set_body_bytes(content.clone());
            if parts > 1 {
                response = response.insert_header("x-jpmc-mp-parts-count", parts.to_string().as_str());
            } else {
                let checksum = self.advertised_checksum.clone().unwrap_or_else(|| sha256_b64(content));
                response = response.insert_header("x-jpmc-checksum-sha256", checksum.as_str());
            }
            return response.insert_header("x-jpmc-version-id", "v1");
        };

        if self.failing_parts.contains(&part_no) {
            return self.delayed(part_no, ResponseTemplate::new(500));
        }
        let index = part_no as usize - 1;
        if part_no == 0 || index >= parts {
            return ResponseTemplate::new(404);
        }

        let start = index * part_size;
        let end = (start + part_size).min(total);
        let shift = usize::from(self.misaligned_parts.contains(&part_no));
        let range = format!("bytes {}-{}/{total}", start + shift, end - 1 + shift);
        self.delayed(
            part_no,
            ResponseTemplate::new(200)
                .set_body_bytes(content[start..end].to_vec())
                .insert_header("content-range", range.as_str()),
        )
    }
}

impl Respond for DistributionServer {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let path = request.url.path().to_owned();
        let query = query(request);
        let mut state = self.state.lock().unwrap();

        match request.method.as_str() {
            "POST" if path.ends_with("/operationType/upload") => {
                state.next_operation += 1;
                let operation_id = format!("op-{}", state.next_operation);
                state.sessions.insert(operation_id.clone(), BTreeMap::new());
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "operationId": operation_id }))
            },
            "PUT" if path.ends_with("/operations/upload") => self.upload_part(&mut state, request, &query),
            "POST" if path.ends_with("/operations/upload") => match query.get("operationId") {
                Some(operation_id) => self.complete(&mut state, request, operation_id),
                None => ResponseTemplate::new(400),
            },
            "DELETE" if path.ends_with("/operations/upload") => {
                let Some(operation_id) = query.get("operationId") else {
                    return ResponseTemplate::new(400);
                };
                state.aborts.push(operation_id.clone());
                if self.fail_abort {
                    return ResponseTemplate::new(503);
                }
                state.sessions.remove(operation_id);
                ResponseTemplate::new(200)
            },
            "GET" if path.ends_with("/operationType/download") => {
                let part_no = query.get("downloadPartNumber").and_then(|n| n.parse().ok());
                self.download(&state, part_no)
            },
            "PUT" if path == resource_path() => {
                let expected_digest = format!("SHA-256={}", sha256_b64(&request.body));
                if request.headers.get("digest").and_then(|v| v.to_str().ok()) != Some(expected_digest.as_str()) {
                    return ResponseTemplate::new(400).set_body_string("digest does not match the content");
                }
                state.stored = Some(request.body.clone());
                ResponseTemplate::new(200)
            },
            _ => ResponseTemplate::new(404),
        }
    }
}

/// Method and path (with query) of every request the server received, in arrival order.
pub async fn request_log(server: &MockServer) -> Vec<(String, String)> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|r| {
            let target = match r.url.query() {
                Some(q) => format!("{}?{q}", r.url.path()),
                None => r.url.path().to_owned(),
            };
            (r.method.to_string(), target)
        })
        .collect()
}
