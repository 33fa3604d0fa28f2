//! Vigil HTTP API Client
//!
//! Typed client for a remote Vigil service.

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::api::{ErrorBody, HealthStatus, HistoryResponse};
use crate::execution::{RunResult, TargetDefinition};
use crate::store::StoredResult;

/// Errors that can occur when talking to a Vigil service
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Client for a Vigil service's HTTP API
///
/// # Example
/// ```no_run
/// use vigil::client::VigilClient;
/// use vigil::execution::{EndpointSpec, TargetDefinition};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = VigilClient::new("http://localhost:8080")?.with_token("eyJ...");
/// let target = TargetDefinition::new(
///     "https://api.example.com",
///     vec![EndpointSpec::get("/healthz", 200)],
/// );
/// let report = client.run(&target).await?;
/// println!("{}: {}", report.request_id, report.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct VigilClient {
    /// Base URL of the service (e.g., http://localhost:8080)
    base_url: Url,
    client: Client,
    token: Option<String>,
    timeout: Option<Duration>,
}

impl VigilClient {
    pub fn new(api_url: &str) -> ClientResult<Self> {
        Self::with_client(api_url, Client::new())
    }

    /// Create a client with a custom HTTP client
    pub fn with_client(api_url: &str, client: Client) -> ClientResult<Self> {
        let mut base_url = Url::parse(api_url)?;
        // keep any path prefix when joining route paths
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            client,
            token: None,
            timeout: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every `/v0` request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Overall timeout for each call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Submit a target definition and wait for its report
    ///
    /// API: POST /v0/tests/run
    pub async fn run(&self, target: &TargetDefinition) -> ClientResult<RunResult> {
        let url = self.base_url.join("v0/tests/run")?;
        let request = self.authorize(self.client.post(url).json(target));
        decode(request.send().await?).await
    }

    /// Fetch a stored run by request id
    ///
    /// API: GET /v0/tests/results?id=<id>
    pub async fn result(&self, request_id: &str) -> ClientResult<StoredResult> {
        let mut url = self.base_url.join("v0/tests/results")?;
        url.query_pairs_mut().append_pair("id", request_id);
        let request = self.authorize(self.client.get(url));
        decode(request.send().await?).await
    }

    /// Most recent stored runs, newest first
    ///
    /// API: GET /v0/tests/history?limit=<n>
    pub async fn history(&self, limit: usize) -> ClientResult<HistoryResponse> {
        let mut url = self.base_url.join("v0/tests/history")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        let request = self.authorize(self.client.get(url));
        decode(request.send().await?).await
    }

    /// API: GET /healthz
    pub async fn health(&self) -> ClientResult<HealthStatus> {
        let url = self.base_url.join("healthz")?;
        let request = self.with_timeout_opt(self.client.get(url));
        decode(request.send().await?).await
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = self.with_timeout_opt(request);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn with_timeout_opt(&self, request: RequestBuilder) -> RequestBuilder {
        match self.timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }
}

/// Decode a success body, or turn an error response into [`ClientError::Api`]
async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or_else(|_| {
            if text.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                text
            }
        });

    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
