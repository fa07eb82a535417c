//! HTTP client for the control plane.
//!
//! Wraps a reusable `reqwest::Client` with the control-plane base URL and
//! the basic-auth credential (workspace token or multi-workspace secret).
//! Every failure is mapped onto [`FetchError`]; the poll drivers only count
//! these, they never branch on the variant.

use std::time::Duration;

use reqwest::header::{HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Upper bound for a single control-plane request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure talking to the control plane or decoding its answer.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Credentials were rejected by the control plane.
    #[error("unauthorized - invalid workspace token or secret")]
    Unauthorized,
    /// Any other non-success status.
    #[error("unexpected response status: {0}")]
    Status(u16),
    /// The configured base URL could not be parsed.
    #[error("invalid control plane url: {0}")]
    InvalidUrl(String),
    /// Transport-level issue (DNS, TLS, socket, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Payload could not be decoded.
    #[error("failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),
    /// A paginated listing returned a cursor that does not advance.
    #[error("pagination cursor did not advance: start {start}, next {next}")]
    Pagination { start: usize, next: usize },
    /// Environment substitution on the raw payload failed.
    #[error("env replacement failed: {0}")]
    Replacement(String),
}

/// Control-plane client authenticating every request with HTTP basic auth.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    username: String,
}

impl BackendClient {
    /// Builds a client for `base_url` authenticating as `username` with an empty password.
    pub fn new(base_url: impl Into<String>, username: impl Into<String>) -> Result<Self, FetchError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|err| FetchError::InvalidUrl(format!("{base_url}: {err}")))?;
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url,
            username: username.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issues a GET request and returns the raw body.
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.send(Method::GET, path, None).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Issues a GET request and decodes the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let body = self.get_bytes(path).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Posts `body` as JSON and returns the raw response body.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Vec<u8>, FetchError> {
        let payload = serde_json::to_vec(body)?;
        let response = self.send(Method::POST, path, Some(payload)).await?;
        let bytes = response.bytes().await?;
        debug!(path, body_len = bytes.len(), "backend-config: post succeeded");
        Ok(bytes.to_vec())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(
            method = %method,
            url = %url,
            body_len = body.as_ref().map(Vec::len).unwrap_or(0),
            "backend-config HTTP request"
        );

        let mut builder = self
            .client
            .request(method.clone(), url.as_str())
            .basic_auth(&self.username, Some(""))
            .header(
                USER_AGENT,
                HeaderValue::from_static(concat!("backend-config/", env!("CARGO_PKG_VERSION"))),
            );
        if let Some(bytes) = body {
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(bytes);
        }
        let response = builder.send().await?;

        let status = response.status();
        debug!(
            method = %method,
            url = %url,
            status = %status,
            "backend-config HTTP response"
        );
        classify_status(status)?;
        Ok(response)
    }
}

/// Maps non-success statuses to [`FetchError`].
fn classify_status(status: StatusCode) -> Result<(), FetchError> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(FetchError::Unauthorized);
    }
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    Ok(())
}
