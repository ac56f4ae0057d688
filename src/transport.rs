//! HTTP transport for the REST endpoints.
//!
//! The executor only needs "send this URL, give me status and body", so the
//! transport is a trait; [`HttpTransport`] is the `reqwest` implementation and
//! tests plug in scripted ones.

use std::future::Future;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use crate::error::{EwizError, EwizResult};

/// HTTP method used by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

/// One request to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Raw octet-stream body, only for uploads.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
        }
    }

    pub fn put(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::Put,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// Status and body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to the server.
///
/// Implementations return `EwizError::Connectivity` when no response was
/// received; any status code, including errors, is a successful call. No
/// implementation retries.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> impl Future<Output = EwizResult<HttpResponse>> + Send;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Transport without a request timeout.
    pub fn new() -> EwizResult<Self> {
        Self::build(reqwest::Client::builder())
    }

    /// Transport that gives up on requests after `timeout`.
    pub fn with_timeout(timeout: Duration) -> EwizResult<Self> {
        Self::build(reqwest::Client::builder().timeout(timeout))
    }

    fn build(builder: reqwest::ClientBuilder) -> EwizResult<Self> {
        let client = builder
            .build()
            .map_err(|e| EwizError::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: HttpRequest) -> EwizResult<HttpResponse> {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Put => self
                .client
                .put(&request.url)
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(request.body.unwrap_or_default()),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| EwizError::Connectivity(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| EwizError::Connectivity(e.without_url().to_string()))?;

        Ok(HttpResponse { status, body })
    }
}
