//! HTTP transport boundary.
//!
//! The rest of the client only sees [`HttpRequest`] and [`HttpResponse`];
//! pooling, TLS and redirects belong to the [`Transport`] implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{redirect, Client, Method, StatusCode};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{CimiError, Result};

/// Maximum number of redirects followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// A fully-built request, ready to be sent.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl HttpRequest {
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// Raw response as returned by the server.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// Sends requests and returns raw responses.
///
/// Implementations must report failures to obtain a response as
/// [`CimiError::Transport`]; any HTTP status, including errors, is a
/// successful transport round-trip.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Default transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Build a transport from client configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed
    /// (for instance when no TLS backend is available).
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(CimiError::Transport)?;

        Ok(Self { http })
    }

    /// Build a transport with default settings and the given timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let config = ClientConfig {
            timeout,
            ..ClientConfig::default()
        };
        Self::new(&config)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip_all, fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .http
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(CimiError::Transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(CimiError::Transport)?;

        tracing::debug!(status = status.as_u16(), bytes = body.len(), "received response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
