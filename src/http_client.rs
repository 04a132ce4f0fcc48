//! The network transport the views use to reach the backend.
//!
//! Views only depend on the [HttpClient] trait. [ReqwestClient] is the
//! implementation used against a real backend and owns the transport details:
//! resolving paths against the base URL, the request timeout, and mapping
//! connection failures to [TransportError].

use async_trait::async_trait;
use reqwest::{
    Client, Method, StatusCode, Url,
    header::{ACCEPT, CONTENT_TYPE},
};
use serde_json::Value;

use crate::{
    Error,
    config::ClientConfig,
    logging::{log_request, log_response},
};

/// The media type the backend uses for structured responses.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A request for one of the backend endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// The HTTP method.
    pub method: Method,
    /// The endpoint path, e.g. "/login".
    pub path: String,
    /// The JSON body, if any.
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Create a GET request for `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    /// Create a POST request for `path` with a JSON body.
    pub fn post_json(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// A response from the backend, fully read into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The value of the content-type header, if present.
    pub content_type: Option<String>,
    /// The response body as text.
    pub body: String,
}

impl HttpResponse {
    /// Create a response without a content type.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    /// Create a response with a JSON body and content type.
    pub fn json(status: StatusCode, body: &Value) -> Self {
        Self::new(status, body.to_string()).with_content_type(JSON_CONTENT_TYPE)
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Whether the content type declares a JSON body.
    ///
    /// Media types are compared case-insensitively and parameters such as
    /// `charset` are allowed.
    pub fn is_json(&self) -> bool {
        self.content_type.as_deref().is_some_and(|content_type| {
            content_type
                .to_ascii_lowercase()
                .contains(JSON_CONTENT_TYPE)
        })
    }
}

/// A failure below the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No response arrived within the configured timeout.
    #[error("the request timed out")]
    Timeout,

    /// The request could not be sent or the connection failed.
    #[error("could not reach the server: {0}")]
    Connection(String),

    /// The response arrived but its body could not be read.
    #[error("could not read the response body: {0}")]
    Body(String),
}

/// Sends requests to the backend.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send `request` and read the full response.
    ///
    /// Non-2xx responses are returned as `Ok`, only failures below the HTTP
    /// layer are errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Send `request` through `client`, logging the request and the response.
pub(crate) async fn dispatch(
    client: &dyn HttpClient,
    request: HttpRequest,
) -> Result<HttpResponse, TransportError> {
    log_request(&request);

    let response = client
        .send(request)
        .await
        .inspect_err(|error| tracing::error!("request failed: {error}"))?;

    log_response(&response);

    Ok(response)
}

/// An [HttpClient] backed by a reqwest client with an explicit timeout.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
    base_url: Url,
}

impl ReqwestClient {
    /// Build a client for the backend described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidConfig] if the underlying client cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|error| {
                Error::InvalidConfig(format!("could not build HTTP client: {error}"))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url().clone(),
        })
    }

    fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|error| TransportError::Connection(format!("invalid path {path}: {error}")))
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.url_for(&request.path)?;

        let mut builder = self
            .client
            .request(request.method, url)
            .header(ACCEPT, JSON_CONTENT_TYPE);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_transport_error)?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await.map_err(map_body_error)?;

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

fn map_transport_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Connection(error.to_string())
    }
}

fn map_body_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Body(error.to_string())
    }
}
