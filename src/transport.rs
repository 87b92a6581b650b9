//! The HTTP transport boundary.
//!
//! A [`Transport`] sends one fully built request and returns whatever response the
//! server produced, or a [`TransportError`] when no response arrived. It does not retry
//! and does not interpret status codes. [`ReqwestTransport`] is the stock implementation;
//! tests substitute in-memory fakes.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Broad category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The connection could not be established (refused, DNS, TLS).
    Connect,
    /// The request timed out.
    Timeout,
    /// Any other failure before a complete response was read.
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Connect => write!(f, "connect"),
            TransportErrorKind::Timeout => write!(f, "timeout"),
            TransportErrorKind::Other => write!(f, "other"),
        }
    }
}

/// A failure to obtain any response from the server.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    /// Creates an error of `kind` with a description.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// What went wrong.
    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// The underlying error's description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if the exchange timed out.
    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Other
        };
        TransportError::new(kind, err.to_string())
    }
}

/// Sends a request and returns the response, whatever its status.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> Result<http::Response<Vec<u8>>, TransportError>;
}

/// A [`Transport`] backed by a shared `reqwest::Client`.
///
/// # Examples
///
/// ```no_run
/// use courier::transport::ReqwestTransport;
/// use std::time::Duration;
///
/// let transport = ReqwestTransport::new().with_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// Creates a transport with a default `reqwest::Client`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing client, sharing its connection pool.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    /// Sets a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> Result<http::Response<Vec<u8>>, TransportError> {
        let mut request = reqwest::Request::try_from(request)?;
        if let Some(timeout) = self.timeout {
            *request.timeout_mut() = Some(timeout);
        }

        let response = self.client.execute(request).await?;

        let mut builder = http::Response::builder()
            .status(response.status())
            .version(response.version());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(response.headers().clone());
        }
        let body = response.bytes().await?.to_vec();

        builder
            .body(body)
            .map_err(|e| TransportError::new(TransportErrorKind::Other, e.to_string()))
    }
}
