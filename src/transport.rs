//! The network layer behind a [`Client`](crate::Client).
//!
//! The client only needs a [`Transport`] able to send a GET or a POST and
//! hand back a status code and a body. Connection pooling, TLS, proxying and
//! retries all belong to the transport. [`ReqwestTransport`] is the default.

use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Boxed error type carried by [`TransportError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A failure reported by a [`Transport`].
///
/// If the transport got far enough to receive a status line before failing
/// (for example, the body could not be read), that status is kept and the
/// client reports it instead of `502 Bad Gateway`.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct TransportError {
    status: Option<StatusCode>,
    #[source]
    source: BoxError,
}

impl TransportError {
    /// A failure with no response at all (DNS, connect, protocol).
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            status: None,
            source: source.into(),
        }
    }

    /// A failure that happened after a response with `status` was received.
    pub fn with_status(status: StatusCode, source: impl Into<BoxError>) -> Self {
        Self {
            status: Some(status),
            source: source.into(),
        }
    }

    /// The status of the partial response, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        Self {
            status: e.status(),
            source: Box::new(e),
        }
    }
}

/// A specialized `Result` type for transports.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// The body of a response, owned by the call that received it.
#[async_trait]
pub trait ResponseBody: Send {
    /// Reads the whole body.
    async fn bytes(&mut self) -> TransportResult<Bytes>;

    /// Releases the underlying stream or connection.
    ///
    /// Called exactly once when the call finishes, whether or not the body
    /// was read. Errors are logged by the client and otherwise ignored.
    fn close(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ResponseBody for Bytes {
    async fn bytes(&mut self) -> TransportResult<Bytes> {
        Ok(std::mem::take(self))
    }
}

/// A response returned by a [`Transport`].
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The response body.
    pub body: Box<dyn ResponseBody>,
}

impl HttpResponse {
    /// Creates a response with no headers.
    pub fn new(status: StatusCode, body: impl ResponseBody + 'static) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Box::new(body),
        }
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Sends requests on behalf of a [`Client`](crate::Client).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a GET request.
    async fn get(&self, url: &Url, headers: &HeaderMap) -> TransportResult<HttpResponse>;

    /// Sends a POST request with `body`.
    async fn post(&self, url: &Url, body: Bytes, headers: &HeaderMap)
        -> TransportResult<HttpResponse>;
}

/// Closes a response body when dropped, on every exit path of a call.
pub(crate) struct BodyGuard {
    status: StatusCode,
    body: Box<dyn ResponseBody>,
}

impl BodyGuard {
    pub(crate) fn new(status: StatusCode, body: Box<dyn ResponseBody>) -> Self {
        Self { status, body }
    }

    pub(crate) async fn bytes(&mut self) -> TransportResult<Bytes> {
        self.body.bytes().await
    }
}

impl Drop for BodyGuard {
    fn drop(&mut self) {
        if let Err(e) = self.body.close() {
            tracing::error!(
                error = %e,
                status = self.status.as_u16(),
                "Failed to close response body"
            );
        }
    }
}

/// [`Transport`] backed by a [`reqwest::Client`].
///
/// # Examples
///
/// ```no_run
/// use nap::ReqwestTransport;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), nap::Error> {
/// let transport = ReqwestTransport::builder()
///     .timeout(Duration::from_secs(30))
///     .proxy_url("http://proxy.internal:3128")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a new `ReqwestTransportBuilder`.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new()
    }

    /// Wraps an already configured `reqwest::Client`.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> TransportResult<HttpResponse> {
        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        tracing::debug!(status = status.as_u16(), "Transport received response");

        Ok(HttpResponse {
            status,
            headers,
            body: Box::new(ReqwestBody {
                status,
                response: Some(response),
            }),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url, headers: &HeaderMap) -> TransportResult<HttpResponse> {
        tracing::debug!(method = "GET", url = %url, "Executing HTTP request");
        let request = self.http_client.get(url.clone()).headers(headers.clone());
        self.send(request).await
    }

    async fn post(
        &self,
        url: &Url,
        body: Bytes,
        headers: &HeaderMap,
    ) -> TransportResult<HttpResponse> {
        tracing::debug!(
            method = "POST",
            url = %url,
            body_len = body.len(),
            "Executing HTTP request"
        );
        let request = self
            .http_client
            .post(url.clone())
            .headers(headers.clone())
            .body(body);
        self.send(request).await
    }
}

struct ReqwestBody {
    status: StatusCode,
    response: Option<reqwest::Response>,
}

#[async_trait]
impl ResponseBody for ReqwestBody {
    async fn bytes(&mut self) -> TransportResult<Bytes> {
        match self.response.take() {
            Some(response) => response
                .bytes()
                .await
                .map_err(|e| TransportError::with_status(self.status, e)),
            None => Ok(Bytes::new()),
        }
    }

    fn close(&mut self) -> std::io::Result<()> {
        // Dropping the response returns the connection to reqwest's pool.
        self.response.take();
        Ok(())
    }
}

/// Builder for a [`ReqwestTransport`].
#[derive(Debug, Default)]
pub struct ReqwestTransportBuilder {
    proxy_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    default_headers: HeaderMap,
    user_agent: Option<String>,
}

impl ReqwestTransportBuilder {
    /// Creates a new `ReqwestTransportBuilder` with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes every request through the proxy at `url`. An empty string
    /// means no proxy.
    pub fn proxy_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.proxy_url = if url.is_empty() { None } else { Some(url) };
        self
    }

    /// Sets the total timeout of each request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Adds a header sent with every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Builds the configured `ReqwestTransport`.
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy URL is invalid or the underlying
    /// `reqwest::Client` cannot be built.
    pub fn build(self) -> Result<ReqwestTransport> {
        let mut builder = reqwest::Client::builder().default_headers(self.default_headers);

        if let Some(proxy_url) = self.proxy_url {
            let proxy = reqwest::Proxy::all(&proxy_url).map_err(|e| {
                Error::ConfigurationError(format!("Invalid proxy URL {}: {}", proxy_url, e))
            })?;
            builder = builder.proxy(proxy);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }

        let http_client = builder.build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(ReqwestTransport { http_client })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingBody {
        closes: Arc<AtomicUsize>,
        fail_close: bool,
    }

    #[async_trait]
    impl ResponseBody for CountingBody {
        async fn bytes(&mut self) -> TransportResult<Bytes> {
            Ok(Bytes::from_static(b"{}"))
        }

        fn close(&mut self) -> std::io::Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "close failed"))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_guard_closes_once_after_read() {
        let closes = Arc::new(AtomicUsize::new(0));
        {
            let mut guard = BodyGuard::new(
                StatusCode::OK,
                Box::new(CountingBody {
                    closes: closes.clone(),
                    fail_close: false,
                }),
            );
            assert_eq!(&guard.bytes().await.unwrap()[..], b"{}");
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_swallows_close_error() {
        let closes = Arc::new(AtomicUsize::new(0));
        drop(BodyGuard::new(
            StatusCode::OK,
            Box::new(CountingBody {
                closes: closes.clone(),
                fail_close: true,
            }),
        ));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bytes_body_reads_once() {
        let mut body = Bytes::from_static(b"hello");
        assert_eq!(&ResponseBody::bytes(&mut body).await.unwrap()[..], b"hello");
        assert!(ResponseBody::bytes(&mut body).await.unwrap().is_empty());
    }

    #[test]
    fn test_transport_error_status() {
        assert_eq!(TransportError::new("refused").status(), None);
        let err = TransportError::with_status(StatusCode::BAD_GATEWAY, "reset");
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
        assert_eq!(err.to_string(), "reset");
    }

    #[test]
    fn test_invalid_proxy_url() {
        let err = ReqwestTransport::builder()
            .proxy_url("http://[::1")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
    }

    #[test]
    fn test_empty_proxy_url_means_none() {
        let builder = ReqwestTransport::builder().proxy_url("");
        assert!(builder.proxy_url.is_none());
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_invalid_default_header() {
        let result = ReqwestTransport::builder().default_header("bad header", "x");
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }
}
