//! HTTP client that encodes requests and decodes responses.
//!
//! The [`Client`] type is the main entry point for making HTTP requests.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    body::BodyProvider,
    context::CallContext,
    decoder::{JsonDecoder, ResponseDecoder},
    query::build_query_url,
    transport::{BodyGuard, HttpResponse, ReqwestTransportBuilder, Transport, TransportError},
    Error, Result,
};
use http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use url::Url;

/// An HTTP client bound to one base host.
///
/// The client is cheap to clone and safe to share between tasks: all of its
/// configuration is immutable and calls keep no state on the client.
///
/// Both [`get`](Client::get) and [`post`](Client::post) return the response
/// status on success. On failure, [`Error::status`] gives the status the
/// failure is classified as.
///
/// # Examples
///
/// ```no_run
/// use nap::{CallContext, Client, FormBody};
/// use http::HeaderMap;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize)]
/// struct StatusQuery {
///     app_id: u32,
///     app_trans_id: String,
/// }
///
/// #[derive(Deserialize, Default)]
/// struct OrderStatus {
///     return_code: i32,
///     return_message: String,
/// }
///
/// # async fn example() -> Result<(), nap::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .build()?;
/// let ctx = CallContext::background();
///
/// let query = StatusQuery { app_id: 1, app_trans_id: "t1".to_string() };
/// let mut status = OrderStatus::default();
/// client
///     .get(&ctx, "/orders/status", &query, &HeaderMap::new(), Some(&mut status))
///     .await?;
/// println!("{}: {}", status.return_code, status.return_message);
///
/// // POST a form and ignore the response body.
/// let mut headers = HeaderMap::new();
/// let code = client
///     .post(&ctx, "/orders/create", &FormBody::new(&query), &mut headers, None::<&mut ()>)
///     .await?;
/// println!("Created with status {}", code);
/// # Ok(())
/// # }
/// ```
pub struct Client<D = JsonDecoder> {
    inner: Arc<ClientInner<D>>,
}

struct ClientInner<D> {
    base_url: String,
    transport: Arc<dyn Transport>,
    decoder: D,
    span: tracing::Span,
}

impl<D> Clone for Client<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client for `base_url` with the default transport.
    ///
    /// `proxy_url` routes all requests through a proxy; pass an empty string
    /// for none.
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy URL is invalid.
    pub fn new(base_url: impl Into<String>, proxy_url: impl Into<String>) -> Result<Self> {
        Self::builder()
            .base_url(base_url)
            .proxy_url(proxy_url)
            .build()
    }
}

impl<D: ResponseDecoder> Client<D> {
    /// The base host that request paths are appended to.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Makes a GET request to `path` with `query` encoded as the query string.
    ///
    /// `query` must serialize as a struct or map; keys are sorted. When `out`
    /// is `None` the response body is never read. Otherwise it is decoded
    /// into `*out`, which is left untouched if decoding fails.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] / [`Error::InvalidQueryInput`] (400) if the
    ///   request cannot be built; nothing is sent.
    /// - [`Error::Transport`], [`Error::Cancelled`], [`Error::Timeout`] if
    ///   the request could not be completed.
    /// - [`Error::DeserializationFailed`] if the body does not decode.
    pub async fn get<Q, T>(
        &self,
        ctx: &CallContext,
        path: &str,
        query: &Q,
        headers: &HeaderMap,
        out: Option<&mut T>,
    ) -> Result<StatusCode>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let full_url = self.full_url(path);
        let span = tracing::debug_span!(parent: &self.inner.span, "get", path = %path);

        async move {
            let url =
                build_query_url(&full_url, query).map_err(|e| self.reject_url(&full_url, e))?;

            let start_time = Instant::now();
            let response = ctx.run(self.dispatch_get(&url, headers)).await?;
            self.finish(ctx, response, start_time, out).await
        }
        .instrument(span)
        .await
    }

    /// Makes a POST request to `path` with the body produced by `body`.
    ///
    /// Appends `Content-Type: body.content_type()` to `headers` before the
    /// request is sent; the caller's map keeps the added header afterwards.
    /// Response decoding works as in [`get`](Client::get).
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`], [`Error::InvalidBodyInput`] or
    ///   [`Error::SerializationFailed`] (400) if the request cannot be
    ///   built; nothing is sent.
    /// - [`Error::Transport`], [`Error::Cancelled`], [`Error::Timeout`] if
    ///   the request could not be completed.
    /// - [`Error::DeserializationFailed`] if the body does not decode.
    pub async fn post<B, T>(
        &self,
        ctx: &CallContext,
        path: &str,
        body: &B,
        headers: &mut HeaderMap,
        out: Option<&mut T>,
    ) -> Result<StatusCode>
    where
        B: BodyProvider + ?Sized,
        T: DeserializeOwned,
    {
        let full_url = self.full_url(path);
        let span = tracing::debug_span!(parent: &self.inner.span, "post", path = %path);

        async move {
            let url = Url::parse(&full_url).map_err(|e| self.reject_url(&full_url, e.into()))?;
            let payload = body.body().map_err(|e| self.reject(e))?;

            let content_type = HeaderValue::from_str(body.content_type()).map_err(|e| {
                self.reject(Error::SerializationFailed(format!("Invalid content type: {}", e)))
            })?;
            headers.append(CONTENT_TYPE, content_type);

            let start_time = Instant::now();
            let response = ctx.run(self.dispatch_post(&url, payload, headers)).await?;
            self.finish(ctx, response, start_time, out).await
        }
        .instrument(span)
        .await
    }

    fn full_url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    fn reject(&self, error: Error) -> Error {
        tracing::warn!(error = %error, "Rejected request before sending");
        error
    }

    /// A URL without a scheme can never be dispatched, so it is reported as
    /// a transport failure without a response (502) rather than bad input.
    fn reject_url(&self, full_url: &str, error: Error) -> Error {
        match error {
            Error::InvalidUrl(url::ParseError::RelativeUrlWithoutBase) => {
                self.transport_failed(TransportError::new(format!(
                    "unsupported protocol scheme: {}",
                    full_url
                )))
            }
            other => self.reject(other),
        }
    }

    async fn dispatch_get(&self, url: &Url, headers: &HeaderMap) -> Result<HttpResponse> {
        tracing::debug!(method = "GET", url = %url, "Dispatching request");
        self.inner
            .transport
            .get(url, headers)
            .await
            .map_err(|e| self.transport_failed(e))
    }

    async fn dispatch_post(
        &self,
        url: &Url,
        payload: bytes::Bytes,
        headers: &HeaderMap,
    ) -> Result<HttpResponse> {
        tracing::debug!(
            method = "POST",
            url = %url,
            body_len = payload.len(),
            "Dispatching request"
        );
        self.inner
            .transport
            .post(url, payload, headers)
            .await
            .map_err(|e| self.transport_failed(e))
    }

    fn transport_failed(&self, error: TransportError) -> Error {
        let error = Error::from(error);
        tracing::warn!(
            error = %error,
            status = error.status().as_u16(),
            "Transport failed"
        );
        error
    }

    /// Releases the response body on every path and decodes it when `out`
    /// is given.
    async fn finish<T>(
        &self,
        ctx: &CallContext,
        response: HttpResponse,
        start_time: Instant,
        out: Option<&mut T>,
    ) -> Result<StatusCode>
    where
        T: DeserializeOwned,
    {
        let status = response.status;
        let mut body = BodyGuard::new(status, response.body);

        tracing::info!(
            status = status.as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "Received HTTP response"
        );
        if status.is_client_error() {
            tracing::warn!(status = status.as_u16(), "Client error (4xx)");
        } else if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), "Server error (5xx)");
        }

        let Some(out) = out else {
            return Ok(status);
        };

        let raw_body = ctx
            .run(async { body.bytes().await.map_err(|e| self.transport_failed(e)) })
            .await?;
        *out = self.inner.decoder.decode(status, &raw_body)?;

        Ok(status)
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// Transport options (proxy, timeouts, default headers, user agent) configure
/// the default [`ReqwestTransport`](crate::ReqwestTransport) and are ignored when a transport is
/// supplied with [`transport`](ClientBuilder::transport).
///
/// # Examples
///
/// ```no_run
/// use nap::ClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), nap::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")
///     .proxy_url("http://proxy.internal:3128")
///     .timeout(Duration::from_secs(30))
///     .default_header("User-Agent", "my-app/1.0")?
///     .span(tracing::info_span!("payments"))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder<D = JsonDecoder> {
    base_url: Option<String>,
    transport_builder: ReqwestTransportBuilder,
    transport: Option<Arc<dyn Transport>>,
    decoder: D,
    span: Option<tracing::Span>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            transport_builder: ReqwestTransportBuilder::new(),
            transport: None,
            decoder: JsonDecoder,
            span: None,
        }
    }
}

impl<D: ResponseDecoder> ClientBuilder<D> {
    /// Sets the base host. Request paths are appended to it verbatim, so it
    /// is only validated when a request is built.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Routes every request through the proxy at `url`. An empty string
    /// means no proxy.
    pub fn proxy_url(mut self, url: impl Into<String>) -> Self {
        self.transport_builder = self.transport_builder.proxy_url(url);
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.transport_builder = self.transport_builder.timeout(timeout);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.transport_builder = self.transport_builder.connect_timeout(timeout);
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        self.transport_builder = self.transport_builder.default_header(name, value)?;
        Ok(self)
    }

    /// Sets the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.transport_builder = self.transport_builder.user_agent(user_agent);
        self
    }

    /// Uses `transport` instead of building a [`ReqwestTransport`](crate::ReqwestTransport).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the span every call is recorded under.
    ///
    /// Defaults to an `info` span named `nap.client` carrying the base URL.
    pub fn span(mut self, span: tracing::Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Replaces the response decoder.
    pub fn response_decoder<D2: ResponseDecoder>(self, decoder: D2) -> ClientBuilder<D2> {
        ClientBuilder {
            base_url: self.base_url,
            transport_builder: self.transport_builder,
            transport: self.transport,
            decoder,
            span: self.span,
        }
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided or if the transport
    /// configuration is invalid.
    pub fn build(self) -> Result<Client<D>> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::ConfigurationError("Base URL is required".to_string()))?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(self.transport_builder.build()?),
        };

        let span = self
            .span
            .unwrap_or_else(|| tracing::info_span!("nap.client", base_url = %base_url));

        Ok(Client {
            inner: Arc::new(ClientInner {
                base_url,
                transport,
                decoder: self.decoder,
                span,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
