//! Error types for HTTP API calls.
//!
//! Every failure of [`Client::get`](crate::Client::get) or
//! [`Client::post`](crate::Client::post) carries a classified HTTP status
//! code, available through [`Error::status`]. Input and encoding problems are
//! detected locally and classified as `400 Bad Request`; transport failures
//! keep their original message and report either the status of the partial
//! response they came with or `502 Bad Gateway`.

use crate::transport::TransportError;
use http::StatusCode;

/// The main error type for HTTP API calls.
///
/// # Examples
///
/// ```no_run
/// use nap::{CallContext, Client, Error};
/// use http::HeaderMap;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Query { id: u32 }
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder().base_url("https://api.example.com").build()?;
/// let mut out = serde_json::Value::Null;
///
/// match client
///     .get(&CallContext::background(), "/items", &Query { id: 1 }, &HeaderMap::new(), Some(&mut out))
///     .await
/// {
///     Ok(status) => println!("{}: {}", status, out),
///     Err(Error::DeserializationFailed { raw_response, serde_error, status }) => {
///         eprintln!("Failed to decode (status {}): {} / {}", status, serde_error, raw_response);
///     }
///     Err(e) => eprintln!("Request failed with {}: {}", e.status(), e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The base host and path did not form a parseable URL. A URL with no
    /// scheme at all is reported as a [`Transport`](Error::Transport) failure.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The query parameters were not a struct or map.
    #[error("query parameters must be a struct or map, got `{type_name}`")]
    InvalidQueryInput {
        /// The Rust type that was supplied.
        type_name: String,
    },

    /// A form body payload was not a struct or map.
    #[error("form body must be a struct or map, got `{type_name}`")]
    InvalidBodyInput {
        /// The Rust type that was supplied.
        type_name: String,
    },

    /// Failed to serialize the request body or query.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// Failed to deserialize the response body into the expected type.
    ///
    /// This error preserves both the raw response text and the serde error
    /// message, making it easy to debug decoding issues in production.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// The transport failed. The message is the transport's own.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The call was cancelled through its [`CallContext`](crate::CallContext).
    #[error("Request cancelled")]
    Cancelled,

    /// The deadline of the call's [`CallContext`](crate::CallContext) elapsed.
    #[error("Request timed out")]
    Timeout,

    /// Invalid configuration was provided to the [`ClientBuilder`](crate::ClientBuilder).
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl Error {
    /// Returns the HTTP status code this failure is classified as.
    ///
    /// # Examples
    ///
    /// ```
    /// use nap::{Error, TransportError};
    /// use http::StatusCode;
    ///
    /// let err = Error::InvalidQueryInput { type_name: "i32".to_string() };
    /// assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    ///
    /// let err = Error::from(TransportError::new("connection refused"));
    /// assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    ///
    /// let err = Error::from(TransportError::with_status(
    ///     StatusCode::SERVICE_UNAVAILABLE,
    ///     "body truncated",
    /// ));
    /// assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    /// ```
    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidUrl(_)
            | Error::InvalidQueryInput { .. }
            | Error::InvalidBodyInput { .. }
            | Error::SerializationFailed(_)
            | Error::ConfigurationError(_) => StatusCode::BAD_REQUEST,
            Error::DeserializationFailed { status, .. } => *status,
            Error::Transport(e) => e.status().unwrap_or(StatusCode::BAD_GATEWAY),
            Error::Cancelled | Error::Timeout => StatusCode::BAD_GATEWAY,
        }
    }

    /// Returns `true` if the failure happened before anything was sent.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidUrl(_)
                | Error::InvalidQueryInput { .. }
                | Error::InvalidBodyInput { .. }
                | Error::SerializationFailed(_)
        )
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// A specialized `Result` type for HTTP API calls.
///
/// This is a convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
