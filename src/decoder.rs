//! Response body decoders.

use crate::{Error, Result};
use http::StatusCode;
use serde::de::DeserializeOwned;

/// Decodes a response body into a typed value.
///
/// Decoders are shared by every call made through a [`Client`](crate::Client)
/// and must not keep per-call state.
pub trait ResponseDecoder: Send + Sync + 'static {
    /// Decodes `body`, received with `status`, into a `T`.
    fn decode<T: DeserializeOwned>(&self, status: StatusCode, body: &[u8]) -> Result<T>;
}

/// Decodes JSON response bodies. This is the default decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl ResponseDecoder for JsonDecoder {
    fn decode<T: DeserializeOwned>(&self, status: StatusCode, body: &[u8]) -> Result<T> {
        serde_json::from_slice(body).map_err(|e| {
            let raw_response = String::from_utf8_lossy(body).into_owned();
            tracing::error!(
                error = %e,
                raw_response = %raw_response,
                "Failed to deserialize response"
            );

            Error::DeserializationFailed {
                raw_response,
                serde_error: e.to_string(),
                status,
            }
        })
    }
}
