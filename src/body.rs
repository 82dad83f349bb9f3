//! Request body encoders.
//!
//! A [`BodyProvider`] turns a payload into bytes and names the content type
//! of those bytes. [`Client::post`](crate::Client::post) always sends the two
//! together.

use crate::query::{encode_pairs, to_pairs, PairsError};
use crate::{Error, Result};
use bytes::Bytes;
use serde::Serialize;

/// `Content-Type` of [`JsonBody`].
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// `Content-Type` of [`FormBody`].
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Provides the body of an outgoing request.
///
/// Implement this to send formats other than JSON and forms; the client
/// does not need to change.
pub trait BodyProvider {
    /// The `Content-Type` of the bytes returned by [`body`](Self::body).
    fn content_type(&self) -> &'static str;

    /// Encodes the payload.
    fn body(&self) -> Result<Bytes>;
}

/// Encodes a payload as JSON.
///
/// # Examples
///
/// ```
/// use nap::{BodyProvider, JsonBody};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct CreateOrder { app_id: u32 }
///
/// let body = JsonBody::new(CreateOrder { app_id: 1 });
/// assert_eq!(body.content_type(), "application/json");
/// assert_eq!(&body.body().unwrap()[..], br#"{"app_id":1}"#);
/// ```
#[derive(Debug, Clone)]
pub struct JsonBody<T> {
    /// The value to encode.
    pub payload: T,
}

impl<T: Serialize> JsonBody<T> {
    /// Wraps `payload`. Pass a reference to avoid moving it.
    pub fn new(payload: T) -> Self {
        Self { payload }
    }
}

impl<T: Serialize> BodyProvider for JsonBody<T> {
    fn content_type(&self) -> &'static str {
        JSON_CONTENT_TYPE
    }

    fn body(&self) -> Result<Bytes> {
        let json =
            serde_json::to_vec(&self.payload).map_err(|e| Error::SerializationFailed(e.to_string()))?;
        Ok(Bytes::from(json))
    }
}

/// Encodes a struct or map as `application/x-www-form-urlencoded`.
///
/// Keys are sorted and values percent-encoded exactly like query strings
/// built by [`query::encode_query`](crate::query::encode_query).
///
/// # Examples
///
/// ```
/// use nap::{BodyProvider, FormBody};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct CreateOrder<'a> { app_trans_id: &'a str, app_id: u32 }
///
/// let body = FormBody::new(CreateOrder { app_trans_id: "t1", app_id: 1 });
/// assert_eq!(&body.body().unwrap()[..], b"app_id=1&app_trans_id=t1");
/// ```
#[derive(Debug, Clone)]
pub struct FormBody<T> {
    /// The value to encode.
    pub payload: T,
}

impl<T: Serialize> FormBody<T> {
    /// Wraps `payload`. Pass a reference to avoid moving it.
    pub fn new(payload: T) -> Self {
        Self { payload }
    }
}

impl<T: Serialize> BodyProvider for FormBody<T> {
    fn content_type(&self) -> &'static str {
        FORM_CONTENT_TYPE
    }

    fn body(&self) -> Result<Bytes> {
        let pairs = to_pairs(&self.payload).map_err(|e| match e {
            PairsError::NotARecord(type_name) => Error::InvalidBodyInput {
                type_name: type_name.to_string(),
            },
            PairsError::Serialize(e) => Error::SerializationFailed(e.to_string()),
        })?;
        Ok(Bytes::from(encode_pairs(&pairs)))
    }
}

impl<B: BodyProvider + ?Sized> BodyProvider for &B {
    fn content_type(&self) -> &'static str {
        (**self).content_type()
    }

    fn body(&self) -> Result<Bytes> {
        (**self).body()
    }
}
