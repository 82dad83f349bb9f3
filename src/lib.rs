//! # nap - a small HTTP API client
//!
//! `nap` builds GET and POST requests against a base host, encodes request
//! parameters as a query string or a body, sends them through a pluggable
//! [`Transport`] and decodes responses into caller-supplied values.
//!
//! ## Quick Start
//!
//! ```no_run
//! use nap::{CallContext, Client, JsonBody};
//! use http::HeaderMap;
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct StatusQuery {
//!     app_id: u32,
//!     app_trans_id: String,
//!     mac: String,
//! }
//!
//! #[derive(Deserialize, Default, Debug)]
//! struct OrderStatus {
//!     return_code: i32,
//!     return_message: String,
//!     zp_trans_id: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), nap::Error> {
//!     let client = Client::builder()
//!         .base_url("https://sb-openapi.example.com")
//!         .timeout(Duration::from_secs(30))
//!         .build()?;
//!
//!     // GET /orders/status?app_id=1&app_trans_id=t1&mac=m
//!     let ctx = CallContext::background().with_timeout(Duration::from_secs(5));
//!     let query = StatusQuery {
//!         app_id: 1,
//!         app_trans_id: "t1".to_string(),
//!         mac: "m".to_string(),
//!     };
//!     let mut status = OrderStatus::default();
//!     let code = client
//!         .get(&ctx, "/orders/status", &query, &HeaderMap::new(), Some(&mut status))
//!         .await?;
//!     println!("{}: {:?}", code, status);
//!
//!     // POST a JSON body; Content-Type is added to `headers`.
//!     let mut headers = HeaderMap::new();
//!     let mut created = OrderStatus::default();
//!     client
//!         .post(&ctx, "/orders/create", &JsonBody::new(&query), &mut headers, Some(&mut created))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Status codes and errors
//!
//! Calls return the response status on success, whatever it is. On failure
//! [`Error::status`] classifies the error:
//!
//! | Failure | Status |
//! |---|---|
//! | URL, query or body could not be built | 400 |
//! | Transport failed after receiving a response | that response's status |
//! | Transport failed without a response, cancelled, timed out | 502 |
//! | Response body did not decode | the response's status |
//!
//! ## Logging
//!
//! Everything is logged with `tracing` under the client's span (see
//! [`ClientBuilder::span`]). The library never installs a subscriber.

pub mod body;
mod client;
mod context;
pub mod decoder;
mod error;
pub mod query;
pub mod transport;

pub use body::{BodyProvider, FormBody, JsonBody};
pub use client::{Client, ClientBuilder};
pub use context::CallContext;
pub use decoder::{JsonDecoder, ResponseDecoder};
pub use error::{Error, Result};
pub use transport::{HttpResponse, ReqwestTransport, ResponseBody, Transport, TransportError};
