//! Query string encoding from serializable records.
//!
//! A "record" is anything that serializes as a struct or a map. Field names
//! (or their `#[serde(rename = "...")]` values) become the query keys.

use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use url::{form_urlencoded, Url};

/// Why a value could not be flattened into key/value pairs.
pub(crate) enum PairsError {
    /// The value did not serialize as a struct or map.
    NotARecord(&'static str),
    /// Serialization itself failed.
    Serialize(serde_json::Error),
}

/// Flattens a record into `(key, value)` pairs sorted by key.
///
/// The sort is stable, so repeated keys produced by sequences keep their
/// original order.
pub(crate) fn to_pairs<T>(value: &T) -> std::result::Result<Vec<(String, String)>, PairsError>
where
    T: Serialize + ?Sized,
{
    let fields = match serde_json::to_value(value).map_err(PairsError::Serialize)? {
        Value::Object(fields) => fields,
        _ => return Err(PairsError::NotARecord(std::any::type_name::<T>())),
    };

    let mut pairs = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        flatten(key, value, &mut pairs);
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(pairs)
}

fn flatten(key: String, value: Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => pairs.push((key, b.to_string())),
        Value::Number(n) => pairs.push((key, n.to_string())),
        Value::String(s) => pairs.push((key, s)),
        Value::Array(items) => {
            for item in items {
                flatten(key.clone(), item, pairs);
            }
        }
        Value::Object(fields) => {
            for (child, value) in fields {
                flatten(format!("{}[{}]", key, child), value, pairs);
            }
        }
    }
}

/// Percent-encodes pairs as `key=value&key2=value2`.
pub(crate) fn encode_pairs(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Encodes a record as a sorted, percent-encoded query string.
///
/// # Errors
///
/// Returns [`Error::InvalidQueryInput`] if `query` is not a struct or map.
///
/// # Examples
///
/// ```
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Search {
///     q: String,
///     page: u32,
/// }
///
/// let encoded = nap::query::encode_query(&Search { q: "rust lang".to_string(), page: 2 }).unwrap();
/// assert_eq!(encoded, "page=2&q=rust+lang");
/// ```
pub fn encode_query<T>(query: &T) -> Result<String>
where
    T: Serialize + ?Sized,
{
    let pairs = to_pairs(query).map_err(|e| match e {
        PairsError::NotARecord(type_name) => Error::InvalidQueryInput {
            type_name: type_name.to_string(),
        },
        PairsError::Serialize(e) => Error::SerializationFailed(e.to_string()),
    })?;
    Ok(encode_pairs(&pairs))
}

/// Parses `full_url` and replaces its query with the encoding of `query`.
///
/// Any query string already present on `full_url` is overwritten.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if `full_url` cannot be parsed, or
/// [`Error::InvalidQueryInput`] if `query` is not a struct or map.
///
/// # Examples
///
/// ```
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct OrderStatus<'a> {
///     app_id: u32,
///     app_trans_id: &'a str,
/// }
///
/// let url = nap::query::build_query_url(
///     "https://api.example.com/orders/status?stale=1",
///     &OrderStatus { app_id: 1, app_trans_id: "t1" },
/// )
/// .unwrap();
/// assert_eq!(url.as_str(), "https://api.example.com/orders/status?app_id=1&app_trans_id=t1");
/// ```
pub fn build_query_url<T>(full_url: &str, query: &T) -> Result<Url>
where
    T: Serialize + ?Sized,
{
    let mut url = Url::parse(full_url)?;
    let encoded = encode_query(query)?;
    if encoded.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(&encoded));
    }
    Ok(url)
}
