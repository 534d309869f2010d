//! Response types for the CRUD handlers
//!
//! Single records are returned as bare JSON objects carrying a `"key"` member,
//! listings as a [`Results`] envelope, and status messages as
//! `{ "msg": "..." }`.
//!
//! # Example
//!
//! ```rust
//! use bucket_crud::handlers::{Document, ItemResponse, Results};
//! use serde_json::json;
//!
//! let mut note = Document::new();
//! note.insert("title".into(), json!("hello"));
//! let response = ItemResponse::new(note).with_key("n_1");
//! assert_eq!(response.data["key"], "n_1");
//!
//! let results = Results::new(vec![response.data], 12);
//! assert_eq!(results.count, 1);
//! ```

use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON object every handler reads and writes
pub type Document = serde_json::Map<String, Value>;

/// Header carrying the bucket's total key count on listings
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Single record response
///
/// Serializes as the bare document with `200 OK`.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemResponse {
    /// The response document
    pub data: Document,
}

impl ItemResponse {
    /// Wrap a document
    pub fn new(data: Document) -> Self {
        Self { data }
    }

    /// Set the `"key"` member of the document
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.data.insert("key".to_string(), Value::String(key.into()));
        self
    }

    /// The record key, if present
    pub fn key(&self) -> Option<&str> {
        self.data.get("key").and_then(Value::as_str)
    }
}

impl IntoResponse for ItemResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self.data)).into_response()
    }
}

/// Envelope for a page of records
///
/// `count` is the number of records in `data`; `total_count` is the number of
/// keys in the whole bucket. Both are omitted from the JSON when zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Results {
    /// Records in this page
    pub data: Vec<Document>,
    /// Number of records in this page
    #[serde(default, skip_serializing_if = "is_zero_usize")]
    pub count: usize,
    /// Number of keys in the bucket
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub total_count: u64,
}

fn is_zero_usize(n: &usize) -> bool {
    *n == 0
}

fn is_zero_u64(n: &u64) -> bool {
    *n == 0
}

impl Results {
    /// Create an envelope; `count` is taken from `data`
    pub fn new(data: Vec<Document>, total_count: u64) -> Self {
        let count = data.len();
        Self {
            data,
            count,
            total_count,
        }
    }
}

/// Listing response
///
/// An empty listing, or one whose store read failed, is written as a bare
/// empty JSON array.
#[derive(Debug, Clone, PartialEq)]
pub enum ListResponse {
    /// `200 []`
    Empty,
    /// `200` with the envelope, optionally advertising `X-Total-Count`
    Page {
        /// The page envelope
        results: Results,
        /// Whether to emit the total count header
        total_count_header: bool,
    },
}

impl ListResponse {
    /// Build a page response
    pub fn page(results: Results, total_count_header: bool) -> Self {
        Self::Page {
            results,
            total_count_header,
        }
    }

    /// Records carried by this response
    pub fn data(&self) -> &[Document] {
        match self {
            Self::Empty => &[],
            Self::Page { results, .. } => &results.data,
        }
    }
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Empty => (StatusCode::OK, Json(Vec::<Document>::new())).into_response(),
            Self::Page {
                results,
                total_count_header,
            } => {
                let total = results.total_count;
                let mut response = (StatusCode::OK, Json(results)).into_response();
                if total_count_header {
                    if let Ok(value) = HeaderValue::from_str(&total.to_string()) {
                        response
                            .headers_mut()
                            .insert(HeaderName::from_static(TOTAL_COUNT_HEADER), value);
                    }
                }
                response
            }
        }
    }
}

/// `{ "msg": "..." }` status body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Human-readable status
    pub msg: String,
}

impl Message {
    /// Create a message
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

impl IntoResponse for Message {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_item_response_with_key() {
        let response = ItemResponse::new(doc(json!({"title": "a"}))).with_key("k1");
        assert_eq!(response.key(), Some("k1"));
        assert_eq!(response.data["title"], "a");
    }

    #[test]
    fn test_results_omits_zero_counts() {
        let results = Results::new(vec![], 0);
        let value = serde_json::to_value(&results).unwrap();
        assert_eq!(value, json!({"data": []}));
    }

    #[test]
    fn test_results_serializes_counts() {
        let results = Results::new(vec![doc(json!({"key": "a"}))], 7);
        let value = serde_json::to_value(&results).unwrap();
        assert_eq!(
            value,
            json!({"data": [{"key": "a"}], "count": 1, "total_count": 7})
        );
    }

    #[test]
    fn test_list_response_header() {
        let response = ListResponse::page(Results::new(vec![doc(json!({}))], 42), true)
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[TOTAL_COUNT_HEADER], "42");
    }

    #[test]
    fn test_list_response_header_disabled() {
        let response = ListResponse::page(Results::new(vec![doc(json!({}))], 42), false)
            .into_response();
        assert!(response.headers().get(TOTAL_COUNT_HEADER).is_none());
    }

    #[test]
    fn test_empty_list_data() {
        assert!(ListResponse::Empty.data().is_empty());
    }

    #[test]
    fn test_message_serialization() {
        let value = serde_json::to_value(Message::new("The item [a] was deleted")).unwrap();
        assert_eq!(value, json!({"msg": "The item [a] was deleted"}));
    }
}
