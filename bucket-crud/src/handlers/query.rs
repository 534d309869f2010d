//! Query parameters for list operations
//!
//! Listings page through a bucket with a cursor rather than an offset:
//! `afterKey` continues forward past a key, `beforeKey` walks back from one,
//! and `_perPage` sets the page size.
//!
//! # Example
//!
//! ```rust
//! use axum::http::Uri;
//! use bucket_crud::config::CrudConfig;
//! use bucket_crud::handlers::PageQuery;
//! use bucket_crud::store::Cursor;
//!
//! let uri: Uri = "/notes?_perPage=5&afterKey=n_9".parse().unwrap();
//! let query = PageQuery::from_uri(&uri);
//!
//! assert_eq!(query.page_size(&CrudConfig::default()), 5);
//! assert_eq!(query.cursor(), Cursor::After("n_9".to_string()));
//! ```

use axum::{extract::Query, http::Uri};
use serde::{Deserialize, Serialize};

use crate::config::CrudConfig;
use crate::store::{Cursor, PageRequest};

/// Paging parameters of a list request
///
/// `_perPage` is kept as text so that a malformed value falls back to the
/// default page size instead of rejecting the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    /// Requested page size
    #[serde(rename = "_perPage", default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<String>,

    /// Continue after this key
    #[serde(rename = "afterKey", default, skip_serializing_if = "Option::is_none")]
    pub after_key: Option<String>,

    /// Walk back from this key
    #[serde(rename = "beforeKey", default, skip_serializing_if = "Option::is_none")]
    pub before_key: Option<String>,
}

impl PageQuery {
    /// Read the paging parameters from a request URI
    ///
    /// A query string that cannot be parsed is treated as empty.
    pub fn from_uri(uri: &Uri) -> Self {
        Query::<Self>::try_from_uri(uri)
            .map(|Query(query)| query)
            .unwrap_or_default()
    }

    /// Continue after `key`
    #[must_use]
    pub fn with_after(mut self, key: impl Into<String>) -> Self {
        self.after_key = Some(key.into());
        self
    }

    /// Walk back from `key`
    #[must_use]
    pub fn with_before(mut self, key: impl Into<String>) -> Self {
        self.before_key = Some(key.into());
        self
    }

    /// Set the requested page size
    #[must_use]
    pub fn with_per_page(mut self, per_page: usize) -> Self {
        self.per_page = Some(per_page.to_string());
        self
    }

    /// Effective page size
    ///
    /// Missing, unparsable or zero values use `config.default_per_page`;
    /// the result never exceeds `config.max_per_page`.
    pub fn page_size(&self, config: &CrudConfig) -> usize {
        let max = config.max_per_page.max(1);
        self.per_page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(config.default_per_page)
            .clamp(1, max)
    }

    /// Cursor for this page; `afterKey` wins when both are given
    pub fn cursor(&self) -> Cursor {
        let non_empty = |key: &Option<String>| key.as_ref().filter(|k| !k.is_empty()).cloned();

        if let Some(key) = non_empty(&self.after_key) {
            Cursor::After(key)
        } else if let Some(key) = non_empty(&self.before_key) {
            Cursor::Before(key)
        } else {
            Cursor::Start
        }
    }

    /// Store request for this page
    ///
    /// Asks for one row more than the page size; the extra row only tells
    /// whether another page exists.
    pub fn page_request(&self, config: &CrudConfig) -> PageRequest {
        PageRequest::new(self.cursor(), self.page_size(config) + 1, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(uri: &str) -> PageQuery {
        PageQuery::from_uri(&uri.parse::<Uri>().unwrap())
    }

    #[test]
    fn test_from_uri_reads_parameters() {
        let q = query("/notes?_perPage=3&afterKey=a&beforeKey=b");
        assert_eq!(q.per_page.as_deref(), Some("3"));
        assert_eq!(q.after_key.as_deref(), Some("a"));
        assert_eq!(q.before_key.as_deref(), Some("b"));
    }

    #[test]
    fn test_from_uri_without_query() {
        assert_eq!(query("/notes"), PageQuery::default());
    }

    #[test]
    fn test_page_size_defaults() {
        let config = CrudConfig::default();
        assert_eq!(query("/notes").page_size(&config), 10);
        assert_eq!(query("/notes?_perPage=abc").page_size(&config), 10);
        assert_eq!(query("/notes?_perPage=0").page_size(&config), 10);
        assert_eq!(query("/notes?_perPage=-4").page_size(&config), 10);
    }

    #[test]
    fn test_page_size_clamped() {
        let config = CrudConfig::default();
        assert_eq!(query("/notes?_perPage=25").page_size(&config), 25);
        assert_eq!(query("/notes?_perPage=5000").page_size(&config), 100);
    }

    #[test]
    fn test_cursor_precedence() {
        assert_eq!(query("/notes").cursor(), Cursor::Start);
        assert_eq!(query("/notes?beforeKey=b").cursor(), Cursor::Before("b".into()));
        assert_eq!(
            query("/notes?afterKey=a&beforeKey=b").cursor(),
            Cursor::After("a".into())
        );
        assert_eq!(query("/notes?afterKey=&beforeKey=b").cursor(), Cursor::Before("b".into()));
    }

    #[test]
    fn test_page_request_fetches_sentinel() {
        let request = PageQuery::default()
            .with_per_page(4)
            .with_after("k1")
            .page_request(&CrudConfig::default());
        assert_eq!(request, PageRequest::after("k1", 5));
    }
}
