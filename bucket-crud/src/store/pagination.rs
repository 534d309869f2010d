//! Cursor pagination types for store listings
//!
//! Listings are driven by a key marker rather than numeric offsets: a page
//! either starts at the beginning of a bucket, continues after a key, or walks
//! backwards from a key.
//!
//! # Example
//!
//! ```rust
//! use bucket_crud::store::{Cursor, PageRequest};
//!
//! let first = PageRequest::first(11);
//! assert_eq!(first.cursor, Cursor::Start);
//!
//! let next = PageRequest::after("note_0010", 11);
//! assert_eq!(next.cursor, Cursor::After("note_0010".to_string()));
//! ```

use std::fmt;

/// Position a listing starts from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cursor {
    /// From the first key of the bucket, ascending
    #[default]
    Start,
    /// Keys strictly greater than the marker, ascending
    After(String),
    /// Keys strictly less than the marker, descending (nearest first)
    Before(String),
}

impl Cursor {
    /// Whether rows come back in descending key order
    #[must_use]
    pub fn is_backward(&self) -> bool {
        matches!(self, Self::Before(_))
    }

    /// The marker key, if any
    #[must_use]
    pub fn marker(&self) -> Option<&str> {
        match self {
            Self::Start => None,
            Self::After(key) | Self::Before(key) => Some(key),
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::After(key) => write!(f, "after:{}", key),
            Self::Before(key) => write!(f, "before:{}", key),
        }
    }
}

/// A single page request against a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Where the page starts
    pub cursor: Cursor,
    /// Maximum number of rows to return
    pub limit: usize,
    /// Rows to skip past the cursor before collecting
    pub skip: usize,
}

impl PageRequest {
    /// Create a page request
    #[must_use]
    pub const fn new(cursor: Cursor, limit: usize, skip: usize) -> Self {
        Self {
            cursor,
            limit,
            skip,
        }
    }

    /// First page of a bucket
    #[must_use]
    pub const fn first(limit: usize) -> Self {
        Self::new(Cursor::Start, limit, 0)
    }

    /// Page continuing after `key`
    #[must_use]
    pub fn after(key: impl Into<String>, limit: usize) -> Self {
        Self::new(Cursor::After(key.into()), limit, 0)
    }

    /// Page walking backwards from `key`
    #[must_use]
    pub fn before(key: impl Into<String>, limit: usize) -> Self {
        Self::new(Cursor::Before(key.into()), limit, 0)
    }

    /// Skip rows past the cursor
    #[must_use]
    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_default_is_start() {
        assert_eq!(Cursor::default(), Cursor::Start);
        assert!(Cursor::Start.marker().is_none());
    }

    #[test]
    fn test_cursor_direction() {
        assert!(!Cursor::Start.is_backward());
        assert!(!Cursor::After("a".into()).is_backward());
        assert!(Cursor::Before("a".into()).is_backward());
    }

    #[test]
    fn test_cursor_display() {
        assert_eq!(Cursor::Start.to_string(), "start");
        assert_eq!(Cursor::After("k1".into()).to_string(), "after:k1");
        assert_eq!(Cursor::Before("k1".into()).to_string(), "before:k1");
    }

    #[test]
    fn test_page_request_constructors() {
        let page = PageRequest::before("k9", 6).with_skip(2);
        assert_eq!(page.cursor.marker(), Some("k9"));
        assert_eq!(page.limit, 6);
        assert_eq!(page.skip, 2);
        assert_eq!(PageRequest::default().limit, 10);
    }
}
