//! Object store trait definitions
//!
//! This module provides the storage contract the CRUD handlers run against,
//! using RPITIT (Return Position Impl Trait In Traits), available since
//! Rust 1.75.
//!
//! Records are opaque byte values addressed by `(bucket, key)`. A bucket is a
//! named partition of the store, analogous to a table or namespace.
//!
//! # Example
//!
//! ```rust,ignore
//! use bucket_crud::store::{
//!     BucketStats, ObjectStore, PageRequest, StoreError, StoreResult, StoredRecord,
//! };
//!
//! struct SledStore {
//!     db: sled::Db,
//! }
//!
//! impl ObjectStore for SledStore {
//!     async fn get(&self, bucket: &str, key: &str) -> StoreResult<StoredRecord> {
//!         let tree = self.db.open_tree(bucket).map_err(backend)?;
//!         tree.get(key)
//!             .map_err(backend)?
//!             .map(|value| StoredRecord::new(key, value.to_vec()))
//!             .ok_or_else(|| StoreError::not_found(bucket, key))
//!     }
//!     // ... other methods
//! }
//! ```

use std::future::Future;

use serde::{Deserialize, Serialize};

use super::error::StoreError;
use super::pagination::PageRequest;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A single row returned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Record key within its bucket
    pub key: String,
    /// Raw record value, JSON for records written by the handlers
    pub data: Vec<u8>,
}

impl StoredRecord {
    /// Create a record
    pub fn new(key: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            data: data.into(),
        }
    }
}

/// Per-bucket statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BucketStats {
    /// Number of keys stored in the bucket
    pub key_count: u64,
}

/// Bucketed key-value store consumed by the CRUD handlers
///
/// Implementations decide how buckets map onto their backend. The handlers
/// only rely on the semantics documented on each method.
pub trait ObjectStore: Send + Sync {
    /// Read the record stored under `key`
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error when no record exists.
    fn get(
        &self,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = StoreResult<StoredRecord>> + Send;

    /// Insert or replace the record stored under `key`
    fn save(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Replace an existing record
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error when no record exists under `key`.
    fn update(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Remove the record stored under `key`
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error when no record exists under `key`.
    fn delete(&self, bucket: &str, key: &str) -> impl Future<Output = StoreResult<()>> + Send;

    /// Read one page of records
    ///
    /// Rows are ordered by key: ascending for [`Cursor::Start`] and
    /// [`Cursor::After`], descending for [`Cursor::Before`]. Cursor markers
    /// are exclusive. At most `page.limit` rows are returned after skipping
    /// `page.skip` rows.
    ///
    /// [`Cursor::Start`]: super::Cursor::Start
    /// [`Cursor::After`]: super::Cursor::After
    /// [`Cursor::Before`]: super::Cursor::Before
    fn list(
        &self,
        bucket: &str,
        page: PageRequest,
    ) -> impl Future<Output = StoreResult<Vec<StoredRecord>>> + Send;

    /// Read bucket statistics
    fn stats(&self, bucket: &str) -> impl Future<Output = StoreResult<BucketStats>> + Send;
}
