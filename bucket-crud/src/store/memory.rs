//! In-memory object store
//!
//! Keeps one ordered map per bucket behind a tokio `RwLock`. Buckets are
//! created on first write; reading a bucket that was never written lists as
//! empty and reports zero keys.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::error::{StoreError, StoreOperation};
use super::pagination::{Cursor, PageRequest};
use super::traits::{BucketStats, ObjectStore, StoreResult, StoredRecord};

type Bucket = BTreeMap<String, Vec<u8>>;

/// [`ObjectStore`] backed by process memory
///
/// Cloning is cheap and clones share the same data.
///
/// # Example
///
/// ```rust
/// use bucket_crud::store::{MemoryStore, ObjectStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = MemoryStore::new();
/// store.save("notes", "n_1", br#"{"title":"hello"}"#.to_vec()).await.unwrap();
/// assert_eq!(store.stats("notes").await.unwrap().key_count, 1);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    buckets: Arc<RwLock<HashMap<String, Bucket>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all buckets holding at least one record, sorted
    pub async fn buckets(&self) -> Vec<String> {
        let buckets = self.buckets.read().await;
        let mut names: Vec<String> = buckets
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

impl ObjectStore for MemoryStore {
    async fn get(&self, bucket: &str, key: &str) -> StoreResult<StoredRecord> {
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .and_then(|rows| rows.get(key))
            .map(|data| StoredRecord::new(key, data.clone()))
            .ok_or_else(|| StoreError::not_found(bucket, key))
    }

    async fn save(&self, bucket: &str, key: &str, data: Vec<u8>) -> StoreResult<()> {
        let mut buckets = self.buckets.write().await;
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), data);
        Ok(())
    }

    async fn update(&self, bucket: &str, key: &str, data: Vec<u8>) -> StoreResult<()> {
        let mut buckets = self.buckets.write().await;
        match buckets.get_mut(bucket).and_then(|rows| rows.get_mut(key)) {
            Some(existing) => {
                *existing = data;
                Ok(())
            }
            None => Err(StoreError::not_found(bucket, key).with_operation(StoreOperation::Update)),
        }
    }

    async fn delete(&self, bucket: &str, key: &str) -> StoreResult<()> {
        let mut buckets = self.buckets.write().await;
        buckets
            .get_mut(bucket)
            .and_then(|rows| rows.remove(key))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(bucket, key).with_operation(StoreOperation::Delete))
    }

    async fn list(&self, bucket: &str, page: PageRequest) -> StoreResult<Vec<StoredRecord>> {
        let buckets = self.buckets.read().await;
        let Some(rows) = buckets.get(bucket) else {
            return Ok(Vec::new());
        };

        let iter: Box<dyn Iterator<Item = (&String, &Vec<u8>)> + '_> = match &page.cursor {
            Cursor::Start => Box::new(rows.iter()),
            Cursor::After(marker) => Box::new(
                rows.range::<str, _>((Bound::Excluded(marker.as_str()), Bound::Unbounded)),
            ),
            Cursor::Before(marker) => Box::new(
                rows.range::<str, _>((Bound::Unbounded, Bound::Excluded(marker.as_str())))
                    .rev(),
            ),
        };

        Ok(iter
            .skip(page.skip)
            .take(page.limit)
            .map(|(key, data)| StoredRecord::new(key.clone(), data.clone()))
            .collect())
    }

    async fn stats(&self, bucket: &str) -> StoreResult<BucketStats> {
        let buckets = self.buckets.read().await;
        let key_count = buckets.get(bucket).map_or(0, |rows| rows.len() as u64);
        Ok(BucketStats { key_count })
    }
}
