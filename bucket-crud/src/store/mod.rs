//! Object store abstraction
//!
//! The CRUD handlers persist records through the [`ObjectStore`] trait: a
//! bucketed key-value store with point reads and writes, cursor-paged
//! listings and per-bucket statistics.
//!
//! # Features
//!
//! - **Store contract**: [`ObjectStore`] with get, save, update, delete, list and stats
//! - **Cursor paging**: [`PageRequest`] and [`Cursor`] for `afterKey` / `beforeKey` listings
//! - **Errors**: [`StoreError`] with operation and kind for status mapping
//! - **In-memory backend**: [`MemoryStore`] for tests, demos and prototypes
//!
//! # Example
//!
//! ```rust
//! use bucket_crud::store::{MemoryStore, ObjectStore, PageRequest};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = MemoryStore::new();
//! store.save("notes", "a", b"{}".to_vec()).await.unwrap();
//! store.save("notes", "b", b"{}".to_vec()).await.unwrap();
//!
//! let page = store.list("notes", PageRequest::after("a", 10)).await.unwrap();
//! assert_eq!(page.len(), 1);
//! assert_eq!(page[0].key, "b");
//! # }
//! ```

mod error;
mod memory;
mod pagination;
mod traits;

// Re-export all public types
pub use error::{StoreError, StoreErrorKind, StoreOperation};
pub use memory::MemoryStore;
pub use pagination::{Cursor, PageRequest};
pub use traits::{BucketStats, ObjectStore, StoreResult, StoredRecord};
