//! HTTP handlers for bucketed CRUD resources
//!
//! This module binds axum's request/response cycle to an
//! [`ObjectStore`](crate::store::ObjectStore). A resource is one [`Crud`]
//! value: a bucket name, a store, optional hooks and the shared
//! [`CrudConfig`](crate::config::CrudConfig).
//!
//! # Features
//!
//! - **CRUD Handlers**: [`Crud`] with `get`, `get_all`, `post`, `put` and `delete`
//! - **Body Decoding**: [`decode_body`] and the [`Decoded`] extractor, keyed on `Content-Type`
//! - **Hooks**: marshal, unmarshal, key, success and error callbacks per resource
//! - **Cursor Paging**: [`PageQuery`] reads `_perPage`, `afterKey` and `beforeKey`
//! - **Error Handling**: [`ApiError`] with automatic HTTP status code mapping
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{extract::{Path, Request, State}, routing::get, Router};
//! use bucket_crud::handlers::{ApiError, Crud, ItemResponse, Marshaled, MarshalError};
//! use bucket_crud::store::MemoryStore;
//!
//! let notes = Crud::new("notes", MemoryStore::new())
//!     .with_marshal(|_, doc| {
//!         if doc.contains_key("title") {
//!             Ok(Marshaled::Created(doc))
//!         } else {
//!             Err(MarshalError::new("title is required"))
//!         }
//!     })
//!     .on_error(|ctx, error| tracing::warn!(bucket = ctx.bucket, "{}", error));
//!
//! async fn read(
//!     State(notes): State<Crud<MemoryStore>>,
//!     Path(key): Path<String>,
//!     request: Request,
//! ) -> Result<ItemResponse, ApiError> {
//!     notes.get(&key, &request.into_parts().0).await
//! }
//!
//! let app = Router::new().route("/notes/{key}", get(read)).with_state(notes);
//! ```

mod crud;
mod decode;
mod error;
mod hooks;
mod query;
mod response;

// Re-export all public types
pub use crud::Crud;
pub use decode::{content_type, decode_body, ContentKind, DecodeError, Decoded, DEFAULT_BODY_LIMIT};
pub use error::{ApiError, ApiErrorKind, ApiOperation, BIND_FAILED_MESSAGE, NOT_SAVED_MESSAGE};
pub use hooks::{
    uuid_key, ErrorCtx, HookError, Hooks, KeyFn, MarshalError, MarshalFn, Marshaled, OnError,
    OnSuccess, SuccessCtx, UnmarshalFn,
};
pub use query::PageQuery;
pub use response::{Document, ItemResponse, ListResponse, Message, Results, TOTAL_COUNT_HEADER};
