//! # bucket-crud
//!
//! Reusable CRUD request handlers for axum over a pluggable, bucketed
//! key-value store.
//!
//! Given a bucket name, an [`ObjectStore`](store::ObjectStore) and optional
//! per-resource hooks, a [`Crud`](handlers::Crud) value decodes request
//! bodies by content type, persists or reads records, and writes JSON
//! responses. Routing, server startup and lifecycle stay with the host
//! application.
//!
//! ## Features
//!
//! - **Content-type decoding**: JSON, vendor `+json` types and `multipart/form-data`
//! - **Cursor paging**: `_perPage`, `afterKey` and `beforeKey` with `X-Total-Count`
//! - **Hooks**: marshal, unmarshal, key derivation, success and error callbacks
//! - **Panic recovery**: create and update never unwind into the server
//! - **Configuration**: Figment with TOML files and `BUCKET_CRUD_` environment overrides
//! - **Observability**: structured `tracing` events with JSON output
//!
//! ## Example
//!
//! ```rust,no_run
//! use bucket_crud::prelude::*;
//!
//! async fn list(State(notes): State<Crud<MemoryStore>>, request: Request) -> std::result::Result<ListResponse, ApiError> {
//!     notes.get_all(&request.into_parts().0).await
//! }
//!
//! async fn create(State(notes): State<Crud<MemoryStore>>, request: Request) -> std::result::Result<ItemResponse, ApiError> {
//!     notes.post(request).await
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let notes = Crud::new("notes", MemoryStore::new()).with_config(config.crud.clone());
//!     let app = Router::new()
//!         .route("/notes", get(list).post(create))
//!         .with_state(notes);
//!
//!     let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.service.port)).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, CrudConfig, ServiceConfig};
    pub use crate::error::{Error, Result};
    pub use crate::observability::init_tracing;

    pub use crate::handlers::{
        ApiError, ApiErrorKind, ApiOperation, Crud, Decoded, Document, ErrorCtx, HookError,
        ItemResponse, ListResponse, MarshalError, Marshaled, Message, PageQuery, Results,
        SuccessCtx,
    };

    pub use crate::store::{
        BucketStats, Cursor, MemoryStore, ObjectStore, PageRequest, StoreError, StoreErrorKind,
        StoreOperation, StoreResult, StoredRecord,
    };

    pub use axum::{
        extract::{Path, Request, State},
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Json, Response},
        routing::{delete, get, post, put},
        Router,
    };

    pub use serde::{Deserialize, Serialize};

    // Re-export tracing macros and types
    pub use tracing::{debug, error, info, trace, warn};

    // Re-export tokio for async runtime
    pub use tokio;
}
