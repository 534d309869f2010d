//! CRUD operations over one bucket of an [`ObjectStore`]
//!
//! [`Crud`] holds a bucket name, a store, the resource's hooks and the shared
//! [`CrudConfig`]. Each operation takes the request (or its parts) and
//! returns a response type or an [`ApiError`], both of which implement
//! `IntoResponse`, so routes stay one-liners:
//!
//! ```rust,ignore
//! use axum::{extract::{Path, Request, State}, routing::get, Router};
//! use bucket_crud::handlers::{ApiError, Crud, ItemResponse, ListResponse};
//! use bucket_crud::store::MemoryStore;
//!
//! async fn list(State(crud): State<Crud<MemoryStore>>, request: Request) -> Result<ListResponse, ApiError> {
//!     crud.get_all(&request.into_parts().0).await
//! }
//!
//! async fn create(State(crud): State<Crud<MemoryStore>>, request: Request) -> Result<ItemResponse, ApiError> {
//!     crud.post(request).await
//! }
//!
//! let app = Router::new()
//!     .route("/notes", get(list).post(create))
//!     .with_state(Crud::new("notes", MemoryStore::new()));
//! ```
//!
//! Without hooks, request bodies and stored rows are bound to the record
//! type `R` (a plain JSON object by default). Hooks replace those bindings
//! per resource; see [`hooks`](super::hooks).

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::{body::Body, extract::Request, http::request::Parts};
use futures::FutureExt;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::decode::decode_body;
use super::error::{ApiError, ApiOperation};
use super::hooks::{ErrorCtx, HookError, Hooks, MarshalError, Marshaled, SuccessCtx};
use super::query::PageQuery;
use super::response::{Document, ItemResponse, ListResponse, Message, Results};
use crate::config::CrudConfig;
use crate::store::{ObjectStore, StoreOperation, StoredRecord};

/// CRUD handlers for one bucket
///
/// Cloning is cheap: the store and hooks are shared.
pub struct Crud<S, R = Document> {
    bucket: Arc<str>,
    store: Arc<S>,
    hooks: Hooks,
    config: CrudConfig,
    _record: PhantomData<fn() -> R>,
}

impl<S, R> Clone for Crud<S, R> {
    fn clone(&self) -> Self {
        Self {
            bucket: Arc::clone(&self.bucket),
            store: Arc::clone(&self.store),
            hooks: self.hooks.clone(),
            config: self.config.clone(),
            _record: PhantomData,
        }
    }
}

impl<S, R> fmt::Debug for Crud<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crud")
            .field("bucket", &self.bucket)
            .field("record", &std::any::type_name::<R>())
            .field("hooks", &self.hooks)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: ObjectStore> Crud<S> {
    /// Handlers for `bucket`, reading and writing plain JSON objects
    pub fn new(bucket: impl Into<String>, store: S) -> Self {
        Self::shared(bucket, Arc::new(store))
    }

    /// Like [`Crud::new`] with a store that is already shared
    pub fn shared(bucket: impl Into<String>, store: Arc<S>) -> Self {
        Self {
            bucket: Arc::from(bucket.into()),
            store,
            hooks: Hooks::default(),
            config: CrudConfig::default(),
            _record: PhantomData,
        }
    }
}

impl<S, R> Crud<S, R> {
    /// Bind bodies and stored rows to `T` when no hook is set
    pub fn with_record<T>(self) -> Crud<S, T> {
        Crud {
            bucket: self.bucket,
            store: self.store,
            hooks: self.hooks,
            config: self.config,
            _record: PhantomData,
        }
    }

    /// Convert request bodies into the document to persist
    #[must_use]
    pub fn with_marshal<F>(mut self, marshal: F) -> Self
    where
        F: Fn(&Parts, Document) -> Result<Marshaled, MarshalError> + Send + Sync + 'static,
    {
        self.hooks.marshal = Some(Arc::new(marshal));
        self
    }

    /// Convert stored rows into response documents
    #[must_use]
    pub fn with_unmarshal<F>(mut self, unmarshal: F) -> Self
    where
        F: Fn(&Parts, &StoredRecord) -> Result<Document, HookError> + Send + Sync + 'static,
    {
        self.hooks.unmarshal = Some(Arc::new(unmarshal));
        self
    }

    /// Derive keys for created records; defaults to a UUIDv7
    #[must_use]
    pub fn with_key<F>(mut self, key: F) -> Self
    where
        F: Fn(&Document, &Parts) -> String + Send + Sync + 'static,
    {
        self.hooks.key = Arc::new(key);
        self
    }

    /// Run after every successful operation
    #[must_use]
    pub fn on_success<F>(mut self, hook: F) -> Self
    where
        F: Fn(SuccessCtx<'_>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hooks.on_success = Some(Arc::new(hook));
        self
    }

    /// Run before every error response
    #[must_use]
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(ErrorCtx<'_>, &ApiError) + Send + Sync + 'static,
    {
        self.hooks.on_error = Some(Arc::new(hook));
        self
    }

    /// Replace the paging and body settings
    #[must_use]
    pub fn with_config(mut self, config: CrudConfig) -> Self {
        self.config = config;
        self
    }

    /// Bucket these handlers operate on
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Active settings
    pub fn config(&self) -> &CrudConfig {
        &self.config
    }
}

impl<S, R> Crud<S, R>
where
    S: ObjectStore,
    R: Serialize + DeserializeOwned + Send,
{
    /// Read one record
    ///
    /// Any store failure is reported as `404 { "msg": "<key> Not found" }`.
    pub async fn get(&self, key: &str, parts: &Parts) -> Result<ItemResponse, ApiError> {
        let start = Instant::now();

        let result = match AssertUnwindSafe(self.read(key, parts)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(self.recovered(ApiOperation::Get, Some(key), panic)),
        };

        self.finished(ApiOperation::Get, Some(key), start, &result);
        result
    }

    /// Read one page of records
    ///
    /// Paging is controlled by `_perPage`, `afterKey` and `beforeKey`. A
    /// listing the store cannot produce is written as an empty array.
    pub async fn get_all(&self, parts: &Parts) -> Result<ListResponse, ApiError> {
        let start = Instant::now();

        let result = match AssertUnwindSafe(self.list(parts)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(self.recovered(ApiOperation::List, None, panic)),
        };

        self.finished(ApiOperation::List, None, start, &result);
        result
    }

    /// Create a record from the request body
    ///
    /// A panic while handling the request becomes
    /// `500 { "msg": "Unable to create item" }`.
    pub async fn post(&self, request: Request) -> Result<ItemResponse, ApiError> {
        let start = Instant::now();
        let (parts, body) = request.into_parts();

        let result = match AssertUnwindSafe(self.create(&parts, body)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(self.recovered(ApiOperation::Create, None, panic)),
        };

        self.finished(ApiOperation::Create, None, start, &result);
        result
    }

    /// Write the request body under `key`, creating the record if needed
    ///
    /// A panic while handling the request becomes
    /// `500 { "msg": "Unable to edit item" }`.
    pub async fn put(&self, key: &str, request: Request) -> Result<ItemResponse, ApiError> {
        let start = Instant::now();
        let (parts, body) = request.into_parts();

        let result = match AssertUnwindSafe(self.update(key, &parts, body))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(self.recovered(ApiOperation::Update, Some(key), panic)),
        };

        self.finished(ApiOperation::Update, Some(key), start, &result);
        result
    }

    /// Remove the record stored under `key`
    pub async fn delete(&self, key: &str, parts: &Parts) -> Result<Message, ApiError> {
        let start = Instant::now();

        let result = match AssertUnwindSafe(self.remove(key, parts)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(self.recovered(ApiOperation::Delete, Some(key), panic)),
        };

        self.finished(ApiOperation::Delete, Some(key), start, &result);
        result
    }

    async fn remove(&self, key: &str, parts: &Parts) -> Result<Message, ApiError> {
        match self.store.delete(&self.bucket, key).await {
            Ok(()) => {
                self.notify_success(SuccessCtx {
                    operation: ApiOperation::Delete,
                    bucket: &self.bucket,
                    key: Some(key),
                    existing: None,
                    result: None,
                    request: parts,
                });
                Ok(Message::new(format!("The item [{}] was deleted", key)))
            }
            Err(err) => {
                tracing::warn!(bucket = %self.bucket, key = %key, error = %err, "Delete failed");
                let error = ApiError::store_write(
                    ApiOperation::Delete,
                    format!("The item [{}] was not deleted", key),
                );
                Err(self.fail(error, Some(key), parts))
            }
        }
    }

    async fn read(&self, key: &str, parts: &Parts) -> Result<ItemResponse, ApiError> {
        let record = match self.store.get(&self.bucket, key).await {
            Ok(record) => record,
            Err(err) => {
                tracing::debug!(bucket = %self.bucket, key = %key, error = %err, "Read failed");
                let error = ApiError::not_found(ApiOperation::Get, self.bucket(), key);
                return Err(self.fail(error, Some(key), parts));
            }
        };

        let doc = self
            .unmarshal(parts, &record, ApiOperation::Get)
            .map_err(|e| self.fail(e, Some(key), parts))?;
        let response = ItemResponse::new(doc).with_key(record.key);

        self.notify_success(SuccessCtx {
            operation: ApiOperation::Get,
            bucket: &self.bucket,
            key: Some(key),
            existing: None,
            result: Some(&response.data),
            request: parts,
        });
        Ok(response)
    }

    async fn list(&self, parts: &Parts) -> Result<ListResponse, ApiError> {
        let query = PageQuery::from_uri(&parts.uri);
        let page_size = query.page_size(&self.config);
        let page = query.page_request(&self.config);
        let backward = page.cursor.is_backward();

        let rows = match self.store.list(&self.bucket, page).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(bucket = %self.bucket, error = %err, "List failed");
                let error = ApiError::internal(ApiOperation::List, "Unable to list items");
                self.fail(error, None, parts);
                return Ok(ListResponse::Empty);
            }
        };

        let mut data = Vec::with_capacity(rows.len().min(page_size));
        for record in rows.into_iter().take(page_size) {
            match self.unmarshal(parts, &record, ApiOperation::List) {
                Ok(doc) => data.push(ItemResponse::new(doc).with_key(record.key).data),
                Err(error) if self.hooks.unmarshal.is_some() => {
                    tracing::warn!(
                        bucket = %self.bucket,
                        key = %record.key,
                        error = %error.message,
                        "Skipping row rejected by unmarshal hook"
                    );
                }
                Err(error) => return Err(self.fail(error, Some(record.key.as_str()), parts)),
            }
        }

        if data.is_empty() {
            return Ok(ListResponse::Empty);
        }
        if backward {
            data.reverse();
        }

        let total_count = match self.store.stats(&self.bucket).await {
            Ok(stats) => stats.key_count,
            Err(err) => {
                tracing::warn!(bucket = %self.bucket, error = %err, "Stats failed");
                0
            }
        };

        self.notify_success(SuccessCtx {
            operation: ApiOperation::List,
            bucket: &self.bucket,
            key: None,
            existing: None,
            result: None,
            request: parts,
        });

        Ok(ListResponse::page(
            Results::new(data, total_count),
            self.config.total_count_header,
        ))
    }

    async fn create(&self, parts: &Parts, body: Body) -> Result<ItemResponse, ApiError> {
        let operation = ApiOperation::Create;
        let (_, mut doc) = self
            .marshal_body(operation, parts, body)
            .await
            .map_err(|e| self.fail(e, None, parts))?;
        doc.remove("key");

        let key = (self.hooks.key)(&doc, parts);
        if key.is_empty() {
            let error = ApiError::internal(operation, "Unable to derive a key for this item");
            return Err(self.fail(error, None, parts));
        }

        let bytes = encode(&doc, operation).map_err(|e| self.fail(e, Some(key.as_str()), parts))?;
        if let Err(err) = self.store.save(&self.bucket, &key, bytes).await {
            let err = err
                .with_operation(StoreOperation::Save)
                .with_key(self.bucket(), key.as_str());
            return Err(self.fail(err.into(), Some(key.as_str()), parts));
        }

        let response = ItemResponse::new(doc).with_key(key.as_str());
        self.notify_success(SuccessCtx {
            operation,
            bucket: &self.bucket,
            key: Some(key.as_str()),
            existing: None,
            result: Some(&response.data),
            request: parts,
        });
        Ok(response)
    }

    async fn update(&self, key: &str, parts: &Parts, body: Body) -> Result<ItemResponse, ApiError> {
        let operation = ApiOperation::Update;
        let (existing, mut doc) = self
            .marshal_body(operation, parts, body)
            .await
            .map_err(|e| self.fail(e, Some(key), parts))?;
        doc.remove("key");

        let bytes = encode(&doc, operation).map_err(|e| self.fail(e, Some(key), parts))?;
        if let Err(err) = self.store.save(&self.bucket, key, bytes).await {
            let err = err
                .with_operation(StoreOperation::Update)
                .with_key(self.bucket(), key);
            return Err(self.fail(err.into(), Some(key), parts));
        }

        let response = ItemResponse::new(doc).with_key(key);
        self.notify_success(SuccessCtx {
            operation,
            bucket: &self.bucket,
            key: Some(key),
            existing: existing.as_ref(),
            result: Some(&response.data),
            request: parts,
        });
        Ok(response)
    }

    /// Decode the body and turn it into `(existing, document to persist)`
    async fn marshal_body(
        &self,
        operation: ApiOperation,
        parts: &Parts,
        body: Body,
    ) -> Result<(Option<Document>, Document), ApiError> {
        let limit = self.config.body_limit_bytes;

        if let Some(marshal) = &self.hooks.marshal {
            let input: Document = decode_body(parts, body, limit)
                .await
                .map_err(|e| ApiError::from(e).with_operation(operation))?;
            let marshaled =
                marshal(parts, input).map_err(|e| ApiError::from(e).with_operation(operation))?;
            return Ok(marshaled.into_parts());
        }

        let record: R = decode_body(parts, body, limit).await.map_err(|e| {
            if e.is_content_type() {
                ApiError::from(e).with_operation(operation)
            } else {
                tracing::debug!(bucket = %self.bucket, error = %e, "Bind failed");
                ApiError::bind_failed(operation)
            }
        })?;
        Ok((None, to_document(&record, operation)?))
    }

    fn unmarshal(
        &self,
        parts: &Parts,
        record: &StoredRecord,
        operation: ApiOperation,
    ) -> Result<Document, ApiError> {
        if let Some(unmarshal) = &self.hooks.unmarshal {
            return unmarshal(parts, record)
                .map_err(|e| ApiError::internal(operation, e.to_string()));
        }

        let value: R = serde_json::from_slice(&record.data).map_err(|e| {
            tracing::error!(bucket = %self.bucket, key = %record.key, error = %e, "Stored row does not decode");
            ApiError::internal(operation, "Unable to read item")
        })?;
        to_document(&value, operation)
    }
}

impl<S, R> Crud<S, R> {
    /// Attach context to an error and hand it to the error hook
    fn fail(&self, mut error: ApiError, key: Option<&str>, parts: &Parts) -> ApiError {
        error.bucket = Some(self.bucket.to_string());
        if error.key.is_none() {
            error.key = key.map(str::to_owned);
        }

        if let Some(on_error) = &self.hooks.on_error {
            on_error(
                ErrorCtx {
                    bucket: &self.bucket,
                    key,
                    request: parts,
                },
                &error,
            );
        }
        error
    }

    fn notify_success(&self, ctx: SuccessCtx<'_>) {
        if let Some(on_success) = &self.hooks.on_success {
            if let Err(err) = on_success(ctx) {
                tracing::warn!(
                    bucket = %self.bucket,
                    key = ?ctx.key,
                    operation = %ctx.operation,
                    error = %err,
                    "Success hook failed"
                );
            }
        }
    }

    fn recovered(
        &self,
        operation: ApiOperation,
        key: Option<&str>,
        panic: Box<dyn Any + Send>,
    ) -> ApiError {
        tracing::error!(
            bucket = %self.bucket,
            key = ?key,
            operation = %operation,
            panic = %panic_message(panic.as_ref()),
            "Recovered from panic"
        );

        let message = match operation {
            ApiOperation::Get => "Unable to read item",
            ApiOperation::List => "Unable to list items",
            ApiOperation::Create => "Unable to create item",
            ApiOperation::Update => "Unable to edit item",
            ApiOperation::Delete => "Unable to delete item",
        };
        let mut error = ApiError::internal(operation, message).with_bucket(self.bucket());
        error.key = key.map(str::to_owned);
        error
    }

    fn finished<T>(
        &self,
        operation: ApiOperation,
        key: Option<&str>,
        start: Instant,
        result: &Result<T, ApiError>,
    ) {
        tracing::debug!(
            bucket = %self.bucket,
            key = ?key,
            operation = %operation,
            elapsed_ms = start.elapsed().as_millis() as u64,
            status = %result.as_ref().map_or_else(|e| e.status_code().as_u16(), |_| 200),
            "Request handled"
        );
    }
}

fn to_document<T: Serialize>(value: &T, operation: ApiOperation) -> Result<Document, ApiError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(_) => Err(ApiError::internal(operation, "Item is not a JSON object")),
        Err(e) => Err(ApiError::internal(operation, e.to_string())),
    }
}

fn encode(doc: &Document, operation: ApiOperation) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(doc).map_err(|e| ApiError::internal(operation, e.to_string()))
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use axum::{
        body::to_bytes,
        extract::{Path, State},
        http::{header::CONTENT_TYPE, HeaderMap, Method, StatusCode},
        routing::get,
        Router,
    };
    use serde::Deserialize;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::handlers::error::{BIND_FAILED_MESSAGE, NOT_SAVED_MESSAGE};
    use crate::handlers::TOTAL_COUNT_HEADER;
    use crate::store::{BucketStats, MemoryStore, PageRequest, StoreError, StoreResult};

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Note {
        title: String,
    }

    /// Store whose every call fails
    struct FailingStore;

    impl ObjectStore for FailingStore {
        async fn get(&self, bucket: &str, key: &str) -> StoreResult<StoredRecord> {
            Err(StoreError::connection_failed(StoreOperation::Get, "refused").with_key(bucket, key))
        }

        async fn save(&self, _bucket: &str, _key: &str, _data: Vec<u8>) -> StoreResult<()> {
            Err(StoreError::backend(StoreOperation::Save, "disk full"))
        }

        async fn update(&self, _bucket: &str, _key: &str, _data: Vec<u8>) -> StoreResult<()> {
            Err(StoreError::backend(StoreOperation::Update, "disk full"))
        }

        async fn delete(&self, _bucket: &str, _key: &str) -> StoreResult<()> {
            Err(StoreError::backend(StoreOperation::Delete, "read-only"))
        }

        async fn list(&self, _bucket: &str, _page: PageRequest) -> StoreResult<Vec<StoredRecord>> {
            Err(StoreError::timeout(StoreOperation::List, "5s"))
        }

        async fn stats(&self, _bucket: &str) -> StoreResult<BucketStats> {
            Err(StoreError::timeout(StoreOperation::Stats, "5s"))
        }
    }

    async fn list<S, R>(
        State(crud): State<Crud<S, R>>,
        request: Request,
    ) -> Result<ListResponse, ApiError>
    where
        S: ObjectStore + 'static,
        R: Serialize + DeserializeOwned + Send + 'static,
    {
        crud.get_all(&request.into_parts().0).await
    }

    async fn create<S, R>(
        State(crud): State<Crud<S, R>>,
        request: Request,
    ) -> Result<ItemResponse, ApiError>
    where
        S: ObjectStore + 'static,
        R: Serialize + DeserializeOwned + Send + 'static,
    {
        crud.post(request).await
    }

    async fn read<S, R>(
        State(crud): State<Crud<S, R>>,
        Path(key): Path<String>,
        request: Request,
    ) -> Result<ItemResponse, ApiError>
    where
        S: ObjectStore + 'static,
        R: Serialize + DeserializeOwned + Send + 'static,
    {
        crud.get(&key, &request.into_parts().0).await
    }

    async fn replace<S, R>(
        State(crud): State<Crud<S, R>>,
        Path(key): Path<String>,
        request: Request,
    ) -> Result<ItemResponse, ApiError>
    where
        S: ObjectStore + 'static,
        R: Serialize + DeserializeOwned + Send + 'static,
    {
        crud.put(&key, request).await
    }

    async fn remove<S, R>(
        State(crud): State<Crud<S, R>>,
        Path(key): Path<String>,
        request: Request,
    ) -> Result<Message, ApiError>
    where
        S: ObjectStore + 'static,
        R: Serialize + DeserializeOwned + Send + 'static,
    {
        crud.delete(&key, &request.into_parts().0).await
    }

    fn router<S, R>(crud: Crud<S, R>) -> Router
    where
        S: ObjectStore + 'static,
        R: Serialize + DeserializeOwned + Send + 'static,
    {
        Router::new()
            .route("/notes", get(list::<S, R>).post(create::<S, R>))
            .route(
                "/notes/{key}",
                get(read::<S, R>).put(replace::<S, R>).delete(remove::<S, R>),
            )
            .with_state(crud)
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: Method, uri: &str) -> Request {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, request: Request) -> (StatusCode, HeaderMap, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    async fn seeded(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..n {
            let doc = json!({ "n": i });
            store
                .save("notes", &format!("k{:02}", i), serde_json::to_vec(&doc).unwrap())
                .await
                .unwrap();
        }
        store
    }

    fn keys(body: &Value) -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|doc| doc["key"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_get_returns_document_with_key() {
        let store = MemoryStore::new();
        store
            .save("notes", "n_1", br#"{"title":"hello"}"#.to_vec())
            .await
            .unwrap();
        let app = router(Crud::new("notes", store));

        let (status, _, body) = send(&app, empty_request(Method::GET, "/notes/n_1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"title": "hello", "key": "n_1"}));
    }

    #[tokio::test]
    async fn test_get_store_failure_is_404() {
        let app = router(Crud::new("notes", FailingStore));

        let (status, _, body) = send(&app, empty_request(Method::GET, "/notes/n_1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["msg"], "n_1 Not found");
    }

    #[tokio::test]
    async fn test_get_missing_record_is_404() {
        let app = router(Crud::new("notes", MemoryStore::new()));

        let (status, _, body) = send(&app, empty_request(Method::GET, "/notes/ghost")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["msg"], "ghost Not found");
    }

    #[tokio::test]
    async fn test_get_undecodable_row_is_500() {
        let store = MemoryStore::new();
        store.save("notes", "bad", b"not json".to_vec()).await.unwrap();
        let app = router(Crud::new("notes", store));

        let (status, _, _) = send(&app, empty_request(Method::GET, "/notes/bad")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_post_creates_record() {
        let store = MemoryStore::new();
        let app = router(Crud::new("notes", store.clone()));

        let (status, _, body) = send(
            &app,
            json_request(Method::POST, "/notes", json!({"title": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "hello");

        let key = body["key"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(key).is_ok());
        let stored = store.get("notes", key).await.unwrap();
        let stored: Value = serde_json::from_slice(&stored.data).unwrap();
        assert_eq!(stored, json!({"title": "hello"}));
    }

    #[tokio::test]
    async fn test_post_vendor_json() {
        let app = router(Crud::new("notes", MemoryStore::new()));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/notes")
            .header(CONTENT_TYPE, "application/vid.api+json; charset=utf-8")
            .body(Body::from(r#"{"title":"hello"}"#))
            .unwrap();

        let (status, _, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_post_unknown_content_type_is_415() {
        let app = router(Crud::new("notes", MemoryStore::new()));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/notes")
            .header(CONTENT_TYPE, "text/plain")
            .body(Body::from("hello"))
            .unwrap();

        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["msg"], "unknown content-type: text/plain");
    }

    #[tokio::test]
    async fn test_post_store_failure_is_500() {
        let app = router(Crud::new("notes", FailingStore));

        let (status, _, body) = send(
            &app,
            json_request(Method::POST, "/notes", json!({"title": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["msg"], NOT_SAVED_MESSAGE);
    }

    #[tokio::test]
    async fn test_put_store_failure_is_500() {
        let app = router(Crud::new("notes", FailingStore));

        let (status, _, _) = send(
            &app,
            json_request(Method::PUT, "/notes/n_1", json!({"title": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_put_unknown_key_creates_record() {
        let app = router(Crud::new("notes", MemoryStore::new()));

        let (status, _, body) = send(
            &app,
            json_request(Method::PUT, "/notes/fresh", json!({"title": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"title": "hello", "key": "fresh"}));

        let (status, _, body) = send(&app, empty_request(Method::GET, "/notes/fresh")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "hello");
    }

    #[tokio::test]
    async fn test_client_key_is_not_stored() {
        let store = MemoryStore::new();
        let app = router(Crud::new("notes", store.clone()));

        let (_, _, body) = send(
            &app,
            json_request(Method::POST, "/notes", json!({"title": "a", "key": "spoofed"})),
        )
        .await;
        let key = body["key"].as_str().unwrap();
        assert_ne!(key, "spoofed");
        let stored: Value =
            serde_json::from_slice(&store.get("notes", key).await.unwrap().data).unwrap();
        assert_eq!(stored, json!({"title": "a"}));

        send(
            &app,
            json_request(Method::PUT, "/notes/n_1", json!({"title": "b", "key": "other"})),
        )
        .await;
        let stored: Value =
            serde_json::from_slice(&store.get("notes", "n_1").await.unwrap().data).unwrap();
        assert_eq!(stored, json!({"title": "b"}));
        assert!(store.get("notes", "other").await.is_err());
    }

    #[tokio::test]
    async fn test_put_replaces_record() {
        let store = seeded(1).await;
        let app = router(Crud::new("notes", store.clone()));

        let (status, _, body) = send(
            &app,
            json_request(Method::PUT, "/notes/k00", json!({"n": 42})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"n": 42, "key": "k00"}));

        let stored: Value =
            serde_json::from_slice(&store.get("notes", "k00").await.unwrap().data).unwrap();
        assert_eq!(stored, json!({"n": 42}));
    }

    #[tokio::test]
    async fn test_typed_record_bind_failure_is_400() {
        let app = router(Crud::new("notes", MemoryStore::new()).with_record::<Note>());

        let (status, _, body) = send(
            &app,
            json_request(Method::POST, "/notes", json!({"body": "no title"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["msg"], BIND_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_typed_record_round_trip() {
        let app = router(Crud::new("notes", MemoryStore::new()).with_record::<Note>());

        let (_, _, created) = send(
            &app,
            json_request(Method::POST, "/notes", json!({"title": "typed", "extra": true})),
        )
        .await;
        let key = created["key"].as_str().unwrap();
        assert!(created.get("extra").is_none());

        let (status, _, body) =
            send(&app, empty_request(Method::GET, &format!("/notes/{}", key))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"title": "typed", "key": key}));
    }

    #[tokio::test]
    async fn test_marshal_rejection_with_details() {
        let crud = Crud::new("notes", MemoryStore::new()).with_marshal(|_, doc| {
            if doc.contains_key("title") {
                return Ok(Marshaled::Created(doc));
            }
            let mut details = Document::new();
            details.insert("title".into(), json!("is required"));
            Err(MarshalError::with_details("invalid note", details))
        });
        let app = router(crud);

        let (status, _, body) =
            send(&app, json_request(Method::POST, "/notes", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["msg"], "Malformed data");
        assert_eq!(body["error"], json!({"title": "is required"}));
    }

    #[tokio::test]
    async fn test_marshal_panic_is_500() {
        let crud = Crud::new("notes", MemoryStore::new())
            .with_marshal(|_, _| -> Result<Marshaled, MarshalError> { panic!("boom") });
        let app = router(crud);

        let (status, _, body) =
            send(&app, json_request(Method::POST, "/notes", json!({"title": "a"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["msg"], "Unable to create item");

        let (status, _, body) =
            send(&app, json_request(Method::PUT, "/notes/a", json!({"title": "a"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["msg"], "Unable to edit item");
    }

    #[tokio::test]
    async fn test_unmarshal_panic_is_500() {
        let crud = Crud::new("notes", seeded(2).await)
            .with_unmarshal(|_, _| -> Result<Document, HookError> { panic!("boom") });
        let app = router(crud);

        let (status, _, body) = send(&app, empty_request(Method::GET, "/notes/k00")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["msg"], "Unable to read item");

        let (status, _, body) = send(&app, empty_request(Method::GET, "/notes")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["msg"], "Unable to list items");
    }

    #[tokio::test]
    async fn test_success_hook_panic_on_delete_is_500() {
        let store = seeded(1).await;
        let crud = Crud::new("notes", store.clone())
            .on_success(|_| -> Result<(), HookError> { panic!("boom") });

        let parts = empty_request(Method::DELETE, "/notes/k00").into_parts().0;
        let result = AssertUnwindSafe(crud.delete("k00", &parts))
            .catch_unwind()
            .await;

        let error = result.expect("panic escaped delete").unwrap_err();
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.message, "Unable to delete item");
        assert_eq!(error.key.as_deref(), Some("k00"));
        assert!(store.get("notes", "k00").await.is_err());
    }

    #[tokio::test]
    async fn test_key_hook() {
        let store = MemoryStore::new();
        let crud = Crud::new("notes", store.clone()).with_key(|doc, _| {
            doc.get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_lowercase()
        });
        let app = router(crud);

        let (status, _, body) = send(
            &app,
            json_request(Method::POST, "/notes", json!({"title": "Hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["key"], "hello");
        assert!(store.get("notes", "hello").await.is_ok());

        let (status, _, _) = send(&app, json_request(Method::POST, "/notes", json!({}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_success_hook_sees_existing_on_update() {
        let store = seeded(1).await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);

        let crud = Crud::new("notes", store)
            .with_marshal(|_, new| {
                let mut old = Document::new();
                old.insert("n".into(), json!(0));
                Ok(Marshaled::Changed { old, new })
            })
            .on_success(move |ctx| {
                captured.lock().unwrap().push((
                    ctx.operation,
                    ctx.key.map(str::to_owned),
                    ctx.existing.cloned(),
                ));
                Err(HookError::new("ignored"))
            });
        let app = router(crud);

        let (status, _, _) =
            send(&app, json_request(Method::PUT, "/notes/k00", json!({"n": 1}))).await;
        assert_eq!(status, StatusCode::OK);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, ApiOperation::Update);
        assert_eq!(seen[0].1.as_deref(), Some("k00"));
        assert_eq!(seen[0].2.as_ref().unwrap()["n"], 0);
    }

    #[tokio::test]
    async fn test_error_hook_receives_context() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let crud = Crud::new("notes", FailingStore).on_error(move |ctx, error| {
            captured.lock().unwrap().push((
                ctx.bucket.to_string(),
                ctx.key.map(str::to_owned),
                error.status_code(),
            ));
        });
        let app = router(crud);

        send(&app, empty_request(Method::GET, "/notes/n_1")).await;
        send(&app, json_request(Method::POST, "/notes", json!({"title": "a"}))).await;
        send(&app, json_request(Method::PUT, "/notes/n_2", json!({"title": "b"}))).await;
        send(&app, empty_request(Method::DELETE, "/notes/n_3")).await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert!(seen.iter().all(|(bucket, _, _)| bucket == "notes"));
        assert_eq!(seen[0].1.as_deref(), Some("n_1"));
        assert_eq!(seen[0].2, StatusCode::NOT_FOUND);
        assert!(seen[1].1.is_some());
        assert_eq!(seen[1].2, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(seen[2].1.as_deref(), Some("n_2"));
        assert_eq!(seen[2].2, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(seen[3].1.as_deref(), Some("n_3"));
        assert_eq!(seen[3].2, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_error_hook_on_marshal_rejection() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let crud = Crud::new("notes", MemoryStore::new())
            .with_marshal(|_, _| Err(MarshalError::new("title is required")))
            .on_error(move |ctx, error| {
                captured.lock().unwrap().push((
                    ctx.bucket.to_string(),
                    ctx.key.map(str::to_owned),
                    error.status_code(),
                ));
            });
        let app = router(crud);

        send(&app, json_request(Method::POST, "/notes", json!({}))).await;
        send(&app, json_request(Method::PUT, "/notes/n_1", json!({}))).await;

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen.as_slice(),
            &[
                ("notes".to_string(), None, StatusCode::BAD_REQUEST),
                ("notes".to_string(), Some("n_1".to_string()), StatusCode::BAD_REQUEST),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_all_first_page() {
        let app = router(Crud::new("notes", seeded(25).await));

        let (status, headers, body) =
            send(&app, empty_request(Method::GET, "/notes")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[TOTAL_COUNT_HEADER], "25");
        assert_eq!(body["count"], 10);
        assert_eq!(body["total_count"], 25);
        assert_eq!(keys(&body).first().map(String::as_str), Some("k00"));
        assert_eq!(keys(&body).last().map(String::as_str), Some("k09"));
    }

    #[tokio::test]
    async fn test_get_all_after_key() {
        let app = router(Crud::new("notes", seeded(25).await));

        let (_, _, body) =
            send(&app, empty_request(Method::GET, "/notes?afterKey=k19&_perPage=10")).await;
        assert_eq!(keys(&body), vec!["k20", "k21", "k22", "k23", "k24"]);
        assert_eq!(body["count"], 5);
    }

    #[tokio::test]
    async fn test_get_all_before_key_is_ascending() {
        let app = router(Crud::new("notes", seeded(25).await));

        let (_, _, body) =
            send(&app, empty_request(Method::GET, "/notes?beforeKey=k10&_perPage=3")).await;
        assert_eq!(keys(&body), vec!["k07", "k08", "k09"]);
    }

    #[tokio::test]
    async fn test_get_all_empty_bucket() {
        let app = router(Crud::new("notes", MemoryStore::new()));

        let (status, headers, body) = send(&app, empty_request(Method::GET, "/notes")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers.get(TOTAL_COUNT_HEADER).is_none());
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_get_all_store_failure_is_empty_list() {
        let failures = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&failures);
        let crud = Crud::new("notes", FailingStore).on_error(move |_, _| {
            *counter.lock().unwrap() += 1;
        });
        let app = router(crud);

        let (status, _, body) = send(&app, empty_request(Method::GET, "/notes")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
        assert_eq!(*failures.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_all_unmarshal_hook_skips_rejected_rows() {
        let crud = Crud::new("notes", seeded(4).await).with_unmarshal(|_, record| {
            if record.key == "k01" {
                return Err(HookError::new("hidden"));
            }
            let mut doc = Document::new();
            doc.insert("size".into(), json!(record.data.len()));
            Ok(doc)
        });
        let app = router(crud);

        let (_, _, body) = send(&app, empty_request(Method::GET, "/notes")).await;
        assert_eq!(keys(&body), vec!["k00", "k02", "k03"]);
        assert_eq!(body["count"], 3);
        assert_eq!(body["total_count"], 4);
        assert!(body["data"][0]["size"].is_number());
    }

    #[tokio::test]
    async fn test_get_all_without_count_header() {
        let config = CrudConfig {
            total_count_header: false,
            ..CrudConfig::default()
        };
        let app = router(Crud::new("notes", seeded(2).await).with_config(config));

        let (_, headers, body) = send(&app, empty_request(Method::GET, "/notes")).await;
        assert!(headers.get(TOTAL_COUNT_HEADER).is_none());
        assert_eq!(body["total_count"], 2);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = seeded(1).await;
        let app = router(Crud::new("notes", store.clone()));

        let (status, _, body) = send(&app, empty_request(Method::DELETE, "/notes/k00")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"msg": "The item [k00] was deleted"}));
        assert!(store.get("notes", "k00").await.is_err());

        let (status, _, body) = send(&app, empty_request(Method::DELETE, "/notes/k00")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["msg"], "The item [k00] was not deleted");
    }

    #[test]
    fn test_panic_message() {
        let panic: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(panic.as_ref()), "boom");
        let panic: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(panic.as_ref()), "bang");
        let panic: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(panic.as_ref()), "unknown panic");
    }
}
