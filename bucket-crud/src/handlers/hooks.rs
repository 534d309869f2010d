//! Per-resource callbacks for the CRUD handlers
//!
//! Every hook is optional. Without a marshal or unmarshal hook the handlers
//! bind bodies and stored rows straight to the resource's record type.

use std::fmt;
use std::sync::Arc;

use axum::http::request::Parts;
use thiserror::Error;

use super::error::{ApiError, ApiOperation};
use super::response::Document;
use crate::store::StoredRecord;

/// Output of a marshal hook
#[derive(Debug, Clone, PartialEq)]
pub enum Marshaled {
    /// A new document to persist
    Created(Document),
    /// A replacement document, together with what it replaces
    Changed {
        /// The document being replaced
        old: Document,
        /// The document to persist
        new: Document,
    },
}

impl Marshaled {
    /// Split into `(existing, document to persist)`
    pub fn into_parts(self) -> (Option<Document>, Document) {
        match self {
            Self::Created(doc) => (None, doc),
            Self::Changed { old, new } => (Some(old), new),
        }
    }
}

/// Rejection returned by a marshal hook
///
/// With `details` the client receives
/// `{ "msg": "Malformed data", "error": details }`, otherwise
/// `{ "msg": message }`. Both are written as `400 Bad Request`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct MarshalError {
    /// Description of the problem
    pub message: String,
    /// Per-field problems
    pub details: Option<Document>,
}

impl MarshalError {
    /// Plain rejection
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    /// Rejection carrying structured details
    pub fn with_details(message: impl Into<String>, details: Document) -> Self {
        Self {
            message: message.into(),
            details: Some(details),
        }
    }
}

/// Failure reported by an unmarshal or success hook
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    /// Create a hook error
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Context handed to [`OnSuccess`]
#[derive(Debug, Clone, Copy)]
pub struct SuccessCtx<'a> {
    /// Operation that succeeded
    pub operation: ApiOperation,
    /// Bucket the operation ran against
    pub bucket: &'a str,
    /// Record key; `None` for listings
    pub key: Option<&'a str>,
    /// Previous document reported by the marshal hook on update
    pub existing: Option<&'a Document>,
    /// Document written to the client; `None` for listings and deletes
    pub result: Option<&'a Document>,
    /// The incoming request
    pub request: &'a Parts,
}

/// Context handed to [`OnError`]
#[derive(Debug, Clone, Copy)]
pub struct ErrorCtx<'a> {
    /// Bucket the operation ran against
    pub bucket: &'a str,
    /// Record key, when one was known
    pub key: Option<&'a str>,
    /// The incoming request
    pub request: &'a Parts,
}

/// Turn a decoded request body into the document to persist
pub type MarshalFn = Arc<dyn Fn(&Parts, Document) -> Result<Marshaled, MarshalError> + Send + Sync>;

/// Turn a stored row into the document written to the client
pub type UnmarshalFn =
    Arc<dyn Fn(&Parts, &StoredRecord) -> Result<Document, HookError> + Send + Sync>;

/// Derive the key of a record being created
pub type KeyFn = Arc<dyn Fn(&Document, &Parts) -> String + Send + Sync>;

/// Called after a successful operation; failures are logged only
pub type OnSuccess = Arc<dyn Fn(SuccessCtx<'_>) -> Result<(), HookError> + Send + Sync>;

/// Called before an error response is written
pub type OnError = Arc<dyn Fn(ErrorCtx<'_>, &ApiError) + Send + Sync>;

/// Default [`KeyFn`]: a time-ordered UUIDv7
pub fn uuid_key() -> KeyFn {
    Arc::new(|_, _| uuid::Uuid::now_v7().to_string())
}

/// The set of hooks configured for one resource
#[derive(Clone)]
pub struct Hooks {
    pub(crate) marshal: Option<MarshalFn>,
    pub(crate) unmarshal: Option<UnmarshalFn>,
    pub(crate) key: KeyFn,
    pub(crate) on_success: Option<OnSuccess>,
    pub(crate) on_error: Option<OnError>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            marshal: None,
            unmarshal: None,
            key: uuid_key(),
            on_success: None,
            on_error: None,
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("marshal", &self.marshal.is_some())
            .field("unmarshal", &self.unmarshal.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}
