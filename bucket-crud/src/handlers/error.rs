//! API error types for handler operations
//!
//! This module provides structured error types for the CRUD handlers, with
//! automatic HTTP status code mapping via `IntoResponse`.
//!
//! # Example
//!
//! ```rust
//! use bucket_crud::handlers::{ApiError, ApiErrorKind, ApiOperation};
//!
//! let error = ApiError::not_found(ApiOperation::Get, "notes", "n_123");
//! assert!(matches!(error.kind, ApiErrorKind::NotFound));
//! assert_eq!(error.message, "n_123 Not found");
//! ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::decode::DecodeError;
use super::hooks::MarshalError;
use super::response::Document;
use crate::store::{StoreError, StoreOperation};

/// Message returned when a typed record cannot be bound from the body
pub const BIND_FAILED_MESSAGE: &str = "Seems like the data submitted is not formatted properly";

/// Message returned when a write reaches the store but fails
pub const NOT_SAVED_MESSAGE: &str = "An error occured and this item could not be saved";

/// Handler operation being performed when the API error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// Reading one record
    Get,
    /// Listing a page of records
    List,
    /// Creating a record
    Create,
    /// Updating a record
    Update,
    /// Deleting a record
    Delete,
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::List => write!(f, "list"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Category of API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// The request's content type cannot be decoded
    UnsupportedContentType,
    /// The body could not be parsed, or a marshal hook rejected it
    MalformedPayload,
    /// The body could not be bound to the record type
    BadRequest,
    /// The store could not read the record
    NotFound,
    /// The store could not persist or remove the record
    StoreWrite,
    /// Hook, serialization or other internal failure
    InternalError,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedContentType => write!(f, "unsupported_content_type"),
            Self::MalformedPayload => write!(f, "malformed_payload"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::NotFound => write!(f, "not_found"),
            Self::StoreWrite => write!(f, "store_write"),
            Self::InternalError => write!(f, "internal_error"),
        }
    }
}

impl ApiErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::MalformedPayload | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::StoreWrite | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error kind
    #[must_use]
    pub fn error_code(&self) -> String {
        format!("{}", self).to_uppercase()
    }
}

/// Structured API error with operation context
///
/// # Example
///
/// ```rust
/// use bucket_crud::handlers::{ApiError, ApiOperation};
///
/// let error = ApiError::store_write(ApiOperation::Create, "disk full").with_key("notes", "n_1");
/// println!("{}", error); // "API store_write error during create: disk full [notes/n_1]"
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    /// The operation being performed when the error occurred
    pub operation: ApiOperation,
    /// The category of error
    pub kind: ApiErrorKind,
    /// Message written to the client as `msg`
    pub message: String,
    /// Structured details written to the client as `error`
    pub details: Option<Document>,
    /// The bucket involved
    pub bucket: Option<String>,
    /// The record key involved
    pub key: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(operation: ApiOperation, kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            details: None,
            bucket: None,
            key: None,
        }
    }

    /// `404 { "msg": "<key> Not found" }`
    pub fn not_found(
        operation: ApiOperation,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        let key = key.into();
        Self::new(operation, ApiErrorKind::NotFound, format!("{} Not found", key))
            .with_key(bucket, key)
    }

    /// Unsupported or unknown content type
    pub fn unsupported_content_type(operation: ApiOperation, message: impl Into<String>) -> Self {
        Self::new(operation, ApiErrorKind::UnsupportedContentType, message)
    }

    /// Body could not be parsed
    pub fn malformed(operation: ApiOperation, message: impl Into<String>) -> Self {
        Self::new(operation, ApiErrorKind::MalformedPayload, message)
    }

    /// Body could not be bound to the record type
    pub fn bind_failed(operation: ApiOperation) -> Self {
        Self::new(operation, ApiErrorKind::BadRequest, BIND_FAILED_MESSAGE)
    }

    /// Store write failure
    pub fn store_write(operation: ApiOperation, message: impl Into<String>) -> Self {
        Self::new(operation, ApiErrorKind::StoreWrite, message)
    }

    /// Internal failure
    pub fn internal(operation: ApiOperation, message: impl Into<String>) -> Self {
        Self::new(operation, ApiErrorKind::InternalError, message)
    }

    /// Attach bucket and key context
    #[must_use]
    pub fn with_key(mut self, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self.key = Some(key.into());
        self
    }

    /// Attach bucket context, keeping any key already set
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Attach structured details
    #[must_use]
    pub fn with_details(mut self, details: Document) -> Self {
        self.details = Some(details);
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: ApiOperation) -> Self {
        self.operation = operation;
        self
    }

    /// HTTP status this error is written with
    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.bucket, &self.key) {
            (Some(bucket), Some(key)) => write!(f, " [{}/{}]", bucket, key)?,
            (Some(bucket), None) => write!(f, " [{}]", bucket)?,
            _ => {}
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Response body for API errors
#[derive(Debug, Serialize, Deserialize)]
struct ApiErrorResponse {
    msg: String,
    code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Document>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();

        if status.is_server_error() {
            tracing::error!(
                operation = %self.operation,
                kind = %self.kind,
                bucket = ?self.bucket,
                key = ?self.key,
                "API error: {}", self.message
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                kind = %self.kind,
                bucket = ?self.bucket,
                key = ?self.key,
                "API error: {}", self.message
            );
        }

        let response = ApiErrorResponse {
            code: self.kind.error_code(),
            msg: self.message,
            error: self.details,
        };

        (status, Json(response)).into_response()
    }
}

fn store_operation_to_api_operation(op: StoreOperation) -> ApiOperation {
    match op {
        StoreOperation::Get => ApiOperation::Get,
        StoreOperation::List | StoreOperation::Stats => ApiOperation::List,
        StoreOperation::Save => ApiOperation::Create,
        StoreOperation::Update => ApiOperation::Update,
        StoreOperation::Delete => ApiOperation::Delete,
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let operation = store_operation_to_api_operation(err.operation);

        // Read failures surface as 404; every write failure hides the
        // backend message.
        let mut error = match err.operation {
            StoreOperation::Get => {
                let key = err.key.clone().unwrap_or_default();
                Self::new(operation, ApiErrorKind::NotFound, format!("{} Not found", key))
            }
            _ => Self::store_write(operation, NOT_SAVED_MESSAGE),
        };
        error.bucket = err.bucket;
        error.key = err.key;
        error
    }
}

impl From<DecodeError> for ApiError {
    fn from(err: DecodeError) -> Self {
        let message = err.to_string();
        match err {
            DecodeError::Unsupported(_) | DecodeError::Unknown(_) => {
                Self::unsupported_content_type(ApiOperation::Create, message)
            }
            DecodeError::Malformed(_) => Self::malformed(ApiOperation::Create, message),
            DecodeError::Body(_) => {
                Self::new(ApiOperation::Create, ApiErrorKind::BadRequest, message)
            }
        }
    }
}

impl From<MarshalError> for ApiError {
    fn from(err: MarshalError) -> Self {
        match err.details {
            Some(details) => Self::malformed(ApiOperation::Create, "Malformed data")
                .with_details(details),
            None => Self::malformed(ApiOperation::Create, err.message),
        }
    }
}
