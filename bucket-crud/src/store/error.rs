//! Object store error types
//!
//! Structured errors returned by [`ObjectStore`](super::ObjectStore)
//! implementations. Each error records the operation being performed, a
//! coarse category, and the bucket/key involved so handlers can map it onto an
//! HTTP status without inspecting backend-specific messages.
//!
//! # Example
//!
//! ```rust
//! use bucket_crud::store::{StoreError, StoreErrorKind};
//!
//! let error = StoreError::not_found("notes", "n_123");
//! assert!(matches!(error.kind, StoreErrorKind::NotFound));
//! assert_eq!(error.key.as_deref(), Some("n_123"));
//! ```

use std::fmt;

/// Operation being performed when the store error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Reading a single record by key
    Get,
    /// Inserting or replacing a record
    Save,
    /// Replacing an existing record
    Update,
    /// Removing a record
    Delete,
    /// Reading a page of records
    List,
    /// Reading bucket statistics
    Stats,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Save => write!(f, "save"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::List => write!(f, "list"),
            Self::Stats => write!(f, "stats"),
        }
    }
}

/// Category of store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// No record stored under the key
    NotFound,
    /// The bucket does not exist
    BucketNotFound,
    /// A record already exists under the key
    AlreadyExists,
    /// The backend could not be reached
    ConnectionFailed,
    /// The backend did not answer in time
    Timeout,
    /// The backend rejected or failed the operation
    Backend,
    /// Record bytes could not be encoded or decoded
    Serialization,
    /// Other unclassified error
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::BucketNotFound => write!(f, "bucket_not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::Backend => write!(f, "backend"),
            Self::Serialization => write!(f, "serialization"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured store error with operation context
///
/// # Example
///
/// ```rust
/// use bucket_crud::store::{StoreError, StoreOperation};
///
/// let error = StoreError::backend(StoreOperation::Save, "disk full").with_key("notes", "n_1");
/// println!("{}", error); // "Store backend error during save: disk full [notes/n_1]"
///
/// if error.is_retriable() {
///     // Retry the operation
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// The operation being performed when the error occurred
    pub operation: StoreOperation,
    /// The category of error
    pub kind: StoreErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The bucket involved
    pub bucket: Option<String>,
    /// The record key involved
    pub key: Option<String>,
}

impl StoreError {
    /// Create a new store error
    ///
    /// # Example
    ///
    /// ```rust
    /// use bucket_crud::store::{StoreError, StoreErrorKind, StoreOperation};
    ///
    /// let error = StoreError::new(StoreOperation::Save, StoreErrorKind::Backend, "write rejected");
    /// assert!(error.bucket.is_none());
    /// ```
    pub fn new(operation: StoreOperation, kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            bucket: None,
            key: None,
        }
    }

    /// Create a "not found" error for a key read
    pub fn not_found(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(StoreOperation::Get, StoreErrorKind::NotFound, "Record not found")
            .with_key(bucket, key)
    }

    /// Create a "bucket not found" error
    pub fn bucket_not_found(operation: StoreOperation, bucket: impl Into<String>) -> Self {
        let mut error = Self::new(operation, StoreErrorKind::BucketNotFound, "Bucket not found");
        error.bucket = Some(bucket.into());
        error
    }

    /// Create a connection failed error
    pub fn connection_failed(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::ConnectionFailed, message)
    }

    /// Create a timeout error
    pub fn timeout(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::Timeout, message)
    }

    /// Create a backend error
    ///
    /// # Example
    ///
    /// ```rust
    /// use bucket_crud::store::{StoreError, StoreErrorKind, StoreOperation};
    ///
    /// let error = StoreError::backend(StoreOperation::Update, "read-only volume");
    /// assert_eq!(error.kind, StoreErrorKind::Backend);
    /// ```
    pub fn backend(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::Backend, message)
    }

    /// Create a serialization error
    pub fn serialization(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::Serialization, message)
    }

    /// Attach bucket and key context
    #[must_use]
    pub fn with_key(mut self, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self.key = Some(key.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: StoreOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    ///
    /// # Example
    ///
    /// ```rust
    /// use bucket_crud::store::{StoreError, StoreOperation};
    ///
    /// assert!(StoreError::timeout(StoreOperation::List, "slow disk").is_retriable());
    /// assert!(!StoreError::not_found("notes", "n_1").is_retriable());
    /// ```
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::ConnectionFailed | StoreErrorKind::Timeout
        )
    }

    /// Whether the record (or its bucket) is missing
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::NotFound | StoreErrorKind::BucketNotFound
        )
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Store {} error during {}: {}",
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

impl std::error::Error for StoreError {}
