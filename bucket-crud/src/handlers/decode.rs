//! Request body decoding keyed on `Content-Type`
//!
//! Bodies are decoded by media type: JSON (including vendor `+json` types)
//! and `multipart/form-data` are supported, URL-encoded forms and XML are
//! recognised but not implemented, and everything else is rejected as
//! unknown.
//!
//! # Example
//!
//! ```rust
//! use http::Method;
//! use bucket_crud::handlers::ContentKind;
//!
//! assert_eq!(
//!     ContentKind::classify(&Method::POST, "application/vid.api+json"),
//!     ContentKind::Json
//! );
//! assert_eq!(ContentKind::classify(&Method::POST, "text/plain"), ContentKind::Unknown);
//! ```

use axum::{
    body::Body,
    extract::{FromRequest, Request},
};
use http::{header::CONTENT_TYPE, request::Parts, HeaderMap, Method};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[cfg(feature = "multipart")]
use super::response::Document;
use super::error::ApiError;

/// Default cap on buffered request bodies (2 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Errors produced while decoding a request body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Recognised media type without a decoder
    #[error("unimplemented content-type: {0}")]
    Unsupported(String),

    /// Media type this crate knows nothing about
    #[error("unknown content-type: {0}")]
    Unknown(String),

    /// Body did not parse as the declared media type
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// Body could not be read
    #[error("unable to read request body: {0}")]
    Body(String),
}

impl DecodeError {
    /// Whether the failure is about the media type rather than the payload
    pub fn is_content_type(&self) -> bool {
        matches!(self, Self::Unsupported(_) | Self::Unknown(_))
    }
}

/// Decoder selected for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// `application/json` and `*/*+json`
    Json,
    /// `multipart/form-data`
    Multipart,
    /// Recognised, no decoder available
    Unsupported,
    /// Not recognised
    Unknown,
}

impl ContentKind {
    /// Pick the decoder for a method and bare media type
    pub fn classify(method: &Method, media_type: &str) -> Self {
        if method == Method::GET {
            return Self::Unsupported;
        }

        let media_type = media_type.to_ascii_lowercase();
        match media_type.as_str() {
            "application/json" => Self::Json,
            "multipart/form-data" => Self::Multipart,
            "application/x-www-form-urlencoded" | "application/xml" | "text/xml" => {
                Self::Unsupported
            }
            other if other.contains('/') && other.ends_with("+json") => Self::Json,
            _ => Self::Unknown,
        }
    }
}

/// Bare media type of a request, parameters stripped
///
/// Returns an empty string when the header is missing or not valid ASCII.
pub fn content_type(headers: &HeaderMap) -> &str {
    let value = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let end = value.find([' ', ';']).unwrap_or(value.len());
    &value[..end]
}

/// Decode a request body into `T` according to its content type
///
/// JSON and multipart bodies are buffered up to `limit` bytes.
///
/// # Errors
///
/// Returns [`DecodeError::Unsupported`] or [`DecodeError::Unknown`] when the
/// media type has no decoder, and [`DecodeError::Malformed`] or
/// [`DecodeError::Body`] when the payload cannot be read or parsed.
pub async fn decode_body<T>(parts: &Parts, body: Body, limit: usize) -> Result<T, DecodeError>
where
    T: DeserializeOwned,
{
    let media_type = content_type(&parts.headers);

    match ContentKind::classify(&parts.method, media_type) {
        ContentKind::Json => {
            let bytes = axum::body::to_bytes(body, limit)
                .await
                .map_err(|e| DecodeError::Body(e.to_string()))?;
            serde_json::from_slice(&bytes).map_err(|e| DecodeError::Malformed(e.to_string()))
        }
        #[cfg(feature = "multipart")]
        ContentKind::Multipart => {
            let fields = multipart_document(parts, body, limit).await?;
            serde_json::from_value(serde_json::Value::Object(fields))
                .map_err(|e| DecodeError::Malformed(e.to_string()))
        }
        #[cfg(not(feature = "multipart"))]
        ContentKind::Multipart => Err(DecodeError::Unsupported(media_type.to_string())),
        ContentKind::Unsupported => Err(DecodeError::Unsupported(media_type.to_string())),
        ContentKind::Unknown => Err(DecodeError::Unknown(media_type.to_string())),
    }
}

/// Collect multipart fields into a JSON object
///
/// The body is buffered up to `limit` bytes before parsing. Text fields
/// become strings. File parts become `{ "filename", "content_type", "size" }`.
#[cfg(feature = "multipart")]
async fn multipart_document(parts: &Parts, body: Body, limit: usize) -> Result<Document, DecodeError> {
    use multer::{parse_boundary, Multipart};
    use serde_json::{json, Value};

    let header = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let boundary = parse_boundary(header).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| DecodeError::Body(e.to_string()))?;
    let stream = futures::stream::once(async move { Ok::<_, std::io::Error>(bytes) });
    let mut multipart = Multipart::new(stream, boundary);

    let mut fields = Document::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DecodeError::Malformed(e.to_string()))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        let value = match field.file_name().map(str::to_owned) {
            Some(filename) => {
                let content_type = field.content_type().map(ToString::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| DecodeError::Body(e.to_string()))?;
                json!({
                    "filename": filename,
                    "content_type": content_type,
                    "size": bytes.len(),
                })
            }
            None => Value::String(
                field
                    .text()
                    .await
                    .map_err(|e| DecodeError::Malformed(e.to_string()))?,
            ),
        };
        fields.insert(name, value);
    }

    Ok(fields)
}

/// Extractor that decodes the body with [`decode_body`]
///
/// The extractor has no access to a resource's [`CrudConfig`], so bodies are
/// limited to [`DEFAULT_BODY_LIMIT`]. [`Crud`](super::Crud) operations use
/// `crud.body_limit_bytes` instead.
///
/// [`CrudConfig`]: crate::config::CrudConfig
///
/// ```rust,ignore
/// async fn create(Decoded(note): Decoded<Note>) -> impl IntoResponse {
///     Json(note)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Decoded<T>(pub T);

impl<S, T> FromRequest<S> for Decoded<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        decode_body(&parts, body, DEFAULT_BODY_LIMIT)
            .await
            .map(Decoded)
            .map_err(ApiError::from)
    }
}
