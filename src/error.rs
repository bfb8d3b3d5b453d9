//! Error taxonomy shared by the catalog, resolver, store and HTTP layer.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

/// One rejected input field, shaped like the error objects of a body validator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: Value,
    pub msg: String,
    pub path: String,
    pub location: &'static str,
}

impl FieldError {
    pub fn body(path: &str, value: Value, msg: &str) -> Self {
        Self {
            kind: "field",
            value,
            msg: msg.to_string(),
            path: path.to_string(),
            location: "body",
        }
    }
}

/// Client input was malformed. Carries every failing field, not just the first.
#[derive(Debug, Clone, Error)]
#[error("invalid input: {}", summary(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} ({})", e.msg, e.path))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    pub fn single(error: FieldError) -> Self {
        Self {
            errors: vec![error],
        }
    }

    /// Whether any entry refers to `path`
    pub fn cites(&self, path: &str) -> bool {
        self.errors.iter().any(|e| e.path == path)
    }
}

/// The geolocation fallback could not produce a coordinate.
#[derive(Debug, Error)]
pub enum LocationFetchError {
    #[error("HTTP error! status: {status}")]
    Status { status: u16 },

    #[error("rate limited by geolocation provider after {retries} retries")]
    RetriesExhausted { retries: u32 },

    #[error("geolocation request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("invalid geolocation response: {0}")]
    Decode(String),

    #[error("geolocation provider error: {reason}")]
    Provider { reason: String },

    #[error("geolocation lookup cancelled")]
    Cancelled,

    #[error("geolocation lookup exceeded its {0:?} deadline")]
    DeadlineExceeded(Duration),
}

impl LocationFetchError {
    /// HTTP 429, the only failure the resolver retries
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LocationFetchError::Status { status: 429 })
    }
}

/// Persistence failure on read or write.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("school id {0} already exists")]
    Duplicate(String),
}

/// Failure of the create path.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Location(#[from] LocationFetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("template rendering failed: {0}")]
    Render(#[from] tera::Error),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(e) => AppError::Validation(e),
            CatalogError::Store(e) => AppError::Store(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(err) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": err.errors }))).into_response()
            }
            AppError::MalformedPayload(reason) => {
                (StatusCode::BAD_REQUEST, format!("Malformed payload: {}", reason)).into_response()
            }
            // already logged by the resolver
            AppError::Location(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error in DB or fetching location",
            )
                .into_response(),
            AppError::Store(err) => {
                error!("Store failure: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Error in DB").into_response()
            }
            AppError::Render(err) => {
                error!("Rendering failed: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Error rendering page").into_response()
            }
        }
    }
}
