//! HTTP surface.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{FromRequest, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{Html, Json},
    routing::get,
    Form, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::catalog::{CoordinateInput, SchoolInput};
use crate::error::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(welcome_handler))
        .route("/health", get(health_handler))
        .route("/listSchools", get(list_handler).post(ranked_list_handler))
        .route("/addSchool", get(add_form_handler).post(add_school_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Request body accepted as JSON or as an urlencoded form.
///
/// A POST without a content type is treated as an empty body.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned + Default + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::MalformedPayload(e.body_text()))?;
            Ok(Payload(value))
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::MalformedPayload(e.body_text()))?;
            Ok(Payload(value))
        } else if content_type.is_empty() {
            Ok(Payload(T::default()))
        } else {
            Err(AppError::MalformedPayload(format!(
                "unsupported content type '{}'",
                content_type
            )))
        }
    }
}

async fn welcome_handler() -> &'static str {
    "Welcome to the school project!"
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    store: bool,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let healthy = state.store.ping().await.is_ok();

    Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        store: healthy,
    })
}

/// All schools, unordered
async fn list_handler(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let schools = state.catalog.list().await?;
    Ok(Html(state.views.list(&schools)?))
}

/// All schools, nearest first from the posted or geolocated coordinate
async fn ranked_list_handler(
    State(state): State<Arc<AppState>>,
    Payload(input): Payload<CoordinateInput>,
) -> Result<Html<String>, AppError> {
    let (lat, lon) = input.parse()?;

    let cancel = state.shutdown.child_token();
    let origin = state.resolver.resolve(lat, lon, &cancel).await?;
    let ranked = state.proximity.rank_by_distance(origin.point).await?;

    Ok(Html(state.views.ranked(&origin, &ranked)?))
}

async fn add_form_handler(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    Ok(Html(state.views.add_form()?))
}

#[derive(Serialize)]
struct CreatedResponse {
    message: &'static str,
    id: String,
}

async fn add_school_handler(
    State(state): State<Arc<AppState>>,
    Payload(input): Payload<SchoolInput>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let id = state.catalog.create(&input).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "School added successfully",
            id,
        }),
    ))
}
