//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tower_http::trace::TraceLayer;
use tracing::debug;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/parking", get(list_parking))
        .route("/parking/:street_name", get(get_parking_for_street))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Landing endpoint.
async fn index() -> Json<LandingResponse> {
    Json(LandingResponse {
        message: "Welcome to the Corfu parking availability API.".to_string(),
    })
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Availability for all known streets.
async fn list_parking(State(state): State<AppState>) -> Json<Vec<ObservationResponse>> {
    let observations = state.parking.get_all().await;
    Json(observations.into_iter().map(ObservationResponse::from).collect())
}

/// Availability for one street, matched case-insensitively.
async fn get_parking_for_street(
    State(state): State<AppState>,
    Path(street_name): Path<String>,
) -> Result<Json<ObservationResponse>, AppError> {
    let observation = state
        .parking
        .get_by_street(&street_name)
        .await
        .ok_or_else(|| AppError::NotFound {
            message: format!("No parking data for '{street_name}'"),
        })?;

    Ok(Json(observation.into()))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound { message: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
        };

        debug!(status = status.as_u16(), %message, "request failed");

        let body = Json(ErrorResponse { detail: message });
        (status, body).into_response()
    }
}
