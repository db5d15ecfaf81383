//! Health endpoint and root redirect.
//!
//! # Endpoints
//!
//! - `GET /health` - Always 200 while the server accepts requests
//! - `GET /` - `301` to `Options::redirect_url`, only routed when set

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::{debug, instrument};

use crate::error::ApiError;
use crate::models::HealthResponse;
use crate::state::AddonState;
use crate::userdata::UserDataType;

/// Health check endpoint.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "1.0.0",
///   "uptime_seconds": 3600,
///   "timestamp": "2024-01-15T10:30:00Z"
/// }
/// ```
#[instrument(skip(state))]
pub async fn health_check<U: UserDataType>(State(state): State<AddonState<U>>) -> Json<HealthResponse> {
    debug!("Health check request received");

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.config.manifest.version.clone(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    })
}

pub async fn root_redirect<U: UserDataType>(State(state): State<AddonState<U>>) -> Response {
    match &state.config.options.redirect_url {
        Some(url) => {
            debug!(redirect_url = %url, "Responding with redirect");
            (StatusCode::MOVED_PERMANENTLY, [(LOCATION, url.clone())]).into_response()
        }
        None => ApiError::NotFound.into_response(),
    }
}

/// Fallback for unmatched paths.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
