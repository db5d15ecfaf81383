//! Manifest endpoint with the optional gate callback.
//!
//! `GET /manifest.json` and `GET /{userData}/manifest.json`. The callback
//! sees a per-request copy of the manifest, so its changes never leak into
//! other requests.

use axum::Json;
use axum::extract::{Request, State};
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use tracing::{debug, instrument};

use super::util::{decode_user_data, request_context};
use crate::error::{ApiError, ApiResult};
use crate::state::AddonState;
use crate::userdata::UserDataType;
use crate::utils::raw_query_param;

const MANIFEST_PATH: &str = "/manifest.json";

/// Raw user data from `/{userData}/manifest.json`.
fn path_user_data(uri: &Uri) -> Option<&str> {
    uri.path()
        .strip_suffix(MANIFEST_PATH)?
        .strip_prefix('/')
        .filter(|v| !v.is_empty())
}

#[instrument(skip_all)]
pub async fn manifest<U: UserDataType>(
    State(state): State<AddonState<U>>,
    request: Request,
) -> ApiResult<Response> {
    let (parts, _) = request.into_parts();
    let config = &state.config;

    let from_path = path_user_data(&parts.uri);
    let raw = from_path.or_else(|| {
        raw_query_param(parts.uri.query(), "userData").filter(|v| !v.is_empty())
    });
    let user_data = decode_user_data(&config.codec, raw)?;

    let mut manifest = config.manifest.clone();

    // Already configured: let Stremio show "Install" instead of "Configure"
    if from_path.is_some() {
        manifest.behavior_hints.configuration_required = false;
    }

    if let Some(callback) = &config.manifest_callback {
        let status = callback(&request_context(&parts), &mut manifest, &user_data);
        if status.as_u16() >= 400 {
            debug!(status = status.as_u16(), "Manifest callback rejected request");
            return Err(ApiError::Status(status));
        }
    }

    Ok(Json(manifest).into_response())
}
