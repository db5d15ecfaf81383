//! Configuration endpoints, only routed for configurable addons.
//!
//! - `GET /configure` - Runs the configuration handler (user data in the `userData` query parameter)
//! - `GET /configure.json` - The configuration form description

use axum::Json;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use tracing::instrument;

use super::util::{decode_user_data, handler_error, request_context};
use crate::error::{ApiError, ApiResult};
use crate::state::AddonState;
use crate::userdata::UserDataType;
use crate::utils::raw_query_param;

#[instrument(skip_all)]
pub async fn configure<U: UserDataType>(
    State(state): State<AddonState<U>>,
    request: Request,
) -> ApiResult<Response> {
    let (parts, _) = request.into_parts();
    let config = &state.config;

    let handler = config
        .configuration_handler
        .as_ref()
        .ok_or(ApiError::NotFound)?;

    let raw = raw_query_param(parts.uri.query(), "userData").filter(|v| !v.is_empty());
    let user_data = decode_user_data(&config.codec, raw)?;

    let value = handler(request_context(&parts), user_data)
        .await
        .map_err(|e| handler_error(e, "Failed to get configuration"))?;

    Ok(Json(value).into_response())
}

#[instrument(skip_all)]
pub async fn configuration_ui<U: UserDataType>(
    State(state): State<AddonState<U>>,
) -> ApiResult<Response> {
    let ui = state
        .config
        .configuration_ui
        .as_ref()
        .ok_or(ApiError::NotFound)?;

    Ok(Json(ui).into_response())
}
