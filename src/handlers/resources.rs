//! Catalog, stream and subtitle dispatch.
//!
//! # Endpoints
//!
//! - `GET /catalog/{type}/{id}.json` and `GET /{userData}/catalog/{type}/{id}.json`
//! - `GET /stream/{type}/{id}.json` and `GET /{userData}/stream/{type}/{id}.json`
//! - `GET /subtitles?videoId=...&userData=...`
//!
//! The request was already parsed into a [`ResourceRequest`] by the route
//! gate. Every handler follows the same steps: decode user data (400 on
//! failure), look up the handler for the media type (400 if none), call it,
//! then wrap the items in their envelope and pass the body through the
//! cache policy.

use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::response::Response;
use serde::Serialize;
use tracing::{debug, instrument};

use super::util::{decode_user_data, handler_error, request_context, to_json};
use crate::error::{ApiError, ApiResult};
use crate::middleware::ResourceRequest;
use crate::models::{MetaPreviewItem, StreamItem, SubtitleItem};
use crate::registry::ResourceKind;
use crate::state::AddonState;
use crate::userdata::UserDataType;

#[derive(Serialize)]
struct CatalogEnvelope<'a> {
    metas: &'a [MetaPreviewItem],
}

#[derive(Serialize)]
struct StreamEnvelope<'a> {
    streams: &'a [StreamItem],
}

/// Parsed request for `kind`.
///
/// 404 when the path isn't a `kind` resource path (e.g. the `.json` suffix
/// is missing), 400 if the route parameters are empty.
fn resource_request(parts: &Parts, kind: ResourceKind) -> ApiResult<ResourceRequest> {
    let missing = match kind {
        ResourceKind::Subtitle => "Missing videoId parameter",
        _ => "Missing type or id parameter",
    };

    let request = parts
        .extensions
        .get::<ResourceRequest>()
        .cloned()
        .or_else(|| ResourceRequest::parse(&parts.uri))
        .filter(|r| r.kind == kind)
        .ok_or(ApiError::NotFound)?;

    if request.id.is_empty() || (kind != ResourceKind::Subtitle && request.media_type.is_empty()) {
        return Err(ApiError::BadRequest(missing));
    }
    Ok(request)
}

/// Catalog endpoint. Answers `{"metas": [...]}`.
#[instrument(skip_all)]
pub async fn catalog<U: UserDataType>(
    State(state): State<AddonState<U>>,
    request: Request,
) -> ApiResult<Response> {
    let (parts, _) = request.into_parts();
    let resource = resource_request(&parts, ResourceKind::Catalog)?;
    let config = &state.config;

    let user_data = decode_user_data(&config.codec, resource.user_data.as_deref())?;
    let handler = config
        .registry
        .catalog(&resource.media_type)
        .ok_or(ApiError::BadRequest("Unsupported type"))?;

    debug!(media_type = %resource.media_type, id = %resource.id, "Dispatching catalog request");
    let metas = handler(request_context(&parts), resource.id, user_data)
        .await
        .map_err(|e| handler_error(e, "Failed to get catalog"))?;

    let body = to_json(&CatalogEnvelope { metas: &metas })?;
    Ok(config.catalog_cache.respond(body, &parts.headers))
}

/// Stream endpoint. Answers `{"streams": [...]}`.
#[instrument(skip_all)]
pub async fn stream<U: UserDataType>(
    State(state): State<AddonState<U>>,
    request: Request,
) -> ApiResult<Response> {
    let (parts, _) = request.into_parts();
    let resource = resource_request(&parts, ResourceKind::Stream)?;
    let config = &state.config;

    let user_data = decode_user_data(&config.codec, resource.user_data.as_deref())?;
    let handler = config
        .registry
        .stream(&resource.media_type)
        .ok_or(ApiError::BadRequest("Unsupported type"))?;

    debug!(media_type = %resource.media_type, id = %resource.id, "Dispatching stream request");
    let streams = handler(request_context(&parts), resource.id, user_data)
        .await
        .map_err(|e| handler_error(e, "Failed to get streams"))?;

    let body = to_json(&StreamEnvelope { streams: &streams })?;
    Ok(config.stream_cache.respond(body, &parts.headers))
}

/// Subtitle endpoint. Answers a bare JSON array and shares the stream cache policy.
#[instrument(skip_all)]
pub async fn subtitles<U: UserDataType>(
    State(state): State<AddonState<U>>,
    request: Request,
) -> ApiResult<Response> {
    let (parts, _) = request.into_parts();
    let resource = resource_request(&parts, ResourceKind::Subtitle)?;
    let config = &state.config;

    let user_data = decode_user_data(&config.codec, resource.user_data.as_deref())?;
    let handler = config
        .registry
        .subtitle()
        .ok_or(ApiError::BadRequest("Unsupported type"))?;

    debug!(video_id = %resource.id, "Dispatching subtitle request");
    let subtitles: Vec<SubtitleItem> = handler(request_context(&parts), resource.id, user_data)
        .await
        .map_err(|e| handler_error(e, "Failed to get subtitles"))?;

    let body = to_json(&subtitles)?;
    Ok(config.stream_cache.respond(body, &parts.headers))
}
