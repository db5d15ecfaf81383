//! Shared utilities for handlers.

use axum::http::request::Parts;
use serde::Serialize;

use crate::error::{ApiError, ApiResult, HandlerError};
use crate::meta::Meta;
use crate::registry::RequestContext;
use crate::userdata::{UserData, UserDataCodec, UserDataType};

/// Decode raw user data, mapping failures to `400 Invalid user data`.
///
/// The codec already logged the reason at WARN.
pub fn decode_user_data<U: UserDataType>(
    codec: &UserDataCodec<U>,
    raw: Option<&str>,
) -> ApiResult<UserData<U>> {
    codec
        .decode(raw.unwrap_or_default())
        .map_err(|_| ApiError::BadRequest("Invalid user data"))
}

/// Map a handler failure: the not-found sentinel becomes 404, anything
/// else a 500 with `public` as the body and the error in the logs.
pub fn handler_error(err: HandlerError, public: &'static str) -> ApiError {
    match err {
        HandlerError::NotFound => ApiError::NotFound,
        HandlerError::Internal(e) => ApiError::internal(public, format!("{e:#}")),
    }
}

/// Build the handler context from request parts.
pub fn request_context(parts: &Parts) -> RequestContext {
    RequestContext {
        uri: parts.uri.clone(),
        headers: parts.headers.clone(),
        meta: parts.extensions.get::<Meta>().cloned(),
    }
}

/// Serialize a response envelope.
pub fn to_json<T: Serialize>(value: &T) -> ApiResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| ApiError::internal("Failed to encode response", e))
}
