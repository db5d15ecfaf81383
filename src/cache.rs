//! Conditional caching: `Cache-Control` and `ETag` handling.
//!
//! A [`CachePolicy`] is derived once from the options for each resource
//! kind. Per request it is evaluated against the serialized response body
//! and the client's `If-None-Match` header, giving a [`CacheDirective`].
//!
//! The ETag is the hex-encoded SHA-256 of the JSON body, so identical
//! payloads always produce identical tags. The fingerprinted bytes are the
//! full response envelope (`{"streams":[...]}`, `{"metas":[...]}` or the
//! bare subtitle array), not the item list alone.

use std::time::Duration;

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};

/// Caching behaviour for one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachePolicy {
    max_age_secs: u64,
    public: bool,
    handle_etag: bool,
}

impl CachePolicy {
    pub fn new(max_age: Duration, public: bool, handle_etag: bool) -> Self {
        Self {
            max_age_secs: max_age.as_secs(),
            public,
            handle_etag,
        }
    }

    pub fn max_age_secs(&self) -> u64 {
        self.max_age_secs
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn handles_etag(&self) -> bool {
        self.handle_etag
    }

    /// Evaluate the policy for a serialized body.
    ///
    /// A zero max-age disables every cache header, including the ETag.
    pub fn evaluate(&self, body: &[u8], if_none_match: Option<&str>) -> CacheDirective {
        if self.max_age_secs == 0 {
            return CacheDirective::default();
        }

        let etag = self.handle_etag.then(|| fingerprint(body));
        let conditional_hit = match (&etag, if_none_match) {
            (Some(etag), Some(client)) => etag == client,
            _ => false,
        };

        CacheDirective {
            max_age_secs: self.max_age_secs,
            public: self.public,
            etag,
            conditional_hit,
        }
    }

    /// Build the final JSON response for `body`, honouring `If-None-Match`.
    pub fn respond(&self, body: Vec<u8>, request_headers: &HeaderMap) -> Response {
        let if_none_match = request_headers
            .get(IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok());

        self.evaluate(&body, if_none_match).into_response_with(body)
    }
}

/// Per-request caching decision.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheDirective {
    pub max_age_secs: u64,
    pub public: bool,
    pub etag: Option<String>,
    /// True only when the computed ETag equals the client's `If-None-Match` exactly.
    pub conditional_hit: bool,
}

impl CacheDirective {
    /// Headers to attach to the response (without `Content-Type`).
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if self.max_age_secs > 0 {
            let value = if self.public {
                format!("public, max-age={}", self.max_age_secs)
            } else {
                format!("max-age={}", self.max_age_secs)
            };
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(CACHE_CONTROL, value);
            }
        }

        if let Some(etag) = &self.etag
            && let Ok(value) = HeaderValue::from_str(etag)
        {
            headers.insert(ETAG, value);
        }

        headers
    }

    /// Whether the response should be a bodyless `304 Not Modified`.
    pub fn should_short_circuit(&self) -> bool {
        self.conditional_hit
    }

    /// Turn the directive and a JSON body into a response.
    pub fn into_response_with(self, body: Vec<u8>) -> Response {
        let headers = self.headers();

        if self.should_short_circuit() {
            return (StatusCode::NOT_MODIFIED, headers).into_response();
        }

        let mut response = (StatusCode::OK, headers, body).into_response();
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

/// Hex-encoded SHA-256 of `data`, the serialized response envelope.
pub fn fingerprint(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
