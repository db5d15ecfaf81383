//! Route parsing and the configuration gate.
//!
//! Resource requests (catalog, stream, subtitles) are parsed once into a
//! [`ResourceRequest`] which travels in the request extensions to the
//! enrichment stage and the handlers. Before that the gate rejects:
//!
//! - requests without user data when the manifest requires configuration
//! - stream requests whose ID doesn't match the configured pattern
//!
//! Everything else (manifest, health, configure, custom routes) passes
//! through untouched.

use axum::extract::{Request, State};
use axum::http::Uri;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use regex::Regex;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::registry::ResourceKind;
use crate::utils::{decode_component, raw_query_param};

/// Path suffix of resource requests.
pub const JSON_SUFFIX: &str = ".json";

/// A parsed catalog, stream or subtitle request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub kind: ResourceKind,
    /// Empty for subtitle requests
    pub media_type: String,
    /// Percent-decoded, `.json` suffix stripped. Empty if missing.
    pub id: String,
    /// Raw user data from the path segment or the `userData` query parameter
    pub user_data: Option<String>,
}

impl ResourceRequest {
    /// Parse a request URI. Returns `None` for non-resource paths.
    ///
    /// Recognized shapes (the `.json` suffix is mandatory):
    ///
    /// - `/{kind}/{type}/{id}.json` and `/{userData}/{kind}/{type}/{id}.json`
    ///   for catalog and stream
    /// - `/subtitles?videoId=...&userData=...`
    pub fn parse(uri: &Uri) -> Option<Self> {
        let query = uri.query();
        let from_query = || {
            raw_query_param(query, "userData")
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        if uri.path() == "/subtitles" {
            let id = raw_query_param(query, "videoId")
                .map(|v| decode_component(v).into_owned())
                .unwrap_or_default();
            return Some(Self {
                kind: ResourceKind::Subtitle,
                media_type: String::new(),
                id,
                user_data: from_query(),
            });
        }

        let segments: Vec<&str> = uri.path().strip_prefix('/')?.split('/').collect();
        let (user_data, kind, media_type, id) = match segments.as_slice() {
            [kind, media_type, id] => (None, *kind, *media_type, *id),
            [user_data, kind, media_type, id] => (Some(*user_data), *kind, *media_type, *id),
            _ => return None,
        };

        let kind = match ResourceKind::from_segment(kind)? {
            ResourceKind::Subtitle => return None,
            kind => kind,
        };

        let id = decode_component(id.strip_suffix(JSON_SUFFIX)?).into_owned();

        let user_data = user_data
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .or_else(from_query);

        Some(Self {
            kind,
            media_type: decode_component(media_type).into_owned(),
            id,
            user_data,
        })
    }

    pub fn has_user_data(&self) -> bool {
        self.user_data.is_some()
    }
}

/// Configuration for the gate stage.
#[derive(Debug, Clone, Default)]
pub struct RouteGate {
    configuration_required: bool,
    stream_id_pattern: Option<Regex>,
}

impl RouteGate {
    pub fn new(configuration_required: bool, stream_id_pattern: Option<Regex>) -> Self {
        Self {
            configuration_required,
            stream_id_pattern,
        }
    }

    /// Check a parsed request against the gate rules.
    ///
    /// # Errors
    ///
    /// `ApiError::BadRequest` when configuration is missing or the stream ID
    /// doesn't match.
    pub fn check(&self, request: &ResourceRequest) -> ApiResult<()> {
        if self.configuration_required && !request.has_user_data() {
            return Err(ApiError::BadRequest("Configuration required"));
        }

        if request.kind == ResourceKind::Stream
            && let Some(pattern) = &self.stream_id_pattern
            && !request.id.is_empty()
            && !pattern.is_match(&request.id)
        {
            return Err(ApiError::BadRequest("Invalid stream ID"));
        }

        Ok(())
    }
}

pub async fn gate_request(State(gate): State<RouteGate>, mut request: Request, next: Next) -> Response {
    let Some(resource) = ResourceRequest::parse(request.uri()) else {
        return next.run(request).await;
    };

    if let Err(e) = gate.check(&resource) {
        debug!(
            kind = %resource.kind,
            id = %resource.id,
            error = %e,
            "Rejected by route gate"
        );
        return e.into_response();
    }

    request.extensions_mut().insert(resource);
    next.run(request).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn parse(uri: &str) -> Option<ResourceRequest> {
        ResourceRequest::parse(&uri.parse::<Uri>().unwrap())
    }

    #[test]
    fn test_parse_stream_without_user_data() {
        let request = parse("/stream/movie/tt1254207.json").unwrap();
        assert_eq!(request.kind, ResourceKind::Stream);
        assert_eq!(request.media_type, "movie");
        assert_eq!(request.id, "tt1254207");
        assert_eq!(request.user_data, None);
    }

    #[test]
    fn test_parse_catalog_with_path_user_data() {
        let request = parse("/abc/catalog/series/top.json").unwrap();
        assert_eq!(request.kind, ResourceKind::Catalog);
        assert_eq!(request.id, "top");
        assert_eq!(request.user_data.as_deref(), Some("abc"));
    }

    #[test]
    fn test_parse_decodes_id_and_falls_back_to_query_user_data() {
        let request = parse("/stream/series/tt0944947%3A1%3A2.json?userData=xyz").unwrap();
        assert_eq!(request.id, "tt0944947:1:2");
        assert_eq!(request.user_data.as_deref(), Some("xyz"));
    }

    #[test]
    fn test_parse_subtitles() {
        let request = parse("/subtitles?videoId=tt1%3A1%3A1&userData=abc").unwrap();
        assert_eq!(request.kind, ResourceKind::Subtitle);
        assert_eq!(request.id, "tt1:1:1");
        assert_eq!(request.user_data.as_deref(), Some("abc"));

        let missing = parse("/subtitles").unwrap();
        assert!(missing.id.is_empty());
        assert!(!missing.has_user_data());
    }

    #[test]
    fn test_parse_ignores_other_paths() {
        assert!(parse("/manifest.json").is_none());
        assert!(parse("/abc/manifest.json").is_none());
        assert!(parse("/health").is_none());
        assert!(parse("/configure").is_none());
        assert!(parse("/meta/movie/tt1.json").is_none());
        assert!(parse("/a/b/stream/movie/tt1.json").is_none());
    }

    #[test]
    fn test_parse_requires_json_suffix() {
        assert!(parse("/stream/movie/tt1").is_none());
        assert!(parse("/abc/stream/movie/tt1").is_none());
        assert!(parse("/catalog/movie/top.jsonx").is_none());

        let empty = parse("/stream/movie/.json").unwrap();
        assert!(empty.id.is_empty());
    }

    #[test]
    fn test_gate_requires_configuration() {
        let gate = RouteGate::new(true, None);

        let err = gate.check(&parse("/stream/movie/tt1.json").unwrap()).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest("Configuration required")));

        assert!(gate.check(&parse("/abc/stream/movie/tt1.json").unwrap()).is_ok());
        assert!(gate.check(&parse("/stream/movie/tt1.json?userData=abc").unwrap()).is_ok());
    }

    #[test]
    fn test_gate_stream_id_pattern() {
        let gate = RouteGate::new(false, Some(Regex::new("^tt\\d+$").unwrap()));

        assert!(gate.check(&parse("/stream/movie/tt1254207.json").unwrap()).is_ok());
        let err = gate.check(&parse("/stream/movie/kitsu:1.json").unwrap()).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest("Invalid stream ID")));

        // Catalog IDs aren't stream IDs
        assert!(gate.check(&parse("/catalog/movie/top.json").unwrap()).is_ok());
    }
}
