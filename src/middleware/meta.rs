//! Metadata enrichment for stream requests.
//!
//! Two modes:
//!
//! - **In context**: the lookup finishes before the stream handler runs and
//!   the [`Meta`] is inserted into the request extensions, where the handler
//!   finds it as [`RequestContext::meta`]. A failed lookup fails the request.
//! - **Logging only**: the lookup is spawned and runs while the handler
//!   proceeds. It is joined before the response goes back to the logging
//!   stage, which reads the [`MediaName`] from the response extensions.
//!   Failures only produce a warning.
//!
//! Movies are looked up by ID, TV shows by `<id>:<season>:<episode>` (or the
//! `season`/`episode` query parameters). Other media types are skipped.
//!
//! [`RequestContext::meta`]: crate::registry::RequestContext::meta

use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use super::gate::ResourceRequest;
use crate::error::ApiError;
use crate::meta::{Meta, MetaError, MetaFetcher, parse_episode_id};
use crate::registry::ResourceKind;
use crate::utils::raw_query_param;

/// Media name recorded for the request log, `"?"` when unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaName(pub String);

impl MediaName {
    pub const UNKNOWN: &'static str = "?";

    pub fn new(meta: Option<&Meta>) -> Self {
        match meta {
            Some(meta) => Self(meta.media_name()),
            None => Self(Self::UNKNOWN.to_string()),
        }
    }
}

impl fmt::Display for MediaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configuration for the enrichment stage.
#[derive(Clone)]
pub struct MetaEnrichment {
    fetcher: Arc<dyn MetaFetcher>,
    put_in_context: bool,
    log_media_name: bool,
}

impl fmt::Debug for MetaEnrichment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaEnrichment")
            .field("put_in_context", &self.put_in_context)
            .field("log_media_name", &self.log_media_name)
            .finish()
    }
}

impl MetaEnrichment {
    pub fn new(fetcher: Arc<dyn MetaFetcher>, put_in_context: bool, log_media_name: bool) -> Self {
        Self {
            fetcher,
            put_in_context,
            log_media_name,
        }
    }

    /// Look up metadata for a stream request.
    ///
    /// Returns `Ok(None)` for media types without metadata and for TV show
    /// IDs without season and episode.
    async fn lookup(
        &self,
        resource: &ResourceRequest,
        query: Option<&str>,
    ) -> Result<Option<Meta>, MetaError> {
        let meta = match resource.media_type.as_str() {
            "movie" => self.fetcher.get_movie(&resource.id).await?,
            "series" => {
                let (show, season, episode) = match episode_coordinates(&resource.id, query) {
                    Ok(coordinates) => coordinates,
                    Err(e) => {
                        warn!(id = %resource.id, error = %e, "Can't look up TV show meta");
                        return Ok(None);
                    }
                };
                self.fetcher.get_tv_show(&show, season, episode).await?
            }
            other => {
                debug!(media_type = other, "No meta lookup for media type");
                return Ok(None);
            }
        };

        debug!(meta = ?meta, "Got meta");
        Ok(Some(meta))
    }
}

/// Show ID, season and episode from `<id>:<season>:<episode>`, falling back
/// to the `season` and `episode` query parameters.
fn episode_coordinates(id: &str, query: Option<&str>) -> Result<(String, u32, u32), MetaError> {
    if let Ok((show, season, episode)) = parse_episode_id(id) {
        return Ok((show.to_string(), season, episode));
    }

    let season = raw_query_param(query, "season").and_then(|v| v.parse().ok());
    let episode = raw_query_param(query, "episode").and_then(|v| v.parse().ok());
    match (season, episode) {
        (Some(season), Some(episode)) => Ok((id.to_string(), season, episode)),
        _ => Err(MetaError::InvalidId(id.to_string())),
    }
}

pub async fn enrich_request(
    State(stage): State<MetaEnrichment>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(resource) = request
        .extensions()
        .get::<ResourceRequest>()
        .filter(|r| r.kind == ResourceKind::Stream)
        .cloned()
    else {
        return next.run(request).await;
    };
    let query = request.uri().query().map(str::to_string);

    if stage.put_in_context {
        let meta = match stage.lookup(&resource, query.as_deref()).await {
            Ok(meta) => meta,
            Err(e) => {
                return ApiError::internal("Failed to get meta information", e).into_response();
            }
        };

        if let Some(meta) = &meta {
            request.extensions_mut().insert(meta.clone());
        }

        let mut response = next.run(request).await;
        if stage.log_media_name {
            response.extensions_mut().insert(MediaName::new(meta.as_ref()));
        }
        return response;
    }

    if !stage.log_media_name {
        return next.run(request).await;
    }

    let lookup = {
        let stage = stage.clone();
        tokio::spawn(async move {
            match stage.lookup(&resource, query.as_deref()).await {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(id = %resource.id, error = %e, "Couldn't get meta for logging");
                    None
                }
            }
        })
    };

    let mut response = next.run(request).await;

    // Join so the media name is available to the logging stage
    let meta = lookup.await.unwrap_or_else(|e| {
        warn!(error = %e, "Meta lookup task failed");
        None
    });
    response.extensions_mut().insert(MediaName::new(meta.as_ref()));
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_coordinates_from_id() {
        let (show, season, episode) = episode_coordinates("tt0944947:2:5", None).unwrap();
        assert_eq!((show.as_str(), season, episode), ("tt0944947", 2, 5));
    }

    #[test]
    fn test_episode_coordinates_from_query() {
        let (show, season, episode) =
            episode_coordinates("tt0944947", Some("season=1&episode=3")).unwrap();
        assert_eq!((show.as_str(), season, episode), ("tt0944947", 1, 3));

        assert!(episode_coordinates("tt0944947", Some("season=1")).is_err());
        assert!(episode_coordinates("tt0944947", Some("season=x&episode=1")).is_err());
    }

    #[test]
    fn test_media_name() {
        let meta = Meta {
            name: "Big Buck Bunny".to_string(),
            release_info: "2008".to_string(),
            ..Meta::default()
        };
        assert_eq!(MediaName::new(Some(&meta)).to_string(), "Big Buck Bunny (2008)");
        assert_eq!(MediaName::new(None).to_string(), "?");
    }
}
