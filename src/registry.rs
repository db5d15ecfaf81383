//! Resource handlers and their lookup table.
//!
//! Catalog and stream handlers are registered per media type ("movie",
//! "series", ...). There is at most one subtitle handler, registered
//! without a media type.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::http::{HeaderMap, Uri};

use crate::error::HandlerResult;
use crate::meta::Meta;
use crate::models::{MetaPreviewItem, StreamItem, SubtitleItem};
use crate::userdata::UserData;

/// Boxed future returned by handlers.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

pub type CatalogFn<U> =
    Arc<dyn Fn(RequestContext, String, UserData<U>) -> BoxFuture<HandlerResult<Vec<MetaPreviewItem>>> + Send + Sync>;

pub type StreamFn<U> =
    Arc<dyn Fn(RequestContext, String, UserData<U>) -> BoxFuture<HandlerResult<Vec<StreamItem>>> + Send + Sync>;

pub type SubtitleFn<U> =
    Arc<dyn Fn(RequestContext, String, UserData<U>) -> BoxFuture<HandlerResult<Vec<SubtitleItem>>> + Send + Sync>;

/// Kind of resource a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Catalog,
    Stream,
    Subtitle,
}

impl ResourceKind {
    /// Path segment used by Stremio for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Stream => "stream",
            Self::Subtitle => "subtitles",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "catalog" => Some(Self::Catalog),
            "stream" => Some(Self::Stream),
            "subtitles" => Some(Self::Subtitle),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request-scoped data handed to handlers.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Set when metadata enrichment runs before the handler
    pub meta: Option<Meta>,
}

impl RequestContext {
    pub fn meta(&self) -> Option<&Meta> {
        self.meta.as_ref()
    }
}

/// A registered handler for one resource kind.
pub enum ResourceHandler<U> {
    Catalog(CatalogFn<U>),
    Stream(StreamFn<U>),
    Subtitle(SubtitleFn<U>),
}

impl<U> ResourceHandler<U> {
    pub fn catalog<F, Fut>(handler: F) -> Self
    where
        F: Fn(RequestContext, String, UserData<U>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Vec<MetaPreviewItem>>> + Send + 'static,
    {
        Self::Catalog(Arc::new(move |ctx, id, user_data| {
            Box::pin(handler(ctx, id, user_data))
        }))
    }

    pub fn stream<F, Fut>(handler: F) -> Self
    where
        F: Fn(RequestContext, String, UserData<U>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Vec<StreamItem>>> + Send + 'static,
    {
        Self::Stream(Arc::new(move |ctx, id, user_data| {
            Box::pin(handler(ctx, id, user_data))
        }))
    }

    pub fn subtitle<F, Fut>(handler: F) -> Self
    where
        F: Fn(RequestContext, String, UserData<U>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Vec<SubtitleItem>>> + Send + 'static,
    {
        Self::Subtitle(Arc::new(move |ctx, id, user_data| {
            Box::pin(handler(ctx, id, user_data))
        }))
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Catalog(_) => ResourceKind::Catalog,
            Self::Stream(_) => ResourceKind::Stream,
            Self::Subtitle(_) => ResourceKind::Subtitle,
        }
    }
}

impl<U> Clone for ResourceHandler<U> {
    fn clone(&self) -> Self {
        match self {
            Self::Catalog(f) => Self::Catalog(Arc::clone(f)),
            Self::Stream(f) => Self::Stream(Arc::clone(f)),
            Self::Subtitle(f) => Self::Subtitle(Arc::clone(f)),
        }
    }
}

impl<U> fmt::Debug for ResourceHandler<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceHandler::{:?}", self.kind())
    }
}

type RegistryKey = (ResourceKind, Option<String>);

/// Handlers keyed by resource kind and media type.
pub struct HandlerRegistry<U> {
    handlers: HashMap<RegistryKey, ResourceHandler<U>>,
}

impl<U> HandlerRegistry<U> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler, replacing any previous one for the same key.
    ///
    /// `media_type` is ignored for subtitle handlers.
    pub fn register(
        &mut self,
        media_type: Option<String>,
        handler: ResourceHandler<U>,
    ) -> Option<ResourceHandler<U>> {
        let media_type = match handler.kind() {
            ResourceKind::Subtitle => None,
            _ => media_type,
        };
        self.handlers.insert((handler.kind(), media_type), handler)
    }

    pub fn get(&self, kind: ResourceKind, media_type: Option<&str>) -> Option<&ResourceHandler<U>> {
        self.handlers
            .get(&(kind, media_type.map(str::to_string)))
    }

    pub fn catalog(&self, media_type: &str) -> Option<&CatalogFn<U>> {
        match self.get(ResourceKind::Catalog, Some(media_type)) {
            Some(ResourceHandler::Catalog(f)) => Some(f),
            _ => None,
        }
    }

    pub fn stream(&self, media_type: &str) -> Option<&StreamFn<U>> {
        match self.get(ResourceKind::Stream, Some(media_type)) {
            Some(ResourceHandler::Stream(f)) => Some(f),
            _ => None,
        }
    }

    pub fn subtitle(&self) -> Option<&SubtitleFn<U>> {
        match self.get(ResourceKind::Subtitle, None) {
            Some(ResourceHandler::Subtitle(f)) => Some(f),
            _ => None,
        }
    }

    /// Whether at least one handler of `kind` is registered.
    pub fn has(&self, kind: ResourceKind) -> bool {
        self.handlers.keys().any(|(k, _)| *k == kind)
    }

    /// Media types with a handler of `kind`, sorted.
    pub fn media_types(&self, kind: ResourceKind) -> Vec<&str> {
        let mut types: Vec<&str> = self
            .handlers
            .keys()
            .filter(|(k, _)| *k == kind)
            .filter_map(|(_, t)| t.as_deref())
            .collect();
        types.sort_unstable();
        types
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}

impl<U> Default for HandlerRegistry<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> Clone for HandlerRegistry<U> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<U> fmt::Debug for HandlerRegistry<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("catalog", &self.media_types(ResourceKind::Catalog))
            .field("stream", &self.media_types(ResourceKind::Stream))
            .field("subtitle", &self.has(ResourceKind::Subtitle))
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::HandlerError;

    fn registry() -> HandlerRegistry<()> {
        let mut registry = HandlerRegistry::new();
        registry.register(
            Some("movie".to_string()),
            ResourceHandler::stream(|_, id, _| async move {
                if id == "tt1" {
                    Ok(vec![StreamItem::http("http://example.com/a.mp4", "1080p")])
                } else {
                    Err(HandlerError::NotFound)
                }
            }),
        );
        registry.register(
            Some("series".to_string()),
            ResourceHandler::catalog(|_, _, _| async { Ok(Vec::new()) }),
        );
        registry.register(
            Some("ignored".to_string()),
            ResourceHandler::subtitle(|_, _, _| async { Ok(Vec::new()) }),
        );
        registry
    }

    #[test]
    fn test_lookup_by_kind_and_media_type() {
        let registry = registry();

        assert!(registry.stream("movie").is_some());
        assert!(registry.stream("series").is_none());
        assert!(registry.catalog("series").is_some());
        assert!(registry.catalog("movie").is_none());
        assert!(registry.subtitle().is_some());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_media_types_and_has() {
        let registry = registry();

        assert_eq!(registry.media_types(ResourceKind::Stream), vec!["movie"]);
        assert!(registry.media_types(ResourceKind::Subtitle).is_empty());
        assert!(registry.has(ResourceKind::Subtitle));
        assert!(!HandlerRegistry::<()>::new().has(ResourceKind::Catalog));
    }

    #[tokio::test]
    async fn test_invoke_stream_handler() {
        let registry = registry();
        let handler = registry.stream("movie").unwrap();

        let items = handler(RequestContext::default(), "tt1".to_string(), UserData::Placeholder)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);

        let err = handler(RequestContext::default(), "ttX".to_string(), UserData::Placeholder)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_kind_segments() {
        for kind in [ResourceKind::Catalog, ResourceKind::Stream, ResourceKind::Subtitle] {
            assert_eq!(ResourceKind::from_segment(kind.as_str()), Some(kind));
        }
        assert_eq!(ResourceKind::from_segment("manifest.json"), None);
    }
}
