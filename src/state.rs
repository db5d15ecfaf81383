//! Shared, read-only addon state for Axum handlers.
//!
//! Everything here is assembled once by [`AddonBuilder::build`] and never
//! mutated while serving, so handlers read it without locking. Cloning
//! [`AddonState`] only bumps a reference count.
//!
//! [`AddonBuilder::build`]: crate::addon::AddonBuilder::build

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use regex::Regex;
use serde_json::Value;

use crate::cache::CachePolicy;
use crate::config::Options;
use crate::error::HandlerResult;
use crate::meta::MetaFetcher;
use crate::models::{ConfigurationUi, Manifest};
use crate::registry::{BoxFuture, HandlerRegistry, RequestContext};
use crate::userdata::{UserData, UserDataCodec};

/// Called before the manifest is returned.
///
/// Receives a per-request copy of the manifest that it may modify. A status
/// of 400 or above aborts the request with that status.
pub type ManifestCallback<U> =
    Arc<dyn Fn(&RequestContext, &mut Manifest, &UserData<U>) -> StatusCode + Send + Sync>;

/// Serves `GET /configure`.
pub type ConfigurationHandler<U> =
    Arc<dyn Fn(RequestContext, UserData<U>) -> BoxFuture<HandlerResult<Value>> + Send + Sync>;

/// Validated, immutable addon configuration.
pub struct AddonConfig<U> {
    pub manifest: Manifest,
    pub registry: HandlerRegistry<U>,
    pub options: Options,
    pub codec: UserDataCodec<U>,
    pub catalog_cache: CachePolicy,
    pub stream_cache: CachePolicy,
    pub manifest_callback: Option<ManifestCallback<U>>,
    pub configuration_handler: Option<ConfigurationHandler<U>>,
    pub configuration_ui: Option<ConfigurationUi>,
    pub meta_fetcher: Option<Arc<dyn MetaFetcher>>,
    /// Compiled `Options::stream_id_regex`
    pub stream_id_pattern: Option<Regex>,
}

impl<U> fmt::Debug for AddonConfig<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddonConfig")
            .field("manifest", &self.manifest.id)
            .field("registry", &self.registry)
            .field("codec", &self.codec)
            .field("catalog_cache", &self.catalog_cache)
            .field("stream_cache", &self.stream_cache)
            .field("manifest_callback", &self.manifest_callback.is_some())
            .field("configuration_handler", &self.configuration_handler.is_some())
            .field("meta_fetcher", &self.meta_fetcher.is_some())
            .field("stream_id_pattern", &self.stream_id_pattern)
            .finish()
    }
}

/// Shared state handed to every handler.
pub struct AddonState<U> {
    pub config: Arc<AddonConfig<U>>,
    /// Timestamp when the addon was built
    pub started_at: Instant,
}

impl<U> AddonState<U> {
    pub fn new(config: AddonConfig<U>) -> Self {
        Self {
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

impl<U> Clone for AddonState<U> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            started_at: self.started_at,
        }
    }
}

impl<U> fmt::Debug for AddonState<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddonState")
            .field("config", &self.config)
            .field("uptime_seconds", &self.uptime_seconds())
            .finish()
    }
}
