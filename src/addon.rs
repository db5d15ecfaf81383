//! Addon construction and serving lifecycle.
//!
//! ```text
//! Unconfigured ──build()──▶ Validated ──▶ Routed ──serve()──▶ Serving
//!                                                               │ shutdown token
//!                                                               ▼
//!                                              Stopped ◀── Draining
//! ```
//!
//! [`AddonBuilder::build`] runs every construction check exactly once. Any
//! violation is returned as a [`ConfigError`] and no router is assembled.
//! After that the configuration is read-only; [`Addon::serve`] can only be
//! stopped through its cancellation token.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::MethodRouter;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_CINEMETA_TIMEOUT, Options};
use crate::error::{ConfigError, HandlerResult, ServeError};
use crate::logging;
use crate::meta::{CinemetaClient, MetaFetcher};
use crate::metrics;
use crate::middleware::MiddlewareChain;
use crate::models::{ConfigurationUi, Manifest, MetaPreviewItem, StreamItem, SubtitleItem};
use crate::registry::{HandlerRegistry, RequestContext, ResourceHandler, ResourceKind};
use crate::routes::{CustomRoute, build_router};
use crate::state::{AddonConfig, AddonState, ConfigurationHandler, ManifestCallback};
use crate::userdata::{UserData, UserDataCodec, UserDataSchema, UserDataType};
use crate::utils;

/// Where the addon is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unconfigured,
    Validated,
    Routed,
    Serving,
    Draining,
    Stopped,
}

/// Collects the manifest, handlers and options of an addon.
///
/// `U` is the user data type. Addons without user data use
/// [`AddonBuilder::new`] and get `U = ()`; handlers then always receive
/// [`UserData::Placeholder`].
///
/// ```rust,no_run
/// use stremio_addon::{AddonBuilder, HandlerError, Manifest, StreamItem};
///
/// # fn manifest() -> Manifest { unimplemented!() }
/// let addon = AddonBuilder::new(manifest())
///     .stream_handler("movie", |_ctx, id, _user_data| async move {
///         Ok::<_, HandlerError>(vec![StreamItem::http(format!("https://example.com/{id}.mp4"), "1080p")])
///     })
///     .build()?;
/// # Ok::<(), stremio_addon::ConfigError>(())
/// ```
pub struct AddonBuilder<U = ()> {
    manifest: Manifest,
    options: Options,
    schema: UserDataSchema<U>,
    registry: HandlerRegistry<U>,
    manifest_callback: Option<ManifestCallback<U>>,
    configuration_handler: Option<ConfigurationHandler<U>>,
    configuration_ui: Option<ConfigurationUi>,
    meta_fetcher: Option<Arc<dyn MetaFetcher>>,
    custom_routes: Vec<CustomRoute<U>>,
}

impl AddonBuilder<()> {
    /// Builder for an addon without typed user data.
    pub fn new(manifest: Manifest) -> Self {
        Self::with_schema(manifest, UserDataSchema::Unregistered)
    }
}

impl<U: UserDataType> AddonBuilder<U> {
    /// Builder for an addon whose user data is parsed into `U`.
    pub fn with_user_data(manifest: Manifest) -> Self {
        Self::with_schema(manifest, UserDataSchema::registered())
    }

    fn with_schema(manifest: Manifest, schema: UserDataSchema<U>) -> Self {
        Self {
            manifest,
            options: Options::default(),
            schema,
            registry: HandlerRegistry::new(),
            manifest_callback: None,
            configuration_handler: None,
            configuration_ui: None,
            meta_fetcher: None,
            custom_routes: Vec::new(),
        }
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn catalog_handler<F, Fut>(mut self, media_type: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RequestContext, String, UserData<U>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Vec<MetaPreviewItem>>> + Send + 'static,
    {
        self.registry
            .register(Some(media_type.into()), ResourceHandler::catalog(handler));
        self
    }

    pub fn stream_handler<F, Fut>(mut self, media_type: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RequestContext, String, UserData<U>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Vec<StreamItem>>> + Send + 'static,
    {
        self.registry
            .register(Some(media_type.into()), ResourceHandler::stream(handler));
        self
    }

    /// The handler receives the `videoId` query parameter as its ID.
    pub fn subtitle_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(RequestContext, String, UserData<U>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Vec<SubtitleItem>>> + Send + 'static,
    {
        self.registry.register(None, ResourceHandler::subtitle(handler));
        self
    }

    /// Called with a per-request copy of the manifest before it's returned.
    ///
    /// Returning a status of 400 or above aborts the request with that status.
    pub fn manifest_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RequestContext, &mut Manifest, &UserData<U>) -> StatusCode + Send + Sync + 'static,
    {
        self.manifest_callback = Some(Arc::new(callback));
        self
    }

    /// Serves `GET /configure` for configurable addons.
    pub fn configuration_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(RequestContext, UserData<U>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Value>> + Send + 'static,
    {
        self.configuration_handler = Some(Arc::new(move |ctx, user_data| {
            Box::pin(handler(ctx, user_data))
        }));
        self
    }

    /// Served as `GET /configure.json` for configurable addons.
    pub fn configuration_ui(mut self, ui: ConfigurationUi) -> Self {
        self.configuration_ui = Some(ui);
        self
    }

    /// Replace the built-in Cinemeta client.
    pub fn meta_fetcher(mut self, fetcher: Arc<dyn MetaFetcher>) -> Self {
        self.meta_fetcher = Some(fetcher);
        self
    }

    /// Add a custom route. It runs behind the same middleware chain.
    ///
    /// Use [`Addon::user_data_codec`] (or `state.config.codec` inside the
    /// handler) to decode user data passed to the route.
    pub fn route(mut self, path: impl Into<String>, method_router: MethodRouter<AddonState<U>>) -> Self {
        self.custom_routes.push((path.into(), method_router));
        self
    }

    /// Validate everything and assemble the router.
    ///
    /// # Errors
    ///
    /// Returns the first violated construction rule. Nothing is routed or
    /// served in that case.
    pub fn build(self) -> Result<Addon<U>, ConfigError> {
        let (lifecycle, _) = watch::channel(LifecycleState::Unconfigured);
        let options = self.options;

        // =====================================================================
        // Validation
        // =====================================================================
        options.validate()?;

        if !self.manifest.is_complete() {
            return Err(ConfigError::EmptyManifest);
        }
        if self.registry.is_empty() {
            return Err(ConfigError::NoHandlers);
        }
        if self.meta_fetcher.is_some() && !options.meta_enabled() {
            return Err(ConfigError::UnusedMetaFetcher);
        }
        if self.meta_fetcher.is_some() && options.cinemeta_timeout.is_some() {
            return Err(ConfigError::CinemetaTimeoutWithFetcher);
        }
        if self.manifest.configuration_required() && !self.manifest.configurable() {
            return Err(ConfigError::ConfigurationRequiredWithoutConfigurable);
        }

        let stream_id_pattern = options
            .stream_id_regex
            .as_deref()
            .map(regex::Regex::new)
            .transpose()?;

        if !options.custom_logger {
            logging::try_init_logging(options.log_level(), options.log_encoding);
        }

        for kind in [ResourceKind::Catalog, ResourceKind::Stream] {
            for media_type in self.registry.media_types(kind) {
                if !self.manifest.supports_type(media_type) {
                    warn!(
                        kind = %kind,
                        media_type,
                        "Handler registered for a type the manifest doesn't list"
                    );
                }
            }
        }

        lifecycle.send_replace(LifecycleState::Validated);
        debug!("Addon options validated");

        // =====================================================================
        // Middleware and routes
        // =====================================================================
        let meta_fetcher = match (self.meta_fetcher, options.meta_enabled()) {
            (Some(fetcher), _) => Some(fetcher),
            (None, true) => {
                let timeout = options.cinemeta_timeout.unwrap_or(DEFAULT_CINEMETA_TIMEOUT);
                let client = CinemetaClient::new(timeout)
                    .map_err(|e| ConfigError::MetaClient(e.to_string()))?;
                Some(Arc::new(client) as Arc<dyn MetaFetcher>)
            }
            (None, false) => None,
        };

        let config = AddonConfig {
            catalog_cache: options.catalog_cache(),
            stream_cache: options.stream_cache(),
            codec: UserDataCodec::new(self.schema, options.user_data_encoding),
            manifest: self.manifest,
            registry: self.registry,
            options,
            manifest_callback: self.manifest_callback,
            configuration_handler: self.configuration_handler,
            configuration_ui: self.configuration_ui,
            meta_fetcher,
            stream_id_pattern,
        };
        let chain = MiddlewareChain::from_config(&config);
        let state = AddonState::new(config);
        let router = build_router(state.clone(), &chain, self.custom_routes);

        lifecycle.send_replace(LifecycleState::Routed);
        info!(
            id = %state.config.manifest.id,
            version = %state.config.manifest.version,
            middleware = ?chain.names(),
            "Addon built"
        );

        Ok(Addon {
            state,
            router,
            chain,
            lifecycle: Arc::new(lifecycle),
        })
    }
}

impl<U> fmt::Debug for AddonBuilder<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddonBuilder")
            .field("manifest", &self.manifest.id)
            .field("registry", &self.registry)
            .field("custom_routes", &self.custom_routes.len())
            .finish()
    }
}

/// A validated addon, ready to serve.
pub struct Addon<U = ()> {
    state: AddonState<U>,
    router: Router,
    chain: MiddlewareChain,
    lifecycle: Arc<watch::Sender<LifecycleState>>,
}

impl<U: UserDataType> Addon<U> {
    /// The fully assembled router, middleware included.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AddonState<U> {
        &self.state
    }

    pub fn manifest(&self) -> &Manifest {
        &self.state.config.manifest
    }

    pub fn options(&self) -> &Options {
        &self.state.config.options
    }

    /// Codec for decoding user data in custom routes.
    pub fn user_data_codec(&self) -> &UserDataCodec<U> {
        &self.state.config.codec
    }

    pub fn middleware(&self) -> &MiddlewareChain {
        &self.chain
    }

    /// Observe lifecycle transitions.
    pub fn lifecycle(&self) -> watch::Receiver<LifecycleState> {
        self.lifecycle.subscribe()
    }

    /// Serve on `listener` until `shutdown` is cancelled.
    ///
    /// On cancellation the listener stops accepting, `stopping` is notified
    /// once, and in-flight requests get `Options::shutdown_grace` to finish.
    /// Requests still running after that are abandoned.
    ///
    /// # Errors
    ///
    /// Returns `ServeError::Serve` if the server fails.
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: CancellationToken,
        stopping: Option<oneshot::Sender<()>>,
    ) -> Result<(), ServeError> {
        let options = &self.state.config.options;
        if let Some(addr) = options.metrics_addr() {
            metrics::try_init_metrics(addr);
        }

        match listener.local_addr() {
            Ok(addr) => info!("Server listening on http://{addr}"),
            Err(e) => warn!(error = %e, "Couldn't read the listener address"),
        }
        self.lifecycle.send_replace(LifecycleState::Serving);

        let lifecycle = Arc::clone(&self.lifecycle);
        let token = shutdown.clone();
        let server = axum::serve(
            listener,
            self.router
                .clone()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            token.cancelled().await;
            info!("Shutting down server...");
            lifecycle.send_replace(LifecycleState::Draining);
            if let Some(stopping) = stopping
                && stopping.send(()).is_err()
            {
                debug!("Nobody is waiting for the stopping notification");
            }
        });

        let grace = options.shutdown_grace;
        let result = tokio::select! {
            result = server.into_future() => result.map_err(ServeError::Serve),
            () = async {
                shutdown.cancelled().await;
                tokio::time::sleep(grace).await;
            } => {
                warn!(
                    grace_secs = grace.as_secs(),
                    "In-flight requests didn't finish in time, stopping anyway"
                );
                Ok(())
            }
        };

        self.lifecycle.send_replace(LifecycleState::Stopped);
        info!("Finished shutting down server");
        result
    }

    /// Bind to `Options::server_addr` and serve until SIGINT or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns `ServeError::Bind` if the address can't be bound, otherwise
    /// whatever [`Addon::serve`] returns.
    pub async fn run(&self, stopping: Option<oneshot::Sender<()>>) -> Result<(), ServeError> {
        let addr = self.state.config.options.server_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServeError::Bind {
                addr: addr.clone(),
                source,
            })?;

        let token = CancellationToken::new();
        let signals = tokio::spawn(utils::shutdown_signal(token.clone()));

        let result = self.serve(listener, token, stopping).await;
        signals.abort();
        result
    }
}

impl<U> fmt::Debug for Addon<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Addon")
            .field("state", &self.state)
            .field("middleware", &self.chain)
            .field("lifecycle", &*self.lifecycle.borrow())
            .finish()
    }
}
