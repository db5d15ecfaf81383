//! # Stremio Addon Server
//!
//! Serve a Stremio addon over HTTP with Axum:
//!
//! - **Protocol**: manifest, catalog, stream, subtitle and configuration endpoints
//! - **User data**: per-user configuration embedded in the URL, decoded into your own type
//! - **Caching**: `Cache-Control` and ETag/`If-None-Match` handling
//! - **Observability**: structured request logs, Prometheus metrics, optional media names via Cinemeta
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Logging → Metrics → CORS → Gate → Meta)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (manifest, catalog, stream, subtitles, configure) │
//! ├─────────────────────────────────────────────────────────────┤
//! │  HandlerRegistry + UserDataCodec + CachePolicy              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Your handlers                                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stremio_addon::{AddonBuilder, HandlerError, Manifest, Options, StreamItem};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manifest = Manifest {
//!         id: "com.example.addon".to_string(),
//!         name: "Example".to_string(),
//!         description: "Example addon".to_string(),
//!         version: "0.1.0".to_string(),
//!         types: vec!["movie".to_string()],
//!         ..Default::default()
//!     };
//!
//!     let addon = AddonBuilder::new(manifest)
//!         .options(Options::from_env()?)
//!         .stream_handler("movie", |_ctx, id, _user_data| async move {
//!             match id.as_str() {
//!                 "tt1254207" => Ok(vec![StreamItem::http("https://example.com/bbb.mp4", "1080p")]),
//!                 _ => Err(HandlerError::NotFound),
//!             }
//!         })
//!         .build()?;
//!
//!     addon.run(None).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! Options can be loaded from the environment (see [`Options::from_env`]):
//! ```bash
//! ADDON_PORT=7000 CACHE_AGE_STREAMS_SECS=3600 HANDLE_ETAG_STREAMS=true cargo run
//! ```

pub mod addon;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod meta;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod registry;
pub mod routes;
pub mod state;
pub mod userdata;
pub mod utils;

// Re-exports for convenience
pub use addon::{Addon, AddonBuilder, LifecycleState};
pub use cache::CachePolicy;
pub use config::{LogEncoding, Options, UserDataEncoding};
pub use error::{ApiError, ApiResult, ConfigError, HandlerError, HandlerResult, ServeError};
pub use meta::{CinemetaClient, Meta, MetaError, MetaFetcher};
pub use middleware::MiddlewareChain;
pub use models::{
    BehaviorHints, CatalogItem, ConfigurationField, ConfigurationUi, Manifest, MetaPreviewItem,
    StreamItem, SubtitleItem,
};
pub use registry::{RequestContext, ResourceKind};
pub use routes::build_router;
pub use state::AddonState;
pub use userdata::{UserData, UserDataCodec};
