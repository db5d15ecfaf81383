//! Route table assembly.
//!
//! # Route Groups
//!
//! - `/health` - Always routed
//! - `/manifest.json`, `/{userData}/manifest.json` - Manifest (see [`handlers::manifest`])
//! - `/catalog/...`, `/stream/...` and their `/{userData}/...` variants - Resource dispatch
//! - `/subtitles` - Only with a subtitle handler
//! - `/configure`, `/configure.json` - Only for configurable manifests
//! - `/` - Only with a redirect URL
//! - Custom routes registered on the builder
//!
//! The path parameter `{id}` still carries the `.json` suffix. The route
//! gate strips it when it parses the request, and a segment without the
//! suffix isn't a resource request at all: it ends in the 404 fallback.
//!
//! Unmatched paths go through the same middleware chain via an explicit
//! fallback, which is how a `configurationRequired` addon rejects
//! `/stream/{type}/{id}.json` with 400 instead of 404.

use axum::Router;
use axum::routing::{MethodRouter, get};
use tracing::{debug, info};

use crate::handlers;
use crate::middleware::MiddlewareChain;
use crate::registry::ResourceKind;
use crate::state::AddonState;
use crate::userdata::UserDataType;

/// A caller-registered route.
pub type CustomRoute<U> = (String, MethodRouter<AddonState<U>>);

/// Build the addon router with all routes and middleware configured.
///
/// # Arguments
///
/// * `state` - Validated addon state
/// * `chain` - Middleware chain, applied to every route including the fallback
/// * `custom_routes` - Additional routes registered on the builder
pub fn build_router<U: UserDataType>(
    state: AddonState<U>,
    chain: &MiddlewareChain,
    custom_routes: Vec<CustomRoute<U>>,
) -> Router {
    let config = &state.config;
    let registry = &config.registry;
    let manifest = &config.manifest;

    let mut router = Router::new()
        .route("/health", get(handlers::health_check::<U>))
        .route("/manifest.json", get(handlers::manifest::<U>))
        .route("/{userData}/manifest.json", get(handlers::manifest::<U>));

    // =========================================================================
    // Resource routes
    // =========================================================================
    let open_routes = !manifest.configuration_required();
    if !open_routes {
        info!("Configuration required, only serving resources with user data");
    }

    if registry.has(ResourceKind::Catalog) {
        router = router.route("/{userData}/catalog/{type}/{id}", get(handlers::catalog::<U>));
        if open_routes {
            router = router.route("/catalog/{type}/{id}", get(handlers::catalog::<U>));
        }
    }

    if registry.has(ResourceKind::Stream) {
        router = router.route("/{userData}/stream/{type}/{id}", get(handlers::stream::<U>));
        if open_routes {
            router = router.route("/stream/{type}/{id}", get(handlers::stream::<U>));
        }
    }

    if registry.has(ResourceKind::Subtitle) {
        router = router.route("/subtitles", get(handlers::subtitles::<U>));
    }

    // =========================================================================
    // Configuration, redirect, custom routes
    // =========================================================================
    if manifest.configurable() {
        router = router
            .route("/configure", get(handlers::configure::<U>))
            .route("/configure.json", get(handlers::configuration_ui::<U>));
    }

    if config.options.redirect_url.is_some() {
        router = router.route("/", get(handlers::root_redirect::<U>));
    }

    for (path, method_router) in custom_routes {
        debug!(path = %path, "Adding custom route");
        router = router.route(&path, method_router);
    }

    let router = router.fallback(handlers::not_found).with_state(state);

    debug!(middleware = ?chain.names(), "Applying middleware chain");
    chain.apply(router)
}
