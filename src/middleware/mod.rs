//! The addon's middleware chain.
//!
//! The chain is an ordered list of [`Stage`]s built once from the options.
//! Order is fixed, outermost first:
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │     Logging      │ ← one record per request, sees the final status
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │     Metrics      │ ← counter per (endpoint, status)
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │       CORS       │ ← OPTIONS answered with 200
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │    Route gate    │ ← 400 without required configuration or bad stream ID
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │ Meta enrichment  │ ← optional, stream requests only
//! └────────┬─────────┘
//!          ▼
//!       Handler
//! ```
//!
//! Logging and metrics sit outside everything else so short-circuits by
//! CORS or the gate are still logged and counted.

pub mod cors;
pub mod gate;
pub mod ip;
pub mod logging;
pub mod meta;
pub mod metrics;

use std::fmt;
use std::sync::Arc;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use tower_http::trace::TraceLayer;

use crate::state::AddonConfig;

pub use gate::{ResourceRequest, RouteGate};
pub use logging::RequestLogging;
pub use meta::{MediaName, MetaEnrichment};

/// One interceptor of the chain.
#[derive(Clone)]
pub enum Stage {
    Logging(RequestLogging),
    Metrics,
    Cors,
    RouteGate(RouteGate),
    MetaEnrichment(MetaEnrichment),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Logging(_) => "logging",
            Self::Metrics => "metrics",
            Self::Cors => "cors",
            Self::RouteGate(_) => "route-gate",
            Self::MetaEnrichment(_) => "meta-enrichment",
        }
    }

    /// Wrap `router` with this stage.
    pub fn apply(self, router: Router) -> Router {
        match self {
            Self::Logging(fields) => router.layer(from_fn_with_state(fields, logging::log_request)),
            Self::Metrics => router.layer(from_fn(metrics::track_metrics)),
            Self::Cors => router.layer(from_fn(cors::apply_cors)),
            Self::RouteGate(gate) => router.layer(from_fn_with_state(gate, gate::gate_request)),
            Self::MetaEnrichment(stage) => {
                router.layer(from_fn_with_state(stage, meta::enrich_request))
            }
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered stages, outermost first.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    stages: Vec<Stage>,
    trace: bool,
}

impl MiddlewareChain {
    /// Assemble the chain. `logging` and `enrichment` are `None` when disabled.
    pub fn new(
        logging: Option<RequestLogging>,
        gate: RouteGate,
        enrichment: Option<MetaEnrichment>,
    ) -> Self {
        let mut stages = Vec::with_capacity(5);
        let trace = logging.is_some();

        if let Some(fields) = logging {
            stages.push(Stage::Logging(fields));
        }
        stages.push(Stage::Metrics);
        stages.push(Stage::Cors);
        stages.push(Stage::RouteGate(gate));
        if let Some(stage) = enrichment {
            stages.push(Stage::MetaEnrichment(stage));
        }

        Self { stages, trace }
    }

    /// Assemble the chain from the validated addon configuration.
    ///
    /// The gate and enrichment stages share the compiled stream ID pattern
    /// and the meta fetcher held by `config`.
    pub fn from_config<U>(config: &AddonConfig<U>) -> Self {
        let options = &config.options;

        let logging = (!options.disable_request_logging).then_some(RequestLogging {
            log_ips: options.log_ips,
            log_user_agent: options.log_user_agent,
            log_media_name: options.log_media_name,
        });
        let gate = RouteGate::new(
            config.manifest.configuration_required(),
            config.stream_id_pattern.clone(),
        );
        let enrichment = config.meta_fetcher.as_ref().map(|fetcher| {
            MetaEnrichment::new(
                Arc::clone(fetcher),
                options.put_meta_in_context,
                options.log_media_name,
            )
        });

        Self::new(logging, gate, enrichment)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(Stage::name).collect()
    }

    /// Wrap `router` with every stage. Layers are applied innermost first.
    pub fn apply(&self, router: Router) -> Router {
        let mut router = self
            .stages
            .iter()
            .rev()
            .cloned()
            .fold(router, |router, stage| stage.apply(router));

        if self.trace {
            router = router.layer(TraceLayer::new_for_http());
        }
        router
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("stages", &self.names())
            .field("trace", &self.trace)
            .finish()
    }
}
