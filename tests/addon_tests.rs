//! Router-level tests for the assembled addon.
//!
//! Every test builds an addon and drives its router with
//! `tower::ServiceExt::oneshot`, so the full middleware chain runs without
//! binding a socket.
//!
//! Run with: `cargo test --test addon_tests`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, ETAG, IF_NONE_MATCH, LOCATION,
};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Deserialize;
use serde_json::{Value, json};
use tower::ServiceExt;

use stremio_addon::cache::fingerprint;
use stremio_addon::userdata::encode;
use stremio_addon::{
    AddonBuilder, BehaviorHints, ConfigError, ConfigurationField, ConfigurationUi, HandlerError,
    Manifest, Meta, MetaError, MetaFetcher, MetaPreviewItem, Options, StreamItem, SubtitleItem,
    UserDataEncoding,
};

// =============================================================================
// Helpers
// =============================================================================

fn manifest() -> Manifest {
    Manifest {
        id: "org.test".to_string(),
        name: "t".to_string(),
        description: "d".to_string(),
        version: "1.0.0".to_string(),
        types: vec!["movie".to_string()],
        ..Default::default()
    }
}

fn configurable_manifest(configuration_required: bool) -> Manifest {
    Manifest {
        behavior_hints: BehaviorHints {
            configurable: true,
            configuration_required,
            ..Default::default()
        },
        ..manifest()
    }
}

fn bbb_stream() -> StreamItem {
    StreamItem::http("https://example.com/bbb.mp4", "1080p")
}

/// Stream handler returning one item for `tt1` and the sentinel otherwise.
fn with_streams(builder: AddonBuilder) -> AddonBuilder {
    builder.stream_handler("movie", |_ctx, id, _user_data| async move {
        match id.as_str() {
            "tt1" => Ok(vec![bbb_stream()]),
            _ => Err(HandlerError::NotFound),
        }
    })
}

fn router(builder: AddonBuilder) -> Router {
    builder.build().unwrap().router()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, headers, body)
}

async fn get_uri(router: Router, uri: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

fn json_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

// =============================================================================
// Manifest
// =============================================================================

#[tokio::test]
async fn test_manifest_served_as_configured() {
    let app = router(with_streams(AddonBuilder::new(manifest())));

    let (status, headers, body) = get_uri(app, "/manifest.json").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(json_body(&body), serde_json::to_value(manifest()).unwrap());
}

#[tokio::test]
async fn test_manifest_with_user_data_clears_configuration_required() {
    let app = router(with_streams(AddonBuilder::new(configurable_manifest(true))));

    let (_, _, body) = get_uri(app.clone(), "/manifest.json").await;
    assert_eq!(json_body(&body)["behaviorHints"]["configurationRequired"], true);

    let (status, _, body) = get_uri(app, "/abc/manifest.json").await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["behaviorHints"]["configurable"], true);
    assert!(body["behaviorHints"].get("configurationRequired").is_none());
}

#[tokio::test]
async fn test_manifest_callback_can_reject_and_modify() {
    let installs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&installs);

    let app = router(
        with_streams(AddonBuilder::new(manifest())).manifest_callback(move |ctx, manifest, _| {
            if ctx.uri.query() == Some("deny=1") {
                return StatusCode::FORBIDDEN;
            }
            counter.fetch_add(1, Ordering::Relaxed);
            manifest.name = "renamed".to_string();
            StatusCode::OK
        }),
    );

    let (status, _, _) = get_uri(app.clone(), "/manifest.json?deny=1").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = get_uri(app.clone(), "/manifest.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["name"], "renamed");
    assert_eq!(installs.load(Ordering::Relaxed), 1);
}

// =============================================================================
// Resource dispatch
// =============================================================================

#[tokio::test]
async fn test_stream_found_and_not_found() {
    let app = router(with_streams(AddonBuilder::new(manifest())));

    let (status, _, body) = get_uri(app.clone(), "/stream/movie/tt1.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_body(&body),
        json!({ "streams": [serde_json::to_value(bbb_stream()).unwrap()] })
    );

    let (status, _, _) = get_uri(app, "/stream/movie/ttX.json").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catalog_dispatch() {
    let app = router(AddonBuilder::new(manifest()).catalog_handler(
        "movie",
        |_ctx, id, _user_data| async move {
            Ok::<_, HandlerError>(vec![MetaPreviewItem::new(
                "tt1",
                "movie",
                format!("from {id}"),
                "https://example.com/poster.jpg",
            )])
        },
    ));

    let (status, headers, body) = get_uri(app, "/catalog/movie/top.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers.get(CACHE_CONTROL).is_none());
    let body = json_body(&body);
    assert_eq!(body["metas"][0]["name"], "from top");
    assert_eq!(body["metas"][0]["type"], "movie");
}

#[tokio::test]
async fn test_unsupported_type_is_bad_request() {
    let app = router(with_streams(AddonBuilder::new(manifest())));

    let (status, _, body) = get_uri(app, "/stream/series/tt1:1:1.json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Unsupported type");
}

#[tokio::test]
async fn test_handler_failure_is_internal_error() {
    let app = router(AddonBuilder::new(manifest()).stream_handler(
        "movie",
        |_ctx, _id, _user_data| async {
            Err::<Vec<StreamItem>, _>(HandlerError::Internal(anyhow::anyhow!("upstream down")))
        },
    ));

    let (status, _, body) = get_uri(app, "/stream/movie/tt1.json").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, b"Failed to get streams");
}

#[tokio::test]
async fn test_subtitles_dispatch() {
    let app = router(AddonBuilder::new(manifest()).subtitle_handler(
        |_ctx, video_id, _user_data| async move {
            Ok::<_, HandlerError>(vec![SubtitleItem {
                id: "1".to_string(),
                url: format!("https://example.com/{video_id}.srt"),
                language: "eng".to_string(),
                label: "English".to_string(),
            }])
        },
    ));

    let (status, _, body) = get_uri(app.clone(), "/subtitles?videoId=tt1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)[0]["url"], "https://example.com/tt1.srt");

    let (status, _, _) = get_uri(app, "/subtitles").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_resource_path_without_json_suffix_is_not_found() {
    let app = router(with_streams(AddonBuilder::new(manifest())));

    let (status, _, _) = get_uri(app.clone(), "/stream/movie/tt1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = get_uri(app.clone(), "/abc/stream/movie/tt1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = get_uri(app, "/catalog/movie/top").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let app = router(with_streams(AddonBuilder::new(manifest())));

    let (status, _, _) = get_uri(app, "/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Caching
// =============================================================================

#[tokio::test]
async fn test_etag_round_trip() {
    let options = Options {
        cache_age_streams: std::time::Duration::from_secs(3600),
        cache_public_streams: true,
        handle_etag_streams: true,
        ..Default::default()
    };
    let app = router(with_streams(AddonBuilder::new(manifest())).options(options));

    let (status, headers, body) = get_uri(app.clone(), "/stream/movie/tt1.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[CACHE_CONTROL], "public, max-age=3600");
    let etag = headers[ETAG].to_str().unwrap().to_string();
    assert!(!body.is_empty());
    // Fingerprint covers the whole envelope, not just the item list
    assert_eq!(etag, fingerprint(&body));
    let items = serde_json::to_vec(&json_body(&body)["streams"]).unwrap();
    assert_ne!(etag, fingerprint(&items));

    let request = Request::get("/stream/movie/tt1.json")
        .header(IF_NONE_MATCH, &etag)
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::NOT_MODIFIED);
    assert_eq!(headers[ETAG], etag.as_str());
    assert!(body.is_empty());

    let request = Request::get("/stream/movie/tt1.json")
        .header(IF_NONE_MATCH, "stale")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_not_found_ignores_cache_configuration() {
    let options = Options {
        cache_age_streams: std::time::Duration::from_secs(60),
        handle_etag_streams: true,
        ..Default::default()
    };
    let app = router(with_streams(AddonBuilder::new(manifest())).options(options));

    let (status, headers, _) = get_uri(app, "/stream/movie/ttX.json").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(headers.get(ETAG).is_none());
}

#[test]
fn test_public_cache_without_age_fails_build() {
    let options = Options {
        cache_public_streams: true,
        ..Default::default()
    };

    let result = with_streams(AddonBuilder::new(manifest()))
        .options(options)
        .build();

    assert!(matches!(result, Err(ConfigError::PublicCacheWithoutAge)));
}

// =============================================================================
// Gate and user data
// =============================================================================

#[tokio::test]
async fn test_configuration_required_gate() {
    let app = router(with_streams(AddonBuilder::new(configurable_manifest(true))));

    let (status, _, body) = get_uri(app.clone(), "/stream/movie/tt1.json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Configuration required");

    let (status, _, body) = get_uri(app, "/abc/stream/movie/tt1.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["streams"][0]["url"], "https://example.com/bbb.mp4");
}

#[tokio::test]
async fn test_stream_id_pattern() {
    let options = Options {
        stream_id_regex: Some(r"^tt\d+$".to_string()),
        ..Default::default()
    };
    let app = router(with_streams(AddonBuilder::new(manifest())).options(options));

    let (status, _, body) = get_uri(app.clone(), "/stream/movie/kitsu:1.json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Invalid stream ID");

    let (status, _, _) = get_uri(app, "/stream/movie/tt1.json").await;
    assert_eq!(status, StatusCode::OK);
}

#[derive(Debug, Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct Credentials {
    api_key: String,
}

fn credentials_addon(encoding: UserDataEncoding) -> Router {
    let options = Options {
        user_data_encoding: encoding,
        ..Default::default()
    };

    AddonBuilder::<Credentials>::with_user_data(manifest())
        .options(options)
        .stream_handler("movie", |_ctx, _id, user_data| async move {
            let key = user_data
                .typed()
                .map(|c| c.api_key.clone())
                .unwrap_or_else(|| "anonymous".to_string());
            Ok::<_, HandlerError>(vec![StreamItem::http("https://example.com/bbb.mp4", key)])
        })
        .build()
        .unwrap()
        .router()
}

#[tokio::test]
async fn test_typed_user_data_reaches_handler() {
    for encoding in [UserDataEncoding::PercentEncodedJson, UserDataEncoding::Base64Url] {
        let app = credentials_addon(encoding);
        let raw = encode(&Credentials { api_key: "secret".to_string() }, encoding).unwrap();

        let (status, _, body) = get_uri(app.clone(), &format!("/{raw}/stream/movie/tt1.json")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["streams"][0]["title"], "secret");

        let (_, _, body) = get_uri(app, "/stream/movie/tt1.json").await;
        assert_eq!(json_body(&body)["streams"][0]["title"], "anonymous");
    }
}

#[tokio::test]
async fn test_invalid_user_data_is_bad_request() {
    let app = credentials_addon(UserDataEncoding::PercentEncodedJson);

    let (status, _, body) = get_uri(app.clone(), "/%7Bbroken/stream/movie/tt1.json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Invalid user data");

    // Valid JSON, wrong shape
    let (status, _, _) = get_uri(app, "/%7B%22foo%22%3A1%7D/manifest.json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Middleware
// =============================================================================

#[tokio::test]
async fn test_options_preflight() {
    let app = router(with_streams(AddonBuilder::new(manifest())));

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/stream/movie/tt1.json")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_custom_route_runs_behind_chain() {
    let app = router(
        with_streams(AddonBuilder::new(manifest())).route("/ping", get(|| async { "pong" })),
    );

    let (status, headers, body) = get_uri(app, "/ping").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(body, b"pong");
}

/// Value of `stremio_http_requests_total` for one (endpoint, status) pair.
fn request_count(rendered: &str, endpoint: &str, status: u16) -> Option<u64> {
    let endpoint = format!("endpoint=\"{endpoint}\"");
    let status = format!("status=\"{status}\"");
    rendered
        .lines()
        .filter(|line| line.starts_with("stremio_http_requests_total{"))
        .find(|line| line.contains(&endpoint) && line.contains(&status))
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}

#[test]
fn test_metrics_count_final_status_of_short_circuits() {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    let options = Options {
        cache_age_streams: std::time::Duration::from_secs(60),
        handle_etag_streams: true,
        stream_id_regex: Some(r"^tt\d+$".to_string()),
        ..Default::default()
    };
    let app = router(with_streams(AddonBuilder::new(manifest())).options(options));

    metrics::with_local_recorder(&recorder, || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let (status, _, _) = get_uri(app.clone(), "/stream/movie/kitsu:1.json").await;
            assert_eq!(status, StatusCode::BAD_REQUEST);

            let (status, headers, _) = get_uri(app.clone(), "/stream/movie/tt1.json").await;
            assert_eq!(status, StatusCode::OK);
            let request = Request::get("/stream/movie/tt1.json")
                .header(IF_NONE_MATCH, headers[ETAG].clone())
                .body(Body::empty())
                .unwrap();
            let (status, _, _) = send(app.clone(), request).await;
            assert_eq!(status, StatusCode::NOT_MODIFIED);

            let request = Request::builder()
                .method(Method::OPTIONS)
                .uri("/manifest.json")
                .body(Body::empty())
                .unwrap();
            let (status, _, _) = send(app, request).await;
            assert_eq!(status, StatusCode::OK);
        });
    });

    let rendered = handle.render();
    assert_eq!(request_count(&rendered, "stream", 400), Some(1));
    assert_eq!(request_count(&rendered, "stream", 200), Some(1));
    assert_eq!(request_count(&rendered, "stream", 304), Some(1));
    assert_eq!(request_count(&rendered, "manifest", 200), Some(1));
}

struct FixedMeta;

#[async_trait]
impl MetaFetcher for FixedMeta {
    async fn get_movie(&self, id: &str) -> Result<Meta, MetaError> {
        Ok(Meta {
            id: id.to_string(),
            media_type: "movie".to_string(),
            name: "Big Buck Bunny".to_string(),
            release_info: "2008".to_string(),
            ..Default::default()
        })
    }

    async fn get_tv_show(&self, id: &str, _season: u32, _episode: u32) -> Result<Meta, MetaError> {
        Err(MetaError::NotFound(id.to_string()))
    }
}

#[tokio::test]
async fn test_meta_in_context() {
    let options = Options {
        put_meta_in_context: true,
        log_media_name: true,
        ..Default::default()
    };
    let app = router(
        AddonBuilder::new(manifest())
            .options(options)
            .meta_fetcher(Arc::new(FixedMeta))
            .stream_handler("movie", |ctx, _id, _user_data| async move {
                let title = ctx
                    .meta()
                    .map(Meta::media_name)
                    .ok_or(HandlerError::NotFound)?;
                Ok::<_, HandlerError>(vec![StreamItem::http("https://example.com/bbb.mp4", title)])
            }),
    );

    let (status, _, body) = get_uri(app, "/stream/movie/tt1254207.json").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["streams"][0]["title"], "Big Buck Bunny (2008)");
}

// =============================================================================
// Configuration endpoints and redirect
// =============================================================================

#[tokio::test]
async fn test_configure_endpoints() {
    let ui = ConfigurationUi::new("object")
        .with_field(
            "apiKey",
            ConfigurationField::new("string", "API key").required(true),
        )
        .unwrap();

    let app = router(
        with_streams(AddonBuilder::new(configurable_manifest(false)))
            .configuration_ui(ui)
            .configuration_handler(|ctx, _user_data| async move {
                Ok::<_, HandlerError>(json!({ "query": ctx.uri.query() }))
            }),
    );

    let (status, _, body) = get_uri(app.clone(), "/configure.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["properties"]["apiKey"]["label"], "API key");

    let (status, _, body) = get_uri(app, "/configure?userData=abc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["query"], "userData=abc");
}

#[tokio::test]
async fn test_configure_not_routed_for_plain_addon() {
    let app = router(with_streams(AddonBuilder::new(manifest())));

    let (status, _, _) = get_uri(app, "/configure").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_root_redirect() {
    let options = Options {
        redirect_url: Some("https://example.com/addon".to_string()),
        ..Default::default()
    };
    let app = router(with_streams(AddonBuilder::new(manifest())).options(options));

    let (status, headers, _) = get_uri(app, "/").await;

    assert_eq!(status, StatusCode::MOVED_PERMANENTLY);
    assert_eq!(headers[LOCATION], "https://example.com/addon");
}

#[tokio::test]
async fn test_health() {
    let app = router(with_streams(AddonBuilder::new(manifest())));

    let (status, _, body) = get_uri(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], "1.0.0");
}
