use std::process::ExitCode;

use tracing::{error, info};

use stremio_addon::{
    AddonBuilder, CatalogItem, HandlerError, Manifest, MetaPreviewItem, Options, ServeError,
    StreamItem, logging,
};

const BIG_BUCK_BUNNY_ID: &str = "tt1254207";

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Run the demo addon, returning an exit code on error.
async fn run() -> Result<(), exitcode::ExitCode> {
    // Load configuration
    let mut options = Options::from_env().map_err(|e| {
        eprintln!("Configuration error: {e}");
        exitcode::CONFIG
    })?;

    // Initialize logging here so startup is logged too; the addon keeps this subscriber
    logging::init_logging(options.log_level(), options.log_encoding).map_err(|e| {
        eprintln!("{e}");
        exitcode::CONFIG
    })?;
    options.logging_level = None;
    options.custom_logger = true;

    info!(
        "Starting Stremio addon server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let addon = AddonBuilder::new(manifest())
        .options(options)
        .catalog_handler("movie", |_ctx, id, _user_data| async move {
            if id != "blender" {
                return Err(HandlerError::NotFound);
            }
            Ok(vec![MetaPreviewItem::new(
                BIG_BUCK_BUNNY_ID,
                "movie",
                "Big Buck Bunny",
                "https://upload.wikimedia.org/wikipedia/commons/c/c5/Big_buck_bunny_poster_big.jpg",
            )])
        })
        .stream_handler("movie", |_ctx, id, _user_data| async move {
            if id != BIG_BUCK_BUNNY_ID {
                return Err(HandlerError::NotFound);
            }
            Ok(vec![
                StreamItem::http(
                    "http://distribution.bbb3d.renderfarming.net/video/mp4/bbb_sunflower_1080p_30fps_normal.mp4",
                    "1080p (HTTP stream)",
                ),
                StreamItem::torrent("dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c", 1, "1080p (torrent)"),
            ])
        })
        .build()
        .map_err(|e| {
            error!("Configuration error: {e}");
            exitcode::CONFIG
        })?;

    info!("API endpoints:");
    info!("  GET  /health                        - Health check");
    info!("  GET  /manifest.json                 - Addon manifest");
    info!("  GET  /catalog/movie/blender.json    - Catalog");
    info!("  GET  /stream/movie/{{id}}.json        - Streams");

    addon.run(None).await.map_err(|e| {
        error!("{e}");
        match e {
            ServeError::Bind { .. } => exitcode::UNAVAILABLE,
            ServeError::Serve(_) => exitcode::SOFTWARE,
        }
    })?;

    info!("Server shutdown complete");
    Ok(())
}

fn manifest() -> Manifest {
    Manifest {
        id: "com.example.blender-streams".to_string(),
        name: "Blender movie streams".to_string(),
        description: "Stream addon for free movies that were made with Blender".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        types: vec!["movie".to_string()],
        catalogs: vec![CatalogItem {
            media_type: "movie".to_string(),
            id: "blender".to_string(),
            name: "Blender movies".to_string(),
            ..Default::default()
        }],
        id_prefixes: vec!["tt".to_string()],
        ..Default::default()
    }
}
