use anyhow::Context;
use clap::Parser;
use listing_map_engine::adapters::http_routing::NoRouting;
use listing_map_engine::adapters::svg::{IconSerializer, SvgIconSerializer};
use listing_map_engine::config::cli::{load_listings, CliArgs, OutputFormat};
use listing_map_engine::utils::error::ErrorSeverity;
use listing_map_engine::utils::{logger, validation::Validate};
use listing_map_engine::{
    BoundingBox, DirectionsAdapter, EngineConfig, EngineError, EngineInput, HeadlessMap,
    HttpRoutingService, MapEngine, MapEvent, MarkerKey, RoutingService,
};
use std::sync::Arc;
use std::time::Duration;

fn exit_for(e: &EngineError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }
    tracing::info!("Starting listing-map");

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path).unwrap_or_else(|e| exit_for(&e)),
        None => EngineConfig::default(),
    };
    if let Err(e) = config.validate() {
        exit_for(&e);
    }

    let listings = load_listings(&args.listings).unwrap_or_else(|e| exit_for(&e));

    let routing: Arc<dyn RoutingService> = match &config.routing.endpoint {
        Some(_) => Arc::new(HttpRoutingService::new(&config.routing).unwrap_or_else(|e| exit_for(&e))),
        None => Arc::new(NoRouting),
    };
    // long enough for one route lookup when directions are requested
    let settle_window = if args.directions {
        Duration::from_secs(config.routing.timeout_seconds)
            + config.interaction.zoom_debounce()
    } else {
        config.interaction.zoom_debounce() * 2
    };

    let map = HeadlessMap::new(args.center, args.zoom, args.width, args.height);
    let mut engine = MapEngine::new(map, config)
        .unwrap_or_else(|e| exit_for(&e))
        .with_directions(DirectionsAdapter::new(routing));

    engine.on_feature_selected(|feature| {
        tracing::info!("Selected {} ({} at {})", feature.id, feature.provider_id, feature.price);
    });
    engine.on_cluster_activated(|features| {
        for feature in features {
            println!("{}\t{}\t{}", feature.provider_id, feature.price, feature.id);
        }
    });

    engine.ingest(&listings);
    if let Some([south, west, north, east]) = args.bbox {
        engine.set_bounding_box(BoundingBox::new(south, west, north, east));
        engine.refresh_markers();
    }

    let sender = engine.sender();
    if let Some(id) = &args.select {
        let handle = engine
            .marker_handle(&MarkerKey::Feature(id.clone()))
            .with_context(|| format!("listing {} is not visible as its own marker", id))?;
        sender.send(EngineInput::Map(MapEvent::Click(handle)))?;
        if args.directions {
            sender.send(EngineInput::ShowDirections)?;
        }
    }
    if let Some(cluster_id) = args.activate_cluster {
        let handle = engine
            .marker_handle(&MarkerKey::Cluster(cluster_id))
            .with_context(|| format!("cluster {} is not visible", cluster_id))?;
        sender.send(EngineInput::Map(MapEvent::Click(handle)))?;
    }

    tokio::spawn(async move {
        tokio::time::sleep(settle_window).await;
        let _ = sender.send(EngineInput::Shutdown);
    });
    engine.run().await;

    match args.format {
        OutputFormat::Json => {
            let snapshot = serde_json::to_string_pretty(&engine.snapshot())
                .context("failed to serialise engine snapshot")?;
            println!("{}", snapshot);
        }
        OutputFormat::Svg => {
            for marker in engine.snapshot().markers {
                println!("<!-- {:?} -->", marker.key);
                println!("{}", SvgIconSerializer.serialize(&marker.visual));
            }
        }
    }

    let stats = engine.stats();
    tracing::info!(
        "✅ Done: {} refresh passes, {} markers added, {} removed",
        stats.refresh_passes,
        stats.markers_added,
        stats.markers_removed
    );
    engine.teardown();
    Ok(())
}
