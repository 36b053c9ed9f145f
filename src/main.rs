use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Use the library instead of redeclaring modules
use svg_fleet::{
    config::{AssetSource, Config},
    fetch::{EmbeddedImageFetcher, HttpImageFetcher, ImageFetcher},
    fleet::Fleet,
    image_cache::{ImageCache, ImageResolver},
    map::SphericalMap,
};

#[derive(Parser)]
#[command(name = "svg-fleet")]
#[command(version = "0.1.0")]
#[command(about = "Animated fleet of recoloured SVG vehicle sprites")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Stop after this many ticks (runs until Ctrl-C otherwise)
    #[arg(short, long, value_name = "N")]
    ticks: Option<u64>,

    /// Number of vehicles (overrides config file)
    #[arg(short = 'n', long, value_name = "N")]
    num_vehicles: Option<usize>,

    /// Vehicle image id (overrides config file)
    #[arg(short = 'i', long, value_name = "IMAGE")]
    vehicle_image: Option<String>,

    /// Random seed for vehicle placement
    #[arg(short, long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with specified level
    let log_filter = format!("svg_fleet={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SVG Fleet v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    // Override config with CLI arguments
    if let Some(num_vehicles) = cli.num_vehicles {
        config.fleet.num_vehicles = num_vehicles;
    }
    if let Some(vehicle_image) = cli.vehicle_image {
        config.fleet.vehicle_image = vehicle_image;
    }
    if cli.seed.is_some() {
        config.fleet.seed = cli.seed;
    }
    config.validate()?;

    let fetcher: Arc<dyn ImageFetcher> = match config.assets.source {
        AssetSource::Embedded => {
            info!("Serving vehicle images from embedded assets");
            Arc::new(EmbeddedImageFetcher)
        }
        AssetSource::Http => {
            info!("Fetching vehicle images from {}", config.assets.base_url);
            Arc::new(HttpImageFetcher::new(
                &config.assets.base_url,
                config.assets.connect_timeout()?,
                config.assets.request_timeout()?,
            )?)
        }
    };

    let cache = ImageCache::new();
    let resolver = ImageResolver::new(cache, fetcher)
        .with_regions(config.assets.colourable_regions.clone());
    let map = Arc::new(SphericalMap::new(config.area.zoom));
    let mut fleet = Fleet::new(config.fleet.clone(), &config.area, resolver, map);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let ticks = fleet.run(cli.ticks, shutdown).await;

    let stats = fleet.stats().await;
    info!(
        "Ran {} ticks: {}/{} vehicles ready, {} failed, {} cached images",
        ticks, stats.ready, stats.vehicles, stats.failed, stats.cache_entries
    );
    info!(
        "Resolver: {} cache hits, {} fetches, {} tints, {} coalesced, {} failures",
        stats.resolver.cache_hits,
        stats.resolver.fetches,
        stats.resolver.tints,
        stats.resolver.coalesced,
        stats.resolver.failures
    );

    Ok(())
}
