use crate::domain::model::{LatLng, Listing, RawPosition};
use crate::utils::error::{EngineError, Result};
use clap::{Parser, ValueEnum};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Svg,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "listing-map")]
#[command(about = "Cluster geolocated listings and render their map markers")]
pub struct CliArgs {
    /// Path to a TOML engine configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Path to a JSON array of listings
    #[arg(short, long)]
    pub listings: String,

    /// Viewport centre as "lat,lng"
    #[arg(long, default_value = "25.0330,121.5654", value_parser = parse_lat_lng)]
    pub center: LatLng,

    #[arg(long, default_value = "12")]
    pub zoom: u8,

    #[arg(long, default_value = "1024")]
    pub width: u32,

    #[arg(long, default_value = "768")]
    pub height: u32,

    /// Fit the viewport to "south,west,north,east" before rendering
    #[arg(long, value_parser = parse_bbox)]
    pub bbox: Option<[f64; 4]>,

    /// Select the listing with this id
    #[arg(long)]
    pub select: Option<String>,

    /// Open the cluster with this id
    #[arg(long)]
    pub activate_cluster: Option<u64>,

    /// Look up directions from the reference point to the selection
    #[arg(long)]
    pub directions: bool,

    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Emit logs as JSON lines instead of compact text
    #[arg(long)]
    pub json_logs: bool,
}

fn parse_lat_lng(value: &str) -> std::result::Result<LatLng, String> {
    RawPosition::Text(value.to_string())
        .resolve()
        .ok_or_else(|| format!("'{}' is not a valid \"lat,lng\" pair", value))
}

fn parse_bbox(value: &str) -> std::result::Result<[f64; 4], String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| format!("invalid bounding box '{}': {}", value, e))?;
    match parts.as_slice() {
        &[south, west, north, east] => Ok([south, west, north, east]),
        _ => Err(format!("bounding box '{}' needs four numbers", value)),
    }
}

/// Read a JSON array of listings. Records that do not decode are skipped
/// with a warning; only an unreadable file or a non-array document fails.
pub fn load_listings<P: AsRef<Path>>(path: P) -> Result<Vec<Listing>> {
    let content = std::fs::read_to_string(&path).map_err(EngineError::IoError)?;
    let records: Vec<serde_json::Value> = serde_json::from_str(&content)?;
    let total = records.len();

    let listings: Vec<Listing> = records
        .into_iter()
        .enumerate()
        .filter_map(|(i, record)| match serde_json::from_value(record) {
            Ok(listing) => Some(listing),
            Err(e) => {
                tracing::warn!("Skipping listing record {}: {}", i, e);
                None
            }
        })
        .collect();

    if listings.len() < total {
        tracing::warn!(
            "Loaded {} of {} listing records",
            listings.len(),
            total
        );
    }
    Ok(listings)
}
