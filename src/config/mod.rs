#[cfg(feature = "cli")]
pub mod cli;

use crate::core::cluster::MAX_CLUSTER_ZOOM;
use crate::domain::model::{LatLng, ScreenPoint};
use crate::domain::visual::Palette;
use crate::utils::error::{EngineError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cluster: ClusterConfig,
    pub markers: MarkerConfig,
    pub interaction: InteractionConfig,
    pub routing: RoutingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub radius_px: f64,
    pub tile_size: f64,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub min_points: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            radius_px: 40.0,
            tile_size: 256.0,
            min_zoom: 0,
            max_zoom: 16,
            min_points: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub currency: String,
    pub base_width: f64,
    pub per_char_width: f64,
    pub horizontal_padding: f64,
    pub height: f64,
    pub font_size: f64,
    pub selected: Palette,
    pub lowest_price: Palette,
    pub default: Palette,
    pub cluster: Palette,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            base_width: 56.0,
            per_char_width: 7.0,
            horizontal_padding: 20.0,
            height: 28.0,
            font_size: 13.0,
            selected: Palette::new("#1d4ed8", "#1e3a8a", "#ffffff"),
            lowest_price: Palette::new("#dcfce7", "#15803d", "#14532d"),
            default: Palette::new("#ffffff", "#9ca3af", "#111827"),
            cluster: Palette::new("#f97316", "#c2410c", "#ffffff"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub zoom_debounce_ms: u64,
    pub mobile: bool,
    pub hover_card_offset: ScreenPoint,
    pub selected_card_offset: ScreenPoint,
    pub cluster_fit_padding_px: u32,
    pub max_fit_zoom: u8,
    pub reference_point: Option<LatLng>,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            zoom_debounce_ms: 250,
            mobile: false,
            hover_card_offset: ScreenPoint { x: 0.0, y: -44.0 },
            selected_card_offset: ScreenPoint { x: 0.0, y: -52.0 },
            cluster_fit_padding_px: 50,
            max_fit_zoom: 15,
            reference_point: None,
        }
    }
}

impl InteractionConfig {
    pub fn zoom_debounce(&self) -> Duration {
        Duration::from_millis(self.zoom_debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub endpoint: Option<String>,
    pub profile: String,
    pub timeout_seconds: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            profile: "driving".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EngineError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text, substituting `${VAR}` references.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EngineError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EngineError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_positive_float("cluster.radius_px", self.cluster.radius_px)?;
        validation::validate_positive_float("cluster.tile_size", self.cluster.tile_size)?;
        validation::validate_range("cluster.max_zoom", self.cluster.max_zoom, 0, MAX_CLUSTER_ZOOM)?;
        validation::validate_range(
            "cluster.min_zoom",
            self.cluster.min_zoom,
            0,
            self.cluster.max_zoom,
        )?;
        validation::validate_positive_number("cluster.min_points", self.cluster.min_points as u64, 1)?;

        validation::validate_non_empty_string("markers.currency", &self.markers.currency)?;
        validation::validate_positive_float("markers.base_width", self.markers.base_width)?;
        validation::validate_positive_float("markers.height", self.markers.height)?;
        validation::validate_positive_float("markers.per_char_width", self.markers.per_char_width)?;

        validation::validate_range("interaction.max_fit_zoom", self.interaction.max_fit_zoom, 0, 24)?;
        if let Some(point) = self.interaction.reference_point {
            validation::validate_lat_lng("interaction.reference_point", point.lat, point.lng)?;
        }

        if let Some(endpoint) = &self.routing.endpoint {
            validation::validate_url("routing.endpoint", endpoint)?;
        }
        validation::validate_non_empty_string("routing.profile", &self.routing.profile)?;
        validation::validate_positive_number("routing.timeout_seconds", self.routing.timeout_seconds, 1)?;

        Ok(())
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
