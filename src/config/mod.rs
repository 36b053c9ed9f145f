use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::svg::Selector;

pub mod defaults;

use defaults::*;

/// Where base vehicle images are fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetSource {
    /// Images bundled into the binary
    Embedded,
    /// Images served below `base_url`
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub area: AreaConfig,
    #[serde(default)]
    pub fleet: FleetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    #[serde(default = "default_asset_source")]
    pub source: AssetSource,
    #[serde(default = "default_asset_base_url")]
    pub base_url: String,
    /// Selectors of the region recoloured per vehicle status
    #[serde(default = "default_colourable_regions")]
    pub colourable_regions: Vec<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
}

/// Circular area the vehicles drive in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaConfig {
    #[serde(default = "default_centre_lat")]
    pub centre_lat: f64,
    #[serde(default = "default_centre_lng")]
    pub centre_lng: f64,
    #[serde(default = "default_area_radius_m")]
    pub radius_m: f64,
    #[serde(default = "default_zoom")]
    pub zoom: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default = "default_num_vehicles")]
    pub num_vehicles: usize,
    #[serde(default = "default_vehicle_image")]
    pub vehicle_image: String,
    #[serde(default = "default_vehicle_image_size")]
    pub vehicle_image_size: u32,
    #[serde(default = "default_automatic_size")]
    pub automatic_size: bool,
    #[serde(default = "default_show_labels")]
    pub show_labels: bool,
    /// Metres per millisecond
    #[serde(default = "default_vehicle_speed")]
    pub vehicle_speed: f64,
    /// Milliseconds between animation ticks
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    /// Fixed seed for reproducible vehicle placement
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_asset_source() -> AssetSource {
    AssetSource::Embedded
}

fn default_asset_base_url() -> String {
    DEFAULT_ASSET_BASE_URL.to_string()
}

fn default_colourable_regions() -> Vec<String> {
    vec![DEFAULT_COLOURABLE_REGION.to_string()]
}

fn default_connect_timeout() -> String {
    DEFAULT_CONNECT_TIMEOUT.to_string()
}

fn default_request_timeout() -> String {
    DEFAULT_REQUEST_TIMEOUT.to_string()
}

fn default_centre_lat() -> f64 {
    DEFAULT_CENTRE_LAT
}

fn default_centre_lng() -> f64 {
    DEFAULT_CENTRE_LNG
}

fn default_area_radius_m() -> f64 {
    DEFAULT_AREA_RADIUS_M
}

fn default_zoom() -> u8 {
    DEFAULT_ZOOM
}

fn default_num_vehicles() -> usize {
    DEFAULT_NUM_VEHICLES
}

fn default_vehicle_image() -> String {
    DEFAULT_VEHICLE_IMAGE.to_string()
}

fn default_vehicle_image_size() -> u32 {
    DEFAULT_VEHICLE_IMAGE_SIZE
}

fn default_automatic_size() -> bool {
    DEFAULT_AUTOMATIC_SIZE
}

fn default_show_labels() -> bool {
    DEFAULT_SHOW_LABELS
}

fn default_vehicle_speed() -> f64 {
    DEFAULT_VEHICLE_SPEED
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MS
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            source: default_asset_source(),
            base_url: default_asset_base_url(),
            colourable_regions: default_colourable_regions(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            centre_lat: DEFAULT_CENTRE_LAT,
            centre_lng: DEFAULT_CENTRE_LNG,
            radius_m: DEFAULT_AREA_RADIUS_M,
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            num_vehicles: DEFAULT_NUM_VEHICLES,
            vehicle_image: DEFAULT_VEHICLE_IMAGE.to_string(),
            vehicle_image_size: DEFAULT_VEHICLE_IMAGE_SIZE,
            automatic_size: DEFAULT_AUTOMATIC_SIZE,
            show_labels: DEFAULT_SHOW_LABELS,
            vehicle_speed: DEFAULT_VEHICLE_SPEED,
            refresh_interval: DEFAULT_REFRESH_INTERVAL_MS,
            seed: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assets: AssetsConfig::default(),
            area: AreaConfig::default(),
            fleet: FleetConfig::default(),
        }
    }
}

impl AssetsConfig {
    pub fn connect_timeout(&self) -> AppResult<Duration> {
        parse_duration_field("assets.connect_timeout", &self.connect_timeout)
    }

    pub fn request_timeout(&self) -> AppResult<Duration> {
        parse_duration_field("assets.request_timeout", &self.request_timeout)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.colourable_regions.is_empty() {
            return Err(AppError::configuration(
                "assets.colourable_regions must name at least one selector",
            ));
        }
        if let Some(bad) = self
            .colourable_regions
            .iter()
            .find(|spec| Selector::parse(spec).is_none())
        {
            return Err(AppError::configuration(format!(
                "assets.colourable_regions: unsupported selector '{bad}'"
            )));
        }
        self.connect_timeout()?;
        self.request_timeout()?;
        Ok(())
    }
}

impl AreaConfig {
    pub fn validate(&self) -> AppResult<()> {
        if !(-85.0..=85.0).contains(&self.centre_lat) || !(-180.0..=180.0).contains(&self.centre_lng)
        {
            return Err(AppError::configuration(format!(
                "area centre ({}, {}) is outside the projectable range",
                self.centre_lat, self.centre_lng
            )));
        }
        if !(self.radius_m.is_finite() && self.radius_m > 0.0) {
            return Err(AppError::configuration("area.radius_m must be positive"));
        }
        if self.zoom > MAX_ZOOM {
            return Err(AppError::configuration(format!(
                "area.zoom {} exceeds maximum {}",
                self.zoom, MAX_ZOOM
            )));
        }
        Ok(())
    }
}

impl FleetConfig {
    /// Check values against the ranges offered by the options form
    pub fn validate(&self) -> AppResult<()> {
        if !(1..=MAX_NUM_VEHICLES).contains(&self.num_vehicles) {
            return Err(AppError::configuration(format!(
                "fleet.num_vehicles {} must be within 1..={}",
                self.num_vehicles, MAX_NUM_VEHICLES
            )));
        }
        if self.vehicle_image.trim().is_empty() {
            return Err(AppError::configuration("fleet.vehicle_image must not be empty"));
        }
        if !VEHICLE_IMAGE_SIZES.contains(&self.vehicle_image_size) {
            return Err(AppError::configuration(format!(
                "fleet.vehicle_image_size {} must be one of {:?}",
                self.vehicle_image_size, VEHICLE_IMAGE_SIZES
            )));
        }
        if !(MIN_VEHICLE_SPEED..=MAX_VEHICLE_SPEED).contains(&self.vehicle_speed) {
            return Err(AppError::configuration(format!(
                "fleet.vehicle_speed {} must be within {}..={}",
                self.vehicle_speed, MIN_VEHICLE_SPEED, MAX_VEHICLE_SPEED
            )));
        }
        if !(MIN_REFRESH_INTERVAL_MS..=MAX_REFRESH_INTERVAL_MS).contains(&self.refresh_interval) {
            return Err(AppError::configuration(format!(
                "fleet.refresh_interval {} must be within {}..={} ms",
                self.refresh_interval, MIN_REFRESH_INTERVAL_MS, MAX_REFRESH_INTERVAL_MS
            )));
        }
        Ok(())
    }
}

impl Config {
    pub fn load() -> AppResult<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    pub fn load_from_file(config_file: &str) -> AppResult<Self> {
        let config = if std::path::Path::new(config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            toml::from_str(&contents)?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            default_config
        };
        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.assets.validate()?;
        self.area.validate()?;
        self.fleet.validate()
    }
}

fn parse_duration_field(field: &str, value: &str) -> AppResult<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| AppError::configuration(format!("{field} '{value}': {e}")))
}
