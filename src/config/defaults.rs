/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Asset defaults
pub const DEFAULT_ASSET_BASE_URL: &str = "http://localhost:8080/img/";
pub const DEFAULT_COLOURABLE_REGION: &str = "#car-body";
pub const DEFAULT_CONNECT_TIMEOUT: &str = "10s";
pub const DEFAULT_REQUEST_TIMEOUT: &str = "30s";

// Area defaults (central London, 100km radius)
pub const DEFAULT_CENTRE_LAT: f64 = 51.502;
pub const DEFAULT_CENTRE_LNG: f64 = -0.117;
pub const DEFAULT_AREA_RADIUS_M: f64 = 100_000.0;
pub const DEFAULT_ZOOM: u8 = 10;
pub const MAX_ZOOM: u8 = 21;

// Fleet defaults
pub const DEFAULT_NUM_VEHICLES: usize = 100;
pub const MAX_NUM_VEHICLES: usize = 2500;
pub const DEFAULT_VEHICLE_IMAGE: &str = "simple-truck.svg";
pub const DEFAULT_VEHICLE_IMAGE_SIZE: u32 = 48;
pub const VEHICLE_IMAGE_SIZES: [u32; 6] = [16, 32, 48, 64, 96, 128];
pub const DEFAULT_AUTOMATIC_SIZE: bool = false;
pub const DEFAULT_SHOW_LABELS: bool = true;
/// Metres per millisecond
pub const DEFAULT_VEHICLE_SPEED: f64 = 0.5;
pub const MIN_VEHICLE_SPEED: f64 = 0.1;
pub const MAX_VEHICLE_SPEED: f64 = 5.0;
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 1000;
pub const MIN_REFRESH_INTERVAL_MS: u64 = 100;
pub const MAX_REFRESH_INTERVAL_MS: u64 = 60_000;

// Vehicle appearance
pub const VEHICLE_STATUSES: [&str; 7] = ["red", "yellow", "orange", "blue", "green", "white", "black"];
pub const VEHICLE_TYPES: [&str; 18] = [
    "4M", "7T", "LU", "VE", "AL", "AV", "V", "T", "L", "GL", "GT", "GV", "GC", "GX", "PC", "PL",
    "MI", "CV",
];
