use std::f64::consts::PI;

use super::types::{LatLng, ScreenPoint};
use super::MapService;

/// Sphere radius used for all geodesic calculations
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Pixels per tile edge at zoom 0
const TILE_SIZE: f64 = 256.0;

/// Latitude beyond which Web-Mercator is undefined
const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Web-Mercator projection with spherical geodesics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalMap {
    zoom: u8,
}

impl SphericalMap {
    pub fn new(zoom: u8) -> Self {
        Self { zoom }
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom;
    }

    fn world_size(&self) -> f64 {
        TILE_SIZE * 2f64.powi(i32::from(self.zoom))
    }
}

impl MapService for SphericalMap {
    fn project(&self, position: LatLng) -> Option<ScreenPoint> {
        if !position.is_finite() || position.lat.abs() > MAX_MERCATOR_LAT {
            return None;
        }
        let scale = self.world_size();
        let sin_lat = position.lat.to_radians().sin();
        let x = (position.lng + 180.0) / 360.0 * scale;
        let y = (0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI)) * scale;
        Some(ScreenPoint::new(x, y))
    }

    fn offset_position(&self, origin: LatLng, distance_m: f64, heading_deg: f64) -> LatLng {
        let angular = distance_m / EARTH_RADIUS_M;
        let heading = heading_deg.to_radians();
        let lat1 = origin.lat.to_radians();
        let lng1 = origin.lng.to_radians();

        let sin_lat2 = lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * heading.cos();
        let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();
        let lng2 = lng1
            + (heading.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * sin_lat2);

        LatLng::new(lat2.to_degrees(), wrap_longitude(lng2.to_degrees()))
    }

    fn distance_between(&self, a: LatLng, b: LatLng) -> f64 {
        let lat1 = a.lat.to_radians();
        let lat2 = b.lat.to_radians();
        let d_lat = lat2 - lat1;
        let d_lng = (b.lng - a.lng).to_radians();

        let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
    }
}

/// Wrap a longitude into [-180, 180)
fn wrap_longitude(lng: f64) -> f64 {
    (lng + 180.0).rem_euclid(360.0) - 180.0
}
