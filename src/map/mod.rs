//! Map and projection collaborator
//!
//! The fleet only needs four things from a map: projecting a world position
//! to screen space, moving a position along a heading, measuring distances
//! and a circular area to keep vehicles in. [`MapService`] is that seam;
//! [`SphericalMap`] is a self-contained Web-Mercator implementation of it.

pub mod geofence;
pub mod spherical;
pub mod types;

pub use geofence::{Bounds, Geofence};
pub use spherical::{SphericalMap, EARTH_RADIUS_M};
pub use types::{LatLng, ScreenPoint, Size};

/// Projection and geodesic operations supplied by a map widget
pub trait MapService: Send + Sync {
    /// Project a world position to screen pixels
    ///
    /// Returns `None` when no projection is available for the position.
    fn project(&self, position: LatLng) -> Option<ScreenPoint>;

    /// Position reached by travelling `distance_m` metres from `origin`
    /// along `heading_deg` (clockwise from North)
    fn offset_position(&self, origin: LatLng, distance_m: f64, heading_deg: f64) -> LatLng;

    /// Great-circle distance in metres
    fn distance_between(&self, a: LatLng, b: LatLng) -> f64;
}
