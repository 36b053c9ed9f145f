use super::types::LatLng;
use super::MapService;

/// Sampling attempts before giving up on a random point
const MAX_SAMPLE_ATTEMPTS: usize = 1000;

/// Axis-aligned bounds of a geofence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

/// Circular area vehicles are kept inside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    pub centre: LatLng,
    pub radius_m: f64,
}

impl Geofence {
    pub fn new(centre: LatLng, radius_m: f64) -> Self {
        Self { centre, radius_m }
    }

    /// Strictly inside the circle
    pub fn contains(&self, map: &dyn MapService, point: LatLng) -> bool {
        map.distance_between(point, self.centre) < self.radius_m
    }

    pub fn bounds(&self, map: &dyn MapService) -> Bounds {
        let north = map.offset_position(self.centre, self.radius_m, 0.0);
        let east = map.offset_position(self.centre, self.radius_m, 90.0);
        let south = map.offset_position(self.centre, self.radius_m, 180.0);
        let west = map.offset_position(self.centre, self.radius_m, 270.0);
        Bounds {
            south_west: LatLng::new(south.lat, west.lng),
            north_east: LatLng::new(north.lat, east.lng),
        }
    }

    /// Uniformly sample a point inside the circle
    ///
    /// Points are drawn from the bounding box and rejected until one falls
    /// inside. A degenerate fence (zero radius) yields its centre.
    pub fn random_point(&self, map: &dyn MapService, rng: &mut fastrand::Rng) -> LatLng {
        let Bounds {
            south_west: sw,
            north_east: ne,
        } = self.bounds(map);

        for _ in 0..MAX_SAMPLE_ATTEMPTS {
            let point = LatLng::new(
                rng.f64() * (ne.lat - sw.lat) + sw.lat,
                rng.f64() * (ne.lng - sw.lng) + sw.lng,
            );
            if self.contains(map, point) {
                return point;
            }
        }
        self.centre
    }
}
