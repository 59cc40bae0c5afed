//! Positioning the swath on the Earth
use crate::model::{PingRecord, Side};

/// Mean Earth radius in meters (IUGG)
pub const MEAN_EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A model of the Earth's surface for direct and inverse problems
pub trait Geodesy {
    /// The position reached by travelling `distance_m` meters from
    /// `(lat, lon)` along `bearing_rad`, as `(lat, lon)` in degrees
    fn destination(&self, lat: f64, lon: f64, bearing_rad: f64, distance_m: f64) -> (f64, f64);

    /// The distance in meters between two positions given in degrees
    fn distance(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64;
}

/// A sphere of mean Earth radius, using great circle formulas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalEarth {
    /// Radius of the sphere in meters
    pub radius_m: f64,
}

impl Default for SphericalEarth {
    fn default() -> Self {
        SphericalEarth {
            radius_m: MEAN_EARTH_RADIUS_M,
        }
    }
}

impl Geodesy for SphericalEarth {
    fn destination(&self, lat: f64, lon: f64, bearing_rad: f64, distance_m: f64) -> (f64, f64) {
        let lat = lat.to_radians();
        let lon = lon.to_radians();
        let delta = distance_m / self.radius_m;

        let lat2 = (lat.sin() * delta.cos() + lat.cos() * delta.sin() * bearing_rad.cos()).asin();
        let lon2 = lon
            + (bearing_rad.sin() * delta.sin() * lat.cos())
                .atan2(delta.cos() - lat.sin() * lat2.sin());

        (lat2.to_degrees(), lon2.to_degrees())
    }

    fn distance(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
        let (lat1, lon1, lat2, lon2) = (
            lat1.to_radians(),
            lon1.to_radians(),
            lat2.to_radians(),
            lon2.to_radians(),
        );
        let dlat = lat2 - lat1;
        let dlon = lon2 - lon1;
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * self.radius_m * a.sqrt().asin()
    }
}

/// The direction in radians in which the beam of `side` reaches the swath edge
///
/// This is perpendicular to the heading, to the right for starboard
/// and to the left for port.
pub fn acoustic_bearing(heading_deg: f64, side: Side) -> f64 {
    match side {
        Side::Starboard => (heading_deg + 90.0).to_radians(),
        Side::Port => (heading_deg - 90.0).to_radians(),
    }
}

/// The position `ground_range_m` meters from the sensor along `bearing_rad`
pub fn outer_point(lat: f64, lon: f64, bearing_rad: f64, ground_range_m: f64) -> (f64, f64) {
    SphericalEarth::default().destination(lat, lon, bearing_rad, ground_range_m)
}

/// Sensor and outer swath positions of a ping, each as `(lat, lon)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwathEdge {
    /// The sensor position
    pub sensor: (f64, f64),
    /// The far edge of the swath
    pub outer: (f64, f64),
}

/// Locate the swath edge of a ping with the given Earth model
pub fn swath_edge<G: Geodesy>(earth: &G, ping: &PingRecord, side: Side) -> SwathEdge {
    let bearing = acoustic_bearing(ping.heading_deg, side);
    let outer = earth.destination(ping.sensor_lat, ping.sensor_lon, bearing, ping.ground_range_m);
    SwathEdge {
        sensor: (ping.sensor_lat, ping.sensor_lon),
        outer,
    }
}
