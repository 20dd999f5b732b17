//! Lat/lon to Cartesian projection on a spherical Earth.
//!
//! Every distance the K-function works with is a straight-line (chord)
//! distance between points on this sphere, so the same radius must be used
//! for projecting documents and for converting the search distance.

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

pub const BEARING_NORTH: f64 = 0.0;
pub const BEARING_EAST: f64 = 90.0;

/// A point in the Earth-centred Cartesian frame, in kilometers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cartesian {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Cartesian {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Cartesian { x, y, z }
    }

    /// Coordinate along axis 0 (x), 1 (y) or 2 (z).
    #[inline]
    pub fn coord(&self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    #[inline]
    pub fn distance_squared(&self, other: &Cartesian) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    pub fn distance(&self, other: &Cartesian) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

pub fn to_cartesian(lat: f64, lon: f64) -> Cartesian {
    let (lat, lon) = (lat.to_radians(), lon.to_radians());
    Cartesian {
        x: EARTH_RADIUS_KM * lat.cos() * lon.cos(),
        y: EARTH_RADIUS_KM * lat.cos() * lon.sin(),
        z: EARTH_RADIUS_KM * lat.sin(),
    }
}

/// Inverse of [`to_cartesian`]. Longitude is meaningless at the poles.
pub fn to_lat_lon(point: &Cartesian) -> (f64, f64) {
    let lat = (point.z / EARTH_RADIUS_KM).clamp(-1.0, 1.0).asin();
    let lon = point.y.atan2(point.x);
    (lat.to_degrees(), lon.to_degrees())
}

/// Point reached from (lat, lon) after travelling `distance_km` along the
/// great circle with initial `bearing` (degrees clockwise from north).
pub fn destination(lat: f64, lon: f64, bearing: f64, distance_km: f64) -> (f64, f64) {
    let delta = distance_km / EARTH_RADIUS_KM;
    let theta = bearing.to_radians();
    let phi1 = lat.to_radians();
    let lambda1 = lon.to_radians();

    let sin_phi2 = phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos();
    let phi2 = sin_phi2.clamp(-1.0, 1.0).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * sin_phi2);

    // normalise to [-180, 180)
    let lon2 = (lambda2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
    (phi2.to_degrees(), lon2)
}

/// Haversine distance between two lat/lon points, in kilometers.
pub fn great_circle_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (phi1, phi2) = (from.0.to_radians(), to.0.to_radians());
    let d_phi = phi2 - phi1;
    let d_lambda = (to.1 - from.1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().clamp(0.0, 1.0).asin()
}

/// Cartesian chord length standing in for `distance_km` of travel from
/// (lat, lon) along `bearing`.
pub fn chord_length_for_distance(lat: f64, lon: f64, bearing: f64, distance_km: f64) -> f64 {
    let origin = to_cartesian(lat, lon);
    let (lat2, lon2) = destination(lat, lon, bearing, distance_km);
    origin.distance(&to_cartesian(lat2, lon2))
}
