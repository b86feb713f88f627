//! Great-circle distance and the spatial view's range ring.

use serde::Serialize;

const EARTH_RADIUS_NM: f64 = 3440.065;

/// Great-circle distance in nautical miles.
pub fn haversine_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_NM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Circle drawn around the observer on the spatial view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeIndicator {
    pub lat: f64,
    pub lon: f64,
    pub radius_nm: f64,
}

impl RangeIndicator {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        haversine_nm(self.lat, self.lon, lat, lon) <= self.radius_nm
    }
}
