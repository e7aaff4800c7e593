//! Conversion of metric ground distances into coordinate-system units
//!
//! Source scales and buffer radii are configured in metres, while rasters
//! may be stored in geographic coordinates. These helpers use the same
//! spherical approximation throughout so that every reduction sees the
//! same lattice for the same inputs.

use super::point::Point;
use super::crs::CoordinateSystem;

/// Converter between metres and coordinate-system units
pub struct ScaleConverter;

impl ScaleConverter {
    /// Metres per degree of latitude (and of longitude at the equator)
    pub const METERS_PER_DEGREE: f64 = 111320.0;

    /// Smallest cosine used for longitude scaling, avoids blow-up at the poles
    const MIN_COS_LAT: f64 = 1e-6;

    /// Convert a distance in metres to (x, y) steps in coordinate units at `at`
    ///
    /// For geographic systems the longitude step depends on latitude. For
    /// projected systems both steps equal the metric distance.
    pub fn meters_to_units(meters: f64, crs: &CoordinateSystem, at: &Point) -> (f64, f64) {
        if crs.is_geographic() {
            let lat_step = meters / Self::METERS_PER_DEGREE;
            let cos_lat = at.y.to_radians().cos().abs().max(Self::MIN_COS_LAT);
            let lon_step = meters / (Self::METERS_PER_DEGREE * cos_lat);
            (lon_step, lat_step)
        } else {
            (meters, meters)
        }
    }

    /// Approximate ground distance in metres between two points
    pub fn distance_meters(a: &Point, b: &Point, crs: &CoordinateSystem) -> f64 {
        if crs.is_geographic() {
            let mean_lat = ((a.y + b.y) / 2.0).to_radians();
            let dx = (b.x - a.x) * Self::METERS_PER_DEGREE * mean_lat.cos();
            let dy = (b.y - a.y) * Self::METERS_PER_DEGREE;
            dx.hypot(dy)
        } else {
            (b.x - a.x).hypot(b.y - a.y)
        }
    }
}
