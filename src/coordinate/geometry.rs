//! Footprint geometries attached to input points

use super::bbox::BoundingBox;
use super::crs::CoordinateSystem;
use super::point::Point;
use super::transform::ScaleConverter;

/// Geometry of an input feature
///
/// Polygons are given by their outer ring; the closing vertex may be
/// repeated or omitted. Circles are buffered points with a radius in metres.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// A single coordinate
    Point(Point),
    /// Outer ring of a polygon
    Polygon(Vec<Point>),
    /// Disc of `radius_m` metres around `center`
    Circle { center: Point, radius_m: f64 },
}

impl Geometry {
    /// Bounding box of the geometry in coordinate units
    ///
    /// Circles need the coordinate system to turn their metric radius into
    /// coordinate units; geographic coordinates are assumed.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds_in(&CoordinateSystem::WGS84)
    }

    /// Bounding box of the geometry, interpreting circle radii in `crs`
    pub fn bounds_in(&self, crs: &CoordinateSystem) -> Option<BoundingBox> {
        match self {
            Geometry::Point(p) => Some(BoundingBox::new(p.x, p.y, p.x, p.y)),
            Geometry::Polygon(ring) => BoundingBox::from_points(ring),
            Geometry::Circle { center, radius_m } => {
                let (dx, dy) = ScaleConverter::meters_to_units(*radius_m, crs, center);
                Some(BoundingBox::from_point_buffer(center, dx, dy))
            }
        }
    }

    /// The single location used for point sampling
    ///
    /// This is the point itself, the circle centre, or the area centroid of a
    /// polygon. Rings with zero area fall back to the vertex average.
    pub fn representative_point(&self) -> Option<Point> {
        match self {
            Geometry::Point(p) => Some(*p),
            Geometry::Circle { center, .. } => Some(*center),
            Geometry::Polygon(ring) => polygon_centroid(ring),
        }
    }

    /// Check whether `point` lies inside the geometry's footprint
    ///
    /// Points and zero-area polygons have an empty footprint.
    pub fn contains(&self, point: &Point, crs: &CoordinateSystem) -> bool {
        match self {
            Geometry::Point(_) => false,
            Geometry::Polygon(ring) => {
                signed_area(ring).abs() > f64::EPSILON && ring_contains(ring, point)
            }
            Geometry::Circle { center, radius_m } => {
                ScaleConverter::distance_meters(center, point, crs) <= *radius_m
            }
        }
    }

    /// Buffer the representative point into a circle of `radius_m` metres
    pub fn buffered(&self, radius_m: f64) -> Option<Geometry> {
        self.representative_point()
            .map(|center| Geometry::Circle { center, radius_m })
    }

    /// Check that all coordinates are finite and the geometry is well formed
    pub fn is_valid(&self) -> bool {
        match self {
            Geometry::Point(p) => p.is_finite(),
            Geometry::Polygon(ring) => !ring.is_empty() && ring.iter().all(Point::is_finite),
            Geometry::Circle { center, radius_m } => {
                center.is_finite() && radius_m.is_finite() && *radius_m >= 0.0
            }
        }
    }
}

/// Shoelace area, positive for counter-clockwise rings
fn signed_area(ring: &[Point]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        twice_area += a.x * b.y - b.x * a.y;
    }
    twice_area / 2.0
}

fn polygon_centroid(ring: &[Point]) -> Option<Point> {
    if ring.is_empty() {
        return None;
    }

    let area = signed_area(ring);
    if area.abs() <= f64::EPSILON {
        let n = ring.len() as f64;
        let (sx, sy) = ring.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        return Some(Point::new(sx / n, sy / n));
    }

    let (mut cx, mut cy) = (0.0, 0.0);
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        let cross = a.x * b.y - b.x * a.y;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    Some(Point::new(cx / (6.0 * area), cy / (6.0 * area)))
}

/// Even-odd ray casting test
fn ring_contains(ring: &[Point], point: &Point) -> bool {
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
