//! Georeferencing of raster grids

use crate::coordinate::{BoundingBox, CoordinateSystem, Point};
use super::region::Region;

/// Tolerance used when comparing grid coordinates
const GRID_EPSILON: f64 = 1e-9;

/// Placement of a north-up raster grid in its coordinate system
///
/// `origin_x`/`origin_y` is the top-left corner of pixel (0,0). Pixel sizes
/// are positive; rows run southwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub width: u32,
    pub height: u32,
    pub crs: CoordinateSystem,
}

impl GridSpec {
    /// Create a new grid specification
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64,
               width: u32, height: u32, crs: CoordinateSystem) -> Self {
        GridSpec { origin_x, origin_y, pixel_width, pixel_height, width, height, crs }
    }

    /// A grid covering nothing
    pub fn empty() -> Self {
        GridSpec::new(0.0, 0.0, 1.0, 1.0, 0, 0, CoordinateSystem::WGS84)
    }

    /// Total number of pixels
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether the grid has no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check that pixel sizes are positive and finite
    pub fn is_valid(&self) -> bool {
        self.pixel_width.is_finite() && self.pixel_width > 0.0 &&
            self.pixel_height.is_finite() && self.pixel_height > 0.0 &&
            self.origin_x.is_finite() && self.origin_y.is_finite()
    }

    /// Extent of the grid in coordinate units
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(
            self.origin_x,
            self.origin_y - self.height as f64 * self.pixel_height,
            self.origin_x + self.width as f64 * self.pixel_width,
            self.origin_y,
        )
    }

    /// Row-major index of a pixel
    pub fn index(&self, col: u32, row: u32) -> usize {
        row as usize * self.width as usize + col as usize
    }

    /// Pixel whose footprint contains `point`, or `None` outside the grid
    pub fn pixel_of(&self, point: &Point) -> Option<(u32, u32)> {
        if self.is_empty() || !point.is_finite() {
            return None;
        }

        let col = ((point.x - self.origin_x) / self.pixel_width).floor();
        let row = ((self.origin_y - point.y) / self.pixel_height).floor();

        if col < 0.0 || row < 0.0 || col >= self.width as f64 || row >= self.height as f64 {
            return None;
        }
        Some((col as u32, row as u32))
    }

    /// Centre of a pixel in coordinate units
    pub fn pixel_center(&self, col: u32, row: u32) -> Point {
        Point::new(
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Convert a bounding box to the pixel window it overlaps
    ///
    /// The window is clipped to the grid; `None` when there is no overlap.
    pub fn region_for(&self, bbox: &BoundingBox) -> Option<Region> {
        if self.is_empty() || !self.bounds().intersects(bbox) {
            return None;
        }

        // f64 intermediates keep negative offsets representable before clipping
        let x_min = ((bbox.min_x - self.origin_x) / self.pixel_width).floor().max(0.0);
        let y_min = ((self.origin_y - bbox.max_y) / self.pixel_height).floor().max(0.0);
        let x_max = ((bbox.max_x - self.origin_x) / self.pixel_width).floor()
            .min(self.width as f64 - 1.0);
        let y_max = ((self.origin_y - bbox.min_y) / self.pixel_height).floor()
            .min(self.height as f64 - 1.0);

        if x_max < x_min || y_max < y_min {
            return None;
        }

        Some(Region::new(
            x_min as u32,
            y_min as u32,
            (x_max - x_min) as u32 + 1,
            (y_max - y_min) as u32 + 1,
        ))
    }

    /// Whether two grids describe the same pixels
    pub fn same_grid(&self, other: &GridSpec) -> bool {
        self.width == other.width && self.height == other.height && self.crs == other.crs &&
            (self.origin_x - other.origin_x).abs() <= GRID_EPSILON &&
            (self.origin_y - other.origin_y).abs() <= GRID_EPSILON &&
            (self.pixel_width - other.pixel_width).abs() <= GRID_EPSILON &&
            (self.pixel_height - other.pixel_height).abs() <= GRID_EPSILON
    }

    /// Grid covering the union of all extents at the finest pixel size
    ///
    /// Empty grids are ignored. Returns `None` when no grid has pixels or
    /// when the grids use different coordinate systems.
    pub fn union(grids: &[GridSpec]) -> Option<GridSpec> {
        let mut non_empty = grids.iter().filter(|g| !g.is_empty());
        let first = non_empty.next()?;

        if grids.iter().filter(|g| !g.is_empty()).all(|g| first.same_grid(g)) {
            return Some(*first);
        }

        let mut extent = first.bounds();
        let mut pixel_width = first.pixel_width;
        let mut pixel_height = first.pixel_height;
        for grid in non_empty {
            if grid.crs != first.crs {
                return None;
            }
            extent = extent.union(&grid.bounds());
            pixel_width = pixel_width.min(grid.pixel_width);
            pixel_height = pixel_height.min(grid.pixel_height);
        }

        let width = (extent.width() / pixel_width - GRID_EPSILON).ceil().max(1.0) as u32;
        let height = (extent.height() / pixel_height - GRID_EPSILON).ceil().max(1.0) as u32;

        Some(GridSpec::new(extent.min_x, extent.max_y, pixel_width, pixel_height,
                           width, height, first.crs))
    }
}
