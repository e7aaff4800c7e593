//! Single-band raster with explicit pixel availability

use crate::coordinate::Point;
use crate::errors::{ExtractError, ExtractResult};
use super::grid::GridSpec;

/// A single band of numeric pixels
///
/// Each pixel is `Some(value)` or `None` when unavailable (nodata, masked,
/// or not computable). Unavailable pixels are never coerced to a number.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    grid: GridSpec,
    data: Vec<Option<f64>>,
}

impl Raster {
    /// Create a raster from row-major pixel values
    ///
    /// Non-finite values are stored as unavailable.
    pub fn new(grid: GridSpec, data: Vec<Option<f64>>) -> ExtractResult<Self> {
        if !grid.is_valid() {
            return Err(ExtractError::GenericError(format!("Invalid raster grid: {:?}", grid)));
        }
        if data.len() != grid.len() {
            return Err(ExtractError::GenericError(format!(
                "Raster data has {} values but grid is {}x{}",
                data.len(), grid.width, grid.height
            )));
        }

        let data = data.into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect();
        Ok(Raster { grid, data })
    }

    /// Create a raster from plain values, treating `nodata` as unavailable
    pub fn from_values(grid: GridSpec, values: Vec<f64>, nodata: Option<f64>) -> ExtractResult<Self> {
        let data = values.into_iter()
            .map(|v| match nodata {
                Some(nd) if v == nd => None,
                _ => Some(v),
            })
            .collect();
        Raster::new(grid, data)
    }

    /// A raster where every pixel is unavailable
    pub fn unavailable(grid: GridSpec) -> Self {
        Raster { grid, data: vec![None; grid.len()] }
    }

    /// A raster without pixels; every query against it is unavailable
    pub fn empty() -> Self {
        Raster::unavailable(GridSpec::empty())
    }

    /// Georeferencing of this raster
    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// Row-major pixel values
    pub fn data(&self) -> &[Option<f64>] {
        &self.data
    }

    /// Pixel value at (column, row)
    pub fn get(&self, col: u32, row: u32) -> Option<f64> {
        if col >= self.grid.width || row >= self.grid.height {
            return None;
        }
        self.data[self.grid.index(col, row)]
    }

    /// Value of the pixel containing `point`
    pub fn value_at(&self, point: &Point) -> Option<f64> {
        let (col, row) = self.grid.pixel_of(point)?;
        self.get(col, row)
    }

    /// Number of available pixels
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_some()).count()
    }

    /// Apply `f` to every pixel, keeping the grid
    pub fn map<F>(&self, f: F) -> Raster
    where
        F: Fn(Option<f64>) -> Option<f64>,
    {
        Raster {
            grid: self.grid,
            data: self.data.iter().map(|v| f(*v).filter(|x| x.is_finite())).collect(),
        }
    }

    /// Make every pixel unavailable where `keep` is false at the same index
    ///
    /// Both rasters must share a grid; the caller checks this.
    pub fn masked_by(&self, keep: &[bool]) -> Raster {
        Raster {
            grid: self.grid,
            data: self.data.iter()
                .zip(keep)
                .map(|(v, k)| if *k { *v } else { None })
                .collect(),
        }
    }

    /// Sample this raster onto another grid by nearest pixel
    pub fn resample_to(&self, target: &GridSpec) -> Raster {
        if self.grid.same_grid(target) {
            return self.clone();
        }

        let mut data = Vec::with_capacity(target.len());
        for row in 0..target.height {
            for col in 0..target.width {
                data.push(self.value_at(&target.pixel_center(col, row)));
            }
        }
        Raster { grid: *target, data }
    }
}
