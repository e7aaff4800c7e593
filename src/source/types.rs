//! Source declaration types

use std::collections::BTreeMap;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::raster::{Expression, Statistic};

/// Default percentile list for statistical summaries
pub const DEFAULT_PERCENTILES: [u8; 3] = [25, 50, 75];

/// Default cap on the number of pixels a region reduction may touch
pub const DEFAULT_MAX_PIXELS: u64 = 1_000_000_000;

/// What kind of data a source provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// A single image with a fixed set of bands
    StaticRaster,
    /// A tile collection merged into one image, last tile on top
    Mosaic,
    /// A multi-band time series that is filtered, masked and composited
    TimeFilteredCollection,
    /// A pre-computed product averaged over a time window
    DerivedComposite,
}

impl SourceKind {
    /// Whether the source is a time series that must be composited
    pub fn is_temporal(&self) -> bool {
        matches!(self, SourceKind::TimeFilteredCollection | SourceKind::DerivedComposite)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::StaticRaster => "static-raster",
            SourceKind::Mosaic => "mosaic",
            SourceKind::TimeFilteredCollection => "time-filtered-collection",
            SourceKind::DerivedComposite => "derived-composite",
        }
    }
}

/// How prepared rasters are reduced at a point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReductionPolicy {
    /// Nearest pixel at the point
    PointSample,
    /// Mean of the pixels inside the point's footprint
    RegionMean,
    /// Composite over time, then mean over the footprint
    TemporalCompositeThenRegionMean,
}

impl ReductionPolicy {
    /// Whether the policy reduces over the footprint rather than sampling
    pub fn is_regional(&self) -> bool {
        !matches!(self, ReductionPolicy::PointSample)
    }
}

/// Time window applied to collection items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalFilter {
    /// Acquisitions with `start <= date < end`
    DateRange { start: NaiveDate, end: NaiveDate },
    /// Acquisitions whose calendar year is in `first..=last`
    CalendarYears { first: i32, last: i32 },
}

impl TemporalFilter {
    /// Whether the window has defined, ordered bounds
    pub fn is_closed(&self) -> bool {
        match self {
            TemporalFilter::DateRange { start, end } => start < end,
            TemporalFilter::CalendarYears { first, last } => first <= last,
        }
    }

    /// Whether an acquisition date falls inside the window
    pub fn matches(&self, date: NaiveDate) -> bool {
        match self {
            TemporalFilter::DateRange { start, end } => *start <= date && date < *end,
            TemporalFilter::CalendarYears { first, last } => (*first..=*last).contains(&date.year()),
        }
    }

    /// Short label used in log messages
    pub fn describe(&self) -> String {
        match self {
            TemporalFilter::DateRange { start, end } => format!("[{}, {})", start, end),
            TemporalFilter::CalendarYears { first, last } => format!("years {}-{}", first, last),
        }
    }
}

/// Pixel-level quality mask over a classification band
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QualityMask {
    /// Band holding the classification
    pub band: String,
    /// Classes whose pixels are masked out
    pub exclude: Vec<i64>,
}

impl QualityMask {
    /// Whether a pixel with this classification value is kept
    ///
    /// Pixels without a classification are masked.
    pub fn keeps(&self, class_value: Option<f64>) -> bool {
        match class_value {
            Some(v) => !self.exclude.iter().any(|c| (*c as f64 - v).abs() < 0.5),
            None => false,
        }
    }
}

/// Comparison used by [`AttributeFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

/// Item-level filter on an image property, e.g. `CLOUDY_PIXEL_PERCENTAGE < 40`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AttributeFilter {
    pub property: String,
    pub op: Comparison,
    pub value: f64,
}

impl AttributeFilter {
    /// Whether an image with these properties passes; a missing property fails
    pub fn matches(&self, properties: &BTreeMap<String, f64>) -> bool {
        let Some(actual) = properties.get(&self.property).copied() else {
            return false;
        };
        match self.op {
            Comparison::Lt => actual < self.value,
            Comparison::Le => actual <= self.value,
            Comparison::Gt => actual > self.value,
            Comparison::Ge => actual >= self.value,
            Comparison::Eq => actual == self.value,
            Comparison::Ne => actual != self.value,
        }
    }
}

/// A band computed from other bands
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedBand {
    pub name: String,
    pub expression: Expression,
}

/// Maps one statistic of one band to an output field
#[derive(Debug, Clone, PartialEq)]
pub struct OutputBinding {
    pub field: String,
    pub band: String,
    pub statistic: Statistic,
}

/// Full declaration of a source
#[derive(Debug, Clone)]
pub struct SourceDefinition {
    pub name: String,
    pub kind: SourceKind,
    /// Identifier of the image or collection in the provider
    pub dataset: String,
    /// Reduction scale in metres
    pub scale: f64,
    pub policy: ReductionPolicy,
    /// Primary bands read from the provider
    pub bands: Vec<String>,
    /// Bands derived after masking, in evaluation order
    pub derived: Vec<DerivedBand>,
    pub temporal: Option<TemporalFilter>,
    pub quality: Option<QualityMask>,
    pub attribute_filter: Option<AttributeFilter>,
    /// Restrict collections to items intersecting the points' extent
    pub filter_bounds: bool,
    /// Buffer radius in metres applied before regional reductions
    pub buffer_m: Option<f64>,
    pub max_pixels: u64,
    pub percentiles: Vec<u8>,
    pub outputs: Vec<OutputBinding>,
}

impl SourceDefinition {
    /// Start a declaration with the required fields
    pub fn new(name: &str, kind: SourceKind, dataset: &str, scale: f64, policy: ReductionPolicy) -> Self {
        SourceDefinition {
            name: name.to_string(),
            kind,
            dataset: dataset.to_string(),
            scale,
            policy,
            bands: Vec::new(),
            derived: Vec::new(),
            temporal: None,
            quality: None,
            attribute_filter: None,
            filter_bounds: true,
            buffer_m: None,
            max_pixels: DEFAULT_MAX_PIXELS,
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            outputs: Vec::new(),
        }
    }

    pub fn with_bands(mut self, bands: &[&str]) -> Self {
        self.bands = bands.iter().map(|b| b.to_string()).collect();
        self
    }

    pub fn with_derived(mut self, name: &str, expression: Expression) -> Self {
        self.derived.push(DerivedBand { name: name.to_string(), expression });
        self
    }

    pub fn with_temporal(mut self, filter: TemporalFilter) -> Self {
        self.temporal = Some(filter);
        self
    }

    pub fn with_quality(mut self, band: &str, exclude: &[i64]) -> Self {
        self.quality = Some(QualityMask { band: band.to_string(), exclude: exclude.to_vec() });
        self
    }

    pub fn with_attribute_filter(mut self, property: &str, op: Comparison, value: f64) -> Self {
        self.attribute_filter = Some(AttributeFilter { property: property.to_string(), op, value });
        self
    }

    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    pub fn with_buffer(mut self, radius_m: f64) -> Self {
        self.buffer_m = Some(radius_m);
        self
    }

    pub fn with_percentiles(mut self, percentiles: &[u8]) -> Self {
        self.percentiles = percentiles.to_vec();
        self
    }

    pub fn with_output(mut self, field: &str, band: &str, statistic: Statistic) -> Self {
        self.outputs.push(OutputBinding {
            field: field.to_string(),
            band: band.to_string(),
            statistic,
        });
        self
    }

    /// Whether `band` is a primary or derived band of this source
    pub fn has_band(&self, band: &str) -> bool {
        self.bands.iter().any(|b| b == band) || self.derived.iter().any(|d| d.name == band)
    }

    /// Distinct (band, statistic) pairs the outputs need, in output order
    pub fn required_rasters(&self) -> Vec<(String, Statistic)> {
        let mut pairs: Vec<(String, Statistic)> = Vec::new();
        for output in &self.outputs {
            let pair = (output.band.clone(), output.statistic);
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }
        pairs
    }
}
