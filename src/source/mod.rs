//! Source registry
//!
//! Declarations of the raster and image-collection sources a pipeline
//! samples from, and the validation that makes a declaration usable.

mod types;
mod registry;

pub use types::{
    AttributeFilter, Comparison, DerivedBand, OutputBinding, QualityMask, ReductionPolicy,
    SourceDefinition, SourceKind, TemporalFilter, DEFAULT_MAX_PIXELS, DEFAULT_PERCENTILES,
};
pub use registry::{SourceHandle, SourceRegistry};
