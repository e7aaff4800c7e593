//! Registration and validation of sources

use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;
use log::{debug, info};

use crate::errors::{ExtractError, ExtractResult};
use crate::raster::Statistic;
use crate::record::OutputSchema;
use super::types::{ReductionPolicy, SourceDefinition, SourceKind};

/// Shared, immutable handle to a validated source
///
/// Handles are only produced by [`SourceRegistry::register_source`], so
/// holding one means the declaration passed validation.
#[derive(Debug, Clone)]
pub struct SourceHandle(Arc<SourceDefinition>);

impl Deref for SourceHandle {
    type Target = SourceDefinition;

    fn deref(&self) -> &SourceDefinition {
        &self.0
    }
}

/// Ordered collection of validated sources
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: Vec<SourceHandle>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        SourceRegistry { sources: Vec::new() }
    }

    /// Validate a declaration and add it to the registry
    ///
    /// # Errors
    /// `InvalidSourceConfig` when the declaration is incomplete or
    /// inconsistent, or its name or output fields clash with a source
    /// already registered.
    pub fn register_source(&mut self, definition: SourceDefinition) -> ExtractResult<SourceHandle> {
        debug!("Validating source '{}' ({})", definition.name, definition.kind.name());

        validate_definition(&definition)?;

        if self.get(&definition.name).is_some() {
            return Err(ExtractError::invalid_source(&definition.name, "source name is already registered"));
        }

        let existing_fields: HashSet<&str> = self.sources.iter()
            .flat_map(|s| s.outputs.iter().map(|o| o.field.as_str()))
            .collect();
        if let Some(clash) = definition.outputs.iter().find(|o| existing_fields.contains(o.field.as_str())) {
            return Err(ExtractError::invalid_source(
                &definition.name,
                format!("output field '{}' is already declared by another source", clash.field),
            ));
        }

        info!("Registered source '{}': kind={}, dataset={}, scale={}m, {} output field(s)",
              definition.name, definition.kind.name(), definition.dataset,
              definition.scale, definition.outputs.len());

        let handle = SourceHandle(Arc::new(definition));
        self.sources.push(handle.clone());
        Ok(handle)
    }

    /// Sources in registration order
    pub fn sources(&self) -> &[SourceHandle] {
        &self.sources
    }

    /// Look up a source by name
    pub fn get(&self, name: &str) -> Option<&SourceHandle> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Output schema declared by all sources
    pub fn schema(&self) -> OutputSchema {
        OutputSchema::from_sources(&self.sources)
    }
}

fn validate_definition(def: &SourceDefinition) -> ExtractResult<()> {
    let fail = |reason: String| Err(ExtractError::invalid_source(&def.name, reason));

    if def.name.trim().is_empty() {
        return fail("source name is empty".to_string());
    }
    if def.dataset.trim().is_empty() {
        return fail("dataset identifier is empty".to_string());
    }
    if !def.scale.is_finite() || def.scale <= 0.0 {
        return fail(format!("scale must be a positive number of metres, got {}", def.scale));
    }
    if def.max_pixels == 0 {
        return fail("max_pixels must be positive".to_string());
    }
    if let Some(radius) = def.buffer_m {
        if !radius.is_finite() || radius <= 0.0 {
            return fail(format!("buffer radius must be positive, got {}", radius));
        }
    }

    if def.bands.is_empty() {
        return fail("at least one band is required".to_string());
    }
    let mut seen = HashSet::new();
    for band in &def.bands {
        if !seen.insert(band.as_str()) {
            return fail(format!("band '{}' is listed twice", band));
        }
    }

    validate_filters(def)?;
    validate_derived(def)?;
    validate_outputs(def)
}

fn validate_filters(def: &SourceDefinition) -> ExtractResult<()> {
    let fail = |reason: String| Err(ExtractError::invalid_source(&def.name, reason));

    if def.kind.is_temporal() {
        match &def.temporal {
            None => return fail(format!("a {} requires a date range", def.kind.name())),
            Some(filter) if !filter.is_closed() => {
                return fail(format!("date range {} is empty or reversed", filter.describe()));
            }
            Some(_) => {}
        }
    } else {
        if def.temporal.is_some() {
            return fail(format!("a {} cannot have a date range", def.kind.name()));
        }
        if def.attribute_filter.is_some() && def.kind == SourceKind::StaticRaster {
            return fail("a static raster cannot have an attribute filter".to_string());
        }
    }

    if let Some(mask) = &def.quality {
        if def.kind != SourceKind::TimeFilteredCollection {
            return fail(format!("quality masks only apply to time-filtered collections, not {}", def.kind.name()));
        }
        if !def.bands.contains(&mask.band) {
            return fail(format!("quality band '{}' is not one of the source bands", mask.band));
        }
    }

    if let Some(bad) = def.percentiles.iter().find(|p| **p > 100) {
        return fail(format!("percentile {} is outside 0..=100", bad));
    }

    Ok(())
}

fn validate_derived(def: &SourceDefinition) -> ExtractResult<()> {
    if def.derived.is_empty() {
        return Ok(());
    }
    if def.kind != SourceKind::TimeFilteredCollection {
        return Err(ExtractError::invalid_source(
            &def.name,
            format!("derived bands only apply to time-filtered collections, not {}", def.kind.name()),
        ));
    }

    let mut known: HashSet<&str> = def.bands.iter().map(String::as_str).collect();
    for derived in &def.derived {
        if known.contains(derived.name.as_str()) {
            return Err(ExtractError::invalid_source(
                &def.name,
                format!("derived band '{}' shadows an existing band", derived.name),
            ));
        }
        if let Some(missing) = derived.expression.variables().iter().find(|v| !known.contains(v.as_str())) {
            return Err(ExtractError::invalid_source(
                &def.name,
                format!("expression for '{}' references unknown band '{}'", derived.name, missing),
            ));
        }
        known.insert(derived.name.as_str());
    }
    Ok(())
}

fn validate_outputs(def: &SourceDefinition) -> ExtractResult<()> {
    let fail = |reason: String| Err(ExtractError::invalid_source(&def.name, reason));

    if def.policy == ReductionPolicy::TemporalCompositeThenRegionMean && !def.kind.is_temporal() {
        return fail(format!("policy temporal-composite-then-region-mean needs a time series, not a {}",
                            def.kind.name()));
    }
    if def.outputs.is_empty() {
        return fail("no output fields are declared".to_string());
    }

    let mut fields = HashSet::new();
    for output in &def.outputs {
        if output.field.trim().is_empty() {
            return fail("output field name is empty".to_string());
        }
        if !fields.insert(output.field.as_str()) {
            return fail(format!("output field '{}' is declared twice", output.field));
        }
        if !def.has_band(&output.band) {
            return fail(format!("output '{}' reads unknown band '{}'", output.field, output.band));
        }

        let allowed = match (def.kind, def.policy, output.statistic) {
            (SourceKind::StaticRaster | SourceKind::Mosaic, ReductionPolicy::PointSample, Statistic::Value) => true,
            (SourceKind::StaticRaster | SourceKind::Mosaic, ReductionPolicy::RegionMean, Statistic::Mean) => true,
            (SourceKind::DerivedComposite, _, Statistic::Mean) => true,
            (SourceKind::TimeFilteredCollection, _, Statistic::Mean | Statistic::StdDev) => true,
            (SourceKind::TimeFilteredCollection, _, Statistic::Percentile(p)) => def.percentiles.contains(&p),
            _ => false,
        };
        if !allowed {
            return fail(format!("statistic '{}' for output '{}' is not available for a {} with {:?}",
                                output.statistic, output.field, def.kind.name(), def.policy));
        }
    }
    Ok(())
}
