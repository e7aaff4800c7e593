//! Per-source reduction results

use std::collections::BTreeMap;

use crate::raster::Statistic;

/// Outcome of one reduction: a number or the explicit unavailable marker
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Value(f64),
    Unavailable,
}

impl Sample {
    /// `None` becomes `Unavailable`; non-finite numbers too
    pub fn from_option(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Sample::Value(v),
            _ => Sample::Unavailable,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Sample::Value(v) => Some(*v),
            Sample::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Sample::Value(_))
    }
}

/// Identifies one statistic of one band, e.g. `NDVI` / `p25`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatKey {
    pub band: String,
    pub statistic: Statistic,
}

impl StatKey {
    pub fn new(band: &str, statistic: Statistic) -> Self {
        StatKey { band: band.to_string(), statistic }
    }
}

/// All values one source produced for one point
#[derive(Debug, Clone, PartialEq)]
pub struct ReductionResult {
    pub source: String,
    pub values: BTreeMap<StatKey, Sample>,
    /// Why the whole source is unavailable for this point, if it failed
    pub failure: Option<String>,
}

impl ReductionResult {
    pub fn new(source: &str) -> Self {
        ReductionResult {
            source: source.to_string(),
            values: BTreeMap::new(),
            failure: None,
        }
    }

    /// A result where every key is unavailable because the source failed
    pub fn failed(source: &str, keys: impl IntoIterator<Item = StatKey>, reason: String) -> Self {
        ReductionResult {
            source: source.to_string(),
            values: keys.into_iter().map(|k| (k, Sample::Unavailable)).collect(),
            failure: Some(reason),
        }
    }

    /// Value stored under `key`; missing keys are unavailable
    pub fn get(&self, key: &StatKey) -> Sample {
        self.values.get(key).copied().unwrap_or(Sample::Unavailable)
    }
}
