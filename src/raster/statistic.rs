//! Statistics that reduce a set of pixel values to one number

use std::cmp::Ordering;
use std::fmt;

/// A reduction over available pixel values
///
/// `Value` is the raw pixel of a point sample. The others reduce a set of
/// values across space or time. Every statistic of an empty set is
/// unavailable; there is no numeric default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Statistic {
    /// Raw pixel value (first value of the set)
    Value,
    /// Arithmetic mean
    Mean,
    /// Population standard deviation
    StdDev,
    /// Percentile in 0..=100, linearly interpolated between closest ranks
    Percentile(u8),
}

impl Statistic {
    /// Parse a statistic name: `value`, `mean`, `stdDev`, or `pNN`
    pub fn parse(name: &str) -> Result<Self, String> {
        match name.trim() {
            "value" => Ok(Statistic::Value),
            "mean" => Ok(Statistic::Mean),
            "stdDev" | "stddev" | "std" => Ok(Statistic::StdDev),
            other => {
                let pct = other.strip_prefix('p')
                    .and_then(|p| p.parse::<u8>().ok())
                    .filter(|p| *p <= 100)
                    .ok_or_else(|| format!("Unknown statistic '{}'", other))?;
                Ok(Statistic::Percentile(pct))
            }
        }
    }

    /// Canonical name, used as the band suffix of composite rasters
    pub fn label(&self) -> String {
        match self {
            Statistic::Value => "value".to_string(),
            Statistic::Mean => "mean".to_string(),
            Statistic::StdDev => "stdDev".to_string(),
            Statistic::Percentile(p) => format!("p{}", p),
        }
    }

    /// Reduce `values`; returns `None` for an empty set or a non-finite result
    ///
    /// The slice may be reordered.
    pub fn reduce(&self, values: &mut [f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }

        let result = match self {
            Statistic::Value => values[0],
            Statistic::Mean => mean(values),
            Statistic::StdDev => {
                let m = mean(values);
                let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
                var.sqrt()
            }
            Statistic::Percentile(p) => {
                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
                let rank = f64::from(*p) / 100.0 * (values.len() - 1) as f64;
                let lo = rank.floor() as usize;
                let hi = rank.ceil() as usize;
                let frac = rank - lo as f64;
                values[lo] + (values[hi] - values[lo]) * frac
            }
        };

        Some(result).filter(|r| r.is_finite())
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
