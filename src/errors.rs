//! Custom error types for feature extraction

use std::fmt;
use std::io;

/// Extraction error types
#[derive(Debug)]
pub enum ExtractError {
    /// I/O error
    IoError(io::Error),
    /// CSV reading or writing error
    CsvError(csv::Error),
    /// JSON parsing error (catalogs, GeoJSON points)
    JsonError(serde_json::Error),
    /// Configuration file could not be parsed
    ConfigError(String),
    /// A source declaration is invalid; fatal to pipeline setup
    InvalidSourceConfig {
        source: String,
        reason: String,
    },
    /// A source has no data intersecting a point
    PointOutOfCoverage {
        source: String,
        point_id: String,
    },
    /// A provider call failed for one source
    ReductionFailure {
        source: String,
        reason: String,
    },
    /// The provider rejected a request because of rate or resource limits
    Throttled(String),
    /// A point could not be extracted at all
    PointExtractionFailure {
        point_id: String,
        cause: String,
    },
    /// Generic error with message
    GenericError(String),
}

impl ExtractError {
    /// Shorthand for an [`ExtractError::InvalidSourceConfig`]
    pub fn invalid_source(source: &str, reason: impl Into<String>) -> Self {
        ExtractError::InvalidSourceConfig {
            source: source.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an [`ExtractError::ReductionFailure`]
    pub fn reduction(source: &str, reason: impl Into<String>) -> Self {
        ExtractError::ReductionFailure {
            source: source.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether retrying the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExtractError::Throttled(_))
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::IoError(e) => write!(f, "I/O error: {}", e),
            ExtractError::CsvError(e) => write!(f, "CSV error: {}", e),
            ExtractError::JsonError(e) => write!(f, "JSON error: {}", e),
            ExtractError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            ExtractError::InvalidSourceConfig { source, reason } => {
                write!(f, "Invalid configuration for source '{}': {}", source, reason)
            }
            ExtractError::PointOutOfCoverage { source, point_id } => {
                write!(f, "Point '{}' is outside the coverage of source '{}'", point_id, source)
            }
            ExtractError::ReductionFailure { source, reason } => {
                write!(f, "Reduction failed for source '{}': {}", source, reason)
            }
            ExtractError::Throttled(msg) => write!(f, "Provider throttled request: {}", msg),
            ExtractError::PointExtractionFailure { point_id, cause } => {
                write!(f, "Extraction failed for point '{}': {}", point_id, cause)
            }
            ExtractError::GenericError(msg) => write!(f, "Extraction error: {}", msg),
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractError::IoError(e) => Some(e),
            ExtractError::CsvError(e) => Some(e),
            ExtractError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ExtractError {
    fn from(error: io::Error) -> Self {
        ExtractError::IoError(error)
    }
}

impl From<csv::Error> for ExtractError {
    fn from(error: csv::Error) -> Self {
        ExtractError::CsvError(error)
    }
}

impl From<serde_json::Error> for ExtractError {
    fn from(error: serde_json::Error) -> Self {
        ExtractError::JsonError(error)
    }
}

impl From<toml::de::Error> for ExtractError {
    fn from(error: toml::de::Error) -> Self {
        ExtractError::ConfigError(error.to_string())
    }
}

/// Result type for extraction operations
pub type ExtractResult<T> = Result<T, ExtractError>;

impl From<String> for ExtractError {
    fn from(msg: String) -> Self {
        ExtractError::GenericError(msg)
    }
}
