use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// Occurrence threshold outside [0, 1] (or NaN).
    InvalidThreshold(f64),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidThreshold(v) => {
                write!(f, "min_occurrence_rate must be within [0, 1], got {v}")
            }
        }
    }
}

impl std::error::Error for ReconError {}

/// A source that could not be loaded. Recorded per source on the comparison
/// table; never aborts the comparison of the remaining sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadError {
    pub source_id: String,
    pub message: String,
}

impl LoadError {
    pub fn new(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source '{}': {}", self.source_id, self.message)
    }
}

impl std::error::Error for LoadError {}
