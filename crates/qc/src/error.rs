use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum QcError {
    /// Two active checklist items share a (module, part, item_name) key.
    Integrity { key: String },
    /// Near-limit ratio outside [0, 1) (or NaN).
    InvalidNearLimitRatio(f64),
}

impl fmt::Display for QcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integrity { key } => {
                write!(f, "duplicate active checklist item for key {key}")
            }
            Self::InvalidNearLimitRatio(v) => {
                write!(f, "near_limit_ratio must be within [0, 1), got {v}")
            }
        }
    }
}

impl std::error::Error for QcError {}

/// A value that had to be numeric but did not parse. Never propagated past
/// the validator; it is turned into a [`crate::QcIssue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    pub value: String,
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot parse '{}' as a number", self.value)
    }
}

impl std::error::Error for ConversionError {}
