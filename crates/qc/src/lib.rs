//! `paramgrid-qc` - Quality control over parameter tables.
//!
//! Structural/range validation, checklist resolution by composite
//! (module, part, item) key with type-common fallback, and a unified
//! verdict. Pure crate: checklist persistence lives in `paramgrid-io`.

pub mod checklist;
pub mod error;
pub mod model;
pub mod scope;
pub mod unified;
pub mod validator;

pub use checklist::{
    CheckOutcome, Checklist, ChecklistItem, ChecklistMatcher, ChecklistReport, ChecklistSummary, FailureKind,
};
pub use error::{ConversionError, QcError};
pub use model::{IssueType, QcIssue, QcVerdict, Severity};
pub use scope::ScopedKey;
pub use unified::UnifiedQcSystem;
pub use validator::QcValidator;

/// Default width of the near-limit warning band, as a fraction of the bound.
pub const DEFAULT_NEAR_LIMIT_RATIO: f64 = 0.05;
