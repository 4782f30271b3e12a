//! `paramgrid-recon` - Multi-source parameter comparison engine.
//!
//! Pure engine crate: receives pre-loaded parameter rows (through a
//! [`SourceLoader`]), returns comparison tables and consensus candidates.
//! No CLI or file format dependencies.

pub mod aggregate;
pub mod cache;
pub mod candidates;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod model;

pub use cache::{CacheStats, ResultCache};
pub use candidates::{analyze, CandidateAnalyzer};
pub use engine::{compare_tables, ComparisonEngine, SourceLoader};
pub use error::{LoadError, ReconError};
pub use evidence::{summarize, ComparisonSummary};
pub use model::{ComparisonRow, ComparisonTable, MotherDbCandidate, ParameterKey, ParameterRow};
