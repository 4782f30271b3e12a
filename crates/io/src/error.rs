use std::fmt;
use std::path::PathBuf;

/// Errors reading a parameter source.
#[derive(Debug)]
pub enum IoError {
    Read { path: PathBuf, message: String },
    Csv(String),
    Xlsx(String),
    /// A required column is absent from the header row.
    MissingColumn { column: &'static str },
    UnsupportedFormat(String),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => write!(f, "cannot read {}: {message}", path.display()),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Xlsx(msg) => write!(f, "Excel error: {msg}"),
            Self::MissingColumn { column } => write!(f, "required column '{column}' not found in header"),
            Self::UnsupportedFormat(ext) => write!(f, "unsupported source format '{ext}'"),
        }
    }
}

impl std::error::Error for IoError {}

impl From<csv::Error> for IoError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}

/// Errors from the checklist store and its migrations.
#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    /// An active item with the same (module, part, item_name) already exists.
    Integrity { key: String },
    /// The database is not at the schema version the operation requires.
    SchemaVersion { found: u32, expected: u32 },
    /// Migrated rows did not match the snapshot; the migration was rolled back.
    Verification(String),
    NoSnapshot,
    Import(IoError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(e) => write!(f, "checklist database error: {e}"),
            Self::Integrity { key } => write!(f, "an active checklist item already exists for {key}"),
            Self::SchemaVersion { found, expected } => {
                write!(f, "checklist schema is v{found}, expected v{expected}")
            }
            Self::Verification(msg) => write!(f, "migration verification failed: {msg}"),
            Self::NoSnapshot => write!(f, "no migration snapshot to restore"),
            Self::Import(e) => write!(f, "checklist import failed: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(e) => Some(e),
            Self::Import(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e)
    }
}

impl From<IoError> for StoreError {
    fn from(e: IoError) -> Self {
        Self::Import(e)
    }
}
