use std::path::{Path, PathBuf};

use paramgrid_recon::{LoadError, ParameterRow, SourceLoader};

use crate::columns::ColumnMap;
use crate::error::IoError;
use crate::{csv, xlsx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Excel,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self, IoError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Ok(Self::Csv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Excel),
            _ => Err(IoError::UnsupportedFormat(ext)),
        }
    }
}

/// Dispatches to the CSV or Excel reader by file extension.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    pub columns: ColumnMap,
    /// Worksheet for Excel sources; first sheet when unset.
    pub sheet: Option<String>,
    /// Relative source ids resolve against this directory.
    pub base: Option<PathBuf>,
}

impl FileLoader {
    pub fn new(columns: ColumnMap) -> Self {
        Self {
            columns,
            ..Default::default()
        }
    }

    pub fn with_sheet(mut self, sheet: Option<String>) -> Self {
        self.sheet = sheet;
        self
    }

    pub fn load_path(&self, source_id: &str) -> Result<Vec<ParameterRow>, IoError> {
        let path = crate::resolve_path(self.base.as_deref(), source_id);
        match SourceFormat::from_path(&path)? {
            SourceFormat::Csv => {
                let content = csv::read_file_as_utf8(&path)?;
                csv::parse_rows(source_id, &content, &self.columns)
            }
            SourceFormat::Excel => xlsx::load_rows(source_id, &path, self.sheet.as_deref(), &self.columns),
        }
    }
}

impl SourceLoader for FileLoader {
    fn load(&self, source_id: &str) -> Result<Vec<ParameterRow>, LoadError> {
        self.load_path(source_id)
            .map_err(|e| LoadError::new(source_id, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn format_by_extension() {
        assert_eq!(SourceFormat::from_path(Path::new("a.CSV")).unwrap(), SourceFormat::Csv);
        assert_eq!(SourceFormat::from_path(Path::new("a.tsv")).unwrap(), SourceFormat::Csv);
        assert_eq!(SourceFormat::from_path(Path::new("b.xlsx")).unwrap(), SourceFormat::Excel);
        assert!(matches!(
            SourceFormat::from_path(Path::new("c.pdf")),
            Err(IoError::UnsupportedFormat(ext)) if ext == "pdf"
        ));
    }

    #[test]
    fn unsupported_becomes_load_error() {
        let err = FileLoader::default().load("notes.pdf").unwrap_err();
        assert_eq!(err.source_id, "notes.pdf");
        assert!(err.message.contains("unsupported"));
    }

    #[test]
    fn missing_file_keeps_source_id() {
        let err = FileLoader::default().load("/definitely/not/here.csv").unwrap_err();
        assert_eq!(err.source_id, "/definitely/not/here.csv");
        assert!(err.message.contains("cannot read"));
    }

    #[test]
    fn resolves_against_base() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "parameter_name,value\nP1,100\n").unwrap();
        let loader = FileLoader {
            base: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let rows = loader.load("a.csv").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source_id, "a.csv");
    }

    #[test]
    fn loads_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("line1.csv");
        fs::write(&path, "parameter_name\tdefault_value\nP1\t100\nP2\t5\n").unwrap();
        let rows = FileLoader::default().load(path.to_str().unwrap()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].present_value(), Some("5"));
    }
}
