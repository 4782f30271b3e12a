// Application settings
// Loaded from ~/.config/paramgrid/settings.toml

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::session::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonSettings {
    /// Maximum number of memoized comparison tables; 0 disables the cache.
    pub cache_capacity: usize,
}

impl Default for ComparisonSettings {
    fn default() -> Self {
        Self { cache_capacity: 32 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateSettings {
    /// Fraction of sources that must agree on a value, in [0, 1].
    pub min_occurrence_rate: f64,
}

impl Default for CandidateSettings {
    fn default() -> Self {
        Self { min_occurrence_rate: 0.8 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcSettings {
    /// Width of the near-limit warning band as a fraction of the bound.
    pub near_limit_ratio: f64,
}

impl Default for QcSettings {
    fn default() -> Self {
        Self { near_limit_ratio: 0.05 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecklistSettings {
    /// Checklist database; defaults to `checklist.db` next to the settings file.
    pub database: Option<PathBuf>,
    pub snapshot_retention_days: u32,
}

impl Default for ChecklistSettings {
    fn default() -> Self {
        Self {
            database: None,
            snapshot_retention_days: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Worksheet to read from Excel sources; first sheet when unset.
    pub sheet: Option<String>,
    /// Extra header names per field, e.g. `value = ["Setpoint"]`.
    pub aliases: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub role: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub comparison: ComparisonSettings,
    pub candidates: CandidateSettings,
    pub qc: QcSettings,
    pub checklist: ChecklistSettings,
    pub loader: LoaderSettings,
    pub session: SessionSettings,
}

const DEFAULT_FILE: &str = r#"# paramgrid settings

[comparison]
# Memoized comparison tables (0 disables the cache)
cache_capacity = 32

[candidates]
# Fraction of sources that must agree for a mother-DB candidate
min_occurrence_rate = 0.8

[qc]
# Near-limit warning band, as a fraction of each spec bound
near_limit_ratio = 0.05

[checklist]
# database = "/path/to/checklist.db"
snapshot_retention_days = 30

[loader]
# sheet = "Parameters"

[loader.aliases]
# value = ["Setpoint"]

[session]
# viewer | operator | engineer | admin
role = "engineer"
"#;

impl Settings {
    /// Get the settings directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("paramgrid")
    }

    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("settings.toml")
    }

    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `path`, or from the default location. A missing
    /// default file means defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::config_path(), false),
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::Read {
                    path,
                    message: "file not found".to_string(),
                });
            }
            log::debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|e| ConfigError::Read {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let settings = Self::from_toml(&contents)?;
        log::debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Write a commented default settings file. Refuses to overwrite.
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        let io_err = |e: std::io::Error| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        if path.exists() {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                message: "already exists".to_string(),
            });
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, DEFAULT_FILE).map_err(io_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.candidates.min_occurrence_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::Validation(format!(
                "candidates.min_occurrence_rate must be within [0, 1], got {rate}"
            )));
        }

        let ratio = self.qc.near_limit_ratio;
        if !(0.0..1.0).contains(&ratio) {
            return Err(ConfigError::Validation(format!(
                "qc.near_limit_ratio must be within [0, 1), got {ratio}"
            )));
        }

        for field in self.loader.aliases.keys() {
            if !KNOWN_FIELDS.contains(&field.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "loader.aliases: unknown field '{field}' (expected one of {})",
                    KNOWN_FIELDS.join(", ")
                )));
            }
        }

        Ok(())
    }

    /// Checklist database path, resolved against the settings directory.
    pub fn checklist_database(&self) -> PathBuf {
        match &self.checklist.database {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => Self::config_dir().join(p),
            None => Self::config_dir().join("checklist.db"),
        }
    }
}

/// Field names accepted as keys of `[loader.aliases]`.
pub const KNOWN_FIELDS: [&str; 9] = [
    "parameter_name",
    "value",
    "module",
    "part",
    "spec_min",
    "spec_max",
    "expected_value",
    "category",
    "is_active",
];
