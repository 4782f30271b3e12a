//! Per-invocation context: settings, capabilities, and the collaborators
//! built from them.

use std::path::Path;
use std::sync::Arc;

use paramgrid_config::{SessionCapabilities, Settings};
use paramgrid_io::{ChecklistStore, ColumnMap, Field, FileLoader};
use paramgrid_recon::{ComparisonEngine, ResultCache};

use crate::exit_codes::{EXIT_CONFIG, EXIT_PERMISSION};
use crate::CliError;

pub struct Context {
    pub settings: Settings,
    pub caps: SessionCapabilities,
}

impl Context {
    pub fn load(config: Option<&Path>) -> Result<Self, CliError> {
        let settings = Settings::load(config).map_err(|e| {
            CliError::new(EXIT_CONFIG, e.to_string())
                .with_hint(format!("settings file: {}", Settings::config_path().display()))
        })?;
        let caps = SessionCapabilities::for_role(settings.session.role);
        log::debug!("session role {} -> {:?}", settings.session.role, caps);
        Ok(Self { settings, caps })
    }

    pub fn require(&self, allowed: bool, action: &str) -> Result<(), CliError> {
        if allowed {
            return Ok(());
        }
        Err(CliError::new(
            EXIT_PERMISSION,
            format!("role '{}' may not {action}", self.settings.session.role),
        )
        .with_hint("set [session] role in the settings file"))
    }

    pub fn columns(&self) -> ColumnMap {
        self.settings
            .loader
            .aliases
            .iter()
            .fold(ColumnMap::default(), |map, (name, extra)| match Field::from_name(name) {
                Some(field) => map.with_aliases(field, extra),
                None => map,
            })
    }

    pub fn loader(&self) -> FileLoader {
        FileLoader::new(self.columns()).with_sheet(self.settings.loader.sheet.clone())
    }

    pub fn engine(&self) -> ComparisonEngine<FileLoader> {
        let cache = Arc::new(ResultCache::new(self.settings.comparison.cache_capacity));
        log::debug!("comparison cache capacity {}", cache.capacity());
        ComparisonEngine::new(self.loader(), cache)
    }

    pub fn open_store(&self, database: Option<&Path>) -> Result<ChecklistStore, CliError> {
        let path = match database {
            Some(p) => p.to_path_buf(),
            None => self.settings.checklist_database(),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CliError::io(format!("{}: {e}", parent.display())))?;
        }
        log::debug!("checklist database {}", path.display());
        ChecklistStore::open(&path).map_err(CliError::store)
    }
}
