use std::sync::Arc;
use std::time::Instant;

use crate::aggregate::group_by_parameter;
use crate::cache::{normalize_key, ResultCache};
use crate::error::LoadError;
use crate::model::{ComparisonTable, ParameterRow};

/// Loads one source into parameter rows.
///
/// Implementations live outside this crate (CSV, XLSX, in-memory fixtures).
/// Returned rows should carry `source_id` equal to the requested source; the
/// engine rewrites mismatching ids so alignment always uses the request key.
pub trait SourceLoader {
    fn load(&self, source_id: &str) -> Result<Vec<ParameterRow>, LoadError>;
}

impl<F> SourceLoader for F
where
    F: Fn(&str) -> Result<Vec<ParameterRow>, LoadError>,
{
    fn load(&self, source_id: &str) -> Result<Vec<ParameterRow>, LoadError> {
        self(source_id)
    }
}

/// Compares parameter tables across sources, memoizing results per source set.
pub struct ComparisonEngine<L> {
    loader: L,
    cache: Arc<ResultCache>,
}

impl<L: SourceLoader> ComparisonEngine<L> {
    pub fn new(loader: L, cache: Arc<ResultCache>) -> Self {
        Self { loader, cache }
    }

    /// Engine without memoization.
    pub fn uncached(loader: L) -> Self {
        Self::new(loader, Arc::new(ResultCache::disabled()))
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Compare the given sources. Sources that fail to load are recorded in
    /// `load_errors` and contribute absent cells; the rest are still compared.
    /// Only complete tables are cached, so a failed source is retried on the
    /// next call.
    pub fn compare<S: AsRef<str>>(&self, sources: &[S]) -> Arc<ComparisonTable> {
        let key = normalize_key(sources);

        if let Some(hit) = self.cache.get(key.as_slice()) {
            log::debug!("comparison cache hit for {} source(s)", key.len());
            return hit;
        }

        let started = Instant::now();
        let loaded: Vec<(String, Result<Vec<ParameterRow>, LoadError>)> = key
            .iter()
            .map(|source| (source.clone(), self.loader.load(source)))
            .collect();
        let table = Arc::new(compare_tables(&key, loaded));

        log::debug!(
            "compared {} parameter(s) across {} source(s) in {:?}",
            table.rows.len(),
            key.len(),
            started.elapsed()
        );

        if table.is_complete() {
            self.cache.set(key.as_slice(), Arc::clone(&table));
        }
        table
    }
}

/// Build a comparison table from per-source load results. `sources` must
/// already be normalized (sorted, de-duplicated).
pub fn compare_tables(
    sources: &[String],
    loaded: Vec<(String, Result<Vec<ParameterRow>, LoadError>)>,
) -> ComparisonTable {
    let mut load_errors = Vec::new();
    let mut rows = Vec::new();

    for (source, result) in loaded {
        match result {
            Ok(source_rows) => {
                rows.extend(source_rows.into_iter().map(|mut row| {
                    if row.source_id != source {
                        row.source_id = source.clone();
                    }
                    row
                }));
            }
            Err(err) => {
                log::warn!("{err}");
                load_errors.push(LoadError::new(source, err.message));
            }
        }
    }

    ComparisonTable {
        sources: sources.to_vec(),
        rows: group_by_parameter(sources, &rows),
        load_errors,
    }
}
