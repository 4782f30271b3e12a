//! Consensus ("mother DB") candidate detection.
//!
//! For every compared parameter the modal value across the requested sources
//! becomes a candidate when its occurrence rate meets the threshold. Missing
//! cells count against the denominator.
//!
//! Confidence is the Herfindahl (Simpson) concentration of the value
//! distribution, `sum((count_i / total_sources)^2)`: 1.0 when every source
//! agrees, `1/k` for an even k-way split, lower still when sources are
//! missing.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::cache::normalize_key;
use crate::error::ReconError;
use crate::model::{ComparisonTable, MotherDbCandidate};

const RATE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
pub struct CandidateAnalyzer {
    min_occurrence_rate: f64,
}

impl CandidateAnalyzer {
    pub fn new(min_occurrence_rate: f64) -> Result<Self, ReconError> {
        validate_threshold(min_occurrence_rate)?;
        Ok(Self { min_occurrence_rate })
    }

    pub fn min_occurrence_rate(&self) -> f64 {
        self.min_occurrence_rate
    }

    pub fn analyze<S: AsRef<str>>(&self, table: &ComparisonTable, source_ids: &[S]) -> Vec<MotherDbCandidate> {
        let sources = normalize_key(source_ids);
        let total_sources = sources.len();
        if total_sources == 0 {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for row in &table.rows {
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for source in &sources {
                if let Some(value) = row.value_for(source) {
                    *counts.entry(value).or_insert(0) += 1;
                }
            }

            // Ascending iteration + strict `>` keeps the smallest value on ties.
            let mut modal: Option<(&str, usize)> = None;
            for (&value, &count) in &counts {
                if modal.map_or(true, |(_, best)| count > best) {
                    modal = Some((value, count));
                }
            }
            let Some((value, occurrence_count)) = modal else {
                continue;
            };

            let occurrence_rate = occurrence_count as f64 / total_sources as f64;
            if occurrence_rate + RATE_EPSILON < self.min_occurrence_rate {
                continue;
            }

            let distribution: Vec<usize> = counts.values().copied().collect();
            candidates.push(MotherDbCandidate {
                parameter_name: row.parameter_name.clone(),
                module: row.module.clone(),
                part: row.part.clone(),
                default_value: value.to_string(),
                occurrence_count,
                total_sources,
                occurrence_rate,
                confidence_score: concentration(&distribution, total_sources),
            });
        }

        rank(&mut candidates);
        log::debug!(
            "{} candidate(s) from {} parameter(s) at threshold {}",
            candidates.len(),
            table.rows.len(),
            self.min_occurrence_rate
        );
        candidates
    }
}

/// Propose consensus values for `table` across `source_ids`.
pub fn analyze<S: AsRef<str>>(
    table: &ComparisonTable,
    source_ids: &[S],
    min_occurrence_rate: f64,
) -> Result<Vec<MotherDbCandidate>, ReconError> {
    Ok(CandidateAnalyzer::new(min_occurrence_rate)?.analyze(table, source_ids))
}

pub fn validate_threshold(rate: f64) -> Result<(), ReconError> {
    if rate.is_nan() || !(0.0..=1.0).contains(&rate) {
        return Err(ReconError::InvalidThreshold(rate));
    }
    Ok(())
}

/// Herfindahl concentration of `counts` over `total` slots, in [0, 1].
pub fn concentration(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
        .clamp(0.0, 1.0)
}

/// Confidence desc, occurrence count desc, then key ascending.
pub fn rank(candidates: &mut [MotherDbCandidate]) {
    candidates.sort_by(compare_candidates);
}

fn compare_candidates(a: &MotherDbCandidate, b: &MotherDbCandidate) -> Ordering {
    b.confidence_score
        .total_cmp(&a.confidence_score)
        .then_with(|| b.occurrence_count.cmp(&a.occurrence_count))
        .then_with(|| a.parameter_name.cmp(&b.parameter_name))
        .then_with(|| a.module.cmp(&b.module))
        .then_with(|| a.part.cmp(&b.part))
}
