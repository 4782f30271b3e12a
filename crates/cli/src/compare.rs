//! `pgrid compare` and `pgrid candidates`.

use serde::Serialize;

use paramgrid_recon::{summarize, CandidateAnalyzer, ComparisonRow, ComparisonSummary, LoadError, MotherDbCandidate};

use crate::context::Context;
use crate::exit_codes::EXIT_SOURCE_LOAD;
use crate::{print_json, CliError};

#[derive(Serialize)]
struct CompareOutput<'a> {
    summary: ComparisonSummary,
    sources: &'a [String],
    rows: Vec<&'a ComparisonRow>,
    load_errors: &'a [LoadError],
}

#[derive(Serialize)]
struct CandidatesOutput<'a> {
    min_occurrence_rate: f64,
    total_sources: usize,
    candidates: &'a [MotherDbCandidate],
    load_errors: &'a [LoadError],
}

fn report_load_errors(errors: &[LoadError], strict: bool) -> Result<(), CliError> {
    for err in errors {
        eprintln!("warning: {err}");
    }
    if strict && !errors.is_empty() {
        return Err(CliError::new(
            EXIT_SOURCE_LOAD,
            format!("{} source(s) failed to load", errors.len()),
        ));
    }
    Ok(())
}

fn cell(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

pub fn cmd_compare(
    ctx: &Context,
    sources: Vec<String>,
    differences_only: bool,
    long: bool,
    strict: bool,
    json: bool,
) -> Result<(), CliError> {
    let engine = ctx.engine();
    let table = engine.compare(sources.as_slice());
    let summary = summarize(&table);

    if json && long {
        print_json(&table.long_form())?;
    } else if json {
        let rows: Vec<&ComparisonRow> = table
            .rows
            .iter()
            .filter(|r| !differences_only || r.is_different)
            .collect();
        print_json(&CompareOutput {
            summary: summary.clone(),
            sources: &table.sources,
            rows,
            load_errors: &table.load_errors,
        })?;
    } else if long {
        for rec in table.long_form() {
            if differences_only && !rec.is_different {
                continue;
            }
            println!(
                "{}\t{}\t{}\t{}\t{}",
                rec.parameter_name,
                cell(rec.module),
                cell(rec.part),
                rec.source_id,
                cell(rec.value)
            );
        }
    } else {
        println!("parameter\t{}", table.sources.join("\t"));
        for row in &table.rows {
            if differences_only && !row.is_different {
                continue;
            }
            let values: Vec<&str> = table.sources.iter().map(|s| cell(row.value_for(s))).collect();
            let marker = if row.is_different { "\t*" } else { "" };
            println!("{}\t{}{marker}", row.key(), values.join("\t"));
        }
    }

    eprintln!(
        "{} parameter(s) across {} source(s): {} different, {} identical, {} missing cell(s)",
        summary.total_parameters,
        summary.sources,
        summary.different_parameters,
        summary.identical_parameters,
        summary.missing_cells,
    );
    report_load_errors(&table.load_errors, strict)
}

pub fn cmd_candidates(
    ctx: &Context,
    sources: Vec<String>,
    min_rate: Option<f64>,
    strict: bool,
    json: bool,
) -> Result<(), CliError> {
    ctx.require(ctx.caps.can_manage_mother_db, "manage the mother DB")?;

    let rate = min_rate.unwrap_or(ctx.settings.candidates.min_occurrence_rate);
    let analyzer = CandidateAnalyzer::new(rate).map_err(|e| CliError::usage(e.to_string()))?;

    let engine = ctx.engine();
    let table = engine.compare(sources.as_slice());
    let candidates = analyzer.analyze(&table, sources.as_slice());

    if json {
        print_json(&CandidatesOutput {
            min_occurrence_rate: analyzer.min_occurrence_rate(),
            total_sources: table.sources.len(),
            candidates: &candidates,
            load_errors: &table.load_errors,
        })?;
    } else {
        println!("parameter\tdefault_value\toccurrences\tconfidence");
        for c in &candidates {
            println!(
                "{}\t{}\t{}/{}\t{:.3}",
                c.parameter_name, c.default_value, c.occurrence_count, c.total_sources, c.confidence_score
            );
        }
    }

    eprintln!(
        "{} candidate(s) at min occurrence rate {rate} from {} parameter(s)",
        candidates.len(),
        table.rows.len()
    );
    report_load_errors(&table.load_errors, strict)
}
