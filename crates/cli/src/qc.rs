//! `pgrid qc`

use std::path::PathBuf;

use serde::Serialize;

use paramgrid_qc::{Checklist, QcVerdict, UnifiedQcSystem};

use crate::context::Context;
use crate::exit_codes::{EXIT_QC_FAILED, EXIT_SOURCE_LOAD};
use crate::{print_json, CliError};

/// One entry per requested source: its verdict, or why it could not be read.
#[derive(Serialize)]
struct SourceVerdict<'a> {
    source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    load_error: Option<&'a str>,
    #[serde(flatten)]
    verdict: Option<&'a QcVerdict>,
}

fn load_checklist(ctx: &Context, database: Option<PathBuf>, no_checklist: bool) -> Result<Option<Checklist>, CliError> {
    if no_checklist {
        return Ok(None);
    }
    let explicit = database.is_some();
    let path = database.unwrap_or_else(|| ctx.settings.checklist_database());
    if !path.exists() {
        if explicit {
            return Err(CliError::io(format!("checklist database not found: {}", path.display())));
        }
        log::info!("no checklist database at {}, structural QC only", path.display());
        return Ok(None);
    }
    let store = ctx.open_store(Some(&path))?;
    let checklist = store.load_checklist().map_err(CliError::store)?;
    log::debug!("{} active checklist item(s)", checklist.len());
    Ok(Some(checklist))
}

fn print_verdict(source: &str, verdict: &QcVerdict) {
    println!(
        "{source}: {} ({}/{} passed, {:.1}%)",
        if verdict.qc_passed { "PASS" } else { "FAIL" },
        verdict.passed_count,
        verdict.total_parameters,
        verdict.pass_rate * 100.0
    );
    if let Some(cl) = &verdict.checklist_summary {
        println!(
            "  checklist: {} governed, {} validated, {} failed",
            cl.checklist_params, cl.validated_params, cl.failed_params
        );
    }
    for issue in &verdict.issues {
        println!(
            "  [{}] row {} {}: {} ({})",
            issue.severity,
            issue.row + 1,
            issue.parameter_name,
            issue.description,
            issue.issue_type
        );
    }
}

pub fn cmd_qc(
    ctx: &Context,
    sources: Vec<String>,
    database: Option<PathBuf>,
    no_checklist: bool,
    json: bool,
) -> Result<(), CliError> {
    ctx.require(ctx.caps.can_run_qc, "run QC")?;

    let system =
        UnifiedQcSystem::new(ctx.settings.qc.near_limit_ratio).map_err(|e| CliError::usage(e.to_string()))?;
    let checklist = load_checklist(ctx, database, no_checklist)?;
    let loader = ctx.loader();

    let results: Vec<Result<QcVerdict, String>> = sources
        .iter()
        .map(|source| match loader.load_path(source) {
            Ok(rows) => Ok(system.perform_qc(&rows, checklist.as_ref())),
            Err(e) => {
                log::warn!("{source}: {e}");
                Err(e.to_string())
            }
        })
        .collect();

    if json {
        let out: Vec<SourceVerdict<'_>> = sources
            .iter()
            .zip(&results)
            .map(|(source, result)| SourceVerdict {
                source,
                load_error: result.as_ref().err().map(String::as_str),
                verdict: result.as_ref().ok(),
            })
            .collect();
        print_json(&out)?;
    } else {
        for (source, result) in sources.iter().zip(&results) {
            match result {
                Ok(verdict) => print_verdict(source, verdict),
                Err(message) => println!("{source}: NOT LOADED ({message})"),
            }
        }
    }

    let failed = results.iter().filter(|r| matches!(r, Ok(v) if !v.qc_passed)).count();
    let unreadable = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        return Err(CliError::new(
            EXIT_QC_FAILED,
            format!("QC failed for {failed} of {} source(s)", sources.len()),
        ));
    }
    if unreadable > 0 {
        return Err(CliError::new(
            EXIT_SOURCE_LOAD,
            format!("{unreadable} source(s) failed to load"),
        ));
    }
    Ok(())
}
