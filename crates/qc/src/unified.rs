//! Single entry point combining structural validation and checklist QC.

use std::collections::{BTreeSet, HashSet};

use paramgrid_recon::ParameterRow;

use crate::checklist::{Checklist, ChecklistMatcher};
use crate::error::QcError;
use crate::model::{count_by_severity, sort_issues, QcVerdict};
use crate::validator::QcValidator;

#[derive(Debug, Clone, Copy, Default)]
pub struct UnifiedQcSystem {
    validator: QcValidator,
    matcher: ChecklistMatcher,
}

impl UnifiedQcSystem {
    pub fn new(near_limit_ratio: f64) -> Result<Self, QcError> {
        Ok(Self {
            validator: QcValidator::new(near_limit_ratio)?,
            matcher: ChecklistMatcher::new(near_limit_ratio)?,
        })
    }

    /// Validate `rows` and, when given, evaluate them against `checklist`.
    ///
    /// A row fails when it carries any blocking (CRITICAL/HIGH) issue from
    /// either pass. When both passes report the same kind of issue on a row,
    /// only the structural one is kept.
    pub fn perform_qc(&self, rows: &[ParameterRow], checklist: Option<&Checklist>) -> QcVerdict {
        let mut issues = self.validator.validate(rows);
        let structural_passed = !issues.iter().any(|i| i.severity.is_blocking());

        let report = checklist.map(|c| self.matcher.run(rows, c));
        if let Some(report) = &report {
            let seen: HashSet<_> = issues.iter().map(|i| (i.row, i.issue_type)).collect();
            issues.extend(
                report
                    .issues
                    .iter()
                    .filter(|i| !seen.contains(&(i.row, i.issue_type)))
                    .cloned(),
            );
            sort_issues(&mut issues);
        }

        let failed_rows: BTreeSet<usize> = issues
            .iter()
            .filter(|i| i.severity.is_blocking())
            .map(|i| i.row)
            .collect();

        let total_parameters = rows.len();
        let failed_count = failed_rows.len();
        let passed_count = total_parameters - failed_count;
        let pass_rate = if total_parameters == 0 {
            0.0
        } else {
            passed_count as f64 / total_parameters as f64
        };

        let checklist_passed = report.as_ref().map_or(true, |r| r.summary.qc_passed);
        let qc_passed = structural_passed && checklist_passed;

        log::info!(
            "qc: {passed_count}/{total_parameters} passed, {} issue(s), verdict {}",
            issues.len(),
            if qc_passed { "PASS" } else { "FAIL" }
        );

        QcVerdict {
            total_parameters,
            passed_count,
            failed_count,
            pass_rate,
            qc_passed,
            structural_passed,
            issue_counts: count_by_severity(&issues),
            issues,
            checklist_summary: report.map(|r| r.summary),
        }
    }
}
