use std::cmp::Ordering;

use crate::models::{ContractChoice, ContractSummary, ReportRow};
use crate::risk;

/// Classifies every summary and orders the rows from most to least severe.
///
/// Within a tier rows are ordered by worst average score, missing scores
/// last. The sort is stable, so rows that compare equal keep the order the
/// store returned them in.
pub fn build_report(summaries: Vec<ContractSummary>, threshold: f64) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = summaries
        .into_iter()
        .map(|summary| ReportRow {
            severity: risk::classify(summary.worst_average_score, threshold),
            summary,
        })
        .collect();

    rows.sort_by(|a, b| {
        a.severity.rank().cmp(&b.severity.rank()).then_with(|| {
            compare_missing_last(
                a.summary.worst_average_score,
                b.summary.worst_average_score,
            )
        })
    });
    rows
}

fn compare_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// The contract selected for drill-down when the user has not picked one.
pub fn default_selection(report: &[ReportRow]) -> Option<i32> {
    report.first().map(|row| row.summary.contract_id)
}

pub fn contract_choices(report: &[ReportRow]) -> Vec<ContractChoice> {
    report
        .iter()
        .map(|row| ContractChoice {
            contract_id: row.summary.contract_id,
            label: row.summary.display_name(),
        })
        .collect()
}
