use std::fmt::Write as _;
use std::io;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{ContractChoice, EvaluationDetailRow, ReportRow};
use crate::window::DateWindow;

pub const NO_CONTRACTS: &str = "No contracts to show.";
pub const NO_EVALUATIONS: &str = "No evaluations for this contract.";

/// Flat summary line as shown to users; severity rank stays internal.
#[derive(Debug, Serialize)]
struct SummaryRecord<'a> {
    contract_id: i32,
    client: &'a str,
    project: &'a str,
    collaborators: i64,
    worst_score: Option<String>,
    mean_score: Option<String>,
    below_threshold: i64,
    status: &'static str,
}

impl<'a> From<&'a ReportRow> for SummaryRecord<'a> {
    fn from(row: &'a ReportRow) -> Self {
        Self {
            contract_id: row.summary.contract_id,
            client: &row.summary.client_name,
            project: &row.summary.project_label,
            collaborators: row.summary.collaborator_count,
            worst_score: row.summary.worst_average_score.map(two_decimals),
            mean_score: row.summary.mean_average_score.map(two_decimals),
            below_threshold: row.summary.bad_collaborator_count,
            status: row.severity.label(),
        }
    }
}

fn two_decimals(score: f64) -> String {
    format!("{score:.2}")
}

fn score_cell(score: Option<f64>) -> String {
    score.map(two_decimals).unwrap_or_else(|| "-".to_string())
}

pub fn month_label(month: NaiveDate) -> String {
    month.format("%B %Y").to_string()
}

pub fn summary_table(report: &[ReportRow]) -> String {
    if report.is_empty() {
        return format!("{NO_CONTRACTS}\n");
    }

    let mut output = String::new();
    let _ = writeln!(
        output,
        "{:>8}  {:<20}  {:<28}  {:>6}  {:>6}  {:>6}  {:>7}  {}",
        "Contract", "Client", "Project", "Colabs", "Worst", "Mean", "Below", "Status"
    );
    for row in report {
        let record = SummaryRecord::from(row);
        let _ = writeln!(
            output,
            "{:>8}  {:<20}  {:<28}  {:>6}  {:>6}  {:>6}  {:>7}  {}",
            record.contract_id,
            truncate(record.client, 20),
            truncate(record.project, 28),
            record.collaborators,
            score_cell(row.summary.worst_average_score),
            score_cell(row.summary.mean_average_score),
            record.below_threshold,
            record.status
        );
    }
    output
}

pub fn detail_table(details: &[EvaluationDetailRow]) -> String {
    if details.is_empty() {
        return format!("{NO_EVALUATIONS}\n");
    }

    let mut output = String::new();
    let _ = writeln!(
        output,
        "{:<24}  {:<10}  {:>5}  {:>4}  {:>4}  {:>4}  {}",
        "Collaborator", "Period", "Score", "Tech", "Comm", "Comp", "Comment"
    );
    for detail in details {
        let _ = writeln!(
            output,
            "{:<24}  {:<10}  {:>5.2}  {:>4}  {:>4}  {:>4}  {}",
            truncate(&detail.collaborator_name, 24),
            detail.period,
            detail.score,
            detail.technical,
            detail.communication,
            detail.commitment,
            detail.comment.as_deref().unwrap_or("")
        );
    }
    output
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut shortened: String = value.chars().take(width.saturating_sub(1)).collect();
    shortened.push('…');
    shortened
}

pub fn write_summary_csv<W: io::Write>(report: &[ReportRow], writer: W) -> anyhow::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in report {
        csv.serialize(SummaryRecord::from(row))?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_details_csv<W: io::Write>(
    details: &[EvaluationDetailRow],
    writer: W,
) -> anyhow::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for detail in details {
        csv.serialize(detail)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn summary_json(report: &[ReportRow]) -> anyhow::Result<String> {
    let records: Vec<SummaryRecord<'_>> = report.iter().map(SummaryRecord::from).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

pub fn details_json(details: &[EvaluationDetailRow]) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(details)?)
}

/// Markdown document with the ranked contracts and one contract's evaluations.
pub fn markdown_report(
    month: NaiveDate,
    window: DateWindow,
    threshold: f64,
    report: &[ReportRow],
    selected: Option<(&ContractChoice, &[EvaluationDetailRow])>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Contract Radar Report");
    let _ = writeln!(
        output,
        "Evaluations from {} ({} to {}), bad score below {:.2}",
        month_label(month),
        window.start,
        window.end,
        threshold
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Contracts by Severity");

    if report.is_empty() {
        let _ = writeln!(output, "{NO_CONTRACTS}");
    } else {
        let _ = writeln!(
            output,
            "| Contract | Client | Project | Collaborators | Worst score | Mean score | Below threshold | Status |"
        );
        let _ = writeln!(output, "|---:|---|---|---:|---:|---:|---:|---|");
        for row in report {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {} | {} |",
                row.summary.contract_id,
                escape_cell(&row.summary.client_name),
                escape_cell(&row.summary.project_label),
                row.summary.collaborator_count,
                score_cell(row.summary.worst_average_score),
                score_cell(row.summary.mean_average_score),
                row.summary.bad_collaborator_count,
                row.severity.label()
            );
        }
    }

    if let Some((choice, details)) = selected {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Evaluations for {}", choice.label);

        if details.is_empty() {
            let _ = writeln!(output, "{NO_EVALUATIONS}");
        } else {
            let _ = writeln!(
                output,
                "| Collaborator | Period | Score | Technical | Communication | Commitment | Comment |"
            );
            let _ = writeln!(output, "|---|---|---:|---:|---:|---:|---|");
            for detail in details {
                let _ = writeln!(
                    output,
                    "| {} | {} | {:.2} | {} | {} | {} | {} |",
                    escape_cell(&detail.collaborator_name),
                    detail.period,
                    detail.score,
                    detail.technical,
                    detail.communication,
                    detail.commitment,
                    escape_cell(detail.comment.as_deref().unwrap_or(""))
                );
            }
        }
    }

    output
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}
