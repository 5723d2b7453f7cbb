use chrono::NaiveDate;
use serde::Serialize;

use crate::risk::Severity;

/// Per-contract aggregate over one date window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractSummary {
    pub contract_id: i32,
    pub client_name: String,
    pub project_label: String,
    pub collaborator_count: i64,
    /// Lowest collaborator average; `None` when nobody was evaluated.
    pub worst_average_score: Option<f64>,
    pub mean_average_score: Option<f64>,
    pub bad_collaborator_count: i64,
}

impl ContractSummary {
    pub fn display_name(&self) -> String {
        format!("{} – {}", self.client_name, self.project_label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    #[serde(flatten)]
    pub summary: ContractSummary,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractChoice {
    pub contract_id: i32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationDetailRow {
    pub collaborator_name: String,
    pub period: NaiveDate,
    pub score: f64,
    pub technical: i32,
    pub communication: i32,
    pub commitment: i32,
    pub comment: Option<String>,
}
