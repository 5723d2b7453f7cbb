use serde::Serialize;

pub const THRESHOLD_MIN: f64 = 0.0;
pub const THRESHOLD_MAX: f64 = 5.0;
pub const DEFAULT_THRESHOLD: f64 = 3.0;

/// Distance below the threshold at which a contract becomes critical.
pub const CRITICAL_MARGIN: f64 = 0.5;

/// Severity tier of a contract, declared from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Ok,
    NoEvaluation,
}

impl Severity {
    /// Sort key; lower ranks sort first.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::Warning => 1,
            Severity::Ok => 2,
            Severity::NoEvaluation => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Ok => "ok",
            Severity::NoEvaluation => "no evaluation",
        }
    }
}

/// Classifies a contract by the worst collaborator average it has.
pub fn classify(worst_average_score: Option<f64>, threshold: f64) -> Severity {
    match worst_average_score {
        None => Severity::NoEvaluation,
        Some(score) if score < threshold - CRITICAL_MARGIN => Severity::Critical,
        Some(score) if score < threshold => Severity::Warning,
        Some(_) => Severity::Ok,
    }
}

pub fn parse_threshold(value: &str) -> Result<f64, String> {
    let threshold: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;

    if !(THRESHOLD_MIN..=THRESHOLD_MAX).contains(&threshold) {
        return Err(format!(
            "threshold must be between {THRESHOLD_MIN:.1} and {THRESHOLD_MAX:.1}"
        ));
    }

    Ok(threshold)
}
