//! Domain types for security findings and triage results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Coarse risk category assigned by the originating scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// Parse a severity string as stored in the findings table.
    /// Returns `None` for values outside the known set.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            "info" => Some(Severity::Info),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remediation lifecycle state of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    New,
    Triaged,
    InProgress,
    Resolved,
    Ignored,
    FalsePositive,
}

impl FindingStatus {
    /// Parse a status string as stored in the findings table.
    /// Returns `None` for values outside the known set.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(FindingStatus::New),
            "triaged" => Some(FindingStatus::Triaged),
            "in_progress" => Some(FindingStatus::InProgress),
            "resolved" => Some(FindingStatus::Resolved),
            "ignored" => Some(FindingStatus::Ignored),
            "false_positive" => Some(FindingStatus::FalsePositive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FindingStatus::New => "new",
            FindingStatus::Triaged => "triaged",
            FindingStatus::InProgress => "in_progress",
            FindingStatus::Resolved => "resolved",
            FindingStatus::Ignored => "ignored",
            FindingStatus::FalsePositive => "false_positive",
        }
    }
}

impl std::fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single security issue tracked through a remediation lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub severity: Severity,
    /// Source category (sast, sca, secrets, iac, container)
    pub source: String,
    pub status: FindingStatus,
    pub cve_id: Option<String>,
    pub cwe_id: Option<String>,
    pub file_path: Option<String>,
    pub line_number: Option<i32>,
    pub code_snippet: Option<String>,
    pub package_name: Option<String>,
    pub package_version: Option<String>,
    pub project_id: Uuid,
    pub confidence_score: Option<f64>,
    pub exploitability_score: Option<f64>,
    pub risk_score: Option<i32>,
    pub ai_summary: Option<String>,
    pub ai_remediation: Option<String>,
    pub ai_risk_explanation: Option<String>,
    pub ai_analyzed_at: Option<DateTime<Utc>>,
}

/// Result of one triage invocation, folded into the finding record
/// and reported back to the caller
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AiAnalysis {
    /// Final blended risk score, always within [0, 100]
    pub risk_score: i32,
    pub summary: String,
    pub remediation: String,
    pub risk_explanation: String,
    pub suggested_status: FindingStatus,
    /// 1 = fix immediately, 10 = low priority
    pub priority_rank: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_round_trips_through_strings() {
        for s in [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
            Severity::Info,
        ] {
            assert_eq!(Severity::parse(s.as_str()), Some(s));
        }
        assert_eq!(Severity::parse("catastrophic"), None);
    }

    #[test]
    fn status_round_trips_through_strings() {
        for s in [
            FindingStatus::New,
            FindingStatus::Triaged,
            FindingStatus::InProgress,
            FindingStatus::Resolved,
            FindingStatus::Ignored,
            FindingStatus::FalsePositive,
        ] {
            assert_eq!(FindingStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(FindingStatus::parse("wontfix"), None);
    }
}
