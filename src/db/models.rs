//! Row types mapping the relational schema to domain models

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::model::{Finding, FindingStatus, Severity};

/// Row shape for the findings table
#[derive(Debug, FromRow)]
pub struct FindingRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub severity: String,
    pub source: String,
    pub status: String,
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

impl FindingRow {
    /// Convert to the domain model.
    ///
    /// Unknown severity values fall back to medium (base score 50) and
    /// unknown status values to new, so rows written by older scanner
    /// versions never abort a triage request.
    pub fn into_domain(self) -> Finding {
        let severity = Severity::parse(&self.severity).unwrap_or_else(|| {
            tracing::warn!(id = %self.id, severity = %self.severity, "Unknown severity, defaulting to medium");
            Severity::Medium
        });

        let status = FindingStatus::parse(&self.status).unwrap_or_else(|| {
            tracing::warn!(id = %self.id, status = %self.status, "Unknown status, defaulting to new");
            FindingStatus::New
        });

        Finding {
            id: self.id,
            title: self.title,
            description: self.description,
            severity,
            source: self.source,
            status,
            cve_id: self.cve_id,
            cwe_id: self.cwe_id,
            file_path: self.file_path,
            line_number: self.line_number,
            code_snippet: self.code_snippet,
            package_name: self.package_name,
            package_version: self.package_version,
            project_id: self.project_id,
            confidence_score: self.confidence_score,
            exploitability_score: self.exploitability_score,
            risk_score: self.risk_score,
            ai_summary: self.ai_summary,
            ai_remediation: self.ai_remediation,
            ai_risk_explanation: self.ai_risk_explanation,
            ai_analyzed_at: self.ai_analyzed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(severity: &str, status: &str) -> FindingRow {
        FindingRow {
            id: Uuid::new_v4(),
            title: "t".to_string(),
            description: None,
            severity: severity.to_string(),
            source: "sast".to_string(),
            status: status.to_string(),
            cve_id: None,
            cwe_id: None,
            file_path: None,
            line_number: None,
            code_snippet: None,
            package_name: None,
            package_version: None,
            project_id: Uuid::new_v4(),
            confidence_score: None,
            exploitability_score: None,
            risk_score: None,
            ai_summary: None,
            ai_remediation: None,
            ai_risk_explanation: None,
            ai_analyzed_at: None,
        }
    }

    #[test]
    fn known_values_map_directly() {
        let finding = row("critical", "in_progress").into_domain();
        assert_eq!(finding.severity, Severity::Critical);
        assert_eq!(finding.status, FindingStatus::InProgress);
    }

    #[test]
    fn unknown_values_fall_back() {
        let finding = row("urgent", "pending").into_domain();
        assert_eq!(finding.severity, Severity::Medium);
        assert_eq!(finding.status, FindingStatus::New);
    }
}
