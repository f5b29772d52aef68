//! Untrusted model output parsing and deterministic fallback
//!
//! The model's response is prose that usually contains a JSON object,
//! often wrapped in a markdown code fence. Parsing is a pure function
//! from the raw string so the fallback path is testable without
//! network access. A parse failure never fails the pipeline; the
//! caller builds a deterministic fallback analysis instead.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::model::{Finding, FindingStatus, Severity};
use crate::service::scoring::clamp_priority_rank;

/// Matches a fenced code block with an optional "json" tag
static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("valid fence regex"));

#[derive(Debug, thiserror::Error)]
pub enum ParseFailure {
    #[error("Model output is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Model output missing required field: {0}")]
    MissingField(&'static str),
}

/// Model-supplied triage fields after domain validation
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAnalysis {
    pub summary: String,
    pub remediation: String,
    pub risk_explanation: String,
    pub suggested_status: FindingStatus,
    pub priority_rank: i32,
}

/// Raw JSON payload as the model emits it; every field optional and
/// untrusted
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    summary: Option<String>,
    remediation: Option<String>,
    risk_explanation: Option<String>,
    suggested_status: Option<String>,
    priority_rank: Option<f64>,
}

/// Strip an optional markdown fence; returns the interior when a
/// fenced block is present, else the raw content
pub fn extract_json_payload(content: &str) -> &str {
    match FENCE_RE.captures(content) {
        Some(caps) => caps.get(1).map(|m| m.as_str().trim()).unwrap_or(content),
        None => content.trim(),
    }
}

/// Parse the model's response into validated triage fields.
///
/// Out-of-domain values are clamped or defaulted rather than
/// propagated: priority_rank is clamped to 1-10, an unknown
/// suggested_status defaults to "triaged". The three text fields are
/// required; their absence is a parse failure handled by the caller's
/// fallback.
pub fn parse_model_analysis(content: &str) -> Result<ModelAnalysis, ParseFailure> {
    let payload = extract_json_payload(content);
    let raw: RawAnalysis = serde_json::from_str(payload)?;

    let summary = non_empty(raw.summary).ok_or(ParseFailure::MissingField("summary"))?;
    let remediation = non_empty(raw.remediation).ok_or(ParseFailure::MissingField("remediation"))?;
    let risk_explanation =
        non_empty(raw.risk_explanation).ok_or(ParseFailure::MissingField("risk_explanation"))?;

    let suggested_status = raw
        .suggested_status
        .as_deref()
        .and_then(FindingStatus::parse)
        .unwrap_or(FindingStatus::Triaged);

    let priority_rank = raw
        .priority_rank
        .map(|r| clamp_priority_rank(r.round() as i32))
        .unwrap_or(5);

    Ok(ModelAnalysis {
        summary,
        remediation,
        risk_explanation,
        suggested_status,
        priority_rank,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Deterministic synthetic analysis used when the model's output is
/// unusable. Guarantees the pipeline never stalls on an uncooperative
/// model.
pub fn fallback_analysis(finding: &Finding, factor: f64) -> ModelAnalysis {
    let severity = finding.severity;

    let suggested_status = match severity {
        Severity::Critical | Severity::High => FindingStatus::Triaged,
        _ => FindingStatus::New,
    };

    let priority_rank = match severity {
        Severity::Critical => 1,
        Severity::High => 3,
        _ => 5,
    };

    ModelAnalysis {
        summary: format!(
            "{} severity {} finding that requires review.",
            severity.as_str().to_uppercase(),
            finding.source
        ),
        remediation: "Review the finding details and apply appropriate security controls."
            .to_string(),
        risk_explanation: format!(
            "Assigned based on {} severity with exploitability factor of {:.2}.",
            severity, factor
        ),
        suggested_status,
        priority_rank,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn finding(severity: Severity) -> Finding {
        Finding {
            id: Uuid::new_v4(),
            title: "t".to_string(),
            description: None,
            severity,
            source: "container".to_string(),
            status: FindingStatus::New,
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

    const FULL_JSON: &str = r#"{
        "summary": "Outdated base image with known CVEs.",
        "remediation": "Upgrade to the latest patch release.",
        "risk_explanation": "Known exploit paths exist.",
        "suggested_status": "in_progress",
        "priority_rank": 2
    }"#;

    #[test]
    fn parses_bare_json() {
        let analysis = parse_model_analysis(FULL_JSON).unwrap();
        assert_eq!(analysis.suggested_status, FindingStatus::InProgress);
        assert_eq!(analysis.priority_rank, 2);
        assert_eq!(analysis.summary, "Outdated base image with known CVEs.");
    }

    #[test]
    fn parses_fenced_json_with_tag() {
        let content = format!("Here is my analysis:\n```json\n{}\n```\nHope it helps.", FULL_JSON);
        let analysis = parse_model_analysis(&content).unwrap();
        assert_eq!(analysis.priority_rank, 2);
    }

    #[test]
    fn parses_fenced_json_without_tag() {
        let content = format!("```\n{}\n```", FULL_JSON);
        assert!(parse_model_analysis(&content).is_ok());
    }

    #[test]
    fn truncated_json_is_a_parse_failure() {
        let content = r#"{"summary": "something", "remediation": "fix it""#;
        assert!(matches!(
            parse_model_analysis(content),
            Err(ParseFailure::InvalidJson(_))
        ));
    }

    #[test]
    fn prose_without_fence_is_a_parse_failure() {
        let content = "I think this finding is quite severe and should be fixed soon.";
        assert!(parse_model_analysis(content).is_err());
    }

    #[test]
    fn missing_text_field_is_a_parse_failure() {
        let content = r#"{"summary": "s", "remediation": "r", "priority_rank": 3}"#;
        assert!(matches!(
            parse_model_analysis(content),
            Err(ParseFailure::MissingField("risk_explanation"))
        ));
    }

    #[test]
    fn unknown_status_defaults_to_triaged() {
        let content = r#"{
            "summary": "s", "remediation": "r", "risk_explanation": "e",
            "suggested_status": "escalated", "priority_rank": 4
        }"#;
        let analysis = parse_model_analysis(content).unwrap();
        assert_eq!(analysis.suggested_status, FindingStatus::Triaged);
    }

    #[test]
    fn out_of_range_rank_is_clamped() {
        let content = r#"{
            "summary": "s", "remediation": "r", "risk_explanation": "e",
            "priority_rank": 42
        }"#;
        let analysis = parse_model_analysis(content).unwrap();
        assert_eq!(analysis.priority_rank, 10);

        let content = r#"{
            "summary": "s", "remediation": "r", "risk_explanation": "e",
            "priority_rank": -3
        }"#;
        let analysis = parse_model_analysis(content).unwrap();
        assert_eq!(analysis.priority_rank, 1);
    }

    #[test]
    fn missing_rank_defaults_to_five() {
        let content = r#"{"summary": "s", "remediation": "r", "risk_explanation": "e"}"#;
        let analysis = parse_model_analysis(content).unwrap();
        assert_eq!(analysis.priority_rank, 5);
        assert_eq!(analysis.suggested_status, FindingStatus::Triaged);
    }

    #[test]
    fn fallback_is_deterministic_per_severity() {
        let critical = fallback_analysis(&finding(Severity::Critical), 1.2);
        assert_eq!(critical.suggested_status, FindingStatus::Triaged);
        assert_eq!(critical.priority_rank, 1);
        assert_eq!(
            critical.summary,
            "CRITICAL severity container finding that requires review."
        );
        assert!(critical
            .risk_explanation
            .contains("exploitability factor of 1.20"));

        let high = fallback_analysis(&finding(Severity::High), 1.0);
        assert_eq!(high.suggested_status, FindingStatus::Triaged);
        assert_eq!(high.priority_rank, 3);

        let medium = fallback_analysis(&finding(Severity::Medium), 1.0);
        assert_eq!(medium.suggested_status, FindingStatus::New);
        assert_eq!(medium.priority_rank, 5);

        let info = fallback_analysis(&finding(Severity::Info), 1.0);
        assert_eq!(info.suggested_status, FindingStatus::New);
        assert_eq!(info.priority_rank, 5);
    }
}
