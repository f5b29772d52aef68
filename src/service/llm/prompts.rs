//! Prompts for finding triage

use crate::model::Finding;

/// System prompt for triage analysis
pub const TRIAGE_SYSTEM_PROMPT: &str = r#"You are an expert security analyst specializing in DevSecOps. Your task is to analyze security findings and provide actionable triage recommendations.

You must respond with a JSON object containing:
- summary: A concise 1-2 sentence summary of the vulnerability and its impact
- remediation: Specific, actionable steps to fix the issue (include code examples when relevant)
- risk_explanation: Explanation of why this risk score was assigned, considering exploitability, impact, and context
- suggested_status: One of "triaged", "in_progress", or "new" based on severity and actionability
- priority_rank: 1-10 scale (1 = fix immediately, 10 = low priority)

Consider these factors:
- Severity level and potential impact
- Exploitability (is there a known CVE? Active exploitation?)
- Context (file path, code location, package dependencies)
- Remediation complexity"#;

/// Build the user prompt carrying the finding fields and the
/// deterministic baseline inputs
pub fn build_triage_prompt(finding: &Finding, base_score: f64, factor: f64) -> String {
    let mut prompt = format!(
        "Analyze this security finding:\n\n\
         Title: {}\n\
         Description: {}\n\
         Severity: {}\n\
         Source: {}\n",
        finding.title,
        finding
            .description
            .as_deref()
            .unwrap_or("No description provided"),
        finding.severity,
        finding.source,
    );

    if let Some(cve) = &finding.cve_id {
        prompt.push_str(&format!("CVE: {}\n", cve));
    }
    if let Some(cwe) = &finding.cwe_id {
        prompt.push_str(&format!("CWE: {}\n", cwe));
    }
    if let Some(path) = &finding.file_path {
        match finding.line_number {
            Some(line) => prompt.push_str(&format!("File: {}:{}\n", path, line)),
            None => prompt.push_str(&format!("File: {}\n", path)),
        }
    }
    if let Some(name) = &finding.package_name {
        prompt.push_str(&format!(
            "Package: {}@{}\n",
            name,
            finding.package_version.as_deref().unwrap_or("unknown")
        ));
    }
    if let Some(snippet) = &finding.code_snippet {
        prompt.push_str(&format!("Code Snippet:\n```\n{}\n```\n", snippet));
    }

    prompt.push_str(&format!(
        "\nBase risk score from severity: {}\n\
         Exploitability factor: {:.2}\n\n\
         Provide your analysis as a JSON object.",
        base_score, factor
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FindingStatus, Severity};
    use uuid::Uuid;

    #[test]
    fn prompt_includes_optional_fields_only_when_present() {
        let mut finding = Finding {
            id: Uuid::new_v4(),
            title: "SQL injection in login".to_string(),
            description: None,
            severity: Severity::High,
            source: "sast".to_string(),
            status: FindingStatus::New,
            cve_id: None,
            cwe_id: Some("CWE-89".to_string()),
            file_path: Some("src/auth.rs".to_string()),
            line_number: Some(42),
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
        };

        let prompt = build_triage_prompt(&finding, 75.0, 1.05);
        assert!(prompt.contains("Title: SQL injection in login"));
        assert!(prompt.contains("Description: No description provided"));
        assert!(prompt.contains("CWE: CWE-89"));
        assert!(prompt.contains("File: src/auth.rs:42"));
        assert!(!prompt.contains("CVE:"));
        assert!(!prompt.contains("Package:"));
        assert!(prompt.contains("Exploitability factor: 1.05"));

        finding.package_name = Some("tokio".to_string());
        let prompt = build_triage_prompt(&finding, 75.0, 1.05);
        assert!(prompt.contains("Package: tokio@unknown"));
    }
}
