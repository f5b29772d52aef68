//! Request and response DTOs for the triage endpoint

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::AiAnalysis;

/// Requested triage operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TriageAction {
    /// Analyze a single finding by id
    Analyze,
    /// Analyze all unanalyzed findings visible to the caller,
    /// optionally restricted to an id list
    TriageAll,
}

/// Body of a POST /v1/triage request
///
/// Identifiers are kept as strings so format validation happens
/// before any store access.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TriageRequest {
    pub action: TriageAction,
    pub finding_id: Option<String>,
    pub finding_ids: Option<Vec<String>>,
}

/// Per-finding outcome within a triage response
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TriageItem {
    pub finding_id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AiAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TriageItem {
    pub fn success(finding_id: Uuid, analysis: AiAnalysis) -> Self {
        Self {
            finding_id,
            success: true,
            analysis: Some(analysis),
            error: None,
        }
    }

    pub fn failure(finding_id: Uuid, error: String) -> Self {
        Self {
            finding_id,
            success: false,
            analysis: None,
            error: Some(error),
        }
    }
}

/// Aggregated response for a triage request
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TriageResponse {
    pub message: String,
    pub analyzed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<TriageItem>>,
}

impl TriageResponse {
    /// Response for a request that selected zero findings.
    /// Carries no `results` key.
    pub fn empty() -> Self {
        Self {
            message: "No findings to analyze".to_string(),
            analyzed: 0,
            results: None,
        }
    }

    /// Response aggregating per-finding outcomes
    pub fn from_results(results: Vec<TriageItem>) -> Self {
        let total = results.len();
        let analyzed = results.iter().filter(|r| r.success).count();

        Self {
            message: format!("Analyzed {} of {} findings", analyzed, total),
            analyzed,
            results: Some(results),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FindingStatus;

    fn analysis() -> AiAnalysis {
        AiAnalysis {
            risk_score: 80,
            summary: "s".to_string(),
            remediation: "r".to_string(),
            risk_explanation: "e".to_string(),
            suggested_status: FindingStatus::Triaged,
            priority_rank: 2,
        }
    }

    #[test]
    fn empty_response_omits_results_key() {
        let json = serde_json::to_value(TriageResponse::empty()).unwrap();
        assert_eq!(json["message"], "No findings to analyze");
        assert_eq!(json["analyzed"], 0);
        assert!(json.get("results").is_none());
    }

    #[test]
    fn success_item_omits_error_key() {
        let item = TriageItem::success(Uuid::new_v4(), analysis());
        let json = serde_json::to_value(item).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
        assert_eq!(json["analysis"]["risk_score"], 80);
    }

    #[test]
    fn failure_item_omits_analysis_key() {
        let item = TriageItem::failure(Uuid::new_v4(), "update failed".to_string());
        let json = serde_json::to_value(item).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("analysis").is_none());
        assert_eq!(json["error"], "update failed");
    }

    #[test]
    fn aggregation_counts_successes_only() {
        let id = Uuid::new_v4();
        let response = TriageResponse::from_results(vec![
            TriageItem::success(id, analysis()),
            TriageItem::failure(Uuid::new_v4(), "boom".to_string()),
            TriageItem::success(Uuid::new_v4(), analysis()),
        ]);
        assert_eq!(response.analyzed, 2);
        assert_eq!(response.message, "Analyzed 2 of 3 findings");
    }

    #[test]
    fn action_deserializes_from_snake_case() {
        let req: TriageRequest =
            serde_json::from_str(r#"{"action":"triage_all"}"#).unwrap();
        assert_eq!(req.action, TriageAction::TriageAll);
        assert!(serde_json::from_str::<TriageRequest>(r#"{"action":"delete_all"}"#).is_err());
    }
}
