//! Triage orchestration: access gate, quota, selection, per-finding
//! analysis, reconciliation, and the audit trail
//!
//! Findings in a batch are processed sequentially on purpose: it keeps
//! the hourly quota easy to reason about and bounds load on the
//! upstream model endpoint.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::db::DbError;
use crate::model::{
    AiAnalysis, Finding, FindingStatus, TriageAction, TriageItem, TriageLimits, TriageRequest,
    TriageResponse,
};
use crate::service::clock::Clock;
use crate::service::llm::parse::{fallback_analysis, parse_model_analysis, ModelAnalysis};
use crate::service::llm::prompts::{build_triage_prompt, TRIAGE_SYSTEM_PROMPT};
use crate::service::llm::{ModelClient, ModelError};
use crate::service::rate_limit::{RateLimitError, RateLimiter};
use crate::service::scoring::{exploitability_factor, final_risk_score, severity_base_score};
use crate::service::store::{AnalysisUpdate, NewActivityLog, TriageStore};

const ACTIVITY_ACTION: &str = "ai_triage";

/// Strict hyphenated-UUID pattern, checked before any store access
static FINDING_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("valid finding id regex")
});

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Finding not found or access denied: {0}")]
    AccessDenied(Uuid),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Finding not found: {0}")]
    NotFound(Uuid),

    #[error("{0}")]
    RateLimited(String),

    #[error("Model credits exhausted")]
    CreditsExhausted,

    #[error("Store error: {0}")]
    Store(#[from] DbError),
}

impl From<RateLimitError> for TriageError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::Exceeded { .. } => TriageError::RateLimited(err.to_string()),
            RateLimitError::Store(e) => TriageError::Store(e),
        }
    }
}

/// Failure while processing one finding of a batch
enum ItemFailure {
    /// Recorded in the item's result; the batch continues
    Soft(String),
    /// Aborts the remaining batch (further model calls cannot succeed)
    Fatal(TriageError),
}

/// Orchestrates the full triage pipeline over injected store, model,
/// and clock seams
pub struct TriageService {
    store: Arc<dyn TriageStore>,
    model: Arc<dyn ModelClient>,
    clock: Arc<dyn Clock>,
    rate_limiter: RateLimiter,
    limits: TriageLimits,
}

impl TriageService {
    pub fn new(
        store: Arc<dyn TriageStore>,
        model: Arc<dyn ModelClient>,
        clock: Arc<dyn Clock>,
        limits: TriageLimits,
    ) -> Self {
        let rate_limiter =
            RateLimiter::new(Arc::clone(&store), Arc::clone(&clock), limits.hourly_limit);

        Self {
            store,
            model,
            clock,
            rate_limiter,
            limits,
        }
    }

    /// Run one triage request end to end
    ///
    /// A fatal mid-batch model failure (upstream rate limit or credit
    /// exhaustion) surfaces as the error alone: findings persisted
    /// earlier in the same batch keep their analysis, but their
    /// per-item results are not reported back to the caller.
    pub async fn triage(
        &self,
        bearer: Option<&str>,
        request: &TriageRequest,
    ) -> Result<TriageResponse, TriageError> {
        // Format validation happens before any store access
        let single_id = request
            .finding_id
            .as_deref()
            .map(parse_finding_id)
            .transpose()?;

        let list_ids: Vec<Uuid> = request
            .finding_ids
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|id| parse_finding_id(id))
            .collect::<Result<_, _>>()?;

        let user_id = self.authenticate(bearer).await?;

        tracing::info!(user = %user_id, action = ?request.action, "Triage request");

        let consumed = self.rate_limiter.check_budget(user_id).await?;

        let findings = self.select_findings(user_id, request.action, single_id, &list_ids).await?;

        if findings.is_empty() {
            tracing::info!(user = %user_id, "No findings to analyze");
            return Ok(TriageResponse::empty());
        }

        // Enforce the hourly cap even for batches
        self.rate_limiter.ensure_batch_fits(consumed, findings.len())?;

        tracing::info!(user = %user_id, count = findings.len(), "Analyzing findings");

        let mut results = Vec::with_capacity(findings.len());
        for finding in &findings {
            match self.process_finding(user_id, finding).await {
                Ok(analysis) => {
                    tracing::info!(
                        finding = %finding.id,
                        risk_score = analysis.risk_score,
                        "Finding analyzed"
                    );
                    results.push(TriageItem::success(finding.id, analysis));
                }
                Err(ItemFailure::Soft(error)) => {
                    tracing::error!(finding = %finding.id, error = %error, "Failed to analyze finding");
                    results.push(TriageItem::failure(finding.id, error));
                }
                Err(ItemFailure::Fatal(e)) => return Err(e),
            }
        }

        Ok(TriageResponse::from_results(results))
    }

    /// Resolve the acting user from a bearer credential, failing closed
    async fn authenticate(&self, bearer: Option<&str>) -> Result<Uuid, TriageError> {
        let Some(token) = bearer.filter(|t| !t.is_empty()) else {
            return Err(TriageError::Unauthorized);
        };

        // Store failures during credential resolution are denial, never
        // implicit allow
        match self.store.resolve_user(token).await {
            Ok(Some(user_id)) => Ok(user_id),
            Ok(None) => Err(TriageError::Unauthorized),
            Err(e) => {
                tracing::error!(error = %e, "Credential resolution failed, denying");
                Err(TriageError::Unauthorized)
            }
        }
    }

    /// Resolve the target set of findings for this request
    async fn select_findings(
        &self,
        user_id: Uuid,
        action: TriageAction,
        single_id: Option<Uuid>,
        list_ids: &[Uuid],
    ) -> Result<Vec<Finding>, TriageError> {
        match action {
            TriageAction::Analyze => {
                let finding_id = single_id.ok_or_else(|| {
                    TriageError::Validation("finding_id is required for analyze".to_string())
                })?;

                // Explicit access check before the fetch; errors fail closed
                let allowed = self
                    .store
                    .can_read_finding(user_id, finding_id)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::error!(error = %e, finding = %finding_id, "Access check failed, denying");
                        false
                    });

                if !allowed {
                    return Err(TriageError::AccessDenied(finding_id));
                }

                let finding = self
                    .store
                    .get_finding(finding_id)
                    .await?
                    .ok_or(TriageError::NotFound(finding_id))?;

                Ok(vec![finding])
            }
            TriageAction::TriageAll => {
                let findings = self
                    .store
                    .list_unanalyzed(list_ids, self.limits.batch_cap)
                    .await?;
                Ok(findings)
            }
        }
    }

    /// Analyze one finding: score, model call, reconcile, persist,
    /// audit. Failures local to this finding are soft.
    async fn process_finding(
        &self,
        user_id: Uuid,
        finding: &Finding,
    ) -> Result<AiAnalysis, ItemFailure> {
        let base = severity_base_score(finding.severity);
        let factor = exploitability_factor(finding);

        let prompt = build_triage_prompt(finding, base, factor);
        let content = match self.model.complete(TRIAGE_SYSTEM_PROMPT, &prompt).await {
            Ok(content) => content,
            Err(ModelError::RateLimited) => {
                return Err(ItemFailure::Fatal(TriageError::RateLimited(
                    "Model endpoint rate limited".to_string(),
                )));
            }
            Err(ModelError::CreditsExhausted) => {
                return Err(ItemFailure::Fatal(TriageError::CreditsExhausted));
            }
            // Transport-level failure for this item only
            Err(e) => return Err(ItemFailure::Soft(e.to_string())),
        };

        let analysis = match parse_model_analysis(&content) {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!(finding = %finding.id, error = %e, "Unparseable model output, using fallback analysis");
                fallback_analysis(finding, factor)
            }
        };

        let risk_score = final_risk_score(base, factor, analysis.priority_rank);

        // Status is only promoted from "new"; an already-triaged or
        // resolved finding keeps its state
        let status = if finding.status == FindingStatus::New {
            analysis.suggested_status
        } else {
            finding.status
        };

        let update = AnalysisUpdate {
            summary: analysis.summary.clone(),
            remediation: analysis.remediation.clone(),
            risk_explanation: analysis.risk_explanation.clone(),
            risk_score,
            status,
            analyzed_at: self.clock.now(),
        };

        self.store
            .apply_analysis(finding.id, &update)
            .await
            .map_err(|e| ItemFailure::Soft(format!("Failed to update finding: {}", e)))?;

        self.record_activity(user_id, finding, &analysis, risk_score)
            .await;

        Ok(AiAnalysis {
            risk_score,
            summary: analysis.summary,
            remediation: analysis.remediation,
            risk_explanation: analysis.risk_explanation,
            suggested_status: analysis.suggested_status,
            priority_rank: analysis.priority_rank,
        })
    }

    /// Best-effort audit trail; never fails the item
    async fn record_activity(
        &self,
        user_id: Uuid,
        finding: &Finding,
        analysis: &ModelAnalysis,
        risk_score: i32,
    ) {
        let organization_id = match self.store.organization_for_project(finding.project_id).await {
            Ok(Some(org)) => org,
            Ok(None) => {
                tracing::warn!(
                    finding = %finding.id,
                    project = %finding.project_id,
                    "Could not resolve owning organization, skipping activity log"
                );
                return;
            }
            Err(e) => {
                tracing::warn!(finding = %finding.id, error = %e, "Organization lookup failed, skipping activity log");
                return;
            }
        };

        let entry = NewActivityLog {
            organization_id,
            user_id,
            finding_id: finding.id,
            action: ACTIVITY_ACTION,
            model_used: self.model.model_id().to_string(),
            response_summary: format!(
                "Risk score: {}, Status: {}",
                risk_score, analysis.suggested_status
            ),
        };

        if let Err(e) = self.store.insert_activity(&entry).await {
            tracing::warn!(finding = %finding.id, error = %e, "Failed to write activity log");
        }
    }
}

/// Validate and parse a finding identifier
fn parse_finding_id(raw: &str) -> Result<Uuid, TriageError> {
    if !FINDING_ID_RE.is_match(raw) {
        return Err(TriageError::Validation(format!(
            "Invalid finding id: {}",
            raw
        )));
    }

    Uuid::parse_str(raw)
        .map_err(|_| TriageError::Validation(format!("Invalid finding id: {}", raw)))
}
