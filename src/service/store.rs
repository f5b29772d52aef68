//! Store seam for the triage pipeline
//!
//! The orchestrator talks to the relational store through this trait so
//! rate limiting, reconciliation, and the audit trail are testable with
//! in-memory doubles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::DbError;
use crate::model::{Finding, FindingStatus};

/// Fields written back to a finding after analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisUpdate {
    pub summary: String,
    pub remediation: String,
    pub risk_explanation: String,
    /// Final blended risk score, within [0, 100]
    pub risk_score: i32,
    /// Status to persist. The "only promote from new" guard is applied
    /// by the reconciler before this struct is built.
    pub status: FindingStatus,
    pub analyzed_at: DateTime<Utc>,
}

/// Audit record written once per successfully analyzed finding
#[derive(Debug, Clone)]
pub struct NewActivityLog {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub finding_id: Uuid,
    pub action: &'static str,
    pub model_used: String,
    pub response_summary: String,
}

/// Access to findings, authorization, quota accounting, and the audit
/// trail backing the triage pipeline
#[async_trait]
pub trait TriageStore: Send + Sync {
    /// Resolve a bearer credential to a user id. `None` means the
    /// credential is unknown or expired.
    async fn resolve_user(&self, bearer: &str) -> Result<Option<Uuid>, DbError>;

    /// Row-level authorization: can this user read this finding
    async fn can_read_finding(&self, user_id: Uuid, finding_id: Uuid) -> Result<bool, DbError>;

    /// Fetch a single finding by id
    async fn get_finding(&self, finding_id: Uuid) -> Result<Option<Finding>, DbError>;

    /// Fetch findings that have never been analyzed, optionally
    /// restricted to `ids` (an empty slice means no restriction),
    /// capped at `limit` rows
    async fn list_unanalyzed(&self, ids: &[Uuid], limit: u32) -> Result<Vec<Finding>, DbError>;

    /// Count "ai_triage" activity rows for this user created at or
    /// after `since`
    async fn count_recent_triage(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, DbError>;

    /// Persist analysis results onto a finding
    async fn apply_analysis(
        &self,
        finding_id: Uuid,
        update: &AnalysisUpdate,
    ) -> Result<(), DbError>;

    /// Resolve the organization owning a project via its workspace.
    /// `None` if either link in the chain is missing.
    async fn organization_for_project(&self, project_id: Uuid) -> Result<Option<Uuid>, DbError>;

    /// Append an audit record
    async fn insert_activity(&self, entry: &NewActivityLog) -> Result<(), DbError>;
}
