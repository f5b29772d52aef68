//! PostgreSQL implementation of the triage store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::FindingRow;
use super::DbError;
use crate::model::Finding;
use crate::service::store::{AnalysisUpdate, NewActivityLog, TriageStore};

/// Store backed by the relational schema (findings, projects,
/// workspaces, sessions, ai_activity_logs)
#[derive(Clone)]
pub struct PgTriageStore {
    pool: PgPool,
}

impl PgTriageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TriageStore for PgTriageStore {
    async fn resolve_user(&self, bearer: &str) -> Result<Option<Uuid>, DbError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT user_id FROM sessions
            WHERE token = $1 AND expires_at > NOW()
            "#,
        )
        .bind(bearer)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(user_id,)| user_id))
    }

    async fn can_read_finding(&self, user_id: Uuid, finding_id: Uuid) -> Result<bool, DbError> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT 1 FROM findings f
            JOIN projects p ON p.id = f.project_id
            JOIN workspace_members m ON m.workspace_id = p.workspace_id
            WHERE f.id = $1 AND m.user_id = $2
            "#,
        )
        .bind(finding_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    async fn get_finding(&self, finding_id: Uuid) -> Result<Option<Finding>, DbError> {
        let row: Option<FindingRow> = sqlx::query_as(
            r#"
            SELECT * FROM findings WHERE id = $1
            "#,
        )
        .bind(finding_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FindingRow::into_domain))
    }

    async fn list_unanalyzed(&self, ids: &[Uuid], limit: u32) -> Result<Vec<Finding>, DbError> {
        let rows: Vec<FindingRow> = if ids.is_empty() {
            sqlx::query_as(
                r#"
                SELECT * FROM findings
                WHERE ai_analyzed_at IS NULL
                ORDER BY created_at
                LIMIT $1
                "#,
            )
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                r#"
                SELECT * FROM findings
                WHERE ai_analyzed_at IS NULL AND id = ANY($1)
                ORDER BY created_at
                LIMIT $2
                "#,
            )
            .bind(ids)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(rows.into_iter().map(FindingRow::into_domain).collect())
    }

    async fn count_recent_triage(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM ai_activity_logs
            WHERE user_id = $1 AND action = 'ai_triage' AND created_at >= $2
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn apply_analysis(
        &self,
        finding_id: Uuid,
        update: &AnalysisUpdate,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            UPDATE findings SET
                ai_summary = $2,
                ai_remediation = $3,
                ai_risk_explanation = $4,
                risk_score = $5,
                status = $6,
                ai_analyzed_at = $7
            WHERE id = $1
            "#,
        )
        .bind(finding_id)
        .bind(&update.summary)
        .bind(&update.remediation)
        .bind(&update.risk_explanation)
        .bind(update.risk_score)
        .bind(update.status.as_str())
        .bind(update.analyzed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(finding_id.to_string()));
        }

        tracing::debug!(id = %finding_id, risk_score = update.risk_score, "Updated finding with analysis");
        Ok(())
    }

    async fn organization_for_project(&self, project_id: Uuid) -> Result<Option<Uuid>, DbError> {
        let workspace: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT workspace_id FROM projects WHERE id = $1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((workspace_id,)) = workspace else {
            return Ok(None);
        };

        let organization: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT organization_id FROM workspaces WHERE id = $1
            "#,
        )
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(organization.map(|(organization_id,)| organization_id))
    }

    async fn insert_activity(&self, entry: &NewActivityLog) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO ai_activity_logs (
                organization_id, user_id, finding_id, action, model_used, response_summary
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.organization_id)
        .bind(entry.user_id)
        .bind(entry.finding_id)
        .bind(entry.action)
        .bind(&entry.model_used)
        .bind(&entry.response_summary)
        .execute(&self.pool)
        .await?;

        tracing::debug!(finding = %entry.finding_id, user = %entry.user_id, "Recorded triage activity");
        Ok(())
    }
}
