//! Sliding-window quota over the audit trail
//!
//! Consumption is counted from ai_activity_logs rows in the trailing
//! 60 minutes, so the quota recovers naturally without a reset call.
//! The check-then-act sequence is not atomic against concurrent
//! requests from the same user; two simultaneous requests can jointly
//! exceed the limit by at most one batch's width. That looseness is
//! intentional: this is an abuse deterrent, not a hard cap.

use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use crate::db::DbError;
use crate::service::clock::Clock;
use crate::service::store::TriageStore;

const WINDOW_MINUTES: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded: max {limit} analyses per hour")]
    Exceeded { limit: i64 },

    #[error("Failed to query rate limit state: {0}")]
    Store(#[from] DbError),
}

/// Per-user hourly quota shared between single and batch requests
pub struct RateLimiter {
    store: Arc<dyn TriageStore>,
    clock: Arc<dyn Clock>,
    limit: i64,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn TriageStore>, clock: Arc<dyn Clock>, limit: i64) -> Self {
        Self { store, clock, limit }
    }

    /// Current consumption within the trailing window. Fails when the
    /// caller has already used up the hourly budget.
    pub async fn check_budget(&self, user_id: Uuid) -> Result<i64, RateLimitError> {
        let since = self.clock.now() - Duration::minutes(WINDOW_MINUTES);
        let count = self.store.count_recent_triage(user_id, since).await?;

        if count >= self.limit {
            tracing::warn!(user = %user_id, count = count, limit = self.limit, "Hourly triage quota exhausted");
            return Err(RateLimitError::Exceeded { limit: self.limit });
        }

        Ok(count)
    }

    /// Second-phase check once the batch size is known: already-consumed
    /// plus about-to-be-consumed capacity must fit under the limit.
    pub fn ensure_batch_fits(&self, consumed: i64, additional: usize) -> Result<(), RateLimitError> {
        if consumed + additional as i64 > self.limit {
            tracing::warn!(
                consumed = consumed,
                additional = additional,
                limit = self.limit,
                "Batch would exceed hourly triage quota"
            );
            return Err(RateLimitError::Exceeded { limit: self.limit });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Finding;
    use crate::service::store::{AnalysisUpdate, NewActivityLog};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Mutex;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    /// Store double that only answers the quota count and records the
    /// window start it was asked about
    struct CountingStore {
        count: i64,
        asked_since: Mutex<Option<DateTime<Utc>>>,
    }

    #[async_trait]
    impl TriageStore for CountingStore {
        async fn resolve_user(&self, _bearer: &str) -> Result<Option<Uuid>, DbError> {
            unimplemented!()
        }

        async fn can_read_finding(&self, _user: Uuid, _finding: Uuid) -> Result<bool, DbError> {
            unimplemented!()
        }

        async fn get_finding(&self, _finding: Uuid) -> Result<Option<Finding>, DbError> {
            unimplemented!()
        }

        async fn list_unanalyzed(&self, _ids: &[Uuid], _limit: u32) -> Result<Vec<Finding>, DbError> {
            unimplemented!()
        }

        async fn count_recent_triage(
            &self,
            _user: Uuid,
            since: DateTime<Utc>,
        ) -> Result<i64, DbError> {
            *self.asked_since.lock().unwrap() = Some(since);
            Ok(self.count)
        }

        async fn apply_analysis(&self, _f: Uuid, _u: &AnalysisUpdate) -> Result<(), DbError> {
            unimplemented!()
        }

        async fn organization_for_project(&self, _p: Uuid) -> Result<Option<Uuid>, DbError> {
            unimplemented!()
        }

        async fn insert_activity(&self, _e: &NewActivityLog) -> Result<(), DbError> {
            unimplemented!()
        }
    }

    fn limiter(count: i64) -> (Arc<CountingStore>, RateLimiter) {
        let store = Arc::new(CountingStore {
            count,
            asked_since: Mutex::new(None),
        });
        let clock = Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ));
        let rl = RateLimiter::new(Arc::clone(&store) as Arc<dyn TriageStore>, clock, 20);
        (store, rl)
    }

    #[tokio::test]
    async fn budget_passes_below_limit_and_reports_consumption() {
        let (store, rl) = limiter(19);
        let consumed = rl.check_budget(Uuid::new_v4()).await.unwrap();
        assert_eq!(consumed, 19);

        // Window start is exactly 60 minutes before "now"
        let since = store.asked_since.lock().unwrap().unwrap();
        assert_eq!(
            since,
            Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn budget_fails_at_limit() {
        let (_, rl) = limiter(20);
        let result = rl.check_budget(Uuid::new_v4()).await;
        assert!(matches!(result, Err(RateLimitError::Exceeded { limit: 20 })));
    }

    #[tokio::test]
    async fn batch_filling_the_window_exactly_is_allowed() {
        let (_, rl) = limiter(0);
        assert!(rl.ensure_batch_fits(19, 1).is_ok());
        assert!(rl.ensure_batch_fits(0, 20).is_ok());
        assert!(rl.ensure_batch_fits(19, 2).is_err());
        assert!(rl.ensure_batch_fits(0, 21).is_err());
    }
}
