use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::error::{NotifyError, NotifyResult};
use crate::models::mood::IconCount;
use crate::models::user::{Address, ReportCandidate};

/// Read-only queries the notification scheduler issues against the store.
///
/// `today` and the window bounds are always supplied by the caller so the
/// calendar date follows the service clock, not the database session.
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// Addresses of users with a registered address and no mood entry dated `today`.
    async fn reminder_candidates(&self, today: NaiveDate) -> NotifyResult<Vec<Address>>;

    /// Every user with a registered address.
    async fn report_candidates(&self) -> NotifyResult<Vec<ReportCandidate>>;

    /// Per-icon entry counts for `user_id` with `start <= date <= end`.
    async fn icon_counts(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> NotifyResult<BTreeMap<String, i64>>;
}

#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgGateway {
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    async fn bounded<T, F>(&self, query: &'static str, fut: F) -> NotifyResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => result.map_err(NotifyError::from),
            Err(_) => Err(NotifyError::DataUnavailable(format!(
                "{} timed out after {}s",
                query,
                self.query_timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl DataGateway for PgGateway {
    async fn reminder_candidates(&self, today: NaiveDate) -> NotifyResult<Vec<Address>> {
        self.bounded(
            "reminder_candidates",
            sqlx::query_scalar::<_, Address>(
                r#"
                SELECT DISTINCT u.telegram_chat_id
                FROM users u
                WHERE u.telegram_chat_id IS NOT NULL
                  AND NOT EXISTS (
                    SELECT 1 FROM mood m
                    WHERE m.user_id = u.id AND m.date = $1
                  )
                "#,
            )
            .bind(today)
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn report_candidates(&self) -> NotifyResult<Vec<ReportCandidate>> {
        self.bounded(
            "report_candidates",
            sqlx::query_as::<_, ReportCandidate>(
                r#"
                SELECT telegram_chat_id, id::text AS user_id
                FROM users
                WHERE telegram_chat_id IS NOT NULL
                "#,
            )
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn icon_counts(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> NotifyResult<BTreeMap<String, i64>> {
        let rows = self
            .bounded(
                "icon_counts",
                sqlx::query_as::<_, IconCount>(
                    r#"
                    SELECT icon, COUNT(*) AS cnt
                    FROM mood
                    WHERE user_id = $1::uuid
                      AND date BETWEEN $2 AND $3
                    GROUP BY icon
                    "#,
                )
                .bind(user_id)
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool),
            )
            .await?;

        Ok(rows
            .into_iter()
            .filter(|row| row.cnt > 0)
            .map(|row| (row.icon, row.cnt))
            .collect())
    }
}
