//! Subscription store: one record per `(user_id, environment)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::model::{Environment, SubscriptionRecord};

/// Internal store of subscription records.
///
/// Uniqueness per `(user_id, environment)` is enforced by the upsert
/// key, not by a separate check. Writes are full-row last-write-wins,
/// never partial field patches.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Point lookup by key.
    async fn get(
        &self,
        user_id: Uuid,
        environment: Environment,
    ) -> StoreResult<Option<SubscriptionRecord>>;

    /// Idempotent full-row upsert keyed `(user_id, environment)`.
    async fn upsert(&self, record: &SubscriptionRecord) -> StoreResult<()>;
}

/// Postgres-backed subscription store.
#[derive(Debug, Clone)]
pub struct PgSubscriptionStore {
    pool: PgPool,
}

impl PgSubscriptionStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn get(
        &self,
        user_id: Uuid,
        environment: Environment,
    ) -> StoreResult<Option<SubscriptionRecord>> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r"
            SELECT
                user_id, environment, plan_type, duration_months, is_active,
                external_subscription_id, external_customer_id,
                cancel_at_period_end, current_period_end, updated_at
            FROM user_subscriptions
            WHERE user_id = $1 AND environment = $2
            ",
        )
        .bind(user_id)
        .bind(environment.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SubscriptionRow::into_record))
    }

    async fn upsert(&self, record: &SubscriptionRecord) -> StoreResult<()> {
        sqlx::query(
            r"
            INSERT INTO user_subscriptions
                (user_id, environment, plan_type, duration_months, is_active,
                 external_subscription_id, external_customer_id,
                 cancel_at_period_end, current_period_end, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id, environment)
            DO UPDATE SET
                plan_type = EXCLUDED.plan_type,
                duration_months = EXCLUDED.duration_months,
                is_active = EXCLUDED.is_active,
                external_subscription_id = EXCLUDED.external_subscription_id,
                external_customer_id = EXCLUDED.external_customer_id,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                current_period_end = EXCLUDED.current_period_end,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(record.user_id)
        .bind(record.environment.as_str())
        .bind(&record.plan_type)
        .bind(record.duration_months as i32)
        .bind(record.is_active)
        .bind(&record.external_subscription_id)
        .bind(&record.external_customer_id)
        .bind(record.cancel_at_period_end)
        .bind(record.current_period_end)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Row from the subscription table.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    user_id: Uuid,
    environment: String,
    plan_type: String,
    duration_months: i32,
    is_active: bool,
    external_subscription_id: String,
    external_customer_id: String,
    cancel_at_period_end: bool,
    current_period_end: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl SubscriptionRow {
    fn into_record(self) -> SubscriptionRecord {
        let environment = self.environment.parse().unwrap_or(Environment::Test);

        SubscriptionRecord {
            user_id: self.user_id,
            environment,
            plan_type: self.plan_type,
            duration_months: self.duration_months.max(0) as u32,
            is_active: self.is_active,
            external_subscription_id: self.external_subscription_id,
            external_customer_id: self.external_customer_id,
            cancel_at_period_end: self.cancel_at_period_end,
            current_period_end: self.current_period_end,
            updated_at: self.updated_at,
        }
    }
}
