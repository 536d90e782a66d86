//! Identity store: customer-to-user links and the user directory.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::model::Environment;

/// Users fetched per directory page during the email fallback search.
const DIRECTORY_PAGE_SIZE: i64 = 100;

/// Internal store of identity links and user accounts.
///
/// Links are keyed `(external_customer_id, environment)` and created
/// lazily by the engine, never deleted here. The user directory does
/// not expose lookup-by-email directly; `search_by_email` is a bounded
/// paginated scan over it.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up the user linked to a provider customer.
    async fn find_link(
        &self,
        customer_id: &str,
        environment: Environment,
    ) -> StoreResult<Option<Uuid>>;

    /// Create a new user account for `email`.
    ///
    /// Fails with [`StoreError::AlreadyExists`] when an account for
    /// that email already exists.
    async fn create_user(&self, email: &str) -> StoreResult<Uuid>;

    /// Scan the user directory for the first exact email match,
    /// visiting at most `page_bound` pages.
    ///
    /// The bound keeps the scan finite on a large directory; a miss
    /// within the bound does not prove the account is absent.
    async fn search_by_email(&self, email: &str, page_bound: u32) -> StoreResult<Option<Uuid>>;

    /// Create or replace the link from a provider customer to a user.
    async fn upsert_link(
        &self,
        customer_id: &str,
        user_id: Uuid,
        environment: Environment,
    ) -> StoreResult<()>;
}

/// Postgres-backed identity store.
#[derive(Debug, Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_link(
        &self,
        customer_id: &str,
        environment: Environment,
    ) -> StoreResult<Option<Uuid>> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r"
            SELECT user_id
            FROM billing_customer_links
            WHERE external_customer_id = $1 AND environment = $2
            ",
        )
        .bind(customer_id)
        .bind(environment.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(user_id,)| user_id))
    }

    async fn create_user(&self, email: &str) -> StoreResult<Uuid> {
        let result: Result<(Uuid,), sqlx::Error> = sqlx::query_as(
            r"
            INSERT INTO users (id, email, created_at)
            VALUES ($1, lower($2), NOW())
            RETURNING id
            ",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok((user_id,)) => Ok(user_id),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::AlreadyExists {
                    email: email.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn search_by_email(&self, email: &str, page_bound: u32) -> StoreResult<Option<Uuid>> {
        // The users table belongs to the auth service; this store only
        // gets directory listing access, so the search pages through it
        // and matches client-side.
        let needle = email.to_lowercase();

        for page in 0..i64::from(page_bound) {
            let rows: Vec<(Uuid, String)> = sqlx::query_as(
                r"
                SELECT id, email
                FROM users
                ORDER BY created_at, id
                LIMIT $1 OFFSET $2
                ",
            )
            .bind(DIRECTORY_PAGE_SIZE)
            .bind(page * DIRECTORY_PAGE_SIZE)
            .fetch_all(&self.pool)
            .await?;

            let exhausted = (rows.len() as i64) < DIRECTORY_PAGE_SIZE;

            if let Some((user_id, _)) = rows
                .into_iter()
                .find(|(_, candidate)| candidate.to_lowercase() == needle)
            {
                debug!(page = page + 1, "Directory search found email match");
                return Ok(Some(user_id));
            }

            if exhausted {
                return Ok(None);
            }
        }

        debug!(
            page_bound = page_bound,
            "Directory search exhausted page bound without a match"
        );
        Ok(None)
    }

    async fn upsert_link(
        &self,
        customer_id: &str,
        user_id: Uuid,
        environment: Environment,
    ) -> StoreResult<()> {
        sqlx::query(
            r"
            INSERT INTO billing_customer_links
                (external_customer_id, environment, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            ON CONFLICT (external_customer_id, environment)
            DO UPDATE SET user_id = EXCLUDED.user_id, updated_at = NOW()
            ",
        )
        .bind(customer_id)
        .bind(environment.as_str())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
