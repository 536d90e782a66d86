//! Reconciliation engine orchestrator.
//!
//! Walks the provider's subscription sequence page by page and decides
//! one terminal action per item: `created`, `updated`, `skipped` or
//! `error`. Item failures never abort the run; only an unreachable
//! provider does, because an incomplete snapshot cannot be reconciled
//! soundly. Processing is sequential: the provider cursor is stateful,
//! and per-user idempotent upserts make sequential order sufficient.

use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use atelier_provider::{
    Customer, ExternalSubscription, ProviderError, ProviderGateway, SubscriptionStatus,
};

use crate::cache::TtlCache;
use crate::catalog::PlanCatalog;
use crate::identity::IdentityStore;
use crate::model::{Environment, RunMode, SubscriptionRecord, SyncAction, SyncOutcome};
use crate::report::{RunReporter, SyncRunReport};
use crate::resolver::{IdentityResolution, IdentityResolver};
use crate::store::SubscriptionStore;

/// Skip reason: record already mirrors this subscription.
pub const REASON_ALREADY_SYNCED: &str = "already synced";

/// Default provider page size.
const DEFAULT_PAGE_SIZE: u32 = 100;
/// Default bound for the email fallback search, in directory pages.
const DEFAULT_SEARCH_PAGE_BOUND: u32 = 10;
/// Default TTL for the per-run customer cache.
const DEFAULT_CUSTOMER_CACHE_TTL: Duration = Duration::from_secs(300);

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Environment discriminator for every store key.
    pub environment: Environment,
    /// Compute and report every decision without mutating state.
    pub dry_run: bool,
    /// Provider page size.
    pub page_size: u32,
    /// Bound for the email fallback search, in directory pages.
    /// A finiteness trade-off, not a correctness guarantee.
    pub search_page_bound: u32,
    /// Provider statuses in scope for reconciliation.
    pub statuses: Vec<SubscriptionStatus>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            environment: Environment::Live,
            dry_run: false,
            page_size: DEFAULT_PAGE_SIZE,
            search_page_bound: DEFAULT_SEARCH_PAGE_BOUND,
            statuses: vec![SubscriptionStatus::Active, SubscriptionStatus::Trialing],
        }
    }
}

impl EngineOptions {
    /// Mode implied by the dry-run flag.
    #[must_use]
    pub fn mode(&self) -> RunMode {
        if self.dry_run {
            RunMode::DryRun
        } else {
            RunMode::Live
        }
    }
}

/// A run that aborted mid-stream on a provider failure.
///
/// Outcomes produced before the abort are kept in `partial` so the
/// audit trail still covers them.
#[derive(Debug, Error)]
#[error("run aborted: {source}")]
pub struct RunAborted {
    #[source]
    pub source: ProviderError,
    pub partial: SyncRunReport,
}

/// Batch reconciliation engine over the three collaborator seams.
pub struct ReconciliationEngine<G, I, S> {
    gateway: G,
    identity: I,
    subscriptions: S,
    catalog: PlanCatalog,
    customer_cache: TtlCache<String, Customer>,
    options: EngineOptions,
}

impl<G, I, S> ReconciliationEngine<G, I, S>
where
    G: ProviderGateway,
    I: IdentityStore,
    S: SubscriptionStore,
{
    /// Create an engine with an explicitly injected customer cache.
    #[must_use]
    pub fn new(
        gateway: G,
        identity: I,
        subscriptions: S,
        catalog: PlanCatalog,
        customer_cache: TtlCache<String, Customer>,
        options: EngineOptions,
    ) -> Self {
        Self {
            gateway,
            identity,
            subscriptions,
            catalog,
            customer_cache,
            options,
        }
    }

    /// Create an engine with the default customer cache TTL.
    #[must_use]
    pub fn with_default_cache(
        gateway: G,
        identity: I,
        subscriptions: S,
        catalog: PlanCatalog,
        options: EngineOptions,
    ) -> Self {
        Self::new(
            gateway,
            identity,
            subscriptions,
            catalog,
            TtlCache::new(DEFAULT_CUSTOMER_CACHE_TTL),
            options,
        )
    }

    /// Engine options.
    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Customer cache, for stats inspection after a run.
    #[must_use]
    pub fn customer_cache(&self) -> &TtlCache<String, Customer> {
        &self.customer_cache
    }

    /// Run one reconciliation pass over the full provider sequence.
    ///
    /// Returns the completed report, or [`RunAborted`] carrying the
    /// partial report when a subscription page could not be fetched.
    #[instrument(skip(self), fields(mode = %self.options.mode(), environment = %self.options.environment))]
    pub async fn run(&self) -> Result<SyncRunReport, RunAborted> {
        let mode = self.options.mode();
        let mut reporter = RunReporter::new(mode);

        info!(
            page_size = self.options.page_size,
            statuses = ?self.options.statuses,
            "Starting reconciliation run"
        );

        let mut cursor: Option<String> = None;
        let mut page_number = 0usize;

        loop {
            let page = match self
                .gateway
                .list_subscriptions(
                    &self.options.statuses,
                    self.options.page_size,
                    cursor.as_deref(),
                )
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!(page = page_number, error = %e, "Subscription page fetch failed, aborting run");
                    return Err(RunAborted {
                        partial: reporter.finish_with_error(e.to_string()),
                        source: e,
                    });
                }
            };
            page_number += 1;

            for subscription in &page.items {
                let outcome = self.process_subscription(subscription).await;
                reporter.record(outcome);
            }

            cursor = page.next_cursor;
            if !page.has_more || cursor.is_none() {
                break;
            }
        }

        let report = reporter.finish();
        info!(
            pages = page_number,
            created = report.summary.created,
            updated = report.summary.updated,
            skipped = report.summary.skipped,
            errors = report.summary.error,
            total = report.summary.total,
            "Reconciliation run complete"
        );

        Ok(report)
    }

    /// Process one subscription to a terminal outcome. Never fails:
    /// every error is converted into an `action = error` outcome here,
    /// at the item boundary.
    async fn process_subscription(&self, subscription: &ExternalSubscription) -> SyncOutcome {
        let resolver = IdentityResolver::new(
            &self.gateway,
            &self.identity,
            &self.customer_cache,
            self.options.environment,
            self.options.search_page_bound,
            self.options.dry_run,
        );

        let resolution = match resolver.resolve(&subscription.customer_id).await {
            Ok(resolution) => resolution,
            Err(e) => return SyncOutcome::error(subscription, None, None, e.to_string()),
        };

        match resolution {
            IdentityResolution::Skipped { reason, email } => {
                SyncOutcome::skipped(subscription, None, email, reason)
            }
            IdentityResolution::Unresolved { reason, email } => {
                SyncOutcome::error(subscription, None, Some(email), reason)
            }
            IdentityResolution::WouldCreate { email } => {
                // Dry run, fresh account: no record can exist yet.
                SyncOutcome::applied(subscription, SyncAction::Created, None, Some(email))
            }
            IdentityResolution::Resolved { user_id, email } => {
                self.sync_record(subscription, user_id, email).await
            }
        }
    }

    /// Compare the existing record against the intended state and, in
    /// live mode, write the full intended state.
    async fn sync_record(
        &self,
        subscription: &ExternalSubscription,
        user_id: uuid::Uuid,
        email: Option<String>,
    ) -> SyncOutcome {
        let existing = match self
            .subscriptions
            .get(user_id, self.options.environment)
            .await
        {
            Ok(existing) => existing,
            Err(e) => {
                return SyncOutcome::error(subscription, Some(user_id), email, e.to_string())
            }
        };

        // Short-circuit that makes repeated runs cheap: an active
        // record already mirroring this subscription needs nothing.
        if let Some(existing) = &existing {
            if existing.is_active && existing.external_subscription_id == subscription.id {
                return SyncOutcome::skipped(
                    subscription,
                    Some(user_id),
                    email,
                    REASON_ALREADY_SYNCED,
                );
            }
        }

        let plan = self.catalog.resolve(&subscription.price_id);
        let record = SubscriptionRecord {
            user_id,
            environment: self.options.environment,
            plan_type: plan.plan_type,
            duration_months: plan.duration_months,
            is_active: matches!(
                subscription.status,
                SubscriptionStatus::Active | SubscriptionStatus::Trialing
            ),
            external_subscription_id: subscription.id.clone(),
            external_customer_id: subscription.customer_id.clone(),
            cancel_at_period_end: subscription.cancel_at_period_end,
            current_period_end: subscription.current_period_end(),
            updated_at: Utc::now(),
        };

        let action = if existing.is_some() {
            SyncAction::Updated
        } else {
            SyncAction::Created
        };

        if !self.options.dry_run {
            if let Err(e) = self.subscriptions.upsert(&record).await {
                return SyncOutcome::error(subscription, Some(user_id), email, e.to_string());
            }
        }

        SyncOutcome::applied(subscription, action, Some(user_id), email)
    }
}
