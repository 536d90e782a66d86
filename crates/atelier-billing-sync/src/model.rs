//! Core data model for billing reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_provider::ExternalSubscription;

/// Environment discriminator present on every store key.
///
/// Partitions otherwise-identical keys so live and test provider data
/// never collide in the identity and subscription stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Live,
    Test,
}

impl Environment {
    /// Store-key representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Test => "test",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(Self::Live),
            "test" => Ok(Self::Test),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

/// Execution mode of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    /// Mutating run.
    #[serde(rename = "live")]
    Live,
    /// Every decision is computed and reported, nothing is written.
    #[serde(rename = "dry-run")]
    DryRun,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => f.write_str("live"),
            Self::DryRun => f.write_str("dry-run"),
        }
    }
}

/// Internal plan derived from a provider price id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanInfo {
    /// Internal plan type (e.g. "standard", "premium").
    pub plan_type: String,
    /// Billing period length in months.
    pub duration_months: u32,
}

impl PlanInfo {
    /// Convenience constructor.
    #[must_use]
    pub fn new(plan_type: impl Into<String>, duration_months: u32) -> Self {
        Self {
            plan_type: plan_type.into(),
            duration_months,
        }
    }
}

/// One subscription record per `(user_id, environment)`.
///
/// Written only through full-row last-write-wins upserts, so a single
/// write fully determines plan, activity and period-end fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Internal user id.
    pub user_id: Uuid,
    /// Environment the record belongs to.
    pub environment: Environment,
    /// Internal plan type.
    pub plan_type: String,
    /// Billing period length in months.
    pub duration_months: u32,
    /// Whether the subscription is currently active.
    pub is_active: bool,
    /// Provider subscription id this record mirrors.
    pub external_subscription_id: String,
    /// Provider customer id this record mirrors.
    pub external_customer_id: String,
    /// Whether the subscription cancels at period end.
    pub cancel_at_period_end: bool,
    /// End of the current billing period.
    pub current_period_end: Option<DateTime<Utc>>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

/// Terminal action taken for one external subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Created,
    Updated,
    Skipped,
    Error,
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Skipped => "skipped",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Outcome of processing one external subscription.
///
/// Created fresh per run and serialized into the run report; never
/// persisted as a long-lived entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// Provider customer id.
    pub external_customer_id: String,
    /// Provider subscription id.
    pub external_subscription_id: String,
    /// Resolved internal user id, if identity resolution got that far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    /// Customer email, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Terminal action.
    pub action: SyncAction,
    /// Reason for a skip or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SyncOutcome {
    /// Outcome with a write (or, in dry-run, an implied write).
    #[must_use]
    pub fn applied(
        subscription: &ExternalSubscription,
        action: SyncAction,
        user_id: Option<Uuid>,
        email: Option<String>,
    ) -> Self {
        Self {
            external_customer_id: subscription.customer_id.clone(),
            external_subscription_id: subscription.id.clone(),
            user_id,
            email,
            action,
            reason: None,
        }
    }

    /// Skipped outcome with its reason.
    #[must_use]
    pub fn skipped(
        subscription: &ExternalSubscription,
        user_id: Option<Uuid>,
        email: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            external_customer_id: subscription.customer_id.clone(),
            external_subscription_id: subscription.id.clone(),
            user_id,
            email,
            action: SyncAction::Skipped,
            reason: Some(reason.into()),
        }
    }

    /// Error outcome, captured at the item boundary.
    #[must_use]
    pub fn error(
        subscription: &ExternalSubscription,
        user_id: Option<Uuid>,
        email: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            external_customer_id: subscription.customer_id.clone(),
            external_subscription_id: subscription.id.clone(),
            user_id,
            email,
            action: SyncAction::Error,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_provider::SubscriptionStatus;

    fn sample_subscription() -> ExternalSubscription {
        ExternalSubscription {
            id: "sub_1".to_string(),
            customer_id: "cus_1".to_string(),
            status: SubscriptionStatus::Active,
            price_id: "price_standard_monthly".to_string(),
            current_period_end_epoch: None,
            cancel_at_period_end: false,
        }
    }

    #[test]
    fn test_environment_round_trip() {
        for env in [Environment::Live, Environment::Test] {
            let parsed: Environment = env.as_str().parse().unwrap();
            assert_eq!(parsed, env);
        }
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_run_mode_display() {
        assert_eq!(RunMode::Live.to_string(), "live");
        assert_eq!(RunMode::DryRun.to_string(), "dry-run");
    }

    #[test]
    fn test_outcome_serialization_omits_empty_fields() {
        let outcome = SyncOutcome::skipped(&sample_subscription(), None, None, "customer deleted");
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["action"], "skipped");
        assert_eq!(json["reason"], "customer deleted");
        assert!(json.get("user_id").is_none());
        assert!(json.get("email").is_none());
    }

    #[test]
    fn test_applied_outcome_has_no_reason() {
        let user_id = Uuid::new_v4();
        let outcome = SyncOutcome::applied(
            &sample_subscription(),
            SyncAction::Created,
            Some(user_id),
            Some("a@x.com".to_string()),
        );
        assert_eq!(outcome.action, SyncAction::Created);
        assert_eq!(outcome.user_id, Some(user_id));
        assert!(outcome.reason.is_none());
    }
}
