//! Wire-facing data model for the payment provider.
//!
//! These are immutable per-run snapshots; the reconciliation engine
//! never mutates provider state.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Subscription status as reported by the provider.
///
/// Only `active` and `trialing` are in scope for reconciliation;
/// everything else is carried as `Other` so an unexpected status is
/// visible instead of silently dropped during decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    #[serde(untagged)]
    Other(String),
}

impl SubscriptionStatus {
    /// Query-parameter value for list filters.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One subscription as held by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalSubscription {
    /// Provider subscription id.
    pub id: String,
    /// Provider customer id owning the subscription.
    pub customer_id: String,
    /// Current status.
    pub status: SubscriptionStatus,
    /// Provider price identifier (maps to an internal plan).
    pub price_id: String,
    /// End of the current billing period, seconds since epoch.
    pub current_period_end_epoch: Option<i64>,
    /// Whether the subscription is set to cancel at period end.
    pub cancel_at_period_end: bool,
}

impl ExternalSubscription {
    /// Period end as a UTC timestamp, when the provider supplied one
    /// and it is representable.
    #[must_use]
    pub fn current_period_end(&self) -> Option<DateTime<Utc>> {
        self.current_period_end_epoch
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }
}

/// One page of subscriptions from the provider list API.
#[derive(Debug, Clone)]
pub struct SubscriptionPage {
    /// Subscriptions on this page, in provider order.
    pub items: Vec<ExternalSubscription>,
    /// Cursor for the next page (last item id), if any.
    pub next_cursor: Option<String>,
    /// Whether more pages exist after this one.
    pub has_more: bool,
}

impl SubscriptionPage {
    /// An empty terminal page.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            has_more: false,
        }
    }
}

/// A provider customer, reduced to what identity resolution needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Provider customer id.
    pub id: String,
    /// Billing email, if the customer has one.
    pub email: Option<String>,
    /// Whether the customer was deleted on the provider side.
    #[serde(default)]
    pub deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_decodes_known_and_unknown() {
        let active: SubscriptionStatus = serde_json::from_str("\"active\"").unwrap();
        assert_eq!(active, SubscriptionStatus::Active);

        let other: SubscriptionStatus = serde_json::from_str("\"past_due\"").unwrap();
        assert_eq!(other, SubscriptionStatus::Other("past_due".to_string()));
        assert_eq!(other.as_str(), "past_due");
    }

    #[test]
    fn test_period_end_conversion() {
        let sub = ExternalSubscription {
            id: "sub_1".into(),
            customer_id: "cus_1".into(),
            status: SubscriptionStatus::Active,
            price_id: "price_1".into(),
            current_period_end_epoch: Some(1_700_000_000),
            cancel_at_period_end: false,
        };
        let ts = sub.current_period_end().unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);

        let without = ExternalSubscription {
            current_period_end_epoch: None,
            ..sub
        };
        assert!(without.current_period_end().is_none());
    }

    #[test]
    fn test_customer_deleted_defaults_false() {
        let customer: Customer =
            serde_json::from_str(r#"{"id":"cus_1","email":"a@x.com"}"#).unwrap();
        assert!(!customer.deleted);
        assert_eq!(customer.email.as_deref(), Some("a@x.com"));
    }
}
