//! Provider gateway trait seam.

use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::types::{Customer, SubscriptionPage, SubscriptionStatus};

/// Read access to the external payment provider.
///
/// Listing is cursor-paginated and stateful on the provider side: a
/// sequence is consumed by passing each page's `next_cursor` back in,
/// and is not restartable mid-stream (a fresh call starts over from
/// the first page). Callers must fetch pages sequentially.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Fetch one page of subscriptions matching any of `statuses`.
    ///
    /// # Arguments
    /// * `statuses` - Status filter; empty means all statuses.
    /// * `page_size` - Maximum items per page.
    /// * `cursor` - Cursor from the previous page, `None` for the first.
    async fn list_subscriptions(
        &self,
        statuses: &[SubscriptionStatus],
        page_size: u32,
        cursor: Option<&str>,
    ) -> ProviderResult<SubscriptionPage>;

    /// Fetch a customer by provider id.
    ///
    /// Returns `ProviderError::CustomerNotFound` when the id does not
    /// exist. Deleted customers are returned with `deleted = true`,
    /// not as an error.
    async fn get_customer(&self, customer_id: &str) -> ProviderResult<Customer>;
}
