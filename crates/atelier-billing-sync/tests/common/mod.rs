//! In-memory fakes for the engine's collaborator seams.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use atelier_billing_sync::error::{StoreError, StoreResult};
use atelier_billing_sync::identity::IdentityStore;
use atelier_billing_sync::model::{Environment, SubscriptionRecord};
use atelier_billing_sync::store::SubscriptionStore;
use atelier_provider::{
    Customer, ExternalSubscription, ProviderError, ProviderGateway, ProviderResult,
    SubscriptionPage, SubscriptionStatus,
};

/// Directory page size used by the fake identity store. Small so the
/// bounded-search scenarios stay readable.
pub const FAKE_DIRECTORY_PAGE_SIZE: usize = 2;

pub fn subscription(id: &str, customer_id: &str, price_id: &str) -> ExternalSubscription {
    ExternalSubscription {
        id: id.to_string(),
        customer_id: customer_id.to_string(),
        status: SubscriptionStatus::Active,
        price_id: price_id.to_string(),
        current_period_end_epoch: Some(1_700_000_000),
        cancel_at_period_end: false,
    }
}

/// Cursor-paginated fake provider.
///
/// Pages are fixed up front; the cursor is the id of the last item of
/// the previous page, so re-listing from `None` restarts the sequence
/// exactly like the real gateway.
#[derive(Clone, Default)]
pub struct FakeGateway {
    pages: Arc<Vec<Vec<ExternalSubscription>>>,
    customers: Arc<Mutex<HashMap<String, Customer>>>,
    fail_on_page: Option<usize>,
    pub customer_calls: Arc<Mutex<usize>>,
}

impl FakeGateway {
    pub fn new(pages: Vec<Vec<ExternalSubscription>>) -> Self {
        Self {
            pages: Arc::new(pages),
            ..Self::default()
        }
    }

    pub fn failing_on_page(mut self, page: usize) -> Self {
        self.fail_on_page = Some(page);
        self
    }

    pub fn with_customer(self, id: &str, email: Option<&str>, deleted: bool) -> Self {
        self.customers.lock().unwrap().insert(
            id.to_string(),
            Customer {
                id: id.to_string(),
                email: email.map(str::to_string),
                deleted,
            },
        );
        self
    }
}

#[async_trait]
impl ProviderGateway for FakeGateway {
    async fn list_subscriptions(
        &self,
        _statuses: &[SubscriptionStatus],
        _page_size: u32,
        cursor: Option<&str>,
    ) -> ProviderResult<SubscriptionPage> {
        let index = match cursor {
            None => 0,
            Some(cursor) => self
                .pages
                .iter()
                .position(|page| page.last().map(|s| s.id.as_str()) == Some(cursor))
                .map_or(self.pages.len(), |i| i + 1),
        };

        if self.fail_on_page == Some(index) {
            return Err(ProviderError::unavailable("injected page failure"));
        }

        let items = self.pages.get(index).cloned().unwrap_or_default();
        let has_more = index + 1 < self.pages.len();
        let next_cursor = if has_more {
            items.last().map(|s| s.id.clone())
        } else {
            None
        };

        Ok(SubscriptionPage {
            items,
            next_cursor,
            has_more,
        })
    }

    async fn get_customer(&self, customer_id: &str) -> ProviderResult<Customer> {
        *self.customer_calls.lock().unwrap() += 1;
        self.customers
            .lock()
            .unwrap()
            .get(customer_id)
            .cloned()
            .ok_or_else(|| ProviderError::CustomerNotFound {
                customer_id: customer_id.to_string(),
            })
    }
}

/// In-memory identity store with an ordered user directory.
#[derive(Clone, Default)]
pub struct FakeIdentityStore {
    pub links: Arc<Mutex<HashMap<(String, Environment), Uuid>>>,
    pub directory: Arc<Mutex<Vec<(Uuid, String)>>>,
    pub create_user_calls: Arc<Mutex<usize>>,
    pub search_calls: Arc<Mutex<usize>>,
    pub upsert_link_calls: Arc<Mutex<usize>>,
}

impl FakeIdentityStore {
    /// Add a user account to the directory, returning its id.
    pub fn seed_user(&self, email: &str) -> Uuid {
        let user_id = Uuid::new_v4();
        self.directory
            .lock()
            .unwrap()
            .push((user_id, email.to_string()));
        user_id
    }

    /// Pad the directory with accounts that match nothing.
    pub fn seed_filler(&self, count: usize) {
        let mut directory = self.directory.lock().unwrap();
        for i in 0..count {
            directory.push((Uuid::new_v4(), format!("filler{i}@example.com")));
        }
    }

    /// Pre-link a customer to a user.
    pub fn seed_link(&self, customer_id: &str, environment: Environment, user_id: Uuid) {
        self.links
            .lock()
            .unwrap()
            .insert((customer_id.to_string(), environment), user_id);
    }
}

#[async_trait]
impl IdentityStore for FakeIdentityStore {
    async fn find_link(
        &self,
        customer_id: &str,
        environment: Environment,
    ) -> StoreResult<Option<Uuid>> {
        Ok(self
            .links
            .lock()
            .unwrap()
            .get(&(customer_id.to_string(), environment))
            .copied())
    }

    async fn create_user(&self, email: &str) -> StoreResult<Uuid> {
        *self.create_user_calls.lock().unwrap() += 1;

        let mut directory = self.directory.lock().unwrap();
        if directory
            .iter()
            .any(|(_, existing)| existing.eq_ignore_ascii_case(email))
        {
            return Err(StoreError::AlreadyExists {
                email: email.to_string(),
            });
        }

        let user_id = Uuid::new_v4();
        directory.push((user_id, email.to_string()));
        Ok(user_id)
    }

    async fn search_by_email(&self, email: &str, page_bound: u32) -> StoreResult<Option<Uuid>> {
        *self.search_calls.lock().unwrap() += 1;

        let limit = page_bound as usize * FAKE_DIRECTORY_PAGE_SIZE;
        Ok(self
            .directory
            .lock()
            .unwrap()
            .iter()
            .take(limit)
            .find(|(_, candidate)| candidate.eq_ignore_ascii_case(email))
            .map(|(user_id, _)| *user_id))
    }

    async fn upsert_link(
        &self,
        customer_id: &str,
        user_id: Uuid,
        environment: Environment,
    ) -> StoreResult<()> {
        *self.upsert_link_calls.lock().unwrap() += 1;
        self.links
            .lock()
            .unwrap()
            .insert((customer_id.to_string(), environment), user_id);
        Ok(())
    }
}

/// In-memory subscription store with injectable write failures.
#[derive(Clone, Default)]
pub struct FakeSubscriptionStore {
    pub records: Arc<Mutex<HashMap<(Uuid, Environment), SubscriptionRecord>>>,
    pub fail_upserts_for: Arc<Mutex<HashSet<String>>>,
    pub upsert_calls: Arc<Mutex<usize>>,
}

impl FakeSubscriptionStore {
    /// Make upserts fail for one external subscription id.
    pub fn fail_upsert_for(&self, external_subscription_id: &str) {
        self.fail_upserts_for
            .lock()
            .unwrap()
            .insert(external_subscription_id.to_string());
    }

    pub fn record_for(&self, user_id: Uuid, environment: Environment) -> Option<SubscriptionRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(user_id, environment))
            .cloned()
    }
}

#[async_trait]
impl SubscriptionStore for FakeSubscriptionStore {
    async fn get(
        &self,
        user_id: Uuid,
        environment: Environment,
    ) -> StoreResult<Option<SubscriptionRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(user_id, environment))
            .cloned())
    }

    async fn upsert(&self, record: &SubscriptionRecord) -> StoreResult<()> {
        *self.upsert_calls.lock().unwrap() += 1;

        if self
            .fail_upserts_for
            .lock()
            .unwrap()
            .contains(&record.external_subscription_id)
        {
            return Err(StoreError::Database("injected write failure".to_string()));
        }

        self.records
            .lock()
            .unwrap()
            .insert((record.user_id, record.environment), record.clone());
        Ok(())
    }
}
