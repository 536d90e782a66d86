//! Identity resolution: find-or-create with a bounded fallback search.
//!
//! Account creation and identity linking are not transactional across
//! the two systems, so "account exists, link missing" is a legitimate
//! state (partial prior runs, manual account creation). The resolver
//! tolerates it without creating a duplicate account or silently
//! dropping the subscription, walking an explicit state chain so each
//! transition is independently testable.

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use atelier_provider::{Customer, ProviderError, ProviderGateway};

use crate::cache::TtlCache;
use crate::error::StoreError;
use crate::identity::IdentityStore;
use crate::model::Environment;

/// Skip reason: the provider customer was deleted.
pub const REASON_CUSTOMER_DELETED: &str = "customer deleted";
/// Skip reason: the provider customer has no email to key an account on.
pub const REASON_NO_EMAIL: &str = "customer has no email";
/// Error reason: an account exists but the bounded search missed it.
pub const REASON_IDENTITY_AMBIGUOUS: &str = "identity ambiguous or undiscoverable";

/// Terminal state of one identity resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityResolution {
    /// A user id was found or created; the link exists (live mode).
    Resolved {
        user_id: Uuid,
        email: Option<String>,
    },
    /// Dry-run only: live mode would create a fresh account here.
    WouldCreate { email: String },
    /// The subscription structurally cannot be linked. Not a failure.
    Skipped {
        reason: &'static str,
        email: Option<String>,
    },
    /// Account exists but was not discoverable within the search
    /// bound. Recoverable-but-unresolved; the run continues.
    Unresolved { reason: &'static str, email: String },
}

/// Failure during resolution, captured at the item boundary by the engine.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("identity store error: {0}")]
    Store(#[from] StoreError),
}

/// Per-run identity resolver.
pub struct IdentityResolver<'a, G, I> {
    gateway: &'a G,
    identity: &'a I,
    customer_cache: &'a TtlCache<String, Customer>,
    environment: Environment,
    search_page_bound: u32,
    dry_run: bool,
}

impl<'a, G, I> IdentityResolver<'a, G, I>
where
    G: ProviderGateway,
    I: IdentityStore,
{
    /// Create a resolver bound to one run's collaborators and options.
    #[must_use]
    pub fn new(
        gateway: &'a G,
        identity: &'a I,
        customer_cache: &'a TtlCache<String, Customer>,
        environment: Environment,
        search_page_bound: u32,
        dry_run: bool,
    ) -> Self {
        Self {
            gateway,
            identity,
            customer_cache,
            environment,
            search_page_bound,
            dry_run,
        }
    }

    /// Resolve a provider customer to an internal user.
    pub async fn resolve(
        &self,
        customer_id: &str,
    ) -> Result<IdentityResolution, ResolutionError> {
        // 1. Existing link wins.
        if let Some(user_id) = self
            .identity
            .find_link(customer_id, self.environment)
            .await?
        {
            debug!(customer_id = %customer_id, user_id = %user_id, "Identity link found");
            return Ok(IdentityResolution::Resolved {
                user_id,
                email: None,
            });
        }

        // 2. No link: the customer decides whether linking is possible.
        let customer = self.fetch_customer(customer_id).await?;

        if customer.deleted {
            return Ok(IdentityResolution::Skipped {
                reason: REASON_CUSTOMER_DELETED,
                email: customer.email,
            });
        }

        let email = match customer.email.filter(|e| !e.trim().is_empty()) {
            Some(email) => email,
            None => {
                return Ok(IdentityResolution::Skipped {
                    reason: REASON_NO_EMAIL,
                    email: None,
                })
            }
        };

        if self.dry_run {
            return self.resolve_dry_run(customer_id, email).await;
        }

        // 3. Create the account, falling back to the bounded directory
        //    search when it already exists.
        let user_id = match self.identity.create_user(&email).await {
            Ok(user_id) => {
                debug!(customer_id = %customer_id, user_id = %user_id, "Created user account");
                user_id
            }
            Err(StoreError::AlreadyExists { .. }) => {
                match self
                    .identity
                    .search_by_email(&email, self.search_page_bound)
                    .await?
                {
                    Some(user_id) => {
                        debug!(
                            customer_id = %customer_id,
                            user_id = %user_id,
                            "Recovered existing account via directory search"
                        );
                        user_id
                    }
                    None => {
                        return Ok(IdentityResolution::Unresolved {
                            reason: REASON_IDENTITY_AMBIGUOUS,
                            email,
                        })
                    }
                }
            }
            Err(e) => return Err(e.into()),
        };

        // 4. Record the link for future runs.
        self.identity
            .upsert_link(customer_id, user_id, self.environment)
            .await?;

        Ok(IdentityResolution::Resolved {
            user_id,
            email: Some(email),
        })
    }

    /// Dry-run resolution: mirror the live decision without creating
    /// an account or writing a link. The read-only directory probe
    /// distinguishes "would reuse an account" from "would create one".
    async fn resolve_dry_run(
        &self,
        customer_id: &str,
        email: String,
    ) -> Result<IdentityResolution, ResolutionError> {
        match self
            .identity
            .search_by_email(&email, self.search_page_bound)
            .await?
        {
            Some(user_id) => {
                debug!(
                    customer_id = %customer_id,
                    user_id = %user_id,
                    "Dry run: would link existing account"
                );
                Ok(IdentityResolution::Resolved {
                    user_id,
                    email: Some(email),
                })
            }
            None => {
                debug!(customer_id = %customer_id, "Dry run: would create account");
                Ok(IdentityResolution::WouldCreate { email })
            }
        }
    }

    async fn fetch_customer(&self, customer_id: &str) -> Result<Customer, ResolutionError> {
        if let Some(customer) = self.customer_cache.get(&customer_id.to_string()) {
            return Ok(customer);
        }

        let customer = self.gateway.get_customer(customer_id).await?;
        self.customer_cache
            .insert(customer_id.to_string(), customer.clone());
        Ok(customer)
    }
}
