//! HTTP provider gateway (reqwest-based).
//!
//! Targets a Stripe-style REST API: bearer-authenticated GETs,
//! `starting_after` cursors and `has_more` list envelopes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::gateway::ProviderGateway;
use crate::types::{Customer, ExternalSubscription, SubscriptionPage, SubscriptionStatus};

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP implementation of [`ProviderGateway`].
#[derive(Debug, Clone)]
pub struct HttpProviderGateway {
    /// Base URL of the provider API (e.g. `https://api.stripe.com`).
    base_url: String,
    /// Secret API key, sent as a bearer token.
    api_key: String,
    /// Underlying HTTP client.
    http_client: Client,
}

impl HttpProviderGateway {
    /// Create a new gateway.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> ProviderResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::InvalidConfiguration {
                message: "provider API key is empty".to_string(),
            });
        }

        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent("atelier-billing-sync/0.3")
            .build()
            .map_err(|e| ProviderError::InvalidConfiguration {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            http_client,
        })
    }

    /// Create a gateway with a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        http_client: Client,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http_client,
        }
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> ProviderResult<T> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| ProviderError::unavailable_with(format!("request to {url} failed"), e))?;

        let status = response.status();
        match status {
            s if s.is_success() => response.json::<T>().await.map_err(|e| {
                ProviderError::InvalidResponse {
                    message: format!("failed to decode response from {url}: {e}"),
                }
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ProviderError::AuthenticationFailed)
            }
            StatusCode::NOT_FOUND => Err(ProviderError::CustomerNotFound {
                customer_id: url.rsplit('/').next().unwrap_or_default().to_string(),
            }),
            s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
                Err(ProviderError::unavailable(format!(
                    "provider returned {s} for {url}"
                )))
            }
            s => Err(ProviderError::InvalidResponse {
                message: format!("unexpected status {s} for {url}"),
            }),
        }
    }
}

#[async_trait]
impl ProviderGateway for HttpProviderGateway {
    async fn list_subscriptions(
        &self,
        statuses: &[SubscriptionStatus],
        page_size: u32,
        cursor: Option<&str>,
    ) -> ProviderResult<SubscriptionPage> {
        let url = format!("{}/v1/subscriptions", self.base_url);

        let mut query: Vec<(String, String)> = vec![("limit".to_string(), page_size.to_string())];
        for status in statuses {
            query.push(("status[]".to_string(), status.as_str().to_string()));
        }
        if let Some(cursor) = cursor {
            query.push(("starting_after".to_string(), cursor.to_string()));
        }

        let envelope: ListEnvelope<ApiSubscription> = self.get_json(&url, &query).await?;

        let mut items = Vec::with_capacity(envelope.data.len());
        for api_sub in envelope.data {
            items.push(api_sub.into_subscription()?);
        }

        let next_cursor = if envelope.has_more {
            items.last().map(|s| s.id.clone())
        } else {
            None
        };

        debug!(
            count = items.len(),
            has_more = envelope.has_more,
            "Fetched subscription page"
        );

        Ok(SubscriptionPage {
            items,
            next_cursor,
            has_more: envelope.has_more,
        })
    }

    async fn get_customer(&self, customer_id: &str) -> ProviderResult<Customer> {
        let url = format!("{}/v1/customers/{customer_id}", self.base_url);
        let api_customer: Customer = self.get_json(&url, &[]).await?;

        if api_customer.deleted {
            warn!(customer_id = %customer_id, "Customer is deleted on provider side");
        }

        Ok(Customer {
            id: api_customer.id,
            email: api_customer.email,
            deleted: api_customer.deleted,
        })
    }
}

/// Provider list envelope (`{"object": "list", "data": [...], "has_more": ...}`).
#[derive(Debug, Deserialize)]
struct ListEnvelope<T> {
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
}

/// Subscription as returned by the provider API.
#[derive(Debug, Deserialize)]
struct ApiSubscription {
    id: String,
    customer: String,
    status: SubscriptionStatus,
    #[serde(default)]
    cancel_at_period_end: bool,
    current_period_end: Option<i64>,
    items: ListEnvelope<ApiSubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct ApiSubscriptionItem {
    price: ApiPrice,
}

#[derive(Debug, Deserialize)]
struct ApiPrice {
    id: String,
}

impl ApiSubscription {
    fn into_subscription(self) -> ProviderResult<ExternalSubscription> {
        let price_id = self
            .items
            .data
            .into_iter()
            .next()
            .map(|item| item.price.id)
            .ok_or_else(|| ProviderError::InvalidResponse {
                message: format!("subscription {} has no items", self.id),
            })?;

        Ok(ExternalSubscription {
            id: self.id,
            customer_id: self.customer,
            status: self.status,
            price_id,
            current_period_end_epoch: self.current_period_end,
            cancel_at_period_end: self.cancel_at_period_end,
        })
    }
}
