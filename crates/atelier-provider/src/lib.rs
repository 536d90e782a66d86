//! Payment-provider gateway for Atelier billing sync.
//!
//! Exposes a trait seam (`ProviderGateway`) over the external payment
//! provider plus an HTTP implementation for its REST API. The gateway
//! is read-only: the reconciliation engine treats the provider as an
//! eventually-fresh snapshot of billing truth and never writes back.

pub mod error;
pub mod gateway;
pub mod http;
pub mod types;

pub use error::{ProviderError, ProviderResult};
pub use gateway::ProviderGateway;
pub use http::HttpProviderGateway;
pub use types::{Customer, ExternalSubscription, SubscriptionPage, SubscriptionStatus};
