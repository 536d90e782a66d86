//! Billing-state reconciliation engine.
//!
//! Reconciles subscription state held by the external payment provider
//! against the internal identity-and-subscription store, repairing
//! drift left behind by the account migration. The engine treats both
//! sides as independently-evolving systems of record: the provider is
//! billing truth, the store is product truth, and every repair is an
//! idempotent upsert so a run can be re-invoked at any point.
//!
//! Per-item failures are isolated into [`model::SyncOutcome`] records;
//! only an unreachable provider aborts a run.

pub mod cache;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod identity;
pub mod model;
pub mod report;
pub mod resolver;
pub mod store;

pub use cache::{CacheStats, TtlCache};
pub use catalog::PlanCatalog;
pub use engine::{EngineOptions, ReconciliationEngine, RunAborted};
pub use error::{StoreError, StoreResult, SyncError};
pub use identity::{IdentityStore, PgIdentityStore};
pub use model::{Environment, PlanInfo, RunMode, SubscriptionRecord, SyncAction, SyncOutcome};
pub use report::{RunReporter, RunSummary, SyncRunReport};
pub use store::{PgSubscriptionStore, SubscriptionStore};
