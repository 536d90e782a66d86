//! Plan catalog: provider price id to internal plan lookup.

use std::collections::HashMap;

use tracing::warn;

use crate::model::PlanInfo;

/// Plan assigned to price ids the catalog does not know.
///
/// Documented policy, not an error: an unmapped price id is a product
/// catalog gap, and failing the item would block reconciliation of an
/// otherwise healthy subscription. The fallback is logged loudly so
/// catalog drift stays visible.
const DEFAULT_PLAN_TYPE: &str = "standard";
const DEFAULT_DURATION_MONTHS: u32 = 1;

/// Pure lookup table mapping provider price ids to internal plans.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    entries: HashMap<String, PlanInfo>,
    default_plan: PlanInfo,
}

impl PlanCatalog {
    /// Create a catalog from explicit entries.
    #[must_use]
    pub fn new(entries: HashMap<String, PlanInfo>) -> Self {
        Self {
            entries,
            default_plan: PlanInfo::new(DEFAULT_PLAN_TYPE, DEFAULT_DURATION_MONTHS),
        }
    }

    /// Catalog with the production price mapping.
    #[must_use]
    pub fn builtin() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            "price_standard_monthly".to_string(),
            PlanInfo::new("standard", 1),
        );
        entries.insert(
            "price_standard_annual".to_string(),
            PlanInfo::new("standard", 12),
        );
        entries.insert(
            "price_premium_monthly".to_string(),
            PlanInfo::new("premium", 1),
        );
        entries.insert(
            "price_premium_annual".to_string(),
            PlanInfo::new("premium", 12),
        );
        Self::new(entries)
    }

    /// Resolve a price id to a plan. Total: unknown ids resolve to the
    /// documented default instead of failing.
    #[must_use]
    pub fn resolve(&self, price_id: &str) -> PlanInfo {
        match self.entries.get(price_id) {
            Some(plan) => plan.clone(),
            None => {
                warn!(
                    price_id = %price_id,
                    plan_type = %self.default_plan.plan_type,
                    duration_months = self.default_plan.duration_months,
                    "Unmapped price id, resolving to default plan"
                );
                self.default_plan.clone()
            }
        }
    }

    /// Number of mapped price ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no explicit entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_mapped_price() {
        let catalog = PlanCatalog::builtin();
        let plan = catalog.resolve("price_premium_annual");
        assert_eq!(plan, PlanInfo::new("premium", 12));
    }

    #[test]
    fn test_unknown_price_resolves_to_default() {
        let catalog = PlanCatalog::builtin();
        let plan = catalog.resolve("price_from_a_future_catalog");
        assert_eq!(plan, PlanInfo::new("standard", 1));
    }

    #[test]
    fn test_total_over_arbitrary_strings() {
        let catalog = PlanCatalog::new(HashMap::new());
        for price_id in ["", " ", "price_x", "\u{1f4b8}", "null"] {
            let plan = catalog.resolve(price_id);
            assert_eq!(plan.plan_type, "standard");
            assert_eq!(plan.duration_months, 1);
        }
    }
}
