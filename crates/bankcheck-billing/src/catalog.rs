//! Static plan catalog.
//!
//! Three tiers exist: Free, Growth, Pro. Price-id resolution is exact
//! match only; an unmatched price id falls back to the Free entry.

use serde::{Deserialize, Serialize};

/// Sentinel for an unlimited check quota.
pub const UNLIMITED_CHECKS: i64 = -1;

/// How a plan is purchased on the payment platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingMode {
    Subscription,
    Payment,
}

impl BillingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subscription => "subscription",
            Self::Payment => "payment",
        }
    }
}

/// A catalog entry: immutable plan definition plus display metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub id: &'static str,
    /// Billing price id on the payment platform. The Free tier is not
    /// purchasable and carries none.
    pub billing_price_id: Option<&'static str>,
    pub name: &'static str,
    pub description: &'static str,
    pub mode: BillingMode,
    pub price: &'static str,
    pub period: &'static str,
    pub quota: &'static str,
    pub checks_limit: i64,
}

/// The three catalog entries, Free first.
pub const PLAN_CATALOG: &[PlanEntry] = &[
    PlanEntry {
        id: "free",
        billing_price_id: None,
        name: "Free",
        description: "Try MyBankCheck with a small monthly allowance",
        mode: BillingMode::Subscription,
        price: "$0",
        period: "forever",
        quota: "10 checks/month",
        checks_limit: 10,
    },
    PlanEntry {
        id: "growth",
        billing_price_id: Some("price_growth_monthly"),
        name: "Growth",
        description: "For teams screening accounts every day",
        mode: BillingMode::Subscription,
        price: "$49",
        period: "month",
        quota: "500 checks/month",
        checks_limit: 500,
    },
    PlanEntry {
        id: "pro",
        billing_price_id: Some("price_pro_monthly"),
        name: "Pro",
        description: "Unlimited checks plus priority support",
        mode: BillingMode::Subscription,
        price: "$149",
        period: "month",
        quota: "Unlimited checks",
        checks_limit: UNLIMITED_CHECKS,
    },
];

/// The fallback entry used for unmatched price ids.
pub fn free_plan() -> &'static PlanEntry {
    &PLAN_CATALOG[0]
}

/// Find a plan by its catalog id.
pub fn entry_for_plan(plan_id: &str) -> Option<&'static PlanEntry> {
    PLAN_CATALOG.iter().find(|p| p.id == plan_id)
}

/// Find a plan by its billing price id (exact match).
pub fn entry_for_price(price_id: &str) -> Option<&'static PlanEntry> {
    PLAN_CATALOG
        .iter()
        .find(|p| p.billing_price_id == Some(price_id))
}

/// Resolve a price id to a plan, defaulting unmatched ids to Free.
pub fn plan_or_free(price_id: &str) -> &'static PlanEntry {
    entry_for_price(price_id).unwrap_or_else(free_plan)
}
