//! Monthly free-hours quota allocation.
//!
//! The quota is measured in hours and drained tier by tier in the order
//! given by a [`FreeHoursPolicy`]. Within a tier, tickets are credited in
//! ascending (date, id) order so the outcome never depends on input order.

use crate::data_structures::{Money, PricedLineItem, PricingTier};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which tier's hours are credited first when several tiers have billable hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreeHoursPolicy {
    /// Cheapest tier first: credits the most hours for a fixed quota.
    #[default]
    LowestRateFirst,
    /// Most expensive tier first: maximizes the dollar value of the quota.
    HighestRateFirst,
}

impl FreeHoursPolicy {
    /// Orders tiers for draining. Ties on rate fall back to tier order.
    pub fn drain_order(&self, rates: &BTreeMap<PricingTier, Money>) -> Vec<PricingTier> {
        let mut tiers: Vec<(PricingTier, Money)> = rates.iter().map(|(t, r)| (*t, *r)).collect();
        match self {
            FreeHoursPolicy::LowestRateFirst => {
                tiers.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
            }
            FreeHoursPolicy::HighestRateFirst => {
                tiers.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)))
            }
        }
        tiers.into_iter().map(|(tier, _)| tier).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TierCredit {
    pub billable_hours: Decimal,
    pub free_hours_applied: Decimal,
    pub gross_amount: Money,
    pub net_amount: Money,
    pub savings: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FreeHoursAllocation {
    /// Line items in (date, id) order with free hours applied.
    pub items: Vec<PricedLineItem>,
    pub per_tier: BTreeMap<PricingTier, TierCredit>,
    pub total_free_hours_applied: Decimal,
    pub total_free_hours_savings: Money,
}

#[derive(Debug, Clone)]
pub struct FreeHoursAllocator {
    monthly_quota: Decimal,
    policy: FreeHoursPolicy,
}

impl FreeHoursAllocator {
    pub fn new(monthly_quota: Decimal, policy: FreeHoursPolicy) -> Self {
        Self {
            monthly_quota,
            policy,
        }
    }

    pub fn monthly_quota(&self) -> Decimal {
        self.monthly_quota
    }

    pub fn policy(&self) -> FreeHoursPolicy {
        self.policy
    }

    /// Applies one month's quota to that month's priced items.
    pub fn allocate(&self, items: &[PricedLineItem]) -> FreeHoursAllocation {
        let mut items: Vec<PricedLineItem> = items.to_vec();
        items.sort_by(|a, b| {
            a.request
                .date()
                .cmp(&b.request.date())
                .then_with(|| a.request.id().cmp(b.request.id()))
        });

        let mut rates: BTreeMap<PricingTier, Money> = BTreeMap::new();
        for item in &items {
            rates.entry(item.tier).or_insert(item.rate);
        }

        let mut remaining = self.monthly_quota;
        for tier in self.policy.drain_order(&rates) {
            for item in items.iter_mut().filter(|item| item.tier == tier) {
                if remaining <= Decimal::ZERO {
                    break;
                }
                let applied = remaining.min(item.billable_hours());
                if applied <= Decimal::ZERO {
                    continue;
                }
                item.free_hours_applied += applied;
                item.net_amount = (item.gross_amount - item.free_hours_applied * item.rate)
                    .max(Decimal::ZERO);
                remaining -= applied;
            }
        }

        let mut per_tier: BTreeMap<PricingTier, TierCredit> = BTreeMap::new();
        for item in &items {
            let credit = per_tier.entry(item.tier).or_default();
            credit.billable_hours += item.rounded_hours;
            credit.free_hours_applied += item.free_hours_applied;
            credit.gross_amount += item.gross_amount;
            credit.net_amount += item.net_amount;
            credit.savings += item.gross_amount - item.net_amount;
        }

        let total_free_hours_applied = per_tier.values().map(|c| c.free_hours_applied).sum();
        let total_free_hours_savings = per_tier.values().map(|c| c.savings).sum();

        FreeHoursAllocation {
            items,
            per_tier,
            total_free_hours_applied,
            total_free_hours_savings,
        }
    }
}
