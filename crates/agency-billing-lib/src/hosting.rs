//! Website hosting: day-granular proration and the count-based free credit.

use crate::data_structures::{
    HostingBillingType, Money, MonthlyHostingCharge, WebsiteHostingInterval, YearMonth,
};
use crate::error::{BillingError, BillingResult};
use chrono::Datelike;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub struct HostingProrationEngine {
    standard_mrr: Money,
}

impl HostingProrationEngine {
    pub fn new(standard_mrr: Money) -> Self {
        Self { standard_mrr }
    }

    pub fn standard_mrr(&self) -> Money {
        self.standard_mrr
    }

    /// Classifies one site for one month and computes its gross recurring fee.
    pub fn charge_for_month(
        &self,
        site: &WebsiteHostingInterval,
        month: YearMonth,
    ) -> BillingResult<MonthlyHostingCharge> {
        site.validate()?;

        let first = month.first_day();
        let last = month.last_day();
        let days_in_month = month.days_in_month();
        let start = site.hosting_start();
        let end = site.hosting_end();

        let (billing_type, days_active) =
            if start <= first && end.map_or(true, |end| end >= last) {
                (HostingBillingType::Full, days_in_month)
            } else if month.contains(start) {
                (
                    HostingBillingType::ProratedStart,
                    days_in_month - start.day() + 1,
                )
            } else if let Some(end) = end.filter(|end| month.contains(*end)) {
                (HostingBillingType::ProratedEnd, end.day())
            } else {
                (HostingBillingType::Inactive, 0)
            };

        let gross_amount = match billing_type {
            HostingBillingType::Full => self.standard_mrr,
            HostingBillingType::Inactive => Decimal::ZERO,
            _ => self.standard_mrr * Decimal::from(days_active) / Decimal::from(days_in_month),
        };

        Ok(MonthlyHostingCharge {
            site_id: site.site_id().to_string(),
            site_name: site.site_name().to_string(),
            month,
            billing_type,
            days_active,
            days_in_month,
            gross_amount,
            credit_applied: false,
            net_amount: gross_amount,
        })
    }

    /// Charges for every site billed in `month`; inactive sites are left out.
    pub fn billed_charges(
        &self,
        sites: &[WebsiteHostingInterval],
        month: YearMonth,
    ) -> BillingResult<Vec<MonthlyHostingCharge>> {
        let mut charges = Vec::new();
        for site in sites {
            let charge = self.charge_for_month(site, month)?;
            if charge.billing_type.is_billed() {
                charges.push(charge);
            }
        }
        Ok(charges)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CreditProgress {
    /// Sites counted toward the next credit.
    pub active_sites: u32,
    pub progress_percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostingCreditAllocation {
    pub charges: Vec<MonthlyHostingCharge>,
    pub active_sites: u32,
    pub free_credits: u32,
}

#[derive(Debug, Clone)]
pub struct HostingCreditAllocator {
    sites_per_credit: u32,
}

impl HostingCreditAllocator {
    pub fn new(sites_per_credit: u32) -> BillingResult<Self> {
        if sites_per_credit == 0 {
            return Err(BillingError::InvalidConfig(
                "sites_per_free_credit must be at least 1".to_string(),
            ));
        }
        Ok(Self { sites_per_credit })
    }

    pub fn free_credits(&self, active_sites: u32) -> u32 {
        active_sites / self.sites_per_credit
    }

    /// Marks `floor(active / threshold)` charges as credited.
    ///
    /// Inactive charges are dropped; they never count toward or receive a credit.
    pub fn allocate(&self, charges: &[MonthlyHostingCharge]) -> HostingCreditAllocation {
        let mut charges: Vec<MonthlyHostingCharge> = charges
            .iter()
            .filter(|charge| charge.billing_type.is_billed())
            .cloned()
            .collect();
        charges.sort_by(credit_priority);

        let active_sites = charges.len() as u32;
        let free_credits = self.free_credits(active_sites);

        for index in select_credit_recipients(&charges, free_credits as usize) {
            charges[index].apply_credit();
        }

        HostingCreditAllocation {
            charges,
            active_sites,
            free_credits,
        }
    }

    pub fn calculate_credit_progress(&self, active_sites: u32) -> CreditProgress {
        let toward_next = active_sites % self.sites_per_credit;
        let progress_percentage =
            Decimal::from(toward_next) * Decimal::ONE_HUNDRED / Decimal::from(self.sites_per_credit);

        CreditProgress {
            active_sites: toward_next,
            progress_percentage,
        }
    }
}

/// Full-month charges first, then ascending site id.
fn credit_priority(a: &MonthlyHostingCharge, b: &MonthlyHostingCharge) -> Ordering {
    let partial = |c: &MonthlyHostingCharge| c.billing_type != HostingBillingType::Full;
    partial(a)
        .cmp(&partial(b))
        .then_with(|| a.site_id.cmp(&b.site_id))
}

/// Indices of the charges that receive the month's free credits.
///
/// Recipients are chosen by [`credit_priority`], never by input position, so a
/// reshuffled site list yields the same credited sites.
pub fn select_credit_recipients(charges: &[MonthlyHostingCharge], credits: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..charges.len())
        .filter(|&i| charges[i].billing_type.is_billed() && !charges[i].credit_applied)
        .collect();
    order.sort_by(|&a, &b| credit_priority(&charges[a], &charges[b]));
    order.truncate(credits);
    order
}
