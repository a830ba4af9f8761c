//! Summary value objects and the all-time reducer.
//!
//! Every derived figure is computed once, here or in the aggregator, and
//! consumers only read it.

use crate::data_structures::{
    Money, MonthlyHostingCharge, PricedLineItem, PricingTier, ProjectCategory, ProjectChargeLine,
    YearMonth,
};
use crate::free_hours::TierCredit;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBillingSummary {
    pub month: YearMonth,

    pub tickets_count: u32,
    pub tickets_hours: Decimal,
    pub tickets_gross_revenue: Money,
    pub tickets_revenue: Money,
    pub tickets_free_hours_applied: Decimal,
    pub tickets_free_hours_savings: Money,
    pub free_hours_by_tier: BTreeMap<PricingTier, TierCredit>,

    pub projects_count: u32,
    pub projects_gross_revenue: Money,
    pub projects_revenue: Money,
    pub projects_credits_applied: u32,
    pub project_category_savings: BTreeMap<ProjectCategory, Money>,

    pub hosting_active_sites: u32,
    pub hosting_gross_revenue: Money,
    pub hosting_revenue: Money,
    pub hosting_credits_applied: u32,
    pub hosting_credit_savings: Money,

    pub gross_revenue: Money,
    pub total_savings: Money,
    pub total_revenue: Money,

    pub line_items: Vec<PricedLineItem>,
    pub hosting_charges: Vec<MonthlyHostingCharge>,
    pub project_lines: Vec<ProjectChargeLine>,
}

impl MonthlyBillingSummary {
    pub fn empty(month: YearMonth) -> Self {
        Self {
            month,
            tickets_count: 0,
            tickets_hours: Decimal::ZERO,
            tickets_gross_revenue: Decimal::ZERO,
            tickets_revenue: Decimal::ZERO,
            tickets_free_hours_applied: Decimal::ZERO,
            tickets_free_hours_savings: Decimal::ZERO,
            free_hours_by_tier: BTreeMap::new(),
            projects_count: 0,
            projects_gross_revenue: Decimal::ZERO,
            projects_revenue: Decimal::ZERO,
            projects_credits_applied: 0,
            project_category_savings: BTreeMap::new(),
            hosting_active_sites: 0,
            hosting_gross_revenue: Decimal::ZERO,
            hosting_revenue: Decimal::ZERO,
            hosting_credits_applied: 0,
            hosting_credit_savings: Decimal::ZERO,
            gross_revenue: Decimal::ZERO,
            total_savings: Decimal::ZERO,
            total_revenue: Decimal::ZERO,
            line_items: Vec::new(),
            hosting_charges: Vec::new(),
            project_lines: Vec::new(),
        }
    }

    pub fn projects_savings(&self) -> Money {
        self.project_category_savings.values().copied().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets_count == 0 && self.projects_count == 0 && self.hosting_active_sites == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingSummary {
    pub total_revenue: Money,
    pub total_tickets_revenue: Money,
    pub total_projects_revenue: Money,
    pub total_hosting_revenue: Money,
    pub total_gross_revenue: Money,

    pub total_tickets_count: u32,
    pub total_projects_count: u32,
    /// Billed site occurrences summed across months, not unique sites.
    pub total_site_months: u32,

    pub total_tickets_free_hours_savings: Money,
    pub total_project_category_savings: BTreeMap<ProjectCategory, Money>,
    pub total_hosting_credits_applied: u32,
    pub total_hosting_credit_savings: Money,

    pub monthly_breakdown: Vec<MonthlyBillingSummary>,
}

/// Window-level figures a dashboard shows, whatever the window granularity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayTotals {
    pub tickets_count: u32,
    pub projects_count: u32,
    pub site_months: u32,
    pub tickets_revenue: Money,
    pub projects_revenue: Money,
    pub hosting_revenue: Money,
    pub gross_revenue: Money,
    pub total_revenue: Money,
    pub tickets_free_hours_savings: Money,
    pub project_category_savings: BTreeMap<ProjectCategory, Money>,
    pub hosting_credits_applied: u32,
}

impl From<&BillingSummary> for DisplayTotals {
    fn from(summary: &BillingSummary) -> Self {
        Self {
            tickets_count: summary.total_tickets_count,
            projects_count: summary.total_projects_count,
            site_months: summary.total_site_months,
            tickets_revenue: summary.total_tickets_revenue,
            projects_revenue: summary.total_projects_revenue,
            hosting_revenue: summary.total_hosting_revenue,
            gross_revenue: summary.total_gross_revenue,
            total_revenue: summary.total_revenue,
            tickets_free_hours_savings: summary.total_tickets_free_hours_savings,
            project_category_savings: summary.total_project_category_savings.clone(),
            hosting_credits_applied: summary.total_hosting_credits_applied,
        }
    }
}

impl From<&MonthlyBillingSummary> for DisplayTotals {
    fn from(month: &MonthlyBillingSummary) -> Self {
        Self {
            tickets_count: month.tickets_count,
            projects_count: month.projects_count,
            site_months: month.hosting_active_sites,
            tickets_revenue: month.tickets_revenue,
            projects_revenue: month.projects_revenue,
            hosting_revenue: month.hosting_revenue,
            gross_revenue: month.gross_revenue,
            total_revenue: month.total_revenue,
            tickets_free_hours_savings: month.tickets_free_hours_savings,
            project_category_savings: month.project_category_savings.clone(),
            hosting_credits_applied: month.hosting_credits_applied,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AverageCosts {
    pub average_ticket_cost: Money,
    pub average_project_cost: Money,
    pub average_hosting_cost: Money,
}

#[derive(Debug, Clone)]
pub struct BillingSummaryReducer {
    standard_mrr: Money,
}

impl BillingSummaryReducer {
    pub fn new(standard_mrr: Money) -> Self {
        Self { standard_mrr }
    }

    /// Folds monthly summaries into window totals. Months are put in
    /// chronological order before summation.
    pub fn reduce(&self, mut months: Vec<MonthlyBillingSummary>) -> BillingSummary {
        months.sort_by_key(|summary| summary.month);

        let mut total_project_category_savings: BTreeMap<ProjectCategory, Money> = BTreeMap::new();
        for month in &months {
            for (category, savings) in &month.project_category_savings {
                *total_project_category_savings.entry(*category).or_default() += *savings;
            }
        }

        BillingSummary {
            total_revenue: months.iter().map(|m| m.total_revenue).sum(),
            total_tickets_revenue: months.iter().map(|m| m.tickets_revenue).sum(),
            total_projects_revenue: months.iter().map(|m| m.projects_revenue).sum(),
            total_hosting_revenue: months.iter().map(|m| m.hosting_revenue).sum(),
            total_gross_revenue: months.iter().map(|m| m.gross_revenue).sum(),
            total_tickets_count: months.iter().map(|m| m.tickets_count).sum(),
            total_projects_count: months.iter().map(|m| m.projects_count).sum(),
            total_site_months: months.iter().map(|m| m.hosting_active_sites).sum(),
            total_tickets_free_hours_savings: months
                .iter()
                .map(|m| m.tickets_free_hours_savings)
                .sum(),
            total_project_category_savings,
            total_hosting_credits_applied: months.iter().map(|m| m.hosting_credits_applied).sum(),
            total_hosting_credit_savings: months.iter().map(|m| m.hosting_credit_savings).sum(),
            monthly_breakdown: months,
        }
    }

    pub fn average_costs(&self, totals: &DisplayTotals) -> AverageCosts {
        AverageCosts {
            average_ticket_cost: average(totals.tickets_revenue, totals.tickets_count),
            average_project_cost: average(totals.projects_revenue, totals.projects_count),
            average_hosting_cost: average(totals.hosting_revenue, totals.site_months),
        }
    }

    /// Free hours + project credits + hosting credits valued at one MRR each.
    pub fn total_discounts(&self, totals: &DisplayTotals) -> Money {
        let project_savings: Money = totals.project_category_savings.values().copied().sum();
        let hosting_savings = Decimal::from(totals.hosting_credits_applied) * self.standard_mrr;

        round_currency(totals.tickets_free_hours_savings + project_savings + hosting_savings)
    }
}

fn average(total: Money, count: u32) -> Money {
    if count == 0 {
        return Decimal::ZERO;
    }
    round_currency(total / Decimal::from(count))
}

/// Rounds to cents. Only presentation figures go through this.
pub fn round_currency(amount: Money) -> Money {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `$1,234.50` style rendering.
pub fn format_money(amount: Money) -> String {
    let rounded = round_currency(amount);
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in whole.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let whole: String = grouped.chars().rev().collect();

    let sign = if rounded < Decimal::ZERO { "-" } else { "" };
    format!("{}${}.{}", sign, whole, cents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn month(m: u32, tickets: Money, projects: Money, hosting: Money) -> MonthlyBillingSummary {
        let mut summary = MonthlyBillingSummary::empty(YearMonth::new(2024, m).unwrap());
        summary.tickets_count = 2;
        summary.tickets_revenue = tickets;
        summary.projects_count = 1;
        summary.projects_revenue = projects;
        summary.hosting_active_sites = 3;
        summary.hosting_revenue = hosting;
        summary.total_revenue = tickets + projects + hosting;
        summary.gross_revenue = summary.total_revenue;
        summary
    }

    #[test]
    fn test_reduce_sums_every_month() {
        let reducer = BillingSummaryReducer::new(dec!(99));
        let months = vec![
            month(2, dec!(300), dec!(0), dec!(99)),
            month(1, dec!(150.5), dec!(800), dec!(198)),
        ];

        let summary = reducer.reduce(months);
        assert_eq!(summary.monthly_breakdown[0].month.month(), 1);
        assert_eq!(summary.total_tickets_revenue, dec!(450.5));
        assert_eq!(summary.total_projects_revenue, dec!(800));
        assert_eq!(summary.total_hosting_revenue, dec!(297));
        assert_eq!(summary.total_site_months, 6);
        let breakdown_total: Money = summary.monthly_breakdown.iter().map(|m| m.total_revenue).sum();
        assert_eq!(summary.total_revenue, breakdown_total);
    }

    #[test]
    fn test_reduce_empty_window() {
        let reducer = BillingSummaryReducer::new(dec!(99));
        let summary = reducer.reduce(Vec::new());
        assert_eq!(summary.total_revenue, Decimal::ZERO);
        assert!(summary.monthly_breakdown.is_empty());

        let totals = DisplayTotals::from(&summary);
        let averages = reducer.average_costs(&totals);
        assert_eq!(averages.average_ticket_cost, Decimal::ZERO);
        assert_eq!(averages.average_project_cost, Decimal::ZERO);
        assert_eq!(averages.average_hosting_cost, Decimal::ZERO);
        assert_eq!(reducer.total_discounts(&totals), Decimal::ZERO);
    }

    #[test]
    fn test_single_month_display_totals_match_month() {
        let single = month(5, dec!(100), dec!(200), dec!(99));
        let totals = DisplayTotals::from(&single);
        assert_eq!(totals.total_revenue, dec!(399));
        assert_eq!(totals.site_months, 3);
    }

    #[test]
    fn test_hosting_average_is_per_site_month() {
        let reducer = BillingSummaryReducer::new(dec!(99));
        let summary = reducer.reduce(vec![
            month(1, dec!(0), dec!(0), dec!(297)),
            month(2, dec!(0), dec!(0), dec!(198)),
        ]);
        let averages = reducer.average_costs(&DisplayTotals::from(&summary));
        assert_eq!(averages.average_hosting_cost, dec!(82.50));
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(dec!(1924)), "$1,924.00");
        assert_eq!(format_money(dec!(341.666)), "$341.67");
        assert_eq!(format_money(dec!(0)), "$0.00");
        assert_eq!(format_money(dec!(1234567.005)), "$1,234,567.01");
        assert_eq!(format_money(dec!(-12.5)), "-$12.50");
    }
}
