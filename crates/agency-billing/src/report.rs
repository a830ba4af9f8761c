use agency_billing_engine::prelude::*;
use agency_billing_engine::{AverageCosts, CreditProgress, DaySelection, MonthSelection};
use serde::Serialize;
use std::fmt;

/// The month whose sites drive the "toward next credit" figure: the selected
/// month, or the `as_of` month clipped to the selected year.
pub fn progress_month(window: &BillingWindow, as_of: NaiveDate) -> BillingResult<YearMonth> {
    match window.month {
        MonthSelection::Month(month) => YearMonth::new(window.year, month),
        MonthSelection::All => {
            let december = YearMonth::new(window.year, 12)?;
            Ok(YearMonth::from_date(as_of).min(december))
        }
    }
}

pub fn window_credit_progress(
    engine: &BillingEngine,
    window: &BillingWindow,
    as_of: NaiveDate,
) -> BillingResult<CreditProgress> {
    engine.credit_progress(progress_month(window, as_of)?)
}

#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub summary: &'a WindowSummary,
    pub averages: AverageCosts,
    pub total_discounts: Decimal,
    pub credit_progress: CreditProgress,
}

impl<'a> JsonReport<'a> {
    pub fn new(engine: &BillingEngine, summary: &'a WindowSummary, progress: CreditProgress) -> Self {
        Self {
            summary,
            averages: engine.average_costs(summary),
            total_discounts: engine.total_discounts(summary),
            credit_progress: progress,
        }
    }
}

pub struct TextReport<'a> {
    pub engine: &'a BillingEngine,
    pub window: &'a BillingWindow,
    pub summary: &'a WindowSummary,
    pub progress: &'a CreditProgress,
}

fn window_label(window: &BillingWindow) -> String {
    match (window.month, window.day) {
        (MonthSelection::Month(month), DaySelection::Day(day)) => {
            format!("{}-{:02}-{:02}", window.year, month, day)
        }
        (MonthSelection::Month(month), DaySelection::All) => format!("{}-{:02}", window.year, month),
        _ => format!("{}", window.year),
    }
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let totals = self.summary.display_totals();
        let averages = self.engine.average_costs(self.summary);

        writeln!(f, "Billing summary for {}", window_label(self.window))?;
        writeln!(f)?;
        writeln!(f, "  Total revenue:     {}", format_money(totals.total_revenue))?;
        writeln!(
            f,
            "  Tickets:           {} ({} tickets)",
            format_money(totals.tickets_revenue),
            totals.tickets_count
        )?;
        writeln!(
            f,
            "  Projects:          {} ({} projects)",
            format_money(totals.projects_revenue),
            totals.projects_count
        )?;
        writeln!(
            f,
            "  Hosting:           {} ({} site-months)",
            format_money(totals.hosting_revenue),
            totals.site_months
        )?;

        writeln!(f)?;
        writeln!(f, "Savings")?;
        writeln!(
            f,
            "  Free hours:        {}",
            format_money(totals.tickets_free_hours_savings)
        )?;
        for (category, savings) in &totals.project_category_savings {
            writeln!(f, "  {:<19}{}", format!("{}:", category), format_money(*savings))?;
        }
        writeln!(f, "  Hosting credits:   {}", totals.hosting_credits_applied)?;
        writeln!(
            f,
            "  Total discounts:   {}",
            format_money(self.engine.total_discounts(self.summary))
        )?;

        writeln!(f)?;
        writeln!(f, "Averages")?;
        writeln!(f, "  Per ticket:        {}", format_money(averages.average_ticket_cost))?;
        writeln!(f, "  Per project:       {}", format_money(averages.average_project_cost))?;
        writeln!(f, "  Per site-month:    {}", format_money(averages.average_hosting_cost))?;

        if let WindowSummary::AllMonths(all) = self.summary {
            writeln!(f)?;
            writeln!(f, "Monthly breakdown")?;
            for month in &all.monthly_breakdown {
                writeln!(
                    f,
                    "  {}  {:>14}  tickets {:>3}  projects {:>3}  sites {:>3}",
                    month.month,
                    format_money(month.total_revenue),
                    month.tickets_count,
                    month.projects_count,
                    month.hosting_active_sites
                )?;
            }
        }

        if let WindowSummary::Day { date, tickets, .. } = self.summary {
            writeln!(f)?;
            writeln!(f, "Tickets on {}", date)?;
            for item in tickets {
                writeln!(
                    f,
                    "  {:<12} {:<10} {:>6}h  {}",
                    item.request.id(),
                    item.tier,
                    item.rounded_hours,
                    format_money(item.net_amount)
                )?;
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "Hosting credit progress: {} site(s) toward next credit ({:.1}%)",
            self.progress.active_sites, self.progress.progress_percentage
        )
    }
}
