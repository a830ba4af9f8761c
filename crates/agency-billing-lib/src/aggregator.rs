use crate::config::BillingConfig;
use crate::data_structures::{ProjectRecord, TimeBasedRequest, WebsiteHostingInterval, YearMonth};
use crate::error::BillingResult;
use crate::free_hours::FreeHoursAllocator;
use crate::hosting::{HostingCreditAllocator, HostingProrationEngine};
use crate::pricing::TieredCostCalculator;
use crate::projects::ProjectCreditAllocator;
use crate::summary::MonthlyBillingSummary;
use tracing::debug;

/// Builds one [`MonthlyBillingSummary`] from the three revenue streams.
///
/// Holds configuration only; every call starts from the inputs it is given.
#[derive(Debug, Clone)]
pub struct MonthlyBillingAggregator {
    calculator: TieredCostCalculator,
    free_hours: FreeHoursAllocator,
    proration: HostingProrationEngine,
    hosting_credits: HostingCreditAllocator,
    project_credits: ProjectCreditAllocator,
}

impl MonthlyBillingAggregator {
    pub fn new(config: &BillingConfig) -> BillingResult<Self> {
        Ok(Self {
            calculator: TieredCostCalculator::new(config)?,
            free_hours: FreeHoursAllocator::new(config.monthly_free_hours, config.free_hours_policy),
            proration: HostingProrationEngine::new(config.standard_mrr),
            hosting_credits: HostingCreditAllocator::new(config.sites_per_free_credit)?,
            project_credits: ProjectCreditAllocator::new(config.credit_eligible_categories.clone()),
        })
    }

    pub fn hosting_credits(&self) -> &HostingCreditAllocator {
        &self.hosting_credits
    }

    /// Records outside `month` are ignored, so callers may pass full lists.
    pub fn summarize_month(
        &self,
        month: YearMonth,
        tickets: &[TimeBasedRequest],
        sites: &[WebsiteHostingInterval],
        projects: &[ProjectRecord],
    ) -> BillingResult<MonthlyBillingSummary> {
        let month_tickets: Vec<TimeBasedRequest> = tickets
            .iter()
            .filter(|ticket| ticket.month() == month)
            .cloned()
            .collect();
        let month_projects: Vec<ProjectRecord> = projects
            .iter()
            .filter(|project| project.completion_month() == month)
            .cloned()
            .collect();

        for project in &month_projects {
            project.validate()?;
        }

        let priced = self.calculator.price_all(&month_tickets)?;
        let free_hours = self.free_hours.allocate(&priced);

        let charges = self.proration.billed_charges(sites, month)?;
        let hosting = self.hosting_credits.allocate(&charges);

        let projects = self.project_credits.allocate(&month_projects);

        let mut summary = MonthlyBillingSummary::empty(month);

        summary.tickets_count = free_hours.items.len() as u32;
        summary.tickets_hours = free_hours.items.iter().map(|item| item.rounded_hours).sum();
        summary.tickets_gross_revenue = free_hours.items.iter().map(|item| item.gross_amount).sum();
        summary.tickets_revenue = free_hours.items.iter().map(|item| item.net_amount).sum();
        summary.tickets_free_hours_applied = free_hours.total_free_hours_applied;
        summary.tickets_free_hours_savings = free_hours.total_free_hours_savings;
        summary.free_hours_by_tier = free_hours.per_tier;
        summary.line_items = free_hours.items;

        summary.projects_count = projects.lines.len() as u32;
        summary.projects_gross_revenue = projects
            .lines
            .iter()
            .map(|line| line.project.base_amount())
            .sum();
        summary.projects_revenue = projects.lines.iter().map(|line| line.amount).sum();
        summary.projects_credits_applied = projects.credits_applied;
        summary.project_category_savings = projects.savings_by_category;
        summary.project_lines = projects.lines;

        summary.hosting_active_sites = hosting.active_sites;
        summary.hosting_gross_revenue = hosting.charges.iter().map(|c| c.gross_amount).sum();
        summary.hosting_revenue = hosting.charges.iter().map(|c| c.net_amount).sum();
        summary.hosting_credits_applied = hosting.free_credits;
        summary.hosting_credit_savings = summary.hosting_gross_revenue - summary.hosting_revenue;
        summary.hosting_charges = hosting.charges;

        summary.gross_revenue = summary.tickets_gross_revenue
            + summary.projects_gross_revenue
            + summary.hosting_gross_revenue;
        summary.total_revenue =
            summary.tickets_revenue + summary.projects_revenue + summary.hosting_revenue;
        summary.total_savings = summary.gross_revenue - summary.total_revenue;

        debug!(
            month = %month,
            tickets = summary.tickets_count,
            projects = summary.projects_count,
            sites = summary.hosting_active_sites,
            total = %summary.total_revenue,
            "Summarized billing month"
        );

        Ok(summary)
    }
}
