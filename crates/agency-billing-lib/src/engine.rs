use crate::aggregator::MonthlyBillingAggregator;
use crate::config::BillingConfig;
use crate::data_structures::{
    BillingWindow, DaySelection, Money, MonthSelection, PricedLineItem, ProjectRecord,
    TimeBasedRequest, WebsiteHostingInterval, YearMonth,
};
use crate::error::{BillingError, BillingResult};
use crate::hosting::CreditProgress;
use crate::loader::RecordSet;
use crate::summary::{
    AverageCosts, BillingSummary, BillingSummaryReducer, DisplayTotals, MonthlyBillingSummary,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

/// What a window evaluates to: window totals, or one month's detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindowSummary {
    AllMonths(BillingSummary),
    Month(MonthlyBillingSummary),
    Day {
        date: NaiveDate,
        summary: MonthlyBillingSummary,
        tickets: Vec<PricedLineItem>,
    },
}

impl WindowSummary {
    /// Uses pre-aggregated totals for a multi-month window and the month's
    /// own values otherwise.
    pub fn display_totals(&self) -> DisplayTotals {
        match self {
            WindowSummary::AllMonths(summary) => DisplayTotals::from(summary),
            WindowSummary::Month(summary) | WindowSummary::Day { summary, .. } => {
                DisplayTotals::from(summary)
            }
        }
    }
}

/// Owns immutable snapshots of the records and evaluates windows over them.
pub struct BillingEngine {
    config: BillingConfig,
    aggregator: MonthlyBillingAggregator,
    reducer: BillingSummaryReducer,
    tickets: Vec<TimeBasedRequest>,
    sites: Vec<WebsiteHostingInterval>,
    projects: Vec<ProjectRecord>,
}

impl BillingEngine {
    pub fn new(
        config: BillingConfig,
        tickets: Vec<TimeBasedRequest>,
        sites: Vec<WebsiteHostingInterval>,
        projects: Vec<ProjectRecord>,
    ) -> BillingResult<Self> {
        config.validate()?;

        check_unique("ticket", tickets.iter().map(|t| t.id()))?;
        check_unique("site", sites.iter().map(|s| s.site_id()))?;
        check_unique("project", projects.iter().map(|p| p.id()))?;

        for ticket in &tickets {
            ticket.validate()?;
        }
        for site in &sites {
            site.validate()?;
        }
        for project in &projects {
            project.validate()?;
        }

        Ok(Self {
            aggregator: MonthlyBillingAggregator::new(&config)?,
            reducer: BillingSummaryReducer::new(config.standard_mrr),
            config,
            tickets,
            sites,
            projects,
        })
    }

    pub fn from_records(config: BillingConfig, records: RecordSet) -> BillingResult<Self> {
        Self::new(config, records.tickets, records.sites, records.projects)
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    pub fn tickets(&self) -> &[TimeBasedRequest] {
        &self.tickets
    }

    pub fn sites(&self) -> &[WebsiteHostingInterval] {
        &self.sites
    }

    pub fn projects(&self) -> &[ProjectRecord] {
        &self.projects
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty() && self.sites.is_empty() && self.projects.is_empty()
    }

    /// Month of the earliest ticket, project delivery or hosting start.
    pub fn earliest_month(&self) -> Option<YearMonth> {
        let tickets = self.tickets.iter().map(|t| t.month());
        let projects = self.projects.iter().map(|p| p.completion_month());
        let sites = self
            .sites
            .iter()
            .map(|s| YearMonth::from_date(s.hosting_start()));
        tickets.chain(projects).chain(sites).min()
    }

    pub fn monthly_summary(&self, month: YearMonth) -> BillingResult<MonthlyBillingSummary> {
        self.aggregator
            .summarize_month(month, &self.tickets, &self.sites, &self.projects)
    }

    pub fn summarize_all_time(&self, as_of: NaiveDate) -> BillingResult<BillingSummary> {
        let months = match self.earliest_month() {
            Some(start) => YearMonth::range(start, YearMonth::from_date(as_of))?,
            None => Vec::new(),
        };
        self.summarize_months(&months)
    }

    pub fn summarize(&self, window: BillingWindow, as_of: NaiveDate) -> BillingResult<WindowSummary> {
        info!(?window, %as_of, "Evaluating billing window");

        match (window.month, window.day) {
            (MonthSelection::All, DaySelection::All) => {
                let months = self.months_in_year(window.year, as_of)?;
                Ok(WindowSummary::AllMonths(self.summarize_months(&months)?))
            }
            (MonthSelection::All, DaySelection::Day(_)) => Err(BillingError::InvalidWindow {
                reason: "a specific day requires a specific month".to_string(),
            }),
            (MonthSelection::Month(month), DaySelection::All) => {
                let month = YearMonth::new(window.year, month)?;
                Ok(WindowSummary::Month(self.monthly_summary(month)?))
            }
            (MonthSelection::Month(month), DaySelection::Day(day)) => {
                let date = NaiveDate::from_ymd_opt(window.year, month, day).ok_or_else(|| {
                    BillingError::InvalidWindow {
                        reason: format!("{}-{:02}-{:02} is not a calendar day", window.year, month, day),
                    }
                })?;
                let summary = self.monthly_summary(YearMonth::from_date(date))?;
                let tickets = summary
                    .line_items
                    .iter()
                    .filter(|item| item.request.date() == date)
                    .cloned()
                    .collect();
                Ok(WindowSummary::Day {
                    date,
                    summary,
                    tickets,
                })
            }
        }
    }

    pub fn average_costs(&self, window: &WindowSummary) -> AverageCosts {
        self.reducer.average_costs(&window.display_totals())
    }

    pub fn total_discounts(&self, window: &WindowSummary) -> Money {
        self.reducer.total_discounts(&window.display_totals())
    }

    pub fn credit_progress(&self, month: YearMonth) -> BillingResult<CreditProgress> {
        let summary = self.monthly_summary(month)?;
        Ok(self
            .aggregator
            .hosting_credits()
            .calculate_credit_progress(summary.hosting_active_sites))
    }

    fn summarize_months(&self, months: &[YearMonth]) -> BillingResult<BillingSummary> {
        let summaries = months
            .iter()
            .map(|month| self.monthly_summary(*month))
            .collect::<BillingResult<Vec<_>>>()?;
        Ok(self.reducer.reduce(summaries))
    }

    /// Months of `year` from the first record through `as_of`.
    fn months_in_year(&self, year: i32, as_of: NaiveDate) -> BillingResult<Vec<YearMonth>> {
        let Some(earliest) = self.earliest_month() else {
            return Ok(Vec::new());
        };

        let start = earliest.max(YearMonth::new(year, 1)?);
        let end = YearMonth::from_date(as_of).min(YearMonth::new(year, 12)?);
        YearMonth::range(start, end)
    }
}

fn check_unique<'a>(kind: &'static str, ids: impl Iterator<Item = &'a str>) -> BillingResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(BillingError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::{PricingTier, ProjectCategory};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn engine() -> BillingEngine {
        let tickets = vec![
            TimeBasedRequest::new("t1", date(2024, 2, 3), PricingTier::Low, dec!(2)),
            TimeBasedRequest::new("t2", date(2024, 2, 3), PricingTier::High, dec!(1)),
            TimeBasedRequest::new("t3", date(2024, 4, 9), PricingTier::Medium, dec!(1)),
        ];
        let sites = vec![WebsiteHostingInterval::new(
            "s1",
            "Main",
            "https://main.example",
            date(2024, 1, 15),
            None,
        )];
        let projects = vec![ProjectRecord::new(
            "p1",
            "Relaunch",
            ProjectCategory::Website,
            date(2024, 3, 30),
            dec!(1200),
        )];
        let config = BillingConfig {
            monthly_free_hours: Decimal::ZERO,
            ..BillingConfig::default()
        };
        BillingEngine::new(config, tickets, sites, projects).unwrap()
    }

    #[test]
    fn test_new_engine_empty() {
        let engine = BillingEngine::new(BillingConfig::default(), vec![], vec![], vec![]).unwrap();
        assert!(engine.is_empty());
        assert!(engine.earliest_month().is_none());

        let summary = engine.summarize_all_time(date(2024, 6, 1)).unwrap();
        assert!(summary.monthly_breakdown.is_empty());
        assert_eq!(summary.total_revenue, Decimal::ZERO);
    }

    #[test]
    fn test_year_window_runs_from_first_record_to_as_of() {
        let engine = engine();
        let window = engine.summarize(BillingWindow::year(2024), date(2024, 5, 20)).unwrap();
        let WindowSummary::AllMonths(summary) = window else {
            panic!("expected a multi-month summary");
        };
        let months: Vec<u32> = summary.monthly_breakdown.iter().map(|m| m.month.month()).collect();
        assert_eq!(months, vec![1, 2, 3, 4, 5]);
        assert_eq!(summary.total_tickets_count, 3);
        assert_eq!(summary.total_site_months, 5);
        assert_eq!(summary.total_projects_revenue, dec!(1200));
    }

    #[test]
    fn test_month_window_returns_month_summary() {
        let engine = engine();
        let window = engine.summarize(BillingWindow::month(2024, 2), date(2024, 5, 20)).unwrap();
        let WindowSummary::Month(summary) = &window else {
            panic!("expected a month summary");
        };
        assert_eq!(summary.tickets_revenue, dec!(550));
        assert_eq!(window.display_totals().tickets_count, 2);
    }

    #[test]
    fn test_day_window_filters_tickets() {
        let engine = engine();
        let window = engine.summarize(BillingWindow::day(2024, 2, 3), date(2024, 5, 20)).unwrap();
        let WindowSummary::Day { tickets, summary, .. } = window else {
            panic!("expected a day summary");
        };
        assert_eq!(tickets.len(), 2);
        assert_eq!(summary.month, YearMonth::new(2024, 2).unwrap());
    }

    #[test]
    fn test_invalid_windows_rejected() {
        let engine = engine();
        let as_of = date(2024, 5, 20);
        assert!(engine.summarize(BillingWindow::month(2024, 13), as_of).is_err());
        assert!(engine.summarize(BillingWindow::day(2024, 2, 30), as_of).is_err());
        let window = BillingWindow {
            year: 2024,
            month: MonthSelection::All,
            day: DaySelection::Day(3),
        };
        assert!(matches!(
            engine.summarize(window, as_of),
            Err(BillingError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let tickets = vec![
            TimeBasedRequest::new("t", date(2024, 1, 1), PricingTier::Low, dec!(1)),
            TimeBasedRequest::new("t", date(2024, 1, 2), PricingTier::Low, dec!(1)),
        ];
        let result = BillingEngine::new(BillingConfig::default(), tickets, vec![], vec![]);
        assert!(matches!(result, Err(BillingError::DuplicateId { .. })));
    }

    #[test]
    fn test_invalid_records_rejected_at_construction() {
        let sites = vec![WebsiteHostingInterval::new(
            "s",
            "Site",
            "",
            date(2024, 3, 1),
            Some(date(2024, 2, 1)),
        )];
        let result = BillingEngine::new(BillingConfig::default(), vec![], sites, vec![]);
        assert!(matches!(
            result,
            Err(BillingError::InvalidHostingInterval { .. })
        ));
    }

    #[test]
    fn test_credit_progress_for_month() {
        let engine = engine();
        let progress = engine.credit_progress(YearMonth::new(2024, 3).unwrap()).unwrap();
        assert_eq!(progress.active_sites, 1);
    }

    #[test]
    fn test_oversized_amounts_rejected_at_construction() {
        let projects = vec![
            ProjectRecord::new("p1", "Huge", ProjectCategory::Website, date(2024, 6, 3), Decimal::MAX),
            ProjectRecord::new("p2", "Huge", ProjectCategory::Website, date(2024, 6, 4), Decimal::MAX),
        ];
        let result = BillingEngine::new(BillingConfig::default(), vec![], vec![], projects);
        assert!(matches!(result, Err(BillingError::AmountOutOfRange { .. })));

        let tickets = vec![TimeBasedRequest::new("t", date(2024, 6, 3), PricingTier::High, Decimal::MAX)];
        let engine = BillingEngine::new(BillingConfig::default(), tickets, vec![], vec![]).unwrap();
        let summary = engine.monthly_summary(YearMonth::new(2024, 6).unwrap()).unwrap();
        assert_eq!(summary.tickets_hours, dec!(99.99));
    }
}
