use crate::error::{BillingError, BillingResult};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Currency amount in dollars. Never rounded before presentation.
pub type Money = Decimal;

/// Largest accepted single amount: project base, hourly rate or MRR.
pub const MAX_AMOUNT: Money = dec!(1000000000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingTier {
    #[serde(alias = "Promotion", alias = "PROMOTION")]
    Promotion,
    #[serde(alias = "Low", alias = "LOW")]
    Low,
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "High", alias = "HIGH")]
    High,
}

impl PricingTier {
    pub const ALL: [PricingTier; 4] = [
        PricingTier::Promotion,
        PricingTier::Low,
        PricingTier::Medium,
        PricingTier::High,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PricingTier::Promotion => "Promotion",
            PricingTier::Low => "Low",
            PricingTier::Medium => "Medium",
            PricingTier::High => "High",
        }
    }
}

impl fmt::Display for PricingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A calendar month, stored as its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    first_day: NaiveDate,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> BillingResult<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|first_day| Self { first_day })
            .ok_or_else(|| BillingError::InvalidWindow {
                reason: format!("{}-{:02} is not a calendar month", year, month),
            })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            first_day: date - chrono::Days::new(u64::from(date.day0())),
        }
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    pub fn last_day(&self) -> NaiveDate {
        self.first_day
            .with_day(self.days_in_month())
            .unwrap_or(self.first_day)
    }

    pub fn days_in_month(&self) -> u32 {
        match self.month() {
            4 | 6 | 9 | 11 => 30,
            2 if NaiveDate::from_ymd_opt(self.year(), 2, 29).is_some() => 29,
            2 => 28,
            _ => 31,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first_day && date <= self.last_day()
    }

    pub fn next(&self) -> BillingResult<Self> {
        let next = if self.month() == 12 {
            YearMonth::new(self.year() + 1, 1)
        } else {
            YearMonth::new(self.year(), self.month() + 1)
        };
        next.map_err(|_| BillingError::InvalidMonth(*self))
    }

    /// Every month from `start` through `end`, inclusive. Empty when `start > end`.
    pub fn range(start: YearMonth, end: YearMonth) -> BillingResult<Vec<YearMonth>> {
        let mut months = Vec::new();
        let mut current = start;
        while current <= end {
            months.push(current);
            if current == end {
                break;
            }
            current = current.next()?;
        }
        Ok(months)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year(), self.month())
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let (year, month) = raw
            .split_once('-')
            .ok_or_else(|| serde::de::Error::custom(format!("expected YYYY-MM, got {}", raw)))?;
        let year: i32 = year.parse().map_err(serde::de::Error::custom)?;
        let month: u32 = month.parse().map_err(serde::de::Error::custom)?;
        YearMonth::new(year, month).map_err(serde::de::Error::custom)
    }
}

/// A billable support ticket, already filtered to billable status upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBasedRequest {
    id: String,
    date: NaiveDate,
    #[serde(alias = "urgency")]
    urgency_tier: PricingTier,
    hours: Decimal,
}

impl TimeBasedRequest {
    pub fn new(id: impl Into<String>, date: NaiveDate, urgency_tier: PricingTier, hours: Decimal) -> Self {
        Self {
            id: id.into(),
            date,
            urgency_tier,
            hours,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn urgency_tier(&self) -> PricingTier {
        self.urgency_tier
    }

    pub fn hours(&self) -> Decimal {
        self.hours
    }

    pub fn month(&self) -> YearMonth {
        YearMonth::from_date(self.date)
    }

    pub fn validate(&self) -> BillingResult<()> {
        if self.hours.is_sign_negative() && !self.hours.is_zero() {
            return Err(BillingError::NegativeHours {
                ticket_id: self.id.clone(),
                hours: self.hours,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteHostingInterval {
    site_id: String,
    site_name: String,
    #[serde(default)]
    url: String,
    hosting_start: NaiveDate,
    #[serde(default)]
    hosting_end: Option<NaiveDate>,
}

impl WebsiteHostingInterval {
    pub fn new(
        site_id: impl Into<String>,
        site_name: impl Into<String>,
        url: impl Into<String>,
        hosting_start: NaiveDate,
        hosting_end: Option<NaiveDate>,
    ) -> Self {
        Self {
            site_id: site_id.into(),
            site_name: site_name.into(),
            url: url.into(),
            hosting_start,
            hosting_end,
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn site_name(&self) -> &str {
        &self.site_name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn hosting_start(&self) -> NaiveDate {
        self.hosting_start
    }

    pub fn hosting_end(&self) -> Option<NaiveDate> {
        self.hosting_end
    }

    pub fn is_active(&self) -> bool {
        self.hosting_end.is_none()
    }

    pub fn validate(&self) -> BillingResult<()> {
        match self.hosting_end {
            Some(end) if end < self.hosting_start => Err(BillingError::InvalidHostingInterval {
                site_id: self.site_id.clone(),
                start: self.hosting_start,
                end,
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectCategory {
    #[serde(alias = "landing-page", alias = "Landing Page")]
    LandingPage,
    #[serde(alias = "multi-form", alias = "Multi-Form")]
    MultiForm,
    #[serde(alias = "basic-form", alias = "Basic Form")]
    BasicForm,
    #[serde(alias = "Website")]
    Website,
    #[serde(alias = "Migration")]
    Migration,
}

impl ProjectCategory {
    pub fn name(&self) -> &'static str {
        match self {
            ProjectCategory::LandingPage => "Landing Page",
            ProjectCategory::MultiForm => "Multi-Form",
            ProjectCategory::BasicForm => "Basic Form",
            ProjectCategory::Website => "Website",
            ProjectCategory::Migration => "Migration",
        }
    }
}

impl fmt::Display for ProjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    id: String,
    name: String,
    category: ProjectCategory,
    completion_date: NaiveDate,
    base_amount: Money,
}

impl ProjectRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: ProjectCategory,
        completion_date: NaiveDate,
        base_amount: Money,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            completion_date,
            base_amount,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> ProjectCategory {
        self.category
    }

    pub fn completion_date(&self) -> NaiveDate {
        self.completion_date
    }

    pub fn completion_month(&self) -> YearMonth {
        YearMonth::from_date(self.completion_date)
    }

    pub fn base_amount(&self) -> Money {
        self.base_amount
    }

    pub fn validate(&self) -> BillingResult<()> {
        if self.base_amount < Decimal::ZERO {
            return Err(BillingError::NegativeAmount {
                kind: "Project",
                id: self.id.clone(),
                amount: self.base_amount,
            });
        }
        if self.base_amount > MAX_AMOUNT {
            return Err(BillingError::AmountOutOfRange {
                kind: "Project",
                id: self.id.clone(),
                amount: self.base_amount,
            });
        }
        Ok(())
    }
}

/// One ticket after tier pricing and free-hours allocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedLineItem {
    pub request: TimeBasedRequest,
    pub tier: PricingTier,
    pub rate: Money,
    pub rounded_hours: Decimal,
    pub gross_amount: Money,
    pub free_hours_applied: Decimal,
    pub net_amount: Money,
}

impl PricedLineItem {
    pub fn billable_hours(&self) -> Decimal {
        self.rounded_hours - self.free_hours_applied
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostingBillingType {
    Full,
    ProratedStart,
    ProratedEnd,
    Inactive,
}

impl HostingBillingType {
    pub fn is_billed(&self) -> bool {
        !matches!(self, HostingBillingType::Inactive)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyHostingCharge {
    pub site_id: String,
    pub site_name: String,
    pub month: YearMonth,
    pub billing_type: HostingBillingType,
    pub days_active: u32,
    pub days_in_month: u32,
    pub gross_amount: Money,
    pub credit_applied: bool,
    pub net_amount: Money,
}

impl MonthlyHostingCharge {
    pub fn apply_credit(&mut self) {
        self.credit_applied = true;
        self.net_amount = Decimal::ZERO;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectChargeLine {
    pub project: ProjectRecord,
    pub is_free_credit: bool,
    pub amount: Money,
}

impl ProjectChargeLine {
    pub fn savings(&self) -> Money {
        self.project.base_amount() - self.amount
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthSelection {
    All,
    Month(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaySelection {
    All,
    Day(u32),
}

fn parse_selection(value: &str, field: &str, max: u32) -> BillingResult<Option<u32>> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    match value.parse::<u32>() {
        Ok(n) if (1..=max).contains(&n) => Ok(Some(n)),
        _ => Err(BillingError::InvalidWindow {
            reason: format!("{} must be 1-{} or \"all\", got {:?}", field, max, value),
        }),
    }
}

impl FromStr for MonthSelection {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parse_selection(s, "month", 12)?.map_or(MonthSelection::All, MonthSelection::Month))
    }
}

impl FromStr for DaySelection {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parse_selection(s, "day", 31)?.map_or(DaySelection::All, DaySelection::Day))
    }
}

/// The time window a caller asks the engine to summarize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingWindow {
    pub year: i32,
    pub month: MonthSelection,
    pub day: DaySelection,
}

impl BillingWindow {
    pub fn year(year: i32) -> Self {
        Self {
            year,
            month: MonthSelection::All,
            day: DaySelection::All,
        }
    }

    pub fn month(year: i32, month: u32) -> Self {
        Self {
            year,
            month: MonthSelection::Month(month),
            day: DaySelection::All,
        }
    }

    pub fn day(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month: MonthSelection::Month(month),
            day: DaySelection::Day(day),
        }
    }
}
