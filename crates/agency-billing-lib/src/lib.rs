pub mod aggregator;
pub mod config;
pub mod data_structures;
pub mod engine;
pub mod error;
pub mod free_hours;
pub mod hosting;
pub mod loader;
pub mod pricing;
pub mod projects;
pub mod summary;

pub use aggregator::MonthlyBillingAggregator;
pub use config::BillingConfig;
pub use data_structures::{
    BillingWindow, DaySelection, HostingBillingType, Money, MonthSelection, MonthlyHostingCharge,
    PricedLineItem, PricingTier, ProjectCategory, ProjectChargeLine, ProjectRecord,
    TimeBasedRequest, WebsiteHostingInterval, YearMonth, MAX_AMOUNT,
};
pub use engine::{BillingEngine, WindowSummary};
pub use error::{BillingError, BillingResult};
pub use free_hours::{FreeHoursAllocation, FreeHoursAllocator, FreeHoursPolicy, TierCredit};
pub use hosting::{
    select_credit_recipients, CreditProgress, HostingCreditAllocation, HostingCreditAllocator,
    HostingProrationEngine,
};
pub use loader::{DataLoader, RecordSet};
pub use pricing::TieredCostCalculator;
pub use projects::{ProjectCreditAllocation, ProjectCreditAllocator};
pub use summary::{
    format_money, round_currency, AverageCosts, BillingSummary, BillingSummaryReducer,
    DisplayTotals, MonthlyBillingSummary,
};

pub use chrono::NaiveDate;
pub use rust_decimal::Decimal;

pub mod prelude {
    pub use crate::config::BillingConfig;
    pub use crate::data_structures::{
        BillingWindow, PricingTier, ProjectCategory, ProjectRecord, TimeBasedRequest,
        WebsiteHostingInterval, YearMonth,
    };
    pub use crate::engine::{BillingEngine, WindowSummary};
    pub use crate::error::{BillingError, BillingResult};
    pub use crate::summary::{format_money, BillingSummary, MonthlyBillingSummary};
    pub use chrono::NaiveDate;
    pub use rust_decimal::Decimal;
}
