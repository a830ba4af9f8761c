use agency_billing_engine::prelude::*;
use agency_billing_engine::{DataLoader, RecordSet};
use rust_decimal_macros::dec;
use std::env;

fn demo_records() -> RecordSet {
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();

    RecordSet {
        tickets: vec![
            TimeBasedRequest::new("T-100", date(2024, 3, 4), PricingTier::Low, dec!(1.6)),
            TimeBasedRequest::new("T-101", date(2024, 3, 18), PricingTier::High, dec!(0.5)),
            TimeBasedRequest::new("T-102", date(2024, 4, 2), PricingTier::Medium, dec!(3)),
        ],
        sites: vec![
            WebsiteHostingInterval::new("S-1", "Storefront", "https://store.example", date(2023, 11, 1), None),
            WebsiteHostingInterval::new("S-2", "Blog", "https://blog.example", date(2024, 3, 12), None),
        ],
        projects: vec![ProjectRecord::new(
            "P-1",
            "Spring promo",
            ProjectCategory::LandingPage,
            date(2024, 3, 20),
            dec!(200),
        )],
    }
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let records = if args.len() >= 2 {
        println!("Loading records from: {}", args[1]);
        DataLoader::new().load_from_directory(&args[1])?
    } else {
        println!("No data directory given, using demo records");
        demo_records()
    };

    let engine = BillingEngine::from_records(BillingConfig::default(), records)?;
    let as_of = NaiveDate::from_ymd_opt(2024, 4, 30).unwrap_or_default();
    let summary = engine.summarize_all_time(as_of)?;

    println!("\n--- Monthly Breakdown ---");
    for month in &summary.monthly_breakdown {
        println!(
            "{}: tickets {} / projects {} / hosting {} => {}",
            month.month,
            format_money(month.tickets_revenue),
            format_money(month.projects_revenue),
            format_money(month.hosting_revenue),
            format_money(month.total_revenue),
        );
    }

    println!("\n--- All Time ---");
    println!("Total revenue: {}", format_money(summary.total_revenue));
    println!("Gross revenue: {}", format_money(summary.total_gross_revenue));

    Ok(())
}
