use agency_billing_engine::prelude::*;
use agency_billing_engine::{DataLoader, DaySelection, MonthSelection};
use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod report;

const DEFAULT_DATA_DIR: &str = "~/.agency-billing/data";
const DEFAULT_CONFIG_PATH: &str = "~/.agency-billing/config.json";

#[derive(Parser, Debug)]
#[clap(author = "Red", version, about)]
struct Args {
    #[arg(short = 'v')]
    verbose: bool,

    #[arg(short = 'c', long = "config")]
    config: Option<String>,

    #[arg(short = 'd', long = "data-dir")]
    data_dir: Option<String>,

    /// Defaults to the year of --as-of.
    #[arg(short = 'y', long = "year")]
    year: Option<i32>,

    #[arg(short = 'm', long = "month", default_value = "all")]
    month: MonthSelection,

    #[arg(long = "day", default_value = "all")]
    day: DaySelection,

    /// Last day of the reporting period, defaults to today.
    #[arg(long = "as-of")]
    as_of: Option<NaiveDate>,

    #[arg(long = "json")]
    json: bool,
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

fn load_config(explicit: Option<&str>) -> Result<BillingConfig> {
    match explicit {
        Some(path) => BillingConfig::load_from_file(expand_path(path)),
        None => {
            let path = expand_path(DEFAULT_CONFIG_PATH);
            if path.is_file() {
                BillingConfig::load_from_file(&path)
            } else {
                debug!("No config at {}, using defaults", path.display());
                Ok(BillingConfig::default())
            }
        }
    }
}

fn load_engine(config: BillingConfig, data_dir: &Path) -> Result<BillingEngine> {
    let records = DataLoader::new().load_from_directory(data_dir)?;
    info!(
        tickets = records.tickets.len(),
        sites = records.sites.len(),
        projects = records.projects.len(),
        "Loaded billing records"
    );
    BillingEngine::from_records(config, records).context("Invalid billing records")
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let data_dir = expand_path(args.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR));
    let engine = load_engine(config, &data_dir)?;

    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
    let window = BillingWindow {
        year: args.year.unwrap_or_else(|| as_of.year()),
        month: args.month,
        day: args.day,
    };

    let summary = engine.summarize(window, as_of)?;
    let progress = report::window_credit_progress(&engine, &window, as_of)?;

    if args.json {
        let report = report::JsonReport::new(&engine, &summary, progress);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let report = report::TextReport {
            engine: &engine,
            window: &window,
            summary: &summary,
            progress: &progress,
        };
        print!("{}", report);
    }

    Ok(())
}
