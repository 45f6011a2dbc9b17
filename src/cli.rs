//! Command-line interface definitions and argument parsing

use chrono::{NaiveDate, Utc};
use clap::Parser;

/// E-commerce order analytics and RFM customer segmentation reports
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the order-level CSV export
    #[arg(long, default_value = "data/orders.csv")]
    pub orders: String,

    /// Customer geolocation CSV with longitude/latitude columns
    #[arg(long)]
    pub geo_customers: Option<String>,

    /// Seller geolocation CSV with longitude/latitude columns
    #[arg(long)]
    pub geo_sellers: Option<String>,

    /// GeoJSON boundary file drawn under the geolocation maps
    #[arg(long)]
    pub boundary: Option<String>,

    /// Directory the PNG charts are written to
    #[arg(short, long, default_value = "report")]
    pub out_dir: String,

    /// Start of the purchase-date window (YYYY-MM-DD, requires --end-date)
    #[arg(long)]
    pub start_date: Option<String>,

    /// End of the purchase-date window, whole day included (requires --start-date)
    #[arg(long)]
    pub end_date: Option<String>,

    /// Reference date for recency scoring (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub as_of: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse the optional purchase-date window.
    /// Both bounds must be given together and the start must not follow the end.
    pub fn parse_date_range(&self) -> crate::Result<Option<(NaiveDate, NaiveDate)>> {
        match (&self.start_date, &self.end_date) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => {
                let start = parse_date(start)?;
                let end = parse_date(end)?;
                if start > end {
                    anyhow::bail!("start date {start} is after end date {end}");
                }
                Ok(Some((start, end)))
            }
            _ => anyhow::bail!("--start-date and --end-date must be given together"),
        }
    }

    /// Reference date used when turning estimated delivery dates into recency days.
    pub fn as_of_date(&self) -> crate::Result<NaiveDate> {
        match &self.as_of {
            Some(raw) => parse_date(raw),
            None => Ok(Utc::now().date_naive()),
        }
    }
}

fn parse_date(raw: &str) -> crate::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("invalid date '{}', expected YYYY-MM-DD", raw))
}
