//! RFM scoring and customer segmentation
//!
//! Scores every customer with at least one delivered order on recency,
//! frequency and monetary value, sums the three ordinal scores, and
//! classifies the result twice: into relative value tiers that follow the
//! realized score distribution, and into fixed-threshold named segments.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use polars::prelude::*;

use crate::data::{micros_to_date, OrderTable};

/// Relative value bucket from equal-frequency partitioning of the summed
/// RFM score. Boundaries move with the score distribution of the current
/// view; only the ordering is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueTier {
    Low,
    Mid,
    High,
}

impl ValueTier {
    pub fn label(&self) -> &'static str {
        match self {
            ValueTier::Low => "Low-Value",
            ValueTier::Mid => "Mid-Value",
            ValueTier::High => "High-Value",
        }
    }

    /// Tier for the customer ranked `rank` (ascending by score) out of
    /// `population` customers. Rank-based tertiles partition any non-empty
    /// population deterministically.
    fn from_rank(rank: usize, population: usize) -> Self {
        match rank * 3 / population {
            0 => ValueTier::Low,
            1 => ValueTier::Mid,
            _ => ValueTier::High,
        }
    }
}

impl fmt::Display for ValueTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Named customer segment from fixed thresholds on the summed RFM score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SegmentLabel {
    Champions,
    PotentialLoyalists,
    AtRiskCustomers,
    CannotLose,
    Lost,
}

impl SegmentLabel {
    /// Classify a summed RFM score. Total over the valid 3..=15 range;
    /// the first matching threshold wins.
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= 9 => SegmentLabel::Champions,
            6..=8 => SegmentLabel::PotentialLoyalists,
            5 => SegmentLabel::AtRiskCustomers,
            4 => SegmentLabel::CannotLose,
            _ => SegmentLabel::Lost,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentLabel::Champions => "Champions",
            SegmentLabel::PotentialLoyalists => "Potential Loyalists",
            SegmentLabel::AtRiskCustomers => "At-Risk Customers",
            SegmentLabel::CannotLose => "Cannot Lose",
            SegmentLabel::Lost => "Lost",
        }
    }
}

impl fmt::Display for SegmentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scored customer, built fresh on every engine run.
#[derive(Debug, Clone)]
pub struct CustomerRfm {
    pub customer_id: String,
    /// Whole days from the most recent estimated delivery date to the
    /// engine's reference date.
    pub recency_days: i64,
    /// Order count over the full view, delivered or not.
    pub frequency: u32,
    /// Summed payment value over the customer's delivered orders.
    pub monetary: f64,
    pub recency_score: u8,
    pub frequency_score: u8,
    pub monetary_score: u8,
    /// Sum of the three ordinal scores, 3..=15.
    pub rfm_score: u8,
    pub value_tier: ValueTier,
    pub segment: SegmentLabel,
}

/// Population count for one (tier, segment) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentCount {
    pub tier: ValueTier,
    pub segment: SegmentLabel,
    pub count: u32,
}

/// The two tables a segmentation run produces.
#[derive(Debug, Default)]
pub struct SegmentationOutput {
    pub customers: Vec<CustomerRfm>,
    /// (tier, segment) pairs seen more than once, largest first.
    pub segment_counts: Vec<SegmentCount>,
}

impl SegmentationOutput {
    /// Customers per value tier, largest tier first.
    pub fn tier_counts(&self) -> Vec<(ValueTier, u32)> {
        let mut counts: BTreeMap<ValueTier, u32> = BTreeMap::new();
        for customer in &self.customers {
            *counts.entry(customer.value_tier).or_default() += 1;
        }
        let mut counts: Vec<_> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }
}

struct RawCustomer {
    customer_id: String,
    recency_days: i64,
    frequency: Option<i64>,
    monetary: f64,
}

/// Computes RFM scores, value tiers and named segments for every customer
/// in an order-table view.
pub struct SegmentationEngine {
    as_of: NaiveDate,
}

impl SegmentationEngine {
    /// `as_of` is the reference date recency is measured against.
    pub fn new(as_of: NaiveDate) -> Self {
        Self { as_of }
    }

    /// Run the full pipeline over one view. An empty view produces an
    /// empty output, never an error.
    pub fn run(&self, orders: &OrderTable) -> crate::Result<SegmentationOutput> {
        let raw = self.collect_customers(orders)?;
        if raw.is_empty() {
            log::info!("no delivered orders in view, segmentation output is empty");
            return Ok(SegmentationOutput::default());
        }

        let customers = score_customers(raw);
        let segment_counts = count_pairs(&customers);
        Ok(SegmentationOutput {
            customers,
            segment_counts,
        })
    }

    /// Per-customer raw RFM inputs.
    ///
    /// Recency and monetary come from delivered orders only; frequency
    /// counts the customer's orders across the whole view and is attached
    /// by left join, so a missing match surfaces as `None` instead of
    /// failing the run.
    fn collect_customers(&self, orders: &OrderTable) -> crate::Result<Vec<RawCustomer>> {
        let frequency = orders
            .frame()
            .clone()
            .lazy()
            .group_by([col("customer_id")])
            .agg([col("order_id")
                .count()
                .cast(DataType::Int64)
                .alias("frequency")]);

        let df = orders
            .frame()
            .clone()
            .lazy()
            .filter(col("order_delivered_customer_date").is_not_null())
            .group_by([col("customer_id")])
            .agg([
                col("order_estimated_delivery_date")
                    .max()
                    .alias("last_estimated"),
                col("payment_value").sum().alias("monetary"),
            ])
            .join(
                frequency,
                [col("customer_id")],
                [col("customer_id")],
                JoinArgs::new(JoinType::Left),
            )
            .sort("customer_id", SortOptions::default())
            .collect()?;

        let ids = df.column("customer_id")?.utf8()?;
        let estimated = df.column("last_estimated")?.datetime()?;
        let monetary = df.column("monetary")?.f64()?;
        let frequency = df.column("frequency")?.i64()?;

        let mut raw = Vec::with_capacity(df.height());
        for (((id, estimated), monetary), frequency) in ids
            .into_iter()
            .zip(estimated.into_iter())
            .zip(monetary.into_iter())
            .zip(frequency.into_iter())
        {
            let (Some(id), Some(estimated), Some(monetary)) = (id, estimated, monetary) else {
                continue;
            };
            let estimated_date = micros_to_date(estimated)?;
            raw.push(RawCustomer {
                customer_id: id.to_string(),
                recency_days: self.as_of.signed_duration_since(estimated_date).num_days(),
                frequency,
                monetary,
            });
        }
        Ok(raw)
    }
}

fn score_customers(raw: Vec<RawCustomer>) -> Vec<CustomerRfm> {
    let recency: Vec<f64> = raw.iter().map(|c| c.recency_days as f64).collect();
    let frequency: Vec<f64> = raw
        .iter()
        .map(|c| c.frequency.unwrap_or(0) as f64)
        .collect();
    let monetary: Vec<f64> = raw.iter().map(|c| c.monetary).collect();

    let recency_range = scored_range("recency", &recency);
    let frequency_range = scored_range("frequency", &frequency);
    let monetary_range = scored_range("monetary", &monetary);

    let mut customers: Vec<CustomerRfm> = raw
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            // most recent orders score highest, so recency inverts the bucket
            let recency_score = 6 - equal_width_bucket(recency[i], recency_range);
            let frequency_score = equal_width_bucket(frequency[i], frequency_range);
            let monetary_score = equal_width_bucket(monetary[i], monetary_range);
            let rfm_score = recency_score + frequency_score + monetary_score;
            CustomerRfm {
                customer_id: c.customer_id,
                recency_days: c.recency_days,
                frequency: c.frequency.unwrap_or(0) as u32,
                monetary: c.monetary,
                recency_score,
                frequency_score,
                monetary_score,
                rfm_score,
                // tiers depend on the whole score distribution, assigned below
                value_tier: ValueTier::Low,
                segment: SegmentLabel::from_score(rfm_score),
            }
        })
        .collect();

    assign_tiers(&mut customers);
    customers
}

/// Column min/max used as the bucket range; warns when the column has no
/// variance and every value will collapse into the middle bucket.
fn scored_range(name: &str, values: &[f64]) -> (f64, f64) {
    let min = values.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    if max - min <= f64::EPSILON {
        log::warn!("{name} column has no variance, every customer gets the middle score");
    }
    (min, max)
}

/// Equal-width five-bucket index in 1..=5 over `[min, max]`.
/// A constant column maps everything to the middle bucket.
fn equal_width_bucket(value: f64, (min, max): (f64, f64)) -> u8 {
    let span = max - min;
    if span <= f64::EPSILON {
        return 3;
    }
    let position = (value - min) / (span / 5.0);
    (position.ceil() as i64).clamp(1, 5) as u8
}

/// Equal-frequency tier assignment over the summed scores: customers are
/// ranked ascending (ties broken by customer id) and split into tertiles.
fn assign_tiers(customers: &mut [CustomerRfm]) {
    let population = customers.len();
    let mut order: Vec<usize> = (0..population).collect();
    order.sort_by(|&a, &b| {
        customers[a]
            .rfm_score
            .cmp(&customers[b].rfm_score)
            .then_with(|| customers[a].customer_id.cmp(&customers[b].customer_id))
    });
    for (rank, &idx) in order.iter().enumerate() {
        customers[idx].value_tier = ValueTier::from_rank(rank, population);
    }
}

/// (tier, segment) population counts, keeping only pairs seen more than
/// once, largest first.
fn count_pairs(customers: &[CustomerRfm]) -> Vec<SegmentCount> {
    let mut counts: BTreeMap<(ValueTier, SegmentLabel), u32> = BTreeMap::new();
    for customer in customers {
        *counts.entry((customer.value_tier, customer.segment)).or_default() += 1;
    }

    let mut pairs: Vec<SegmentCount> = counts
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|((tier, segment), count)| SegmentCount {
            tier,
            segment,
            count,
        })
        .collect();
    pairs.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| (a.tier, a.segment).cmp(&(b.tier, b.segment)))
    });
    pairs
}
