//! Descriptive aggregations over the order table
//!
//! Each function collects one lazy group-by over an [`OrderTable`] view and
//! extracts the result into a typed row vector. All of them return empty
//! vectors on an empty view.

use polars::prelude::*;

use crate::data::{OrderTable, MICROS_PER_DAY};

/// Summed payment value per seller, highest first.
#[derive(Debug, Clone, PartialEq)]
pub struct SellerRevenue {
    pub seller_id: String,
    pub revenue: f64,
}

/// Summed payment value per customer, highest first.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerSpend {
    pub customer_id: String,
    pub total_spend: f64,
}

/// Order count per product category, highest first.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPopularity {
    pub category: String,
    pub order_count: u64,
}

/// Order count and revenue per delivery month, chronological.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTrend {
    pub year: i32,
    pub month: u32,
    pub order_count: u64,
    pub revenue: f64,
}

/// Mean days from purchase to delivery per seller, fastest first.
#[derive(Debug, Clone, PartialEq)]
pub struct SellerDeliveryTime {
    pub seller_id: String,
    pub mean_days: f64,
}

/// Mean days delivered ahead of the estimate per seller, earliest first.
/// Negative values mean the seller delivers after the estimated date.
#[derive(Debug, Clone, PartialEq)]
pub struct SellerEstimateGap {
    pub seller_id: String,
    pub mean_days: f64,
}

/// Order count per review score, most frequent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewCount {
    pub score: i32,
    pub orders: u64,
}

/// Header metric pair for the report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalesSummary {
    pub total_orders: u64,
    pub total_revenue: f64,
}

pub fn revenue_by_seller(orders: &OrderTable) -> crate::Result<Vec<SellerRevenue>> {
    let df = orders
        .frame()
        .clone()
        .lazy()
        .group_by([col("seller_id")])
        .agg([col("payment_value").sum().alias("revenue")])
        .sort(
            "revenue",
            SortOptions {
                descending: true,
                ..Default::default()
            },
        )
        .collect()?;

    let ids = df.column("seller_id")?.utf8()?;
    let revenue = df.column("revenue")?.f64()?;

    Ok(ids
        .into_iter()
        .zip(revenue.into_iter())
        .filter_map(|(id, revenue)| {
            Some(SellerRevenue {
                seller_id: id?.to_string(),
                revenue: revenue?,
            })
        })
        .collect())
}

pub fn spend_by_customer(orders: &OrderTable) -> crate::Result<Vec<CustomerSpend>> {
    let df = orders
        .frame()
        .clone()
        .lazy()
        .group_by([col("customer_id")])
        .agg([col("payment_value").sum().alias("total_spend")])
        .sort(
            "total_spend",
            SortOptions {
                descending: true,
                ..Default::default()
            },
        )
        .collect()?;

    let ids = df.column("customer_id")?.utf8()?;
    let spend = df.column("total_spend")?.f64()?;

    Ok(ids
        .into_iter()
        .zip(spend.into_iter())
        .filter_map(|(id, total_spend)| {
            Some(CustomerSpend {
                customer_id: id?.to_string(),
                total_spend: total_spend?,
            })
        })
        .collect())
}

pub fn product_popularity(orders: &OrderTable) -> crate::Result<Vec<ProductPopularity>> {
    let df = orders
        .frame()
        .clone()
        .lazy()
        .filter(col("product_category").is_not_null())
        .group_by([col("product_category")])
        .agg([col("order_id")
            .count()
            .cast(DataType::Int64)
            .alias("order_count")])
        .sort(
            "order_count",
            SortOptions {
                descending: true,
                ..Default::default()
            },
        )
        .collect()?;

    let categories = df.column("product_category")?.utf8()?;
    let counts = df.column("order_count")?.i64()?;

    Ok(categories
        .into_iter()
        .zip(counts.into_iter())
        .filter_map(|(category, count)| {
            Some(ProductPopularity {
                category: category?.to_string(),
                order_count: count? as u64,
            })
        })
        .collect())
}

/// Order count and revenue grouped by the year/month of the delivery date.
/// Undelivered orders carry no delivery month and are left out.
pub fn monthly_trends(orders: &OrderTable) -> crate::Result<Vec<MonthlyTrend>> {
    let df = orders
        .frame()
        .clone()
        .lazy()
        .filter(col("order_delivered_customer_date").is_not_null())
        .with_columns([
            col("order_delivered_customer_date")
                .dt()
                .year()
                .cast(DataType::Int32)
                .alias("year"),
            col("order_delivered_customer_date")
                .dt()
                .month()
                .cast(DataType::Int32)
                .alias("month"),
        ])
        .group_by([col("year"), col("month")])
        .agg([
            col("order_id")
                .count()
                .cast(DataType::Int64)
                .alias("order_count"),
            col("payment_value").sum().alias("revenue"),
        ])
        .sort_by_exprs([col("year"), col("month")], [false, false], false, false)
        .collect()?;

    let years = df.column("year")?.i32()?;
    let months = df.column("month")?.i32()?;
    let counts = df.column("order_count")?.i64()?;
    let revenue = df.column("revenue")?.f64()?;

    let mut trends = Vec::with_capacity(df.height());
    for (((year, month), count), revenue) in years
        .into_iter()
        .zip(months.into_iter())
        .zip(counts.into_iter())
        .zip(revenue.into_iter())
    {
        let (Some(year), Some(month), Some(count), Some(revenue)) = (year, month, count, revenue)
        else {
            continue;
        };
        trends.push(MonthlyTrend {
            year,
            month: month as u32,
            order_count: count as u64,
            revenue,
        });
    }
    Ok(trends)
}

/// Mean purchase-to-delivery duration per seller in fractional days,
/// rounded to two decimals, most responsive seller first.
pub fn delivery_time_by_seller(orders: &OrderTable) -> crate::Result<Vec<SellerDeliveryTime>> {
    let rows = mean_day_gap_by_seller(
        orders,
        "order_delivered_customer_date",
        "order_purchase_timestamp",
        false,
    )?;
    Ok(rows
        .into_iter()
        .map(|(seller_id, mean_days)| SellerDeliveryTime {
            seller_id,
            mean_days,
        })
        .collect())
}

/// Mean delivered-ahead-of-estimate duration per seller in fractional days,
/// rounded to two decimals, earliest-delivering seller first.
pub fn estimate_gap_by_seller(orders: &OrderTable) -> crate::Result<Vec<SellerEstimateGap>> {
    let rows = mean_day_gap_by_seller(
        orders,
        "order_estimated_delivery_date",
        "order_delivered_customer_date",
        true,
    )?;
    Ok(rows
        .into_iter()
        .map(|(seller_id, mean_days)| SellerEstimateGap {
            seller_id,
            mean_days,
        })
        .collect())
}

fn mean_day_gap_by_seller(
    orders: &OrderTable,
    later: &str,
    earlier: &str,
    descending: bool,
) -> crate::Result<Vec<(String, f64)>> {
    let df = orders
        .frame()
        .clone()
        .lazy()
        .filter(col("order_delivered_customer_date").is_not_null())
        .with_columns([((col(later).cast(DataType::Int64)
            - col(earlier).cast(DataType::Int64))
        .cast(DataType::Float64)
            / lit(MICROS_PER_DAY))
        .alias("day_gap")])
        .group_by([col("seller_id")])
        .agg([col("day_gap").mean().alias("mean_days")])
        .with_columns([col("mean_days").round(2)])
        .sort(
            "mean_days",
            SortOptions {
                descending,
                ..Default::default()
            },
        )
        .collect()?;

    let ids = df.column("seller_id")?.utf8()?;
    let means = df.column("mean_days")?.f64()?;

    Ok(ids
        .into_iter()
        .zip(means.into_iter())
        .filter_map(|(id, mean_days)| Some((id?.to_string(), mean_days?)))
        .collect())
}

pub fn review_counts(orders: &OrderTable) -> crate::Result<Vec<ReviewCount>> {
    let df = orders
        .frame()
        .clone()
        .lazy()
        .filter(col("review_score").is_not_null())
        .with_columns([col("review_score").cast(DataType::Int32)])
        .group_by([col("review_score")])
        .agg([col("order_id").count().cast(DataType::Int64).alias("orders")])
        .sort(
            "orders",
            SortOptions {
                descending: true,
                ..Default::default()
            },
        )
        .collect()?;

    let scores = df.column("review_score")?.i32()?;
    let counts = df.column("orders")?.i64()?;

    Ok(scores
        .into_iter()
        .zip(counts.into_iter())
        .filter_map(|(score, orders)| {
            Some(ReviewCount {
                score: score?,
                orders: orders? as u64,
            })
        })
        .collect())
}

/// Header totals derived from the monthly trend rows (delivered orders only).
pub fn sales_summary(trends: &[MonthlyTrend]) -> SalesSummary {
    SalesSummary {
        total_orders: trends.iter().map(|t| t.order_count).sum(),
        total_revenue: trends.iter().map(|t| t.revenue).sum(),
    }
}
