//! Chart rendering for the analytics report using Plotters

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::analytics::{
    CustomerSpend, MonthlyTrend, ProductPopularity, ReviewCount, SellerDeliveryTime,
    SellerEstimateGap, SellerRevenue,
};
use crate::data::GeoPoint;
use crate::segmentation::{SegmentCount, SegmentationOutput};

/// Accent for the best value in a chart
const HIGHLIGHT: RGBColor = RGBColor(100, 149, 237);
/// Accent for the worst value in a chart
const LOWLIGHT: RGBColor = RGBColor(178, 34, 34);
/// Everything that is not highlighted
const MUTED: RGBColor = RGBColor(192, 192, 192);

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Everything the report renderer consumes, borrowed from the pipeline.
pub struct ReportInputs<'a> {
    pub trends: &'a [MonthlyTrend],
    pub seller_revenue: &'a [SellerRevenue],
    pub customer_spend: &'a [CustomerSpend],
    pub product_popularity: &'a [ProductPopularity],
    pub delivery_time: &'a [SellerDeliveryTime],
    pub estimate_gap: &'a [SellerEstimateGap],
    pub reviews: &'a [ReviewCount],
    pub segmentation: &'a SegmentationOutput,
    pub customer_geo: &'a [GeoPoint],
    pub seller_geo: &'a [GeoPoint],
    pub boundary: &'a [Vec<(f64, f64)>],
}

/// Render every chart of the report into `out_dir`, creating it if needed.
/// Charts with no input rows are skipped, not treated as errors.
pub fn render_report(inputs: &ReportInputs, out_dir: &Path) -> crate::Result<()> {
    std::fs::create_dir_all(out_dir)?;

    monthly_revenue_chart(inputs.trends, &chart_path(out_dir, "monthly_revenue.png"))?;

    paired_extremes_chart(
        &inputs
            .seller_revenue
            .iter()
            .map(|r| (r.seller_id.clone(), r.revenue))
            .collect::<Vec<_>>(),
        "Highest Revenue",
        "Lowest Revenue",
        "Seller Id",
        "Revenue",
        &chart_path(out_dir, "seller_revenue.png"),
    )?;

    paired_extremes_chart(
        &inputs
            .customer_spend
            .iter()
            .map(|r| (r.customer_id.clone(), r.total_spend))
            .collect::<Vec<_>>(),
        "Highest Customer Spend",
        "Lowest Customer Spend",
        "Customer Id",
        "Spend",
        &chart_path(out_dir, "customer_spend.png"),
    )?;

    paired_extremes_chart(
        &inputs
            .product_popularity
            .iter()
            .map(|r| (r.category.clone(), r.order_count as f64))
            .collect::<Vec<_>>(),
        "Most Popular Product",
        "Least Popular Product",
        "Product category",
        "Total sold",
        &chart_path(out_dir, "product_popularity.png"),
    )?;

    paired_extremes_chart(
        &inputs
            .delivery_time
            .iter()
            .map(|r| (r.seller_id.clone(), r.mean_days))
            .collect::<Vec<_>>(),
        "Most Responsive Seller",
        "Least Responsive Seller",
        "Seller Id",
        "Day difference",
        &chart_path(out_dir, "delivery_time.png"),
    )?;

    paired_extremes_chart(
        &inputs
            .estimate_gap
            .iter()
            .map(|r| (r.seller_id.clone(), r.mean_days))
            .collect::<Vec<_>>(),
        "Earliest Delivery vs Estimate",
        "Latest Delivery vs Estimate",
        "Seller Id",
        "Day difference",
        &chart_path(out_dir, "estimate_gap.png"),
    )?;

    review_score_chart(inputs.reviews, &chart_path(out_dir, "review_scores.png"))?;
    value_tier_chart(
        inputs.segmentation,
        &chart_path(out_dir, "value_tiers.png"),
    )?;
    segment_pair_chart(
        &inputs.segmentation.segment_counts,
        &chart_path(out_dir, "tier_segments.png"),
    )?;

    geo_scatter_chart(
        inputs.customer_geo,
        inputs.boundary,
        "Customer Density Map",
        &chart_path(out_dir, "customer_map.png"),
    )?;
    geo_scatter_chart(
        inputs.seller_geo,
        inputs.boundary,
        "Seller Density Map",
        &chart_path(out_dir, "seller_map.png"),
    )?;

    Ok(())
}

fn chart_path(dir: &Path, name: &str) -> String {
    dir.join(name).to_string_lossy().into_owned()
}

/// Line chart of revenue per delivery month.
pub fn monthly_revenue_chart(trends: &[MonthlyTrend], output_path: &str) -> crate::Result<()> {
    if trends.is_empty() {
        log::warn!("no monthly trend rows, skipping {output_path}");
        return Ok(());
    }

    let labels: Vec<String> = trends
        .iter()
        .map(|t| {
            let month = MONTH_NAMES[((t.month as usize).saturating_sub(1)) % 12];
            format!("{month} {}", t.year)
        })
        .collect();
    let revenue: Vec<f64> = trends.iter().map(|t| t.revenue).collect();
    let y_max = revenue.iter().fold(0.0f64, |a, &b| a.max(b)).max(1.0) * 1.1;
    let n = trends.len();

    let root = BitMapBackend::new(output_path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Revenue by Month", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_labels(n.min(12))
        .x_label_formatter(&|x| {
            let idx = x.round();
            if idx < 0.0 {
                return String::new();
            }
            labels.get(idx as usize).cloned().unwrap_or_default()
        })
        .x_desc("Month")
        .y_desc("Revenue")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(LineSeries::new(
        revenue.iter().enumerate().map(|(i, &v)| (i as f64, v)),
        HIGHLIGHT.stroke_width(3),
    ))?;
    chart.draw_series(
        revenue
            .iter()
            .enumerate()
            .map(|(i, &v)| Circle::new((i as f64, v), 4, HIGHLIGHT.filled())),
    )?;

    root.present()?;
    log::info!("monthly revenue chart saved to {output_path}");
    Ok(())
}

/// Two side-by-side bar panels: the five best rows with the best one
/// highlighted, and the five worst rows with the worst one highlighted.
/// Expects rows sorted best-first.
pub fn paired_extremes_chart(
    rows: &[(String, f64)],
    title_high: &str,
    title_low: &str,
    x_desc: &str,
    y_desc: &str,
    output_path: &str,
) -> crate::Result<()> {
    if rows.is_empty() {
        log::warn!("no rows, skipping {output_path}");
        return Ok(());
    }

    let take = rows.len().min(5);
    let head: Vec<(String, f64)> = rows[..take].to_vec();
    // reversed so the extreme sits first in both panels
    let tail: Vec<(String, f64)> = rows[rows.len() - take..].iter().rev().cloned().collect();

    let root = BitMapBackend::new(output_path, (1200, 500)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, 2));

    bar_panel(&panels[0], title_high, &head, HIGHLIGHT, x_desc, y_desc)?;
    bar_panel(&panels[1], title_low, &tail, LOWLIGHT, x_desc, y_desc)?;

    root.present()?;
    log::info!("paired chart saved to {output_path}");
    Ok(())
}

/// Review-score distribution, most frequent score highlighted.
pub fn review_score_chart(reviews: &[ReviewCount], output_path: &str) -> crate::Result<()> {
    if reviews.is_empty() {
        log::warn!("no review rows, skipping {output_path}");
        return Ok(());
    }

    let rows: Vec<(String, f64)> = reviews
        .iter()
        .map(|r| (r.score.to_string(), r.orders as f64))
        .collect();

    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;
    bar_panel(
        &root,
        "Customer Satisfaction Rating",
        &rows,
        HIGHLIGHT,
        "Rating",
        "Order count",
    )?;
    root.present()?;
    Ok(())
}

/// Customer count per value tier, largest tier highlighted.
pub fn value_tier_chart(output: &SegmentationOutput, output_path: &str) -> crate::Result<()> {
    if output.customers.is_empty() {
        log::warn!("no scored customers, skipping {output_path}");
        return Ok(());
    }

    let rows: Vec<(String, f64)> = output
        .tier_counts()
        .into_iter()
        .map(|(tier, count)| (tier.label().to_string(), count as f64))
        .collect();

    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;
    bar_panel(
        &root,
        "Customer Count by Value Tier",
        &rows,
        HIGHLIGHT,
        "Value tier",
        "Customer count",
    )?;
    root.present()?;
    Ok(())
}

/// Population per (tier, segment) pair, largest pair highlighted.
pub fn segment_pair_chart(counts: &[SegmentCount], output_path: &str) -> crate::Result<()> {
    if counts.is_empty() {
        log::warn!("no segment pairs, skipping {output_path}");
        return Ok(());
    }

    let rows: Vec<(String, f64)> = counts
        .iter()
        .map(|c| {
            (
                format!("{}-{}", c.tier.label(), c.segment.as_str()),
                c.count as f64,
            )
        })
        .collect();

    let root = BitMapBackend::new(output_path, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)?;
    bar_panel(
        &root,
        "Customer Count by Tier and Segment",
        &rows,
        HIGHLIGHT,
        "Tier-Segment",
        "Customer count",
    )?;
    root.present()?;
    Ok(())
}

/// Density scatter of geolocation points over the boundary rings.
pub fn geo_scatter_chart(
    points: &[GeoPoint],
    boundary: &[Vec<(f64, f64)>],
    title: &str,
    output_path: &str,
) -> crate::Result<()> {
    if points.is_empty() {
        log::warn!("no geolocation points, skipping {output_path}");
        return Ok(());
    }

    let mut lng_min = f64::INFINITY;
    let mut lng_max = f64::NEG_INFINITY;
    let mut lat_min = f64::INFINITY;
    let mut lat_max = f64::NEG_INFINITY;
    for p in points {
        lng_min = lng_min.min(p.lng);
        lng_max = lng_max.max(p.lng);
        lat_min = lat_min.min(p.lat);
        lat_max = lat_max.max(p.lat);
    }
    let lng_pad = ((lng_max - lng_min) * 0.05).max(1.0);
    let lat_pad = ((lat_max - lat_min) * 0.05).max(1.0);

    let root = BitMapBackend::new(output_path, (900, 900)).into_drawing_area();
    root.fill(&WHITE)?;

    // no mesh: the map reads like the dashboard's axis-free plot
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .build_cartesian_2d(
            (lng_min - lng_pad)..(lng_max + lng_pad),
            (lat_min - lat_pad)..(lat_max + lat_pad),
        )?;

    for ring in boundary {
        chart.draw_series(LineSeries::new(ring.iter().copied(), &BLACK.mix(0.5)))?;
    }
    chart.draw_series(
        points
            .iter()
            .map(|p| Circle::new((p.lng, p.lat), 2, RED.mix(0.2).filled())),
    )?;

    root.present()?;
    log::info!("geolocation chart saved to {output_path}");
    Ok(())
}

/// Print the segmentation breakdown to stdout.
pub fn print_segmentation_summary(output: &SegmentationOutput) {
    println!("\n=== RFM Segmentation ===");
    println!("Customers scored: {}", output.customers.len());
    if output.customers.is_empty() {
        return;
    }

    let total = output.customers.len() as f64;
    println!("\nValue tiers:");
    for (tier, count) in output.tier_counts() {
        let percentage = (count as f64 / total) * 100.0;
        println!("  {}: {} customers ({:.1}%)", tier.label(), count, percentage);
    }

    println!("\nTier/segment pairs with more than one customer:");
    for pair in &output.segment_counts {
        println!(
            "  {}-{}: {} customers",
            pair.tier.label(),
            pair.segment.as_str(),
            pair.count
        );
    }
}

/// One vertical bar panel; the first row carries the accent color and a
/// value annotation, the rest stay muted.
fn bar_panel(
    area: &DrawingArea<BitMapBackend, Shift>,
    title: &str,
    rows: &[(String, f64)],
    accent: RGBColor,
    x_desc: &str,
    y_desc: &str,
) -> crate::Result<()> {
    let labels: Vec<String> = rows
        .iter()
        .map(|(label, _)| label.chars().take(10).collect())
        .collect();
    let values: Vec<f64> = rows.iter().map(|&(_, v)| v).collect();

    let low = values.iter().fold(0.0f64, |a, &b| a.min(b));
    let high = values.iter().fold(0.0f64, |a, &b| a.max(b));
    let pad = ((high - low).abs() * 0.15).max(1.0);
    let y_bottom = if low < 0.0 { low - pad } else { 0.0 };
    let n = rows.len();

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_bottom..(high + pad))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| {
            let idx = x.round();
            if idx < 0.0 {
                return String::new();
            }
            labels.get(idx as usize).cloned().unwrap_or_default()
        })
        .x_desc(x_desc)
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 14))
        .draw()?;

    for (i, &value) in values.iter().enumerate() {
        let color = if i == 0 { accent } else { MUTED };
        chart.draw_series(std::iter::once(Rectangle::new(
            [(i as f64 - 0.35, 0.0), (i as f64 + 0.35, value)],
            color.filled(),
        )))?;
    }

    chart.draw_series(std::iter::once(Text::new(
        format!("{:.2}", values[0]),
        (-0.3f64, values[0]),
        ("sans-serif", 14).into_font().color(&accent),
    )))?;

    Ok(())
}
