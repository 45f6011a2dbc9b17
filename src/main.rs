//! OrderLens: e-commerce order analytics and RFM customer segmentation
//!
//! This is the main entrypoint that orchestrates data loading, date-range
//! filtering, aggregation, segmentation and chart rendering.

use anyhow::Result;
use clap::Parser;
use orderlens::{analytics, data, viz, Args, SegmentationEngine};
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.verbose {
        println!("OrderLens - E-Commerce Order Analytics");
        println!("======================================\n");
    }

    run_report(&args)
}

/// Run the full report pipeline: load, filter, aggregate, segment, render.
fn run_report(args: &Args) -> Result<()> {
    let start_time = Instant::now();

    // Step 1: Load the order export
    if args.verbose {
        println!("Step 1: Loading order data");
        println!("  Input file: {}", args.orders);
    }

    let load_start = Instant::now();
    let orders = data::load_orders(&args.orders)?;
    println!("✓ Orders loaded: {} rows", orders.len());
    if args.verbose {
        println!("  Loading time: {:.2}s", load_start.elapsed().as_secs_f64());
        if let Some((first, last)) = orders.purchase_span()? {
            println!("  Purchase window: {first} to {last}");
        }
    }

    // Step 2: Apply the optional purchase-date window
    let view = match args.parse_date_range()? {
        Some((start, end)) => {
            let view = orders.filter_date_range(start, end)?;
            println!(
                "✓ Date filter {start} to {end}: {} of {} rows retained",
                view.len(),
                orders.len()
            );
            view
        }
        None => orders,
    };

    // Step 3: Descriptive aggregates
    if args.verbose {
        println!("\nStep 2: Computing aggregates");
    }

    let agg_start = Instant::now();
    let trends = analytics::monthly_trends(&view)?;
    let summary = analytics::sales_summary(&trends);
    let seller_revenue = analytics::revenue_by_seller(&view)?;
    let customer_spend = analytics::spend_by_customer(&view)?;
    let product_popularity = analytics::product_popularity(&view)?;
    let delivery_time = analytics::delivery_time_by_seller(&view)?;
    let estimate_gap = analytics::estimate_gap_by_seller(&view)?;
    let reviews = analytics::review_counts(&view)?;

    println!("✓ Aggregates computed");
    println!("  Total orders: {}", summary.total_orders);
    println!("  Total revenue: {:.2}", summary.total_revenue);
    if args.verbose {
        println!("  Aggregation time: {:.2}s", agg_start.elapsed().as_secs_f64());
    }

    // Step 4: RFM segmentation
    if args.verbose {
        println!("\nStep 3: Segmenting customers");
    }

    let seg_start = Instant::now();
    let engine = SegmentationEngine::new(args.as_of_date()?);
    let segmentation = engine.run(&view)?;

    println!(
        "✓ Segmentation complete: {} customers scored",
        segmentation.customers.len()
    );
    if args.verbose {
        println!(
            "  Segmentation time: {:.2}s",
            seg_start.elapsed().as_secs_f64()
        );
    }
    viz::print_segmentation_summary(&segmentation);

    // Step 5: Optional geolocation inputs
    let customer_geo = match &args.geo_customers {
        Some(path) => data::load_geolocation(path)?,
        None => Vec::new(),
    };
    let seller_geo = match &args.geo_sellers {
        Some(path) => data::load_geolocation(path)?,
        None => Vec::new(),
    };
    let boundary = match &args.boundary {
        Some(path) => data::load_boundary(path)?,
        None => Vec::new(),
    };

    // Step 6: Render the report
    if args.verbose {
        println!("\nStep 4: Rendering charts");
        println!("  Output directory: {}", args.out_dir);
    }

    let viz_start = Instant::now();
    let inputs = viz::ReportInputs {
        trends: &trends,
        seller_revenue: &seller_revenue,
        customer_spend: &customer_spend,
        product_popularity: &product_popularity,
        delivery_time: &delivery_time,
        estimate_gap: &estimate_gap,
        reviews: &reviews,
        segmentation: &segmentation,
        customer_geo: &customer_geo,
        seller_geo: &seller_geo,
        boundary: &boundary,
    };
    viz::render_report(&inputs, Path::new(&args.out_dir))?;

    println!("\n✓ Charts written to: {}", args.out_dir);
    if args.verbose {
        println!("  Rendering time: {:.2}s", viz_start.elapsed().as_secs_f64());
    }

    println!("\n=== Report Complete ===");
    println!(
        "Total processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}
