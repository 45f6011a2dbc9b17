//! Integration tests for OrderLens

use chrono::NaiveDate;
use orderlens::{analytics, load_orders, SegmentLabel, SegmentationEngine, ValueTier};
use std::io::Write;
use tempfile::NamedTempFile;

/// Fixture export with five delivered customers and one undelivered order.
///
/// Payments are 100.0 per order, so against the reference date 2018-06-01
/// the five customers land on recency 10/100/200/300/410 days, frequency
/// 5/4/3/2/1 and monetary 500/400/300/200/100, spreading the summed RFM
/// scores over 15/12/9/6/3.
fn create_orders_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "order_id,customer_id,seller_id,order_purchase_timestamp,order_delivered_customer_date,order_estimated_delivery_date,payment_value,product_category,review_score"
    )
    .unwrap();

    // c1: five delivered orders, most recent estimated delivery
    writeln!(file, "o1,c1,s1,2018-01-05 10:00:00,2018-01-10 10:00:00,2018-05-22 00:00:00,100.0,electronics,5").unwrap();
    writeln!(file, "o2,c1,s1,2018-01-15 10:00:00,2018-01-20 10:00:00,2018-05-22 00:00:00,100.0,electronics,5").unwrap();
    writeln!(file, "o3,c1,s1,2018-02-05 10:00:00,2018-02-10 10:00:00,2018-05-22 00:00:00,100.0,electronics,5").unwrap();
    writeln!(file, "o4,c1,s1,2018-02-15 10:00:00,2018-02-20 10:00:00,2018-05-22 00:00:00,100.0,electronics,5").unwrap();
    writeln!(file, "o5,c1,s1,2018-03-05 10:00:00,2018-03-10 10:00:00,2018-05-22 00:00:00,100.0,electronics,5").unwrap();

    // c2: four delivered orders
    writeln!(file, "o6,c2,s2,2018-01-08 10:00:00,2018-01-13 10:00:00,2018-02-21 00:00:00,100.0,toys,4").unwrap();
    writeln!(file, "o7,c2,s2,2018-02-08 10:00:00,2018-02-13 10:00:00,2018-02-21 00:00:00,100.0,toys,4").unwrap();
    writeln!(file, "o8,c2,s2,2018-03-08 10:00:00,2018-03-13 10:00:00,2018-02-21 00:00:00,100.0,toys,4").unwrap();
    writeln!(file, "o9,c2,s2,2018-03-18 10:00:00,2018-03-23 10:00:00,2018-02-21 00:00:00,100.0,toys,4").unwrap();

    // c3: three delivered orders
    writeln!(file, "o10,c3,s3,2017-09-01 10:00:00,2017-09-06 10:00:00,2017-11-13 00:00:00,100.0,books,3").unwrap();
    writeln!(file, "o11,c3,s3,2017-09-10 10:00:00,2017-09-15 10:00:00,2017-11-13 00:00:00,100.0,books,3").unwrap();
    writeln!(file, "o12,c3,s3,2017-10-01 10:00:00,2017-10-06 10:00:00,2017-11-13 00:00:00,100.0,books,3").unwrap();

    // c4: two delivered orders
    writeln!(file, "o13,c4,s4,2017-06-01 10:00:00,2017-06-06 10:00:00,2017-08-05 00:00:00,100.0,garden,2").unwrap();
    writeln!(file, "o14,c4,s4,2017-06-10 10:00:00,2017-06-15 10:00:00,2017-08-05 00:00:00,100.0,garden,2").unwrap();

    // c5: a single delivered order
    writeln!(file, "o15,c5,s5,2017-02-01 10:00:00,2017-02-06 10:00:00,2017-04-17 00:00:00,100.0,auto,1").unwrap();

    // c6: never delivered, no review
    writeln!(
        file,
        "o16,c6,s5,2018-04-01 10:00:00,,2018-04-20 00:00:00,50.0,home,"
    )
    .unwrap();

    file
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 6, 1).unwrap()
}

#[test]
fn test_segmentation_end_to_end() {
    let file = create_orders_csv();
    let orders = load_orders(file.path().to_str().unwrap()).unwrap();
    assert_eq!(orders.len(), 16);

    let output = SegmentationEngine::new(as_of()).run(&orders).unwrap();

    // c6 has no delivered order and never reaches the scored table
    assert_eq!(output.customers.len(), 5);
    assert!(!output.customers.iter().any(|c| c.customer_id == "c6"));

    let by_id = |id: &str| {
        output
            .customers
            .iter()
            .find(|c| c.customer_id == id)
            .unwrap()
    };

    let c1 = by_id("c1");
    assert_eq!(c1.recency_days, 10);
    assert_eq!(c1.frequency, 5);
    assert_eq!(c1.monetary, 500.0);
    assert_eq!(
        (c1.recency_score, c1.frequency_score, c1.monetary_score),
        (5, 5, 5)
    );
    assert_eq!(c1.rfm_score, 15);
    assert_eq!(c1.segment, SegmentLabel::Champions);
    assert_eq!(c1.value_tier, ValueTier::High);

    let c2 = by_id("c2");
    assert_eq!((c2.recency_days, c2.rfm_score), (100, 12));
    assert_eq!(c2.segment, SegmentLabel::Champions);
    assert_eq!(c2.value_tier, ValueTier::Mid);

    let c3 = by_id("c3");
    assert_eq!((c3.recency_days, c3.rfm_score), (200, 9));
    assert_eq!(c3.segment, SegmentLabel::Champions);
    assert_eq!(c3.value_tier, ValueTier::Mid);

    let c4 = by_id("c4");
    assert_eq!((c4.recency_days, c4.rfm_score), (300, 6));
    assert_eq!(c4.segment, SegmentLabel::PotentialLoyalists);
    assert_eq!(c4.value_tier, ValueTier::Low);

    let c5 = by_id("c5");
    assert_eq!((c5.recency_days, c5.rfm_score), (410, 3));
    assert_eq!(c5.segment, SegmentLabel::Lost);
    assert_eq!(c5.value_tier, ValueTier::Low);

    // only (Mid, Champions) occurs more than once
    assert_eq!(output.segment_counts.len(), 1);
    let pair = output.segment_counts[0];
    assert_eq!(pair.tier, ValueTier::Mid);
    assert_eq!(pair.segment, SegmentLabel::Champions);
    assert_eq!(pair.count, 2);

    let tiers = output.tier_counts();
    assert_eq!(tiers.iter().map(|&(_, n)| n).sum::<u32>(), 5);
}

#[test]
fn test_date_filter_reshapes_segmentation() {
    let file = create_orders_csv();
    let orders = load_orders(file.path().to_str().unwrap()).unwrap();

    let view = orders
        .filter_date_range(
            NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2018, 3, 31).unwrap(),
        )
        .unwrap();
    assert_eq!(view.len(), 9);

    let output = SegmentationEngine::new(as_of()).run(&view).unwrap();
    assert_eq!(output.customers.len(), 2);

    // tier boundaries follow the filtered distribution: with only two
    // customers the top score lands in Mid, not High
    let c1 = output
        .customers
        .iter()
        .find(|c| c.customer_id == "c1")
        .unwrap();
    assert_eq!(c1.rfm_score, 15);
    assert_eq!(c1.value_tier, ValueTier::Mid);
    assert_eq!(c1.segment, SegmentLabel::Champions);

    let c2 = output
        .customers
        .iter()
        .find(|c| c.customer_id == "c2")
        .unwrap();
    assert_eq!(c2.rfm_score, 3);
    assert_eq!(c2.value_tier, ValueTier::Low);
    assert_eq!(c2.segment, SegmentLabel::Lost);

    // every pair occurs once, so the pair table is empty
    assert!(output.segment_counts.is_empty());
}

#[test]
fn test_date_filter_includes_whole_end_day() {
    let file = create_orders_csv();
    let orders = load_orders(file.path().to_str().unwrap()).unwrap();

    // o2 is purchased at 10:00 on the end day
    let view = orders
        .filter_date_range(
            NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2018, 1, 15).unwrap(),
        )
        .unwrap();
    assert_eq!(view.len(), 3);
}

#[test]
fn test_empty_date_range_yields_empty_outputs() {
    let file = create_orders_csv();
    let orders = load_orders(file.path().to_str().unwrap()).unwrap();

    let view = orders
        .filter_date_range(
            NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(1990, 12, 31).unwrap(),
        )
        .unwrap();
    assert!(view.is_empty());

    let output = SegmentationEngine::new(as_of()).run(&view).unwrap();
    assert!(output.customers.is_empty());
    assert!(output.segment_counts.is_empty());
    assert!(output.tier_counts().is_empty());

    assert!(analytics::monthly_trends(&view).unwrap().is_empty());
    assert!(analytics::revenue_by_seller(&view).unwrap().is_empty());
    assert!(analytics::review_counts(&view).unwrap().is_empty());
}

#[test]
fn test_aggregates_over_fixture() {
    let file = create_orders_csv();
    let orders = load_orders(file.path().to_str().unwrap()).unwrap();

    let trends = analytics::monthly_trends(&orders).unwrap();
    let summary = analytics::sales_summary(&trends);
    // the undelivered order o16 is excluded from the delivered totals
    assert_eq!(summary.total_orders, 15);
    assert_eq!(summary.total_revenue, 1500.0);
    assert_eq!(trends.len(), 7);
    assert_eq!((trends[0].year, trends[0].month), (2017, 2));
    assert_eq!((trends[6].year, trends[6].month), (2018, 3));
    assert_eq!(trends[6].order_count, 3);

    let revenue = analytics::revenue_by_seller(&orders).unwrap();
    let ids: Vec<&str> = revenue.iter().map(|r| r.seller_id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "s2", "s3", "s4", "s5"]);
    assert_eq!(revenue[0].revenue, 500.0);
    assert_eq!(revenue[4].revenue, 150.0);

    let spend = analytics::spend_by_customer(&orders).unwrap();
    assert_eq!(spend[0].customer_id, "c1");
    assert_eq!(spend[0].total_spend, 500.0);
    assert_eq!(spend.last().unwrap().customer_id, "c6");

    let products = analytics::product_popularity(&orders).unwrap();
    assert_eq!(products[0].category, "electronics");
    assert_eq!(products[0].order_count, 5);
    assert_eq!(products.iter().map(|p| p.order_count).sum::<u64>(), 16);

    let reviews = analytics::review_counts(&orders).unwrap();
    assert_eq!(reviews.len(), 5);
    assert_eq!(reviews[0].score, 5);
    assert_eq!(reviews[0].orders, 5);
    assert_eq!(reviews[4].orders, 1);
}

#[test]
fn test_delivery_statistics_over_fixture() {
    let file = create_orders_csv();
    let orders = load_orders(file.path().to_str().unwrap()).unwrap();

    // every delivered order arrives exactly five days after purchase
    let delivery = analytics::delivery_time_by_seller(&orders).unwrap();
    assert_eq!(delivery.len(), 5);
    assert!(delivery.iter().all(|r| (r.mean_days - 5.0).abs() < 1e-9));

    let gaps = analytics::estimate_gap_by_seller(&orders).unwrap();
    assert_eq!(gaps.len(), 5);
    // s1 delivers furthest ahead of its estimates, s2 is late on average
    assert_eq!(gaps[0].seller_id, "s1");
    assert!((gaps[0].mean_days - 103.38).abs() < 1e-6);
    assert_eq!(gaps[4].seller_id, "s2");
    assert!((gaps[4].mean_days - (-1.17)).abs() < 1e-6);
    assert!(gaps.windows(2).all(|w| w[0].mean_days >= w[1].mean_days));
}
