//! Order data loading and the immutable table handle, built on Polars

use chrono::{NaiveDate, NaiveTime};
use polars::prelude::*;
use serde::Deserialize;

/// Microseconds per day, the physical unit of the parsed timestamp columns.
pub(crate) const MICROS_PER_DAY: f64 = 86_400_000_000.0;

/// Immutable handle around the loaded order table.
///
/// Every computation takes a reference to a handle; date filtering returns
/// a new handle instead of mutating the loaded data, so one loaded export
/// can back any number of filtered views.
#[derive(Debug, Clone)]
pub struct OrderTable {
    df: DataFrame,
}

impl OrderTable {
    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Restrict to orders purchased inside `[start, end]`, whole end day included.
    ///
    /// Pure: builds a new table, the receiver is untouched. An empty result
    /// is a valid table, not an error.
    pub fn filter_date_range(&self, start: NaiveDate, end: NaiveDate) -> crate::Result<OrderTable> {
        let window_start = start.and_time(NaiveTime::MIN).and_utc().timestamp_micros();
        let window_end = end
            .succ_opt()
            .ok_or_else(|| anyhow::anyhow!("end date {end} has no successor"))?
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp_micros();

        let df = self
            .df
            .clone()
            .lazy()
            .filter(
                col("order_purchase_timestamp")
                    .cast(DataType::Int64)
                    .gt_eq(lit(window_start))
                    .and(
                        col("order_purchase_timestamp")
                            .cast(DataType::Int64)
                            .lt(lit(window_end)),
                    ),
            )
            .collect()?;

        Ok(OrderTable { df })
    }

    /// Earliest and latest purchase timestamps as dates, `None` when empty.
    pub fn purchase_span(&self) -> crate::Result<Option<(NaiveDate, NaiveDate)>> {
        let purchases = self.df.column("order_purchase_timestamp")?.datetime()?;
        let span = match (purchases.min(), purchases.max()) {
            (Some(min), Some(max)) => Some((micros_to_date(min)?, micros_to_date(max)?)),
            _ => None,
        };
        Ok(span)
    }
}

pub(crate) fn micros_to_date(micros: i64) -> crate::Result<NaiveDate> {
    chrono::DateTime::from_timestamp_micros(micros)
        .map(|ts| ts.date_naive())
        .ok_or_else(|| anyhow::anyhow!("timestamp {micros}us is out of range"))
}

/// Load the order-level CSV export.
///
/// Expected columns: `order_id`, `customer_id`, `seller_id`,
/// `order_purchase_timestamp`, `order_delivered_customer_date` (may be
/// empty for undelivered orders), `order_estimated_delivery_date`,
/// `payment_value`, `product_category`, `review_score` (may be empty).
/// Timestamp columns are parsed to microsecond datetimes; rows are sorted
/// by purchase time.
pub fn load_orders(path: &str) -> crate::Result<OrderTable> {
    let df = LazyCsvReader::new(path)
        .with_try_parse_dates(true)
        .finish()?
        .sort("order_purchase_timestamp", SortOptions::default())
        .collect()?;

    if df.height() == 0 {
        anyhow::bail!("no orders found in {path}");
    }

    log::info!("loaded {} order rows from {path}", df.height());
    Ok(OrderTable { df })
}

/// A longitude/latitude pair from a geolocation CSV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

/// Load a geolocation CSV with `geolocation_lng`/`geolocation_lat` columns.
pub fn load_geolocation(path: &str) -> crate::Result<Vec<GeoPoint>> {
    let df = LazyCsvReader::new(path)
        .finish()?
        .select([col("geolocation_lng"), col("geolocation_lat")])
        .drop_nulls(None)
        .collect()?;

    let lng = df.column("geolocation_lng")?.f64()?;
    let lat = df.column("geolocation_lat")?.f64()?;

    Ok(lng
        .into_no_null_iter()
        .zip(lat.into_no_null_iter())
        .map(|(lng, lat)| GeoPoint { lng, lat })
        .collect())
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Geometry,
}

#[derive(Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum Geometry {
    Polygon(Vec<Vec<[f64; 2]>>),
    MultiPolygon(Vec<Vec<Vec<[f64; 2]>>>),
}

/// Load boundary rings from a GeoJSON feature collection.
///
/// Only Polygon and MultiPolygon geometries are supported; every ring is
/// returned as a closed (lng, lat) polyline for map rendering.
pub fn load_boundary(path: &str) -> crate::Result<Vec<Vec<(f64, f64)>>> {
    let raw = std::fs::read_to_string(path)?;
    let collection: FeatureCollection = serde_json::from_str(&raw)?;

    let mut rings = Vec::new();
    for feature in collection.features {
        match feature.geometry {
            Geometry::Polygon(polygon) => push_rings(&mut rings, polygon),
            Geometry::MultiPolygon(polygons) => {
                for polygon in polygons {
                    push_rings(&mut rings, polygon);
                }
            }
        }
    }

    log::info!("loaded {} boundary rings from {path}", rings.len());
    Ok(rings)
}

fn push_rings(rings: &mut Vec<Vec<(f64, f64)>>, polygon: Vec<Vec<[f64; 2]>>) {
    for ring in polygon {
        rings.push(ring.into_iter().map(|[lng, lat]| (lng, lat)).collect());
    }
}
