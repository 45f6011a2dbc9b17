//! OrderLens: e-commerce order analytics and RFM customer segmentation
//!
//! This library loads an order-level CSV export, computes descriptive
//! aggregates (seller revenue, customer spend, product popularity, monthly
//! trends, delivery statistics, review distribution) and RFM (Recency,
//! Frequency, Monetary) customer segments, and renders the results as a
//! set of PNG charts.

pub mod analytics;
pub mod cli;
pub mod data;
pub mod segmentation;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{load_boundary, load_geolocation, load_orders, GeoPoint, OrderTable};
pub use segmentation::{
    CustomerRfm, SegmentCount, SegmentLabel, SegmentationEngine, SegmentationOutput, ValueTier,
};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
