//! Data types produced by the aggregation pipeline.

use clap::ValueEnum;
use serde::Serialize;

/// Time-bucketing unit for the purchase-timestamp series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Calendar month, keyed `YYYY-MM`.
    Month,
    /// Calendar day, keyed `YYYY-MM-DD`.
    Day,
}

/// One entry of the top-categories ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// Transaction count for one time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketCount {
    pub bucket: String,
    pub count: usize,
}

/// Distinct-order volume for one city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityVolume {
    pub city: String,
    pub orders: usize,
}

/// Mean delivery duration for one purchase month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyMean {
    pub bucket: String,
    pub mean_days: f64,
}

/// Delivery-duration summary over the rows where both timestamps parsed.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryStats {
    /// Rows contributing to the mean; rows missing either timestamp are
    /// excluded from numerator and denominator alike.
    pub measured_rows: usize,
    /// `None` when no row carries both timestamps.
    pub mean_days: Option<f64>,
    pub per_month: Vec<MonthlyMean>,
}
