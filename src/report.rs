//! Assembles the full insights report from the filter and aggregation
//! stages. This is the data contract the rendering layer consumes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::analyzers::aggregate::{bucketed_counts, delivery_stats, top_categories, top_cities};
use crate::analyzers::types::{BucketCount, CategoryCount, CityVolume, DeliveryStats, Granularity};
use crate::analyzers::utility::round2;
use crate::filter::{self, FilterParams};
use crate::loader::Dataset;

/// Complete aggregation output for one filtered view of the dataset.
#[derive(Debug, Serialize)]
pub struct InsightsReport {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub filters: FilterParams,
    pub granularity: Granularity,
    pub total_rows: usize,
    pub filtered_rows: usize,
    pub top_categories: Vec<CategoryCount>,
    pub transactions_per_bucket: Vec<BucketCount>,
    /// Bucket with the most transactions; earliest wins a tie.
    pub busiest_bucket: Option<BucketCount>,
    pub top_cities: Vec<CityVolume>,
    /// Means rounded to two decimals for display.
    pub delivery: DeliveryStats,
}

/// Runs filter and all four aggregations over a loaded dataset.
pub fn build_report(
    dataset: &Dataset,
    params: &FilterParams,
    granularity: Granularity,
) -> InsightsReport {
    let rows = filter::apply(&dataset.records, params);

    if rows.is_empty() {
        info!(
            source = %dataset.source,
            "No rows match the supplied filters; report sections will be empty"
        );
    }

    let buckets = bucketed_counts(&rows, granularity);
    // Buckets are ascending, so keeping the first strict maximum resolves
    // ties to the earliest bucket.
    let busiest_bucket = buckets
        .iter()
        .fold(None::<&BucketCount>, |best, candidate| match best {
            Some(current) if current.count >= candidate.count => Some(current),
            _ => Some(candidate),
        })
        .cloned();

    let mut delivery = delivery_stats(&rows);
    delivery.mean_days = delivery.mean_days.map(round2);
    for monthly in &mut delivery.per_month {
        monthly.mean_days = round2(monthly.mean_days);
    }

    InsightsReport {
        generated_at: Utc::now(),
        source: dataset.source.clone(),
        filters: params.clone(),
        granularity,
        total_rows: dataset.records.len(),
        filtered_rows: rows.len(),
        top_categories: top_categories(&rows),
        transactions_per_bucket: buckets,
        busiest_bucket,
        top_cities: top_cities(&rows),
        delivery,
    }
}
