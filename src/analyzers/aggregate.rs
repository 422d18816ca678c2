//! The four aggregation operations behind the dashboard insights:
//! top product categories, time-bucketed transaction counts, top cities
//! by distinct orders, and mean delivery duration.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDateTime;

use crate::analyzers::types::{
    BucketCount, CategoryCount, CityVolume, DeliveryStats, Granularity, MonthlyMean,
};
use crate::analyzers::utility::mean;
use crate::record::TransactionRecord;

/// Rankings are truncated to the ten most frequent entries.
pub const TOP_N: usize = 10;

/// Frequency of each product category, most purchased first.
///
/// Ties are broken by first-encountered order; rows without a category
/// are skipped. At most [`TOP_N`] entries are returned.
pub fn top_categories(rows: &[&TransactionRecord]) -> Vec<CategoryCount> {
    ranked_counts(
        rows.iter()
            .filter_map(|r| r.product_category_name.as_deref()),
    )
    .into_iter()
    .map(|(category, count)| CategoryCount { category, count })
    .collect()
}

/// Transaction counts bucketed by purchase month or day, ascending by
/// bucket key. Buckets with no rows are omitted; rows with a missing
/// purchase timestamp are skipped.
pub fn bucketed_counts(rows: &[&TransactionRecord], granularity: Granularity) -> Vec<BucketCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for row in rows {
        if let Some(ts) = row.order_purchase_timestamp {
            *counts.entry(bucket_key(ts, granularity)).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .map(|(bucket, count)| BucketCount { bucket, count })
        .collect()
}

/// Cities ranked by distinct order count, descending, truncated to
/// [`TOP_N`]. Ties are broken by first-encountered order.
pub fn top_cities(rows: &[&TransactionRecord]) -> Vec<CityVolume> {
    // city -> (first row index, distinct order ids)
    let mut per_city: HashMap<&str, (usize, HashSet<&str>)> = HashMap::new();

    for (index, row) in rows.iter().enumerate() {
        let Some(city) = row.customer_city.as_deref() else {
            continue;
        };
        per_city
            .entry(city)
            .or_insert_with(|| (index, HashSet::new()))
            .1
            .insert(row.order_id.as_str());
    }

    let mut ranked: Vec<(&str, usize, usize)> = per_city
        .into_iter()
        .map(|(city, (first_seen, orders))| (city, first_seen, orders.len()))
        .collect();
    ranked.sort_by(|a, b| b.2.cmp(&a.2).then(a.1.cmp(&b.1)));
    ranked.truncate(TOP_N);

    ranked
        .into_iter()
        .map(|(city, _, orders)| CityVolume {
            city: city.to_string(),
            orders,
        })
        .collect()
}

/// Mean whole-day delivery duration, overall and per purchase month.
///
/// Rows missing either timestamp contribute to neither numerator nor
/// denominator. Negative durations (delivered before purchase) are kept
/// as-is; the source data is not validated on that axis.
pub fn delivery_stats(rows: &[&TransactionRecord]) -> DeliveryStats {
    let mut all_days = Vec::new();
    let mut per_month: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for row in rows {
        let Some(days) = row.delivery_days() else {
            continue;
        };
        let days = days as f64;
        all_days.push(days);

        // delivery_days() implies the purchase timestamp is present.
        if let Some(ts) = row.order_purchase_timestamp {
            per_month
                .entry(bucket_key(ts, Granularity::Month))
                .or_default()
                .push(days);
        }
    }

    DeliveryStats {
        measured_rows: all_days.len(),
        mean_days: if all_days.is_empty() {
            None
        } else {
            Some(mean(&all_days))
        },
        per_month: per_month
            .into_iter()
            .map(|(bucket, days)| MonthlyMean {
                bucket,
                mean_days: mean(&days),
            })
            .collect(),
    }
}

/// Formats a bucket key; zero-padded so lexicographic order is
/// chronological order.
pub fn bucket_key(ts: NaiveDateTime, granularity: Granularity) -> String {
    match granularity {
        Granularity::Month => ts.format("%Y-%m").to_string(),
        Granularity::Day => ts.format("%Y-%m-%d").to_string(),
    }
}

/// Counts occurrences of each value, sorts descending by count with ties
/// broken by first encounter, and truncates to [`TOP_N`].
fn ranked_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    // value -> (first seen position, count)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();

    for (position, value) in values.enumerate() {
        counts.entry(value).or_insert((position, 0)).1 += 1;
    }

    let mut ranked: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.1.cmp(&a.1.1).then(a.1.0.cmp(&b.1.0)));
    ranked.truncate(TOP_N);

    ranked
        .into_iter()
        .map(|(value, (_, count))| (value.to_string(), count))
        .collect()
}
