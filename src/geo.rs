//! Valid-coordinate extraction and deterministic down-sampling for the
//! customer scatter map.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::record::TransactionRecord;

/// Cap on rendered map points, for rendering performance.
pub const DEFAULT_MAX_POINTS: usize = 1000;

/// Fixed seed so repeated runs over the same data sample the same points.
pub const DEFAULT_SEED: u64 = 42;

/// One plottable customer location with the map's hover fields.
#[derive(Debug, Clone, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    pub customer_city: Option<String>,
    pub customer_state: Option<String>,
    pub order_id: String,
}

/// Extracts rows with both coordinates present, sampling down to
/// `max_points` without replacement when there are more. Sampling is
/// deterministic for a fixed seed and input order.
pub fn sample_points(rows: &[&TransactionRecord], max_points: usize, seed: u64) -> Vec<GeoPoint> {
    let valid: Vec<GeoPoint> = rows.iter().filter_map(|r| point_of(r)).collect();

    if valid.len() <= max_points {
        return valid;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    valid
        .choose_multiple(&mut rng, max_points)
        .cloned()
        .collect()
}

fn point_of(record: &TransactionRecord) -> Option<GeoPoint> {
    match (record.geolocation_lat, record.geolocation_lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint {
            lat,
            lng,
            customer_city: record.customer_city.clone(),
            customer_state: record.customer_state.clone(),
            order_id: record.order_id.clone(),
        }),
        _ => None,
    }
}
