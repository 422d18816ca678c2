//! The joined transaction row and tolerant field coercion.
//!
//! One record spans order, customer, order item, product, payment, and
//! geolocation columns from the merged dataset export. Malformed cell
//! values never fail a load; they coerce to `None`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransactionRecord {
    pub order_id: String,
    pub customer_id: String,
    pub customer_city: Option<String>,
    pub customer_state: Option<String>,
    pub product_category_name: Option<String>,
    pub order_status: Option<String>,
    pub order_purchase_timestamp: Option<NaiveDateTime>,
    pub order_delivered_customer_date: Option<NaiveDateTime>,
    pub geolocation_lat: Option<f64>,
    pub geolocation_lng: Option<f64>,
}

impl TransactionRecord {
    /// Calendar date of the purchase, if the timestamp parsed.
    pub fn purchase_date(&self) -> Option<NaiveDate> {
        self.order_purchase_timestamp.map(|t| t.date())
    }

    /// Whole-day delivery duration. Negative when the delivered date
    /// precedes the purchase date; `None` when either timestamp is missing.
    pub fn delivery_days(&self) -> Option<i64> {
        match (
            self.order_delivered_customer_date,
            self.order_purchase_timestamp,
        ) {
            (Some(delivered), Some(purchased)) => Some((delivered - purchased).num_days()),
            _ => None,
        }
    }

    pub fn has_coordinates(&self) -> bool {
        self.geolocation_lat.is_some() && self.geolocation_lng.is_some()
    }
}

/// Timestamp formats the dataset exports are known to use.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parses a timestamp cell. Empty and unparseable values become `None`.
pub fn coerce_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }

    // Some exports carry bare dates; anchor them at midnight.
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Parses a numeric cell. Empty and unparseable values become `None`.
pub fn coerce_f64(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok()
}

/// Trims a string cell, mapping empty cells to `None`.
pub fn coerce_string(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}
