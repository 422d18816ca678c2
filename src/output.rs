//! Output formatting and persistence for reports and row exports.
//!
//! Supports pretty-printing, JSON serialization, CSV row exports, and a
//! header-once metrics append for tracking runs over time.

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::geo::GeoPoint;
use crate::record::TransactionRecord;
use crate::report::InsightsReport;

/// Logs a report using Rust's debug pretty-print format.
pub fn print_pretty(report: &InsightsReport) {
    debug!("{:#?}", report);
}

/// Writes a report as pretty-printed JSON to stdout.
pub fn print_json(report: &InsightsReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Writes a report as pretty-printed JSON to a file.
pub fn write_json(path: &str, report: &InsightsReport) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(report)?)?;
    Ok(())
}

/// Writes the first `limit` filtered rows as CSV, headers included.
pub fn write_preview_csv<W: Write>(
    writer: W,
    rows: &[&TransactionRecord],
    limit: usize,
) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().from_writer(writer);
    for row in rows.iter().take(limit) {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes sampled map points as CSV, headers included.
pub fn write_geo_csv<W: Write>(writer: W, points: &[GeoPoint]) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().from_writer(writer);
    for point in points {
        csv_writer.serialize(point)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// One summary row per pipeline run, appended to a long-lived CSV.
#[derive(Debug, Serialize)]
pub struct RunMetrics {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub total_rows: usize,
    pub filtered_rows: usize,
    pub mean_delivery_days: Option<f64>,
    pub busiest_bucket: Option<String>,
}

impl RunMetrics {
    pub fn from_report(report: &InsightsReport) -> Self {
        RunMetrics {
            generated_at: report.generated_at,
            source: report.source.clone(),
            total_rows: report.total_rows,
            filtered_rows: report.filtered_rows,
            mean_delivery_days: report.delivery.mean_days,
            busiest_bucket: report.busiest_bucket.as_ref().map(|b| b.bucket.clone()),
        }
    }
}

/// Appends a [`RunMetrics`] record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_metrics(path: &str, metrics: &RunMetrics) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(metrics)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn sample_metrics() -> RunMetrics {
        RunMetrics {
            generated_at: Utc::now(),
            source: "fixture.csv".to_string(),
            total_rows: 3,
            filtered_rows: 2,
            mean_delivery_days: Some(5.0),
            busiest_bucket: Some("2018-02".to_string()),
        }
    }

    #[test]
    fn test_append_metrics_creates_file() {
        let path = temp_path("ecom_insights_test_create.csv");
        let _ = fs::remove_file(&path); // clean up any prior run

        append_metrics(&path, &sample_metrics()).unwrap();

        assert!(Path::new(&path).exists());
        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.is_empty());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_metrics_writes_header_once() {
        let path = temp_path("ecom_insights_test_header.csv");
        let _ = fs::remove_file(&path);

        append_metrics(&path, &sample_metrics()).unwrap();
        append_metrics(&path, &sample_metrics()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        // Header line should appear exactly once
        let header_count = content
            .lines()
            .filter(|l| l.contains("generated_at"))
            .count();
        assert_eq!(header_count, 1);

        // 1 header + 2 data rows
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_preview_csv_honors_limit() {
        let rows: Vec<TransactionRecord> = (0..5)
            .map(|i| TransactionRecord {
                order_id: format!("o{i}"),
                ..Default::default()
            })
            .collect();
        let refs: Vec<&TransactionRecord> = rows.iter().collect();

        let mut buffer = Vec::new();
        write_preview_csv(&mut buffer, &refs, 2).unwrap();

        let content = String::from_utf8(buffer).unwrap();
        // Header plus two rows.
        assert_eq!(content.lines().count(), 3);
        assert!(content.contains("o0"));
        assert!(content.contains("o1"));
        assert!(!content.contains("o2"));
    }

    #[test]
    fn test_write_geo_csv() {
        let points = vec![GeoPoint {
            lat: -23.55,
            lng: -46.63,
            customer_city: Some("sao paulo".to_string()),
            customer_state: Some("SP".to_string()),
            order_id: "o1".to_string(),
        }];

        let mut buffer = Vec::new();
        write_geo_csv(&mut buffer, &points).unwrap();

        let content = String::from_utf8(buffer).unwrap();
        assert!(content.starts_with("lat,lng"));
        assert!(content.contains("sao paulo"));
    }
}
