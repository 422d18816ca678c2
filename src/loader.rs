//! CSV dataset loading with tolerant field coercion and per-process
//! memoization.
//!
//! A source is either a local file path or an HTTP(S) URL. Gzip payloads
//! are detected by magic bytes and decompressed transparently. Header
//! names are trimmed before column lookup. Framing-level CSV errors and
//! missing required columns are fatal; cell-level coercion failures are
//! not, they become missing values.

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use tracing::{debug, info, warn};

use crate::fetch::{BasicClient, fetch_bytes};
use crate::record::{TransactionRecord, coerce_datetime, coerce_f64, coerce_string};

/// A loaded dataset, immutable for the life of the process.
#[derive(Debug)]
pub struct Dataset {
    pub source: String,
    pub records: Vec<TransactionRecord>,
}

/// Columns a source must carry; everything else is optional.
const REQUIRED_COLUMNS: &[&str] = &["order_id", "order_purchase_timestamp"];

/// Memoizes dataset loads for the lifetime of the process, keyed by the
/// source string. There is no invalidation; a changed source requires a
/// process restart.
#[derive(Default)]
pub struct DatasetStore {
    loaded: Mutex<HashMap<String, Arc<Dataset>>>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(&self, source: &str) -> Result<Arc<Dataset>> {
        if let Some(dataset) = self.loaded.lock().unwrap().get(source) {
            debug!(source, "Dataset served from cache");
            return Ok(dataset.clone());
        }

        let bytes = read_source(source).await?;
        let dataset = Arc::new(parse_dataset(source, &bytes)?);

        self.loaded
            .lock()
            .unwrap()
            .insert(source.to_string(), dataset.clone());

        Ok(dataset)
    }
}

/// Reads raw dataset bytes from a local file path or fetches them over HTTP.
#[tracing::instrument(fields(source = %source))]
pub async fn read_source(source: &str) -> Result<Vec<u8>> {
    let bytes = if source.starts_with("http") {
        let client = BasicClient::new();
        fetch_bytes(&client, source).await?
    } else {
        std::fs::read(source).with_context(|| format!("reading dataset file {source}"))?
    };
    Ok(bytes)
}

/// Per-load tally of cell values that failed coercion.
#[derive(Debug, Default)]
struct CoercionFailures {
    latitude: usize,
    longitude: usize,
    purchase_timestamp: usize,
    delivered_timestamp: usize,
}

impl CoercionFailures {
    fn total(&self) -> usize {
        self.latitude + self.longitude + self.purchase_timestamp + self.delivered_timestamp
    }
}

/// Parses raw bytes into a [`Dataset`].
///
/// # Errors
///
/// Returns an error if the bytes are not parseable as CSV or a required
/// column is absent.
pub fn parse_dataset(source: &str, bytes: &[u8]) -> Result<Dataset> {
    let bytes = maybe_gunzip(bytes)?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes.as_slice());

    let headers = reader.headers().context("reading CSV header")?.clone();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut records = Vec::new();
    let mut failures = CoercionFailures::default();

    for row in reader.records() {
        let row = row.context("reading CSV row")?;
        records.push(columns.record_from_row(&row, &mut failures));
    }

    if failures.total() > 0 {
        warn!(
            source,
            bad_latitude = failures.latitude,
            bad_longitude = failures.longitude,
            bad_purchase_timestamp = failures.purchase_timestamp,
            bad_delivered_timestamp = failures.delivered_timestamp,
            "Some cell values failed coercion and were recorded as missing"
        );
    }

    info!(source, rows = records.len(), "Dataset loaded");

    Ok(Dataset {
        source: source.to_string(),
        records,
    })
}

/// Decompresses the payload when it carries the gzip magic bytes.
fn maybe_gunzip(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.starts_with(&[0x1f, 0x8b]) {
        let mut decoded = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut decoded)
            .context("decompressing gzip dataset")?;
        Ok(decoded)
    } else {
        Ok(bytes.to_vec())
    }
}

/// Column positions resolved from a trimmed header row.
struct ColumnMap {
    order_id: usize,
    customer_id: Option<usize>,
    customer_city: Option<usize>,
    customer_state: Option<usize>,
    product_category_name: Option<usize>,
    order_status: Option<usize>,
    order_purchase_timestamp: usize,
    order_delivered_customer_date: Option<usize>,
    geolocation_lat: Option<usize>,
    geolocation_lng: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let mut by_name: HashMap<String, usize> = HashMap::new();
        for (index, name) in headers.iter().enumerate() {
            by_name.entry(name.trim().to_string()).or_insert(index);
        }

        for required in REQUIRED_COLUMNS {
            if !by_name.contains_key(*required) {
                bail!("dataset is missing required column {required:?}");
            }
        }

        Ok(Self {
            order_id: by_name["order_id"],
            customer_id: by_name.get("customer_id").copied(),
            customer_city: by_name.get("customer_city").copied(),
            customer_state: by_name.get("customer_state").copied(),
            product_category_name: by_name.get("product_category_name").copied(),
            order_status: by_name.get("order_status").copied(),
            order_purchase_timestamp: by_name["order_purchase_timestamp"],
            order_delivered_customer_date: by_name.get("order_delivered_customer_date").copied(),
            geolocation_lat: by_name.get("geolocation_lat").copied(),
            geolocation_lng: by_name.get("geolocation_lng").copied(),
        })
    }

    fn record_from_row(
        &self,
        row: &csv::StringRecord,
        failures: &mut CoercionFailures,
    ) -> TransactionRecord {
        let cell = |index: Option<usize>| index.and_then(|i| row.get(i));

        let latitude = coerce_tracked(cell(self.geolocation_lat), coerce_f64, || {
            failures.latitude += 1
        });
        let longitude = coerce_tracked(cell(self.geolocation_lng), coerce_f64, || {
            failures.longitude += 1
        });
        let purchased = coerce_tracked(
            row.get(self.order_purchase_timestamp),
            coerce_datetime,
            || failures.purchase_timestamp += 1,
        );
        let delivered = coerce_tracked(
            cell(self.order_delivered_customer_date),
            coerce_datetime,
            || failures.delivered_timestamp += 1,
        );

        TransactionRecord {
            order_id: row.get(self.order_id).unwrap_or_default().trim().to_string(),
            customer_id: cell(self.customer_id).unwrap_or_default().trim().to_string(),
            customer_city: cell(self.customer_city).and_then(coerce_string),
            customer_state: cell(self.customer_state).and_then(coerce_string),
            product_category_name: cell(self.product_category_name).and_then(coerce_string),
            order_status: cell(self.order_status).and_then(coerce_string),
            order_purchase_timestamp: purchased,
            order_delivered_customer_date: delivered,
            geolocation_lat: latitude,
            geolocation_lng: longitude,
        }
    }
}

/// Applies a coercion to a cell, invoking `on_failure` only when a
/// non-empty value refused to parse. Empty cells are ordinary missing data.
fn coerce_tracked<T>(
    raw: Option<&str>,
    coerce: impl Fn(&str) -> Option<T>,
    on_failure: impl FnOnce(),
) -> Option<T> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    let value = coerce(raw);
    if value.is_none() {
        on_failure();
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
order_id, customer_id ,customer_city,customer_state,product_category_name,order_status,order_purchase_timestamp,order_delivered_customer_date,geolocation_lat,geolocation_lng
o1,c1,sao paulo,SP,beleza_saude,delivered,2018-01-15 10:00:00,2018-01-20 10:00:00,-23.55,-46.63
o2,c2,rio de janeiro,RJ,cama_mesa_banho,delivered,2018-02-20 09:30:00,2018-02-25 09:30:00,not-a-number,-43.17
o3,c3,,,,shipped,bad-timestamp,,,
";

    #[test]
    fn test_parse_dataset_trims_headers_and_keeps_row_count() {
        let dataset = parse_dataset("sample", SAMPLE.as_bytes()).unwrap();

        assert_eq!(dataset.records.len(), 3);
        // Header " customer_id " resolves despite the surrounding whitespace.
        assert_eq!(dataset.records[0].customer_id, "c1");
    }

    #[test]
    fn test_parse_dataset_bad_latitude_becomes_missing() {
        let dataset = parse_dataset("sample", SAMPLE.as_bytes()).unwrap();

        let row = &dataset.records[1];
        assert!(row.geolocation_lat.is_none());
        assert_eq!(row.geolocation_lng, Some(-43.17));
        assert!(!row.has_coordinates());
    }

    #[test]
    fn test_parse_dataset_bad_timestamp_becomes_missing() {
        let dataset = parse_dataset("sample", SAMPLE.as_bytes()).unwrap();

        let row = &dataset.records[2];
        assert!(row.order_purchase_timestamp.is_none());
        assert!(row.order_delivered_customer_date.is_none());
        assert!(row.customer_city.is_none());
    }

    #[test]
    fn test_parse_dataset_missing_required_column() {
        let csv = "customer_id,customer_city\nc1,sao paulo\n";
        let result = parse_dataset("sample", csv.as_bytes());

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("order_id"));
    }

    #[test]
    fn test_parse_dataset_absent_optional_columns() {
        let csv = "order_id,order_purchase_timestamp\no1,2018-01-15 10:00:00\n";
        let dataset = parse_dataset("sample", csv.as_bytes()).unwrap();

        let row = &dataset.records[0];
        assert!(row.customer_city.is_none());
        assert!(row.geolocation_lat.is_none());
        assert!(row.order_purchase_timestamp.is_some());
    }

    #[test]
    fn test_parse_dataset_gzip_payload() {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let dataset = parse_dataset("sample.gz", &compressed).unwrap();
        assert_eq!(dataset.records.len(), 3);
    }

    #[tokio::test]
    async fn test_store_memoizes_by_source() {
        let path = std::env::temp_dir().join("ecom_insights_store_test.csv");
        std::fs::write(&path, SAMPLE).unwrap();
        let source = path.display().to_string();

        let store = DatasetStore::new();
        let first = store.load(&source).await.unwrap();
        let second = store.load(&source).await.unwrap();

        // Same allocation, not a re-load.
        assert!(Arc::ptr_eq(&first, &second));

        std::fs::remove_file(&path).unwrap();
    }
}
