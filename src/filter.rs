//! Row predicates applied between load and aggregation.

use chrono::NaiveDate;
use serde::Serialize;

use crate::record::TransactionRecord;

/// User-supplied predicates, combined with AND semantics.
///
/// An empty membership list leaves that dimension unrestricted. An
/// inverted date range (`from > to`) simply matches nothing; it is not
/// treated as an error.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterParams {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub categories: Vec<String>,
    pub cities: Vec<String>,
    pub statuses: Vec<String>,
}

impl FilterParams {
    /// Whether a record satisfies every supplied predicate.
    ///
    /// Rows with a missing purchase timestamp fail the date predicate
    /// whenever a bound is set: comparisons against missing are false.
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(date) = record.purchase_date() else {
                return false;
            };
            if let Some(from) = self.date_from {
                if date < from {
                    return false;
                }
            }
            if let Some(to) = self.date_to {
                if date > to {
                    return false;
                }
            }
        }

        member_of(&self.categories, record.product_category_name.as_deref())
            && member_of(&self.cities, record.customer_city.as_deref())
            && member_of(&self.statuses, record.order_status.as_deref())
    }
}

fn member_of(allowed: &[String], value: Option<&str>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    match value {
        Some(value) => allowed.iter().any(|a| a == value),
        None => false,
    }
}

/// Returns the rows satisfying all supplied predicates, in input order.
pub fn apply<'a>(
    records: &'a [TransactionRecord],
    params: &FilterParams,
) -> Vec<&'a TransactionRecord> {
    records.iter().filter(|r| params.matches(r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::coerce_datetime;

    fn record(purchase: &str, category: &str, city: &str, status: &str) -> TransactionRecord {
        TransactionRecord {
            order_id: "o1".to_string(),
            order_purchase_timestamp: coerce_datetime(purchase),
            product_category_name: Some(category.to_string()),
            customer_city: Some(city.to_string()),
            order_status: Some(status.to_string()),
            ..Default::default()
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_date_range_bounds_are_inclusive() {
        let rows = vec![
            record("2018-01-14 23:59:59", "a", "x", "delivered"),
            record("2018-01-15 00:00:00", "a", "x", "delivered"),
            record("2018-01-31 23:59:59", "a", "x", "delivered"),
            record("2018-02-01 00:00:00", "a", "x", "delivered"),
        ];
        let params = FilterParams {
            date_from: Some(date("2018-01-15")),
            date_to: Some(date("2018-01-31")),
            ..Default::default()
        };

        let kept = apply(&rows, &params);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_inverted_date_range_matches_nothing() {
        let rows = vec![record("2018-01-15 12:00:00", "a", "x", "delivered")];
        let params = FilterParams {
            date_from: Some(date("2018-02-01")),
            date_to: Some(date("2018-01-01")),
            ..Default::default()
        };

        assert!(apply(&rows, &params).is_empty());
    }

    #[test]
    fn test_missing_purchase_timestamp_fails_date_predicate() {
        let mut row = record("2018-01-15 12:00:00", "a", "x", "delivered");
        row.order_purchase_timestamp = None;
        let rows = vec![row];

        let params = FilterParams {
            date_from: Some(date("2017-01-01")),
            ..Default::default()
        };
        assert!(apply(&rows, &params).is_empty());

        // With no date bound the row passes.
        assert_eq!(apply(&rows, &FilterParams::default()).len(), 1);
    }

    #[test]
    fn test_empty_category_filter_is_identity() {
        let rows = vec![
            record("2018-01-15 12:00:00", "beleza_saude", "x", "delivered"),
            record("2018-01-16 12:00:00", "cama_mesa_banho", "y", "shipped"),
        ];

        let unfiltered = apply(&rows, &FilterParams::default());
        let empty_categories = apply(
            &rows,
            &FilterParams {
                categories: Vec::new(),
                ..Default::default()
            },
        );

        assert_eq!(unfiltered.len(), empty_categories.len());
    }

    #[test]
    fn test_membership_predicates_and_together() {
        let rows = vec![
            record("2018-01-15 12:00:00", "beleza_saude", "sao paulo", "delivered"),
            record("2018-01-16 12:00:00", "beleza_saude", "rio de janeiro", "delivered"),
            record("2018-01-17 12:00:00", "cama_mesa_banho", "sao paulo", "delivered"),
        ];
        let params = FilterParams {
            categories: vec!["beleza_saude".to_string()],
            cities: vec!["sao paulo".to_string()],
            ..Default::default()
        };

        let kept = apply(&rows, &params);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].customer_city.as_deref(), Some("sao paulo"));
    }

    #[test]
    fn test_missing_value_fails_nonempty_membership() {
        let mut row = record("2018-01-15 12:00:00", "a", "x", "delivered");
        row.product_category_name = None;
        let rows = vec![row];

        let params = FilterParams {
            categories: vec!["a".to_string()],
            ..Default::default()
        };
        assert!(apply(&rows, &params).is_empty());
    }
}
