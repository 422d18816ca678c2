/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Rounds to two decimal places, the precision used for displayed metrics.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
