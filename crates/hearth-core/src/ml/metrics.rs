//! Regression metrics

/// Coefficient of determination
///
/// Returns 0 when `y_true` is constant (the metric is undefined there) or
/// when the inputs are empty or of different lengths.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return 0.0;
    }
    let first = y_true[0];
    if y_true.iter().all(|v| *v == first) {
        return 0.0;
    }

    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_tot: f64 = y_true.iter().map(|v| (v - mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    1.0 - ss_res / ss_tot
}

/// Mean absolute error (0 for empty or mismatched inputs)
pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return 0.0;
    }
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / y_true.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_r2_perfect_and_mean() {
        let y = [1.0, 2.0, 3.0];
        assert_eq!(r2_score(&y, &y), 1.0);
        assert_eq!(r2_score(&y, &[2.0, 2.0, 2.0]), 0.0);
        assert!(r2_score(&y, &[3.0, 2.0, 1.0]) < 0.0);
    }

    #[test]
    fn test_r2_constant_target_is_zero() {
        assert_eq!(r2_score(&[5.0, 5.0], &[4.0, 6.0]), 0.0);
        assert_eq!(r2_score(&[], &[]), 0.0);
    }

    #[test]
    fn test_mae() {
        assert_eq!(mean_absolute_error(&[1.0, 2.0], &[2.0, 4.0]), 1.5);
        assert_eq!(mean_absolute_error(&[], &[]), 0.0);
    }
}
