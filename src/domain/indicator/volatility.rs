//! Rolling volatility of simple returns.
//!
//! r[i] = x[i] / x[i-1] - 1. VOL(n)[i] is the sample standard deviation of the
//! n returns ending at i, scaled by sqrt(periods_per_year). Pass 1.0 for the
//! raw per-bar figure. Warmup: first n bars are NaN.

use crate::domain::error::AnalyticsError;

pub fn compute_volatility(
    series: &[f64],
    window: usize,
    periods_per_year: f64,
) -> Result<Vec<f64>, AnalyticsError> {
    if window < 2 {
        return Err(AnalyticsError::invalid_parameter(
            "window",
            "must be at least 2",
        ));
    }
    if !periods_per_year.is_finite() || periods_per_year <= 0.0 {
        return Err(AnalyticsError::invalid_parameter(
            "periods_per_year",
            "must be positive",
        ));
    }

    let n = series.len();
    let mut values = vec![f64::NAN; n];
    if n <= window {
        return Ok(values);
    }

    let returns: Vec<f64> = series
        .windows(2)
        .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { f64::NAN })
        .collect();
    let scale = periods_per_year.sqrt();

    for i in window..n {
        let slice = &returns[i - window..i];
        let mean = slice.iter().sum::<f64>() / window as f64;
        let variance = slice
            .iter()
            .map(|r| {
                let diff = r - mean;
                diff * diff
            })
            .sum::<f64>()
            / (window - 1) as f64;
        values[i] = variance.sqrt() * scale;
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn volatility_warmup() {
        let values = compute_volatility(&[1.0, 2.0, 3.0, 4.0], 2, 1.0).unwrap();
        assert!(values[0].is_nan());
        assert!(values[1].is_nan());
        assert!(values[2].is_finite());
    }

    #[test]
    fn constant_growth_has_zero_volatility() {
        let series: Vec<f64> = (0..10).map(|i| 100.0 * 1.01_f64.powi(i)).collect();
        let values = compute_volatility(&series, 5, 1.0).unwrap();
        for v in &values[5..] {
            assert_relative_eq!(*v, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn known_sample_stddev() {
        // returns: +10%, -10% → mean 0, sample var = 0.02
        let values = compute_volatility(&[100.0, 110.0, 99.0], 2, 1.0).unwrap();
        assert_relative_eq!(values[2], 0.02_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn annualization_scales_by_sqrt() {
        let series = [100.0, 110.0, 99.0, 104.0];
        let raw = compute_volatility(&series, 2, 1.0).unwrap();
        let annual = compute_volatility(&series, 2, 365.0).unwrap();
        assert_relative_eq!(annual[3], raw[3] * 365.0_f64.sqrt());
    }

    #[test]
    fn window_below_two_fails() {
        assert!(compute_volatility(&[1.0, 2.0], 1, 1.0).is_err());
        assert!(compute_volatility(&[1.0, 2.0], 2, 0.0).is_err());
    }
}
