//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = x[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) defined bars are NaN. Leading NaNs in the input are
//! skipped, so the EMA of another indicator seeds on its first full window.

use crate::domain::error::AnalyticsError;
use crate::domain::indicator::{check_window, first_defined};

pub fn compute_ema(series: &[f64], window: usize) -> Result<Vec<f64>, AnalyticsError> {
    check_window("window", window)?;

    let mut values = vec![f64::NAN; series.len()];
    let Some(start) = first_defined(series) else {
        return Ok(values);
    };
    let Some(seed_index) = start
        .checked_add(window - 1)
        .filter(|&seed| seed < series.len())
    else {
        return Ok(values);
    };

    let k = 2.0 / (window as f64 + 1.0);
    let mut ema = series[start..=seed_index].iter().sum::<f64>() / window as f64;
    values[seed_index] = ema;

    for i in (seed_index + 1)..series.len() {
        ema = series[i] * k + ema * (1.0 - k);
        values[i] = ema;
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ema_warmup() {
        let values = compute_ema(&[10.0, 20.0, 30.0, 40.0, 50.0], 3).unwrap();
        assert!(values[0].is_nan());
        assert!(values[1].is_nan());
        assert!(values[2..].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn ema_period_1_tracks_input() {
        let values = compute_ema(&[10.0, 20.0, 30.0], 1).unwrap();
        assert_relative_eq!(values[0], 10.0);
        assert_relative_eq!(values[1], 20.0);
        assert_relative_eq!(values[2], 30.0);
    }

    #[test]
    fn ema_seed_is_sma() {
        let values = compute_ema(&[10.0, 20.0, 30.0], 3).unwrap();
        assert_relative_eq!(values[2], 20.0);
    }

    #[test]
    fn ema_recursive_calculation() {
        let values = compute_ema(&[10.0, 20.0, 30.0, 40.0, 50.0], 3).unwrap();

        let k = 2.0 / 4.0;
        let sma = 20.0;
        let ema_3 = 40.0 * k + sma * (1.0 - k);
        let ema_4 = 50.0 * k + ema_3 * (1.0 - k);

        assert_relative_eq!(values[3], ema_3);
        assert_relative_eq!(values[4], ema_4);
    }

    #[test]
    fn ema_skips_leading_nan() {
        let values = compute_ema(&[f64::NAN, f64::NAN, 2.0, 4.0, 6.0], 2).unwrap();
        assert!(values[2].is_nan());
        assert_relative_eq!(values[3], 3.0);
        let k = 2.0 / 3.0;
        assert_relative_eq!(values[4], 6.0 * k + 3.0 * (1.0 - k));
    }

    #[test]
    fn ema_insufficient_history() {
        let values = compute_ema(&[1.0, 2.0], 3).unwrap();
        assert!(values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ema_zero_window_fails() {
        assert!(compute_ema(&[1.0, 2.0], 0).is_err());
    }

    #[test]
    fn huge_window_after_nan_prefix_is_undefined() {
        let series = [f64::NAN, f64::NAN, 1.0, 2.0, 3.0];
        let values = compute_ema(&series, usize::MAX).unwrap();
        assert_eq!(values.len(), 5);
        assert!(values.iter().all(|v| v.is_nan()));
    }
}
