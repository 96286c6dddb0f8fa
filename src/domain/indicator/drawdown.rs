//! Drawdown from running peak, in percent (always ≤ 0).

pub fn compute_drawdown(series: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    series
        .iter()
        .map(|&x| {
            if x.is_nan() {
                return f64::NAN;
            }
            if x > peak {
                peak = x;
            }
            if peak > 0.0 {
                (x / peak - 1.0) * 100.0
            } else {
                f64::NAN
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn drawdown_tracks_running_peak() {
        let values = compute_drawdown(&[100.0, 120.0, 90.0, 130.0, 117.0]);
        assert_relative_eq!(values[0], 0.0);
        assert_relative_eq!(values[1], 0.0);
        assert_relative_eq!(values[2], -25.0);
        assert_relative_eq!(values[3], 0.0);
        assert_relative_eq!(values[4], -10.0);
    }

    #[test]
    fn drawdown_skips_nan() {
        let values = compute_drawdown(&[100.0, f64::NAN, 50.0]);
        assert!(values[1].is_nan());
        assert_relative_eq!(values[2], -50.0);
    }

    #[test]
    fn drawdown_non_positive_peak_is_undefined() {
        let values = compute_drawdown(&[0.0, -1.0]);
        assert!(values.iter().all(|v| v.is_nan()));
    }
}
