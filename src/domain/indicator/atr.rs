//! Average True Range (Wilder).
//!
//! TR[0] = high - low, TR[i] = max(H-L, |H-C[i-1]|, |L-C[i-1]|).
//! Seed: mean TR of the first n bars; then ATR[i] = (ATR[i-1]*(n-1) + TR[i]) / n.
//! Warmup: first (n-1) bars are NaN.

use crate::domain::error::AnalyticsError;
use crate::domain::indicator::check_window;
use crate::domain::indicator::stochastic::check_aligned;
use crate::domain::raw_series::true_range;

pub fn compute_atr(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    period: usize,
) -> Result<Vec<f64>, AnalyticsError> {
    check_window("period", period)?;
    check_aligned(high, low, close)?;

    let n = close.len();
    let mut values = vec![f64::NAN; n];
    if n < period {
        return Ok(values);
    }

    let tr: Vec<f64> = (0..n).map(|i| true_range(high, low, close, i)).collect();

    let mut atr = tr[..period].iter().sum::<f64>() / period as f64;
    values[period - 1] = atr;
    for i in period..n {
        atr = (atr * (period - 1) as f64 + tr[i]) / period as f64;
        values[i] = atr;
    }

    Ok(values)
}
