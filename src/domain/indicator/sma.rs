//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(x[i-n+1..=i]). Warmup: first (n-1) bars are NaN.
//! A NaN inside the window propagates, so a NaN-prefixed input (e.g. another
//! indicator's output) simply extends the warmup.

use crate::domain::error::AnalyticsError;
use crate::domain::indicator::check_window;

pub fn compute_sma(series: &[f64], window: usize) -> Result<Vec<f64>, AnalyticsError> {
    check_window("window", window)?;

    let mut values = vec![f64::NAN; series.len()];
    if series.len() < window {
        return Ok(values);
    }

    for i in (window - 1)..series.len() {
        let slice = &series[i + 1 - window..=i];
        values[i] = slice.iter().sum::<f64>() / window as f64;
    }

    Ok(values)
}
