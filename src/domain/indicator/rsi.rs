//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100, unless avg_gain is also 0 (flat input): RSI = 50.
//!
//! Warmup: first n bars are NaN (need n price changes to compute initial average).

use crate::domain::error::AnalyticsError;
use crate::domain::indicator::check_window;

pub fn compute_rsi(series: &[f64], period: usize) -> Result<Vec<f64>, AnalyticsError> {
    check_window("period", period)?;

    let mut values = vec![f64::NAN; series.len()];
    if series.len() <= period {
        return Ok(values);
    }

    let changes: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();
    let gain = |c: f64| if c > 0.0 { c } else { 0.0 };
    let loss = |c: f64| if c < 0.0 { -c } else { 0.0 };

    let mut avg_gain = changes[..period].iter().map(|&c| gain(c)).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().map(|&c| loss(c)).sum::<f64>() / period as f64;
    values[period] = rsi_from_averages(avg_gain, avg_loss);

    for i in (period + 1)..series.len() {
        let change = changes[i - 1];
        avg_gain = (avg_gain * (period - 1) as f64 + gain(change)) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss(change)) / period as f64;
        values[i] = rsi_from_averages(avg_gain, avg_loss);
    }

    Ok(values)
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
