//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are NaN.

use crate::domain::error::AnalyticsError;
use crate::domain::indicator::check_window;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULT: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerOutput {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn compute_bollinger_bands(
    series: &[f64],
    period: usize,
    mult: f64,
) -> Result<BollingerOutput, AnalyticsError> {
    check_window("period", period)?;
    if !mult.is_finite() || mult < 0.0 {
        return Err(AnalyticsError::invalid_parameter(
            "mult",
            format!("must be a non-negative number, got {}", mult),
        ));
    }

    let n = series.len();
    let mut upper = vec![f64::NAN; n];
    let mut middle = vec![f64::NAN; n];
    let mut lower = vec![f64::NAN; n];

    for i in (period.saturating_sub(1))..n {
        let window = &series[i + 1 - period..=i];

        let mean: f64 = window.iter().sum::<f64>() / period as f64;
        let variance: f64 = window
            .iter()
            .map(|x| {
                let diff = x - mean;
                diff * diff
            })
            .sum::<f64>()
            / period as f64;

        let stddev = variance.sqrt();
        upper[i] = mean + mult * stddev;
        middle[i] = mean;
        lower[i] = mean - mult * stddev;
    }

    Ok(BollingerOutput {
        upper,
        middle,
        lower,
    })
}
