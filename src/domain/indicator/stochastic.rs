//! Stochastic oscillator (%K / %D).
//!
//! raw %K[i] = 100 * (C[i] - LL(k)) / (HH(k) - LL(k)), 50 when HH == LL
//! %K = SMA(smooth) of raw %K (smooth = 1 gives the fast stochastic)
//! %D = SMA(d) of %K

use crate::domain::error::AnalyticsError;
use crate::domain::indicator::{check_window, compute_sma};

#[derive(Debug, Clone, PartialEq)]
pub struct StochasticOutput {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

pub fn compute_stochastic(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    k_period: usize,
    d_period: usize,
    smooth: usize,
) -> Result<StochasticOutput, AnalyticsError> {
    check_window("k_period", k_period)?;
    check_window("d_period", d_period)?;
    check_window("smooth", smooth)?;
    check_aligned(high, low, close)?;

    let n = close.len();
    let mut raw_k = vec![f64::NAN; n];
    for i in (k_period.saturating_sub(1))..n {
        let start = i + 1 - k_period;
        let highest = high[start..=i].iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let lowest = low[start..=i].iter().copied().fold(f64::INFINITY, f64::min);
        let range = highest - lowest;
        raw_k[i] = if range == 0.0 {
            50.0
        } else {
            100.0 * (close[i] - lowest) / range
        };
    }

    let k = compute_sma(&raw_k, smooth)?;
    let d = compute_sma(&k, d_period)?;
    Ok(StochasticOutput { k, d })
}

pub(crate) fn check_aligned(high: &[f64], low: &[f64], close: &[f64]) -> Result<(), AnalyticsError> {
    if high.len() != close.len() || low.len() != close.len() {
        return Err(AnalyticsError::invalid_parameter(
            "high/low/close",
            format!(
                "columns must be aligned (high {}, low {}, close {})",
                high.len(),
                low.len(),
                close.len()
            ),
        ));
    }
    Ok(())
}
