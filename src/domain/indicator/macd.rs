//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of the defined part of the MACD line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: max(fast, slow) - 1 + signal - 1 bars.

use crate::domain::error::AnalyticsError;
use crate::domain::indicator::{check_window, compute_ema};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdOutput {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn compute_macd(
    series: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Result<MacdOutput, AnalyticsError> {
    check_window("fast", fast)?;
    check_window("slow", slow)?;
    check_window("signal", signal_period)?;

    let ema_fast = compute_ema(series, fast)?;
    let ema_slow = compute_ema(series, slow)?;

    let macd: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal = compute_ema(&macd, signal_period)?;
    let histogram = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();

    Ok(MacdOutput {
        macd,
        signal,
        histogram,
    })
}

pub fn compute_macd_default(series: &[f64]) -> Result<MacdOutput, AnalyticsError> {
    compute_macd(series, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}
