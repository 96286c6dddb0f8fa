//! Technical indicator implementations.
//!
//! Every function here is pure and length-preserving: the output has one value
//! per input bar, and bars before a full window are `f64::NAN`. Short history
//! never fails; a zero window does.
//!
//! - `IndicatorKind`: indicator identity + parameters (serves as HashMap key)
//! - `IndicatorOutput`: the different indicator output shapes
//! - `compute_indicator`: exhaustive dispatch from a kind to its function

pub mod atr;
pub mod bollinger;
pub mod drawdown;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod volatility;
pub mod volume_ratio;

pub use atr::compute_atr;
pub use bollinger::{compute_bollinger_bands, BollingerOutput};
pub use drawdown::compute_drawdown;
pub use ema::compute_ema;
pub use macd::{compute_macd, compute_macd_default, MacdOutput};
pub use rsi::compute_rsi;
pub use sma::compute_sma;
pub use stochastic::{compute_stochastic, StochasticOutput};
pub use volatility::compute_volatility;
pub use volume_ratio::compute_volume_ratio;

use crate::domain::error::AnalyticsError;
use crate::domain::raw_series::RawSeries;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
    Stochastic {
        k_period: usize,
        d_period: usize,
        smooth: usize,
    },
    Atr(usize),
    Volatility(usize),
    Drawdown,
    VolumeRatio(usize),
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma(period) => write!(f, "SMA({})", period),
            IndicatorKind::Ema(period) => write!(f, "EMA({})", period),
            IndicatorKind::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorKind::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorKind::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
            IndicatorKind::Stochastic {
                k_period,
                d_period,
                smooth,
            } => write!(f, "STOCHASTIC({},{},{})", k_period, d_period, smooth),
            IndicatorKind::Atr(period) => write!(f, "ATR({})", period),
            IndicatorKind::Volatility(window) => write!(f, "VOLATILITY({})", window),
            IndicatorKind::Drawdown => write!(f, "DRAWDOWN"),
            IndicatorKind::VolumeRatio(window) => write!(f, "VOLUME_RATIO({})", window),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorOutput {
    Line(Vec<f64>),
    Macd(MacdOutput),
    Bollinger(BollingerOutput),
    Stochastic(StochasticOutput),
}

impl IndicatorOutput {
    pub fn len(&self) -> usize {
        self.primary().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The series a chart would draw first: the line itself, the MACD line,
    /// the Bollinger middle band or %K.
    pub fn primary(&self) -> &[f64] {
        match self {
            IndicatorOutput::Line(values) => values,
            IndicatorOutput::Macd(m) => &m.macd,
            IndicatorOutput::Bollinger(b) => &b.middle,
            IndicatorOutput::Stochastic(s) => &s.k,
        }
    }
}

/// Compute `kind` over `raw`. Volume-based kinds fail when the series has no volume.
pub fn compute_indicator(
    kind: IndicatorKind,
    raw: &RawSeries,
) -> Result<IndicatorOutput, AnalyticsError> {
    let closes = raw.closes();
    let output = match kind {
        IndicatorKind::Sma(window) => IndicatorOutput::Line(compute_sma(closes, window)?),
        IndicatorKind::Ema(window) => IndicatorOutput::Line(compute_ema(closes, window)?),
        IndicatorKind::Rsi(period) => IndicatorOutput::Line(compute_rsi(closes, period)?),
        IndicatorKind::Macd { fast, slow, signal } => {
            IndicatorOutput::Macd(compute_macd(closes, fast, slow, signal)?)
        }
        IndicatorKind::Bollinger {
            period,
            stddev_mult_x100,
        } => IndicatorOutput::Bollinger(compute_bollinger_bands(
            closes,
            period,
            stddev_mult_x100 as f64 / 100.0,
        )?),
        IndicatorKind::Stochastic {
            k_period,
            d_period,
            smooth,
        } => IndicatorOutput::Stochastic(compute_stochastic(
            raw.highs(),
            raw.lows(),
            closes,
            k_period,
            d_period,
            smooth,
        )?),
        IndicatorKind::Atr(period) => {
            IndicatorOutput::Line(compute_atr(raw.highs(), raw.lows(), closes, period)?)
        }
        IndicatorKind::Volatility(window) => {
            IndicatorOutput::Line(compute_volatility(closes, window, 1.0)?)
        }
        IndicatorKind::Drawdown => IndicatorOutput::Line(compute_drawdown(closes)),
        IndicatorKind::VolumeRatio(window) => {
            let volume = raw.volumes().ok_or_else(|| AnalyticsError::InvalidSeries {
                reason: "series has no volume column".into(),
            })?;
            IndicatorOutput::Line(compute_volume_ratio(volume, window)?)
        }
    };
    Ok(output)
}

pub(crate) fn check_window(name: &str, window: usize) -> Result<(), AnalyticsError> {
    if window == 0 {
        return Err(AnalyticsError::invalid_parameter(name, "must be at least 1"));
    }
    Ok(())
}

/// Index of the first defined (non-NaN) value, if any.
pub(crate) fn first_defined(series: &[f64]) -> Option<usize> {
    series.iter().position(|v| !v.is_nan())
}
