//! Signal reliability: how often a classic indicator signal was followed by
//! a move in its predicted direction.
//!
//! For each trigger bar `i` and horizon `h` with `i + h < len`, a bullish
//! signal hits when `close[i+h] > close[i]` and a bearish one when
//! `close[i+h] < close[i]`. Triggers too close to the end only drop out of
//! the horizons they cannot reach.

use crate::domain::error::AnalyticsError;
use crate::domain::indicator::{
    compute_bollinger_bands, compute_macd_default, compute_rsi, compute_sma, compute_stochastic,
};
use crate::domain::raw_series::RawSeries;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Forward horizons, in bars.
pub const HORIZONS: [usize; 5] = [1, 3, 7, 14, 30];

const RSI_PERIOD: usize = 14;
const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;
const BOLLINGER_PERIOD: usize = 20;
const BOLLINGER_MULT: f64 = 2.0;
const SMA_FAST: usize = 50;
const SMA_SLOW: usize = 200;
const STOCH_OVERSOLD: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Bullish => write!(f, "bullish"),
            Direction::Bearish => write!(f, "bearish"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    RsiOversold,
    RsiOverbought,
    MacdBullishCross,
    MacdBearishCross,
    BollingerLowerTouch,
    BollingerUpperTouch,
    GoldenCross,
    DeathCross,
    StochasticOversold,
}

impl SignalKind {
    pub const ALL: [SignalKind; 9] = [
        SignalKind::RsiOversold,
        SignalKind::RsiOverbought,
        SignalKind::MacdBullishCross,
        SignalKind::MacdBearishCross,
        SignalKind::BollingerLowerTouch,
        SignalKind::BollingerUpperTouch,
        SignalKind::GoldenCross,
        SignalKind::DeathCross,
        SignalKind::StochasticOversold,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SignalKind::RsiOversold => "rsi_oversold",
            SignalKind::RsiOverbought => "rsi_overbought",
            SignalKind::MacdBullishCross => "macd_bullish_cross",
            SignalKind::MacdBearishCross => "macd_bearish_cross",
            SignalKind::BollingerLowerTouch => "bollinger_lower_touch",
            SignalKind::BollingerUpperTouch => "bollinger_upper_touch",
            SignalKind::GoldenCross => "golden_cross",
            SignalKind::DeathCross => "death_cross",
            SignalKind::StochasticOversold => "stochastic_oversold",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            SignalKind::RsiOversold => "RSI(14) below 30",
            SignalKind::RsiOverbought => "RSI(14) above 70",
            SignalKind::MacdBullishCross => "MACD(12,26,9) crosses above its signal line",
            SignalKind::MacdBearishCross => "MACD(12,26,9) crosses below its signal line",
            SignalKind::BollingerLowerTouch => "close at or below the lower Bollinger band (20, 2)",
            SignalKind::BollingerUpperTouch => "close at or above the upper Bollinger band (20, 2)",
            SignalKind::GoldenCross => "SMA(50) crosses above SMA(200)",
            SignalKind::DeathCross => "SMA(50) crosses below SMA(200)",
            SignalKind::StochasticOversold => "stochastic %K(14,3,3) below 20",
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            SignalKind::RsiOversold
            | SignalKind::MacdBullishCross
            | SignalKind::BollingerLowerTouch
            | SignalKind::GoldenCross
            | SignalKind::StochasticOversold => Direction::Bullish,
            SignalKind::RsiOverbought
            | SignalKind::MacdBearishCross
            | SignalKind::BollingerUpperTouch
            | SignalKind::DeathCross => Direction::Bearish,
        }
    }

    /// Per-bar trigger flags. `None` when the series lacks the columns the
    /// signal needs.
    pub fn triggers(self, raw: &RawSeries) -> Result<Option<Vec<bool>>, AnalyticsError> {
        let closes = raw.closes();
        let flags = match self {
            SignalKind::RsiOversold => {
                let rsi = compute_rsi(closes, RSI_PERIOD)?;
                rsi.iter().map(|v| *v < RSI_OVERSOLD).collect()
            }
            SignalKind::RsiOverbought => {
                let rsi = compute_rsi(closes, RSI_PERIOD)?;
                rsi.iter().map(|v| *v > RSI_OVERBOUGHT).collect()
            }
            SignalKind::MacdBullishCross => {
                let macd = compute_macd_default(closes)?;
                crosses_above(&macd.macd, &macd.signal)
            }
            SignalKind::MacdBearishCross => {
                let macd = compute_macd_default(closes)?;
                crosses_above(&macd.signal, &macd.macd)
            }
            SignalKind::BollingerLowerTouch => {
                let bands = compute_bollinger_bands(closes, BOLLINGER_PERIOD, BOLLINGER_MULT)?;
                closes.iter().zip(&bands.lower).map(|(c, l)| c <= l).collect()
            }
            SignalKind::BollingerUpperTouch => {
                let bands = compute_bollinger_bands(closes, BOLLINGER_PERIOD, BOLLINGER_MULT)?;
                closes.iter().zip(&bands.upper).map(|(c, u)| c >= u).collect()
            }
            SignalKind::GoldenCross => crosses_above(
                &compute_sma(closes, SMA_FAST)?,
                &compute_sma(closes, SMA_SLOW)?,
            ),
            SignalKind::DeathCross => crosses_above(
                &compute_sma(closes, SMA_SLOW)?,
                &compute_sma(closes, SMA_FAST)?,
            ),
            SignalKind::StochasticOversold => {
                if !raw.has_ohlc() {
                    return Ok(None);
                }
                let stoch = compute_stochastic(raw.highs(), raw.lows(), closes, 14, 3, 3)?;
                stoch.k.iter().map(|k| *k < STOCH_OVERSOLD).collect()
            }
        };
        Ok(Some(flags))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalResult {
    pub name: String,
    pub description: String,
    pub direction: Direction,
    pub occurrences: usize,
    /// Hit probability per horizon; horizons nothing could be evaluated at are absent.
    pub hit_rates: BTreeMap<usize, f64>,
    /// Number of occurrences each hit rate was computed over.
    pub evaluated: BTreeMap<usize, usize>,
}

/// Evaluate every catalog signal that applies to `raw`.
pub fn evaluate_signals(raw: &RawSeries) -> Result<Vec<SignalResult>, AnalyticsError> {
    let mut results = Vec::new();
    for kind in SignalKind::ALL {
        if let Some(result) = evaluate_signal(kind, raw)? {
            results.push(result);
        }
    }
    tracing::debug!(bars = raw.len(), signals = results.len(), "signals evaluated");
    Ok(results)
}

/// Evaluate one signal. `None` when the series cannot support it.
pub fn evaluate_signal(
    kind: SignalKind,
    raw: &RawSeries,
) -> Result<Option<SignalResult>, AnalyticsError> {
    let Some(triggers) = kind.triggers(raw)? else {
        return Ok(None);
    };
    let stats = forward_hits(&triggers, raw.closes(), kind.direction(), &HORIZONS);
    Ok(Some(SignalResult {
        name: kind.name().to_string(),
        description: kind.description().to_string(),
        direction: kind.direction(),
        occurrences: stats.occurrences,
        hit_rates: stats.hit_rates,
        evaluated: stats.evaluated,
    }))
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForwardHits {
    pub occurrences: usize,
    pub hit_rates: BTreeMap<usize, f64>,
    pub evaluated: BTreeMap<usize, usize>,
}

/// Score `triggers` against forward closes at each horizon.
pub fn forward_hits(
    triggers: &[bool],
    closes: &[f64],
    direction: Direction,
    horizons: &[usize],
) -> ForwardHits {
    let trigger_bars: Vec<usize> = triggers
        .iter()
        .enumerate()
        .filter(|(_, t)| **t)
        .map(|(i, _)| i)
        .collect();

    let mut stats = ForwardHits {
        occurrences: trigger_bars.len(),
        ..ForwardHits::default()
    };

    for &h in horizons {
        let mut evaluated = 0;
        let mut hits = 0;
        for &i in trigger_bars.iter().filter(|i| **i + h < closes.len()) {
            evaluated += 1;
            let hit = match direction {
                Direction::Bullish => closes[i + h] > closes[i],
                Direction::Bearish => closes[i + h] < closes[i],
            };
            if hit {
                hits += 1;
            }
        }
        if evaluated > 0 {
            stats.hit_rates.insert(h, hits as f64 / evaluated as f64);
            stats.evaluated.insert(h, evaluated);
        }
    }
    stats
}

/// True on bars where `a` moves from at-or-below `b` to strictly above it.
fn crosses_above(a: &[f64], b: &[f64]) -> Vec<bool> {
    let mut flags = vec![false; a.len()];
    for i in 1..a.len() {
        flags[i] = a[i - 1] <= b[i - 1] && a[i] > b[i];
    }
    flags
}
