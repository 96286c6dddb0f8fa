//! Strategy catalog.
//!
//! Every strategy is a pure function from closes to a per-bar target
//! position. Bars where an indicator is still warming up compare false
//! against anything, so they come out `Flat`.

use crate::domain::error::AnalyticsError;
use crate::domain::indicator::{
    compute_bollinger_bands, compute_ema, compute_macd, compute_rsi, compute_sma,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Position {
    Flat,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrategyKind {
    SmaCrossover {
        fast: usize,
        slow: usize,
    },
    EmaCrossover {
        fast: usize,
        slow: usize,
    },
    /// Enter below `oversold`, hold until RSI rises above `overbought`.
    RsiReversion {
        period: usize,
        oversold: f64,
        overbought: f64,
    },
    MacdCrossover {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    /// Enter on a close at or under the lower band, exit at the middle band.
    BollingerReversion {
        period: usize,
        mult: f64,
    },
    BuyAndHold,
}

/// Catalog names accepted by `StrategyKind::from_name`.
pub const STRATEGY_NAMES: [&str; 6] = [
    "sma_crossover",
    "ema_crossover",
    "rsi_reversion",
    "macd_crossover",
    "bollinger_reversion",
    "buy_and_hold",
];

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::SmaCrossover { .. } => "sma_crossover",
            StrategyKind::EmaCrossover { .. } => "ema_crossover",
            StrategyKind::RsiReversion { .. } => "rsi_reversion",
            StrategyKind::MacdCrossover { .. } => "macd_crossover",
            StrategyKind::BollingerReversion { .. } => "bollinger_reversion",
            StrategyKind::BuyAndHold => "buy_and_hold",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StrategyKind::SmaCrossover { .. } => "long while the fast SMA is above the slow SMA",
            StrategyKind::EmaCrossover { .. } => "long while the fast EMA is above the slow EMA",
            StrategyKind::RsiReversion { .. } => {
                "buy when RSI is oversold, sell when it turns overbought"
            }
            StrategyKind::MacdCrossover { .. } => "long while MACD is above its signal line",
            StrategyKind::BollingerReversion { .. } => {
                "buy at the lower band, sell back at the middle band"
            }
            StrategyKind::BuyAndHold => "long from the first bar to the last",
        }
    }

    /// The strategy with its default parameters.
    pub fn default_for(name: &str) -> Result<Self, AnalyticsError> {
        Self::from_name(name, &BTreeMap::new())
    }

    /// Build a strategy by catalog name. Missing parameters take their
    /// defaults; unknown parameter names are rejected.
    pub fn from_name(name: &str, params: &BTreeMap<String, f64>) -> Result<Self, AnalyticsError> {
        let key = name.trim().to_ascii_lowercase().replace('-', "_");
        let mut reader = ParamReader::new(params);
        let kind = match key.as_str() {
            "sma_crossover" => StrategyKind::SmaCrossover {
                fast: reader.period("fast", 10)?,
                slow: reader.period("slow", 30)?,
            },
            "ema_crossover" => StrategyKind::EmaCrossover {
                fast: reader.period("fast", 12)?,
                slow: reader.period("slow", 26)?,
            },
            "rsi_reversion" => StrategyKind::RsiReversion {
                period: reader.period("period", 14)?,
                oversold: reader.value("oversold", 30.0),
                overbought: reader.value("overbought", 70.0),
            },
            "macd_crossover" => StrategyKind::MacdCrossover {
                fast: reader.period("fast", 12)?,
                slow: reader.period("slow", 26)?,
                signal: reader.period("signal", 9)?,
            },
            "bollinger_reversion" => StrategyKind::BollingerReversion {
                period: reader.period("period", 20)?,
                mult: reader.value("mult", 2.0),
            },
            "buy_and_hold" => StrategyKind::BuyAndHold,
            _ => {
                return Err(AnalyticsError::UnknownStrategy {
                    name: name.to_string(),
                })
            }
        };
        reader.finish()?;
        kind.validate()?;
        Ok(kind)
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        match *self {
            StrategyKind::SmaCrossover { fast, slow } | StrategyKind::EmaCrossover { fast, slow } => {
                check_fast_slow(fast, slow)
            }
            StrategyKind::MacdCrossover { fast, slow, signal } => {
                check_fast_slow(fast, slow)?;
                if signal == 0 {
                    return Err(AnalyticsError::invalid_parameter("signal", "must be at least 1"));
                }
                Ok(())
            }
            StrategyKind::RsiReversion {
                period,
                oversold,
                overbought,
            } => {
                if period == 0 {
                    return Err(AnalyticsError::invalid_parameter("period", "must be at least 1"));
                }
                if !(0.0..=100.0).contains(&oversold) || !(0.0..=100.0).contains(&overbought) {
                    return Err(AnalyticsError::invalid_parameter(
                        "oversold",
                        "thresholds must lie within 0..=100",
                    ));
                }
                if oversold >= overbought {
                    return Err(AnalyticsError::invalid_parameter(
                        "oversold",
                        format!("{} must be below overbought {}", oversold, overbought),
                    ));
                }
                Ok(())
            }
            StrategyKind::BollingerReversion { period, mult } => {
                if period == 0 {
                    return Err(AnalyticsError::invalid_parameter("period", "must be at least 1"));
                }
                if !mult.is_finite() || mult <= 0.0 {
                    return Err(AnalyticsError::invalid_parameter(
                        "mult",
                        format!("must be positive, got {}", mult),
                    ));
                }
                Ok(())
            }
            StrategyKind::BuyAndHold => Ok(()),
        }
    }

    /// Target position per bar. Output length equals `closes.len()`.
    pub fn positions(&self, closes: &[f64]) -> Result<Vec<Position>, AnalyticsError> {
        let positions = match *self {
            StrategyKind::SmaCrossover { fast, slow } => {
                above(&compute_sma(closes, fast)?, &compute_sma(closes, slow)?)
            }
            StrategyKind::EmaCrossover { fast, slow } => {
                above(&compute_ema(closes, fast)?, &compute_ema(closes, slow)?)
            }
            StrategyKind::MacdCrossover { fast, slow, signal } => {
                let macd = compute_macd(closes, fast, slow, signal)?;
                above(&macd.macd, &macd.signal)
            }
            StrategyKind::RsiReversion {
                period,
                oversold,
                overbought,
            } => {
                let rsi = compute_rsi(closes, period)?;
                hysteresis(closes.len(), |i| rsi[i] < oversold, |i| rsi[i] > overbought)
            }
            StrategyKind::BollingerReversion { period, mult } => {
                let bands = compute_bollinger_bands(closes, period, mult)?;
                hysteresis(
                    closes.len(),
                    |i| closes[i] <= bands.lower[i],
                    |i| closes[i] >= bands.middle[i],
                )
            }
            StrategyKind::BuyAndHold => vec![Position::Long; closes.len()],
        };
        Ok(positions)
    }

    /// Parameters as name/value pairs, in catalog order.
    pub fn params(&self) -> Vec<(&'static str, f64)> {
        match *self {
            StrategyKind::SmaCrossover { fast, slow } | StrategyKind::EmaCrossover { fast, slow } => {
                vec![("fast", fast as f64), ("slow", slow as f64)]
            }
            StrategyKind::RsiReversion {
                period,
                oversold,
                overbought,
            } => vec![
                ("period", period as f64),
                ("oversold", oversold),
                ("overbought", overbought),
            ],
            StrategyKind::MacdCrossover { fast, slow, signal } => vec![
                ("fast", fast as f64),
                ("slow", slow as f64),
                ("signal", signal as f64),
            ],
            StrategyKind::BollingerReversion { period, mult } => {
                vec![("period", period as f64), ("mult", mult)]
            }
            StrategyKind::BuyAndHold => Vec::new(),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        let params = self.params();
        if !params.is_empty() {
            let rendered: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            write!(f, "({})", rendered.join(", "))?;
        }
        Ok(())
    }
}

fn check_fast_slow(fast: usize, slow: usize) -> Result<(), AnalyticsError> {
    if fast == 0 {
        return Err(AnalyticsError::invalid_parameter("fast", "must be at least 1"));
    }
    if fast >= slow {
        return Err(AnalyticsError::invalid_parameter(
            "fast",
            format!("{} must be below slow {}", fast, slow),
        ));
    }
    Ok(())
}

fn above(a: &[f64], b: &[f64]) -> Vec<Position> {
    a.iter()
        .zip(b)
        .map(|(x, y)| if x > y { Position::Long } else { Position::Flat })
        .collect()
}

/// Latching position: go long when `enter(i)`, stay long until `exit(i)`.
fn hysteresis(
    len: usize,
    enter: impl Fn(usize) -> bool,
    exit: impl Fn(usize) -> bool,
) -> Vec<Position> {
    let mut state = Position::Flat;
    (0..len)
        .map(|i| {
            state = match state {
                Position::Flat if enter(i) => Position::Long,
                Position::Long if exit(i) => Position::Flat,
                other => other,
            };
            state
        })
        .collect()
}

struct ParamReader<'a> {
    params: &'a BTreeMap<String, f64>,
    used: Vec<&'static str>,
}

impl<'a> ParamReader<'a> {
    fn new(params: &'a BTreeMap<String, f64>) -> Self {
        Self {
            params,
            used: Vec::new(),
        }
    }

    fn value(&mut self, name: &'static str, default: f64) -> f64 {
        self.used.push(name);
        self.params.get(name).copied().unwrap_or(default)
    }

    fn period(&mut self, name: &'static str, default: usize) -> Result<usize, AnalyticsError> {
        let value = self.value(name, default as f64);
        if !value.is_finite() || value < 1.0 || value.fract() != 0.0 {
            return Err(AnalyticsError::invalid_parameter(
                name,
                format!("must be a positive integer, got {}", value),
            ));
        }
        Ok(value as usize)
    }

    fn finish(self) -> Result<(), AnalyticsError> {
        match self.params.keys().find(|k| !self.used.iter().any(|u| u == k)) {
            Some(unknown) => Err(AnalyticsError::invalid_parameter(
                unknown,
                "not a parameter of this strategy",
            )),
            None => Ok(()),
        }
    }
}
