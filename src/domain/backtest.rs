//! Single-instrument, long-only backtest.
//!
//! The engine is a two-state machine driven by the strategy's per-bar target
//! position. Entries and exits fill at the close of the signalling bar. A
//! position still open on the last bar is closed at the last close.
//!
//! Equity starts at 100 and compounds by each trade's return on its exit
//! bar, so the curve is flat while a position is open.

use crate::domain::error::AnalyticsError;
use crate::domain::metrics::Metrics;
use crate::domain::strategy::{Position, StrategyKind};
use serde::Serialize;

/// Shortest history callers should backtest on.
pub const MIN_BACKTEST_BARS: usize = 30;

pub const INITIAL_EQUITY: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Long,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    pub return_pct: f64,
    pub side: Side,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub strategy: StrategyKind,
}

impl BacktestConfig {
    pub fn new(strategy: StrategyKind) -> Self {
        Self { strategy }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub strategy: String,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub exposure_pct: f64,
}

/// Reject histories shorter than `MIN_BACKTEST_BARS`.
pub fn check_backtest_input(closes: &[f64]) -> Result<(), AnalyticsError> {
    if closes.len() < MIN_BACKTEST_BARS {
        return Err(AnalyticsError::InsufficientData {
            bars: closes.len(),
            minimum: MIN_BACKTEST_BARS,
        });
    }
    Ok(())
}

/// Run `config.strategy` over `closes`. The length check is left to the
/// caller via `check_backtest_input`; short input still produces a result.
///
/// Closes must be positive and finite; trade returns divide by the entry price.
pub fn run_backtest(closes: &[f64], config: &BacktestConfig) -> Result<BacktestResult, AnalyticsError> {
    if let Some(i) = closes.iter().position(|c| !c.is_finite() || *c <= 0.0) {
        return Err(AnalyticsError::InvalidSeries {
            reason: format!("backtest needs positive closes, found {} at index {}", closes[i], i),
        });
    }
    let positions = config.strategy.positions(closes)?;

    let mut trades = Vec::new();
    let mut equity_curve = Vec::with_capacity(closes.len());
    let mut equity = INITIAL_EQUITY;
    let mut entry: Option<usize> = None;
    let mut bars_long = 0;
    let last = closes.len().saturating_sub(1);

    for (i, &target) in positions.iter().enumerate() {
        match (entry, target) {
            (None, Position::Long) => entry = Some(i),
            (Some(entry_index), Position::Flat) => {
                let trade = close_trade(closes, entry_index, i);
                equity *= 1.0 + trade.return_pct / 100.0;
                trades.push(trade);
                entry = None;
            }
            _ => {}
        }
        if entry.is_some() {
            bars_long += 1;
        }
        if i == last {
            match entry.take() {
                Some(entry_index) if entry_index < i => {
                    let trade = close_trade(closes, entry_index, i);
                    equity *= 1.0 + trade.return_pct / 100.0;
                    trades.push(trade);
                }
                // entered on the final bar: nothing was held, so no trade
                Some(_) => bars_long -= 1,
                None => {}
            }
        }
        equity_curve.push(equity);
    }

    let metrics = Metrics::compute(&trades, &equity_curve, INITIAL_EQUITY, bars_long);

    tracing::debug!(
        strategy = %config.strategy,
        bars = closes.len(),
        trades = trades.len(),
        total_return = metrics.total_return,
        "backtest finished"
    );

    Ok(BacktestResult {
        strategy: config.strategy.to_string(),
        trades,
        equity_curve,
        total_return: metrics.total_return,
        max_drawdown: metrics.max_drawdown,
        sharpe_ratio: metrics.sharpe_ratio,
        win_rate: metrics.win_rate,
        avg_win: metrics.avg_win,
        avg_loss: metrics.avg_loss,
        exposure_pct: metrics.exposure_pct,
    })
}

fn close_trade(closes: &[f64], entry_index: usize, exit_index: usize) -> Trade {
    let entry_price = closes[entry_index];
    let exit_price = closes[exit_index];
    Trade {
        entry_index,
        exit_index,
        entry_price,
        exit_price,
        return_pct: (exit_price / entry_price - 1.0) * 100.0,
        side: Side::Long,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const GOLDEN: [f64; 16] = [
        100.0, 102.0, 101.0, 105.0, 110.0, 108.0, 95.0, 90.0, 92.0, 100.0, 103.0, 107.0, 96.0,
        91.0, 93.0, 101.0,
    ];

    fn golden_config() -> BacktestConfig {
        BacktestConfig::new(StrategyKind::SmaCrossover { fast: 3, slow: 5 })
    }

    #[test]
    fn golden_trades() {
        let result = run_backtest(&GOLDEN, &golden_config()).unwrap();
        assert_eq!(result.trades.len(), 2);

        let first = &result.trades[0];
        assert_eq!((first.entry_index, first.exit_index), (4, 7));
        assert_eq!((first.entry_price, first.exit_price), (110.0, 90.0));

        let second = &result.trades[1];
        assert_eq!((second.entry_index, second.exit_index), (10, 13));
        assert_eq!((second.entry_price, second.exit_price), (103.0, 91.0));
        assert_relative_eq!(second.return_pct, (91.0 / 103.0 - 1.0) * 100.0, epsilon = 1e-12);
    }

    #[test]
    fn golden_metrics() {
        let result = run_backtest(&GOLDEN, &golden_config()).unwrap();
        let expected = 100.0 * (90.0 / 110.0) * (91.0 / 103.0) - 100.0;
        assert_relative_eq!(result.total_return, expected, epsilon = 1e-9);
        assert_relative_eq!(result.max_drawdown, -expected, epsilon = 1e-9);
        assert_eq!(result.win_rate, 0.0);
        assert_eq!(result.avg_win, 0.0);
        assert!(result.avg_loss < 0.0);
        assert_relative_eq!(result.exposure_pct, 37.5, epsilon = 1e-12);
        assert_eq!(result.strategy, "sma_crossover(fast=3, slow=5)");
    }

    #[test]
    fn equity_changes_only_on_exit_bars() {
        let result = run_backtest(&GOLDEN, &golden_config()).unwrap();
        assert_eq!(result.equity_curve.len(), GOLDEN.len());
        assert!(result.equity_curve[..7].iter().all(|e| *e == 100.0));
        assert_relative_eq!(result.equity_curve[7], 100.0 * 90.0 / 110.0, epsilon = 1e-9);
        assert_eq!(result.equity_curve[7], result.equity_curve[12]);
        assert_eq!(result.equity_curve[13], result.equity_curve[15]);
    }

    #[test]
    fn open_position_closed_on_last_bar() {
        let closes = [10.0, 11.0, 12.0, 13.0];
        let result = run_backtest(&closes, &BacktestConfig::new(StrategyKind::BuyAndHold)).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].entry_index, 0);
        assert_eq!(result.trades[0].exit_index, 3);
        assert_relative_eq!(result.total_return, 30.0, epsilon = 1e-9);
        assert_relative_eq!(result.exposure_pct, 100.0, epsilon = 1e-12);
        assert_eq!(result.win_rate, 100.0);
    }

    #[test]
    fn entry_on_final_bar_records_no_trade() {
        let closes = [10.0, 10.0, 10.0, 10.0, 10.0, 11.0];
        let config = BacktestConfig::new(StrategyKind::SmaCrossover { fast: 2, slow: 3 });
        let positions = config.strategy.positions(&closes).unwrap();
        assert_eq!(positions[5], Position::Long);
        assert!(positions[..5].iter().all(|p| *p == Position::Flat));

        let result = run_backtest(&closes, &config).unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.win_rate, 0.0);
        assert_eq!(result.exposure_pct, 0.0);
        assert!(result.equity_curve.iter().all(|e| *e == 100.0));
    }

    #[test]
    fn non_positive_close_rejected() {
        let mut closes = vec![50.0; 40];
        closes[10] = 0.0;
        assert!(matches!(
            run_backtest(&closes, &BacktestConfig::new(StrategyKind::BuyAndHold)),
            Err(AnalyticsError::InvalidSeries { .. })
        ));
    }

    #[test]
    fn no_signals_no_trades() {
        let closes = vec![50.0; 40];
        let result = run_backtest(&closes, &golden_config()).unwrap();
        assert!(result.trades.is_empty());
        assert!(result.equity_curve.iter().all(|e| *e == 100.0));
        assert_eq!(result.total_return, 0.0);
        assert_eq!(result.sharpe_ratio, 0.0);
    }

    #[test]
    fn empty_input_is_empty_result() {
        let result = run_backtest(&[], &golden_config()).unwrap();
        assert!(result.trades.is_empty());
        assert!(result.equity_curve.is_empty());
    }

    #[test]
    fn deterministic() {
        let closes: Vec<f64> = (0..200)
            .map(|i| 100.0 + (i as f64 * 0.21).sin() * 12.0 + (i as f64 * 0.05).cos() * 4.0)
            .collect();
        let config = BacktestConfig::new(StrategyKind::MacdCrossover {
            fast: 12,
            slow: 26,
            signal: 9,
        });
        let a = run_backtest(&closes, &config).unwrap();
        let b = run_backtest(&closes, &config).unwrap();
        assert_eq!(a, b);
        assert!(!a.trades.is_empty());
    }

    #[test]
    fn input_check() {
        assert!(matches!(
            check_backtest_input(&GOLDEN),
            Err(AnalyticsError::InsufficientData {
                bars: 16,
                minimum: 30
            })
        ));
        assert!(check_backtest_input(&[1.0; 30]).is_ok());
    }

    #[test]
    fn invalid_strategy_params_surface() {
        let config = BacktestConfig::new(StrategyKind::SmaCrossover { fast: 0, slow: 5 });
        assert!(run_backtest(&GOLDEN, &config).is_err());
    }
}
