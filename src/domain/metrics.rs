//! Performance metrics for a finished backtest.
//!
//! All figures are percentages except `sharpe_ratio`, which is the plain
//! mean / sample stddev of per-trade returns. It is not annualized and
//! carries no risk-free rate.

use crate::domain::backtest::Trade;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub exposure_pct: f64,
}

impl Metrics {
    /// `equity_curve` starts at `initial_equity`; `bars_long` counts bars
    /// spent in the market.
    pub fn compute(
        trades: &[Trade],
        equity_curve: &[f64],
        initial_equity: f64,
        bars_long: usize,
    ) -> Self {
        let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();
        let final_equity = equity_curve.last().copied().unwrap_or(initial_equity);

        let exposure_pct = if equity_curve.is_empty() {
            0.0
        } else {
            100.0 * bars_long as f64 / equity_curve.len() as f64
        };

        Metrics {
            total_return: final_equity - initial_equity,
            max_drawdown: max_drawdown(equity_curve),
            sharpe_ratio: sharpe_ratio(&returns),
            win_rate: win_rate(&returns),
            avg_win: mean_where(&returns, |r| r > 0.0),
            avg_loss: mean_where(&returns, |r| r < 0.0),
            exposure_pct,
        }
    }
}

/// Largest percentage decline from a running peak, as a positive number.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &equity in equity_curve {
        if equity > peak {
            peak = equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - equity) / peak * 100.0);
        }
    }
    max_dd
}

/// Mean over sample standard deviation (n - 1). Zero with fewer than two
/// returns or no dispersion.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();
    if stddev > 0.0 {
        mean / stddev
    } else {
        0.0
    }
}

/// Share of winning trades, 0..=100.
pub fn win_rate(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let wins = returns.iter().filter(|r| **r > 0.0).count();
    100.0 * wins as f64 / returns.len() as f64
}

fn mean_where(returns: &[f64], keep: impl Fn(f64) -> bool) -> f64 {
    let (sum, count) = returns
        .iter()
        .filter(|r| keep(**r))
        .fold((0.0, 0usize), |(s, c), r| (s + r, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::Side;
    use approx::assert_relative_eq;

    fn make_trade(return_pct: f64) -> Trade {
        Trade {
            entry_index: 0,
            exit_index: 1,
            entry_price: 100.0,
            exit_price: 100.0 + return_pct,
            return_pct,
            side: Side::Long,
        }
    }

    #[test]
    fn metrics_empty() {
        let m = Metrics::compute(&[], &[], 100.0, 0);
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.win_rate, 0.0);
        assert_eq!(m.avg_win, 0.0);
        assert_eq!(m.avg_loss, 0.0);
        assert_eq!(m.exposure_pct, 0.0);
    }

    #[test]
    fn total_return_from_final_equity() {
        let m = Metrics::compute(&[make_trade(10.0)], &[100.0, 100.0, 110.0], 100.0, 1);
        assert_relative_eq!(m.total_return, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn drawdown_peak_to_trough() {
        // peak 120, trough 90 → 25%
        let dd = max_drawdown(&[100.0, 120.0, 90.0, 110.0, 95.0]);
        assert_relative_eq!(dd, 25.0, epsilon = 1e-12);
    }

    #[test]
    fn drawdown_monotonic_rise_is_zero() {
        assert_eq!(max_drawdown(&[100.0, 101.0, 105.0]), 0.0);
    }

    #[test]
    fn sharpe_needs_two_trades() {
        assert_eq!(sharpe_ratio(&[5.0]), 0.0);
        assert_eq!(sharpe_ratio(&[]), 0.0);
    }

    #[test]
    fn sharpe_zero_dispersion() {
        assert_eq!(sharpe_ratio(&[2.0, 2.0, 2.0]), 0.0);
    }

    #[test]
    fn sharpe_uses_sample_stddev() {
        // mean 2, sample variance ((−2)² + 0 + 2²) / 2 = 4 → stddev 2
        assert_relative_eq!(sharpe_ratio(&[0.0, 2.0, 4.0]), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn win_rate_and_averages() {
        let trades: Vec<Trade> = [10.0, -5.0, 20.0, -15.0, 0.0]
            .into_iter()
            .map(make_trade)
            .collect();
        let m = Metrics::compute(&trades, &[100.0], 100.0, 0);
        assert_relative_eq!(m.win_rate, 40.0, epsilon = 1e-12);
        assert_relative_eq!(m.avg_win, 15.0, epsilon = 1e-12);
        assert_relative_eq!(m.avg_loss, -10.0, epsilon = 1e-12);
    }

    #[test]
    fn exposure_is_share_of_bars() {
        let m = Metrics::compute(&[], &[100.0; 8], 100.0, 2);
        assert_relative_eq!(m.exposure_pct, 25.0, epsilon = 1e-12);
    }
}
