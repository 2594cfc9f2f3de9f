//! Performance metrics and statistics for a finished backtest.

use serde::Serialize;

use super::portfolio::{EquityPoint, Portfolio};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    /// Fraction of trades with positive pnl, 0 when there are no trades.
    pub win_rate: f64,
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    /// Largest peak-to-trough decline, in percent of the peak.
    pub max_drawdown: f64,
    /// Longest run of bars spent below a prior peak.
    pub max_drawdown_duration: usize,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    /// `None` when there are no losing trades.
    pub profit_factor: Option<f64>,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub avg_trade_duration_days: f64,
    pub final_equity: f64,
}

impl Metrics {
    pub fn compute(portfolio: &Portfolio, risk_free_rate: f64) -> Self {
        let equity_curve = &portfolio.equity_curve;
        let trades = &portfolio.closed_trades;
        let initial_capital = portfolio.initial_capital;

        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_equity - initial_capital) / initial_capital
        } else {
            0.0
        };

        let years = equity_curve.len() as f64 / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return > -1.0 && total_return.is_finite() {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);

        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(equity_curve, daily_rf);

        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut breakeven_trades = 0usize;
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_duration_secs = 0i64;

        for trade in trades {
            let pnl = trade.pnl;
            if pnl > 0.0 {
                winning_trades += 1;
                gross_profit += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                losing_trades += 1;
                gross_loss += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                breakeven_trades += 1;
            }

            total_duration_secs += (trade.exit_time - trade.entry_time).num_seconds();
        }

        let total_trades = trades.len();
        let win_rate = ratio(winning_trades as f64, total_trades as f64);

        let profit_factor = if gross_loss > 0.0 {
            Some(gross_profit / gross_loss)
        } else {
            None
        };

        Metrics {
            total_trades,
            winning_trades,
            losing_trades,
            breakeven_trades,
            win_rate,
            total_return_pct: total_return * 100.0,
            annualized_return_pct: annualized_return * 100.0,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown: max_drawdown * 100.0,
            max_drawdown_duration,
            avg_win: ratio(gross_profit, winning_trades as f64),
            avg_loss: ratio(gross_loss, losing_trades as f64),
            largest_win,
            largest_loss,
            profit_factor,
            gross_profit,
            gross_loss,
            avg_trade_duration_days: ratio(
                total_duration_secs as f64 / SECONDS_PER_DAY,
                total_trades as f64,
            ),
            final_equity,
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Maximum drawdown as a fraction of the running peak, and its duration in bars.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            max_dd = max_dd.max(dd);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd.clamp(0.0, 1.0), max_dd_duration)
}

fn compute_risk_adjusted(equity_curve: &[EquityPoint], daily_rf: f64) -> (f64, f64) {
    if equity_curve.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            let curr = w[1].equity;
            if prev > 0.0 { (curr - prev) / prev } else { 0.0 }
        })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;

    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let excess_return = mean - daily_rf;

    let sharpe = if stddev > 0.0 {
        (excess_return / stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside_sq_sum: f64 = returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|&r| (r - daily_rf).powi(2))
        .sum();
    let downside_stddev = (downside_sq_sum / n).sqrt();

    let sortino = if downside_stddev > 0.0 {
        (excess_return / downside_stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{ExitReason, Side, Trade};
    use chrono::{NaiveDate, NaiveDateTime};

    fn day(i: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::days(i)
    }

    fn make_equity_curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint {
                timestamp: day(i as i64),
                equity: v,
            })
            .collect()
    }

    fn make_portfolio(equity: Vec<f64>, trades: Vec<Trade>) -> Portfolio {
        let initial = equity.first().copied().unwrap_or(100_000.0);
        let mut portfolio = Portfolio::new(initial);
        for trade in trades {
            portfolio.record_trade(trade);
        }
        for point in make_equity_curve(&equity) {
            portfolio.record_equity(point.timestamp, point.equity);
        }
        portfolio
    }

    fn make_trade(id: u64, pnl: f64, days: i64) -> Trade {
        Trade {
            id,
            symbol: "AAPL".to_string(),
            side: Side::Long,
            size: 100.0,
            entry_time: day(0),
            entry_price: 100.0,
            exit_time: day(days),
            exit_price: 100.0 + pnl / 100.0,
            pnl,
            pnl_pct: pnl / 100.0,
            exit_reason: ExitReason::Reversal,
            bars_held: days as usize,
        }
    }

    #[test]
    fn metrics_empty_portfolio() {
        let portfolio = Portfolio::new(100_000.0);
        let metrics = Metrics::compute(&portfolio, 0.05);
        assert_eq!(metrics.total_return_pct, 0.0);
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.final_equity, 100_000.0);
        assert_eq!(metrics.profit_factor, None);
    }

    #[test]
    fn metrics_total_return_positive() {
        let portfolio = make_portfolio(vec![100_000.0, 110_000.0], vec![]);
        let metrics = Metrics::compute(&portfolio, 0.05);
        assert!((metrics.total_return_pct - 10.0).abs() < 1e-9);
    }

    #[test]
    fn metrics_total_return_negative() {
        let portfolio = make_portfolio(vec![100_000.0, 90_000.0], vec![]);
        let metrics = Metrics::compute(&portfolio, 0.05);
        assert!((metrics.total_return_pct - (-10.0)).abs() < 1e-9);
    }

    #[test]
    fn metrics_annualized_return_flat() {
        let portfolio = make_portfolio(vec![100_000.0; 252], vec![]);
        let metrics = Metrics::compute(&portfolio, 0.05);
        assert!(metrics.annualized_return_pct.abs() < 1e-9);
    }

    #[test]
    fn metrics_trade_stats_wins_and_losses() {
        let trades = vec![
            make_trade(1, 100.0, 5),
            make_trade(2, -50.0, 3),
            make_trade(3, 200.0, 10),
            make_trade(4, 0.0, 1),
        ];
        let portfolio = make_portfolio(vec![100_000.0, 100_250.0], trades);
        let metrics = Metrics::compute(&portfolio, 0.05);

        assert_eq!(metrics.total_trades, 4);
        assert_eq!(metrics.winning_trades, 2);
        assert_eq!(metrics.losing_trades, 1);
        assert_eq!(metrics.breakeven_trades, 1);
        assert!((metrics.win_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn metrics_profit_factor() {
        let trades = vec![
            make_trade(1, 100.0, 5),
            make_trade(2, -50.0, 3),
            make_trade(3, 200.0, 10),
        ];
        let portfolio = make_portfolio(vec![100_000.0, 100_250.0], trades);
        let metrics = Metrics::compute(&portfolio, 0.05);

        assert!((metrics.profit_factor.unwrap() - 6.0).abs() < 1e-9);
        assert!((metrics.gross_profit - 300.0).abs() < 1e-9);
        assert!((metrics.gross_loss - 50.0).abs() < 1e-9);
    }

    #[test]
    fn metrics_profit_factor_undefined_without_losses() {
        let trades = vec![make_trade(1, 100.0, 5)];
        let portfolio = make_portfolio(vec![100_000.0, 100_100.0], trades);
        let metrics = Metrics::compute(&portfolio, 0.0);
        assert_eq!(metrics.profit_factor, None);
    }

    #[test]
    fn metrics_avg_win_and_loss() {
        let trades = vec![
            make_trade(1, 100.0, 5),
            make_trade(2, -60.0, 3),
            make_trade(3, 200.0, 10),
            make_trade(4, -40.0, 2),
        ];
        let portfolio = make_portfolio(vec![100_000.0, 100_200.0], trades);
        let metrics = Metrics::compute(&portfolio, 0.05);

        assert!((metrics.avg_win - 150.0).abs() < 1e-9);
        assert!((metrics.avg_loss - 50.0).abs() < 1e-9);
    }

    #[test]
    fn metrics_largest_win_and_loss() {
        let trades = vec![
            make_trade(1, 100.0, 5),
            make_trade(2, 300.0, 3),
            make_trade(3, -50.0, 10),
            make_trade(4, -150.0, 2),
        ];
        let portfolio = make_portfolio(vec![100_000.0, 100_200.0], trades);
        let metrics = Metrics::compute(&portfolio, 0.05);

        assert!((metrics.largest_win - 300.0).abs() < 1e-9);
        assert!((metrics.largest_loss - 150.0).abs() < 1e-9);
    }

    #[test]
    fn metrics_avg_trade_duration() {
        let trades = vec![
            make_trade(1, 100.0, 5),
            make_trade(2, -50.0, 10),
            make_trade(3, 200.0, 15),
        ];
        let portfolio = make_portfolio(vec![100_000.0, 100_250.0], trades);
        let metrics = Metrics::compute(&portfolio, 0.05);

        assert!((metrics.avg_trade_duration_days - 10.0).abs() < 1e-9);
    }

    #[test]
    fn metrics_max_drawdown_percent() {
        let curve = make_equity_curve(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]);
        let (dd, _) = compute_drawdown(&curve);
        assert!((dd - (110.0 - 80.0) / 110.0).abs() < 1e-9);

        let portfolio = make_portfolio(vec![100.0, 110.0, 90.0, 95.0, 80.0, 100.0], vec![]);
        let metrics = Metrics::compute(&portfolio, 0.0);
        assert!((metrics.max_drawdown - 30.0 / 110.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn metrics_max_drawdown_duration() {
        let curve = make_equity_curve(&[100.0, 110.0, 100.0, 90.0, 85.0, 95.0]);
        let (_, duration) = compute_drawdown(&curve);
        assert_eq!(duration, 4);
    }

    #[test]
    fn metrics_sharpe_ratio_positive() {
        let mut values = vec![100_000.0];
        for i in 1..253 {
            values.push(100_000.0 * (1.0 + 0.001 * (i as f64)));
        }
        let portfolio = make_portfolio(values, vec![]);
        let metrics = Metrics::compute(&portfolio, 0.0);

        assert!(metrics.sharpe_ratio > 0.0);
    }

    #[test]
    fn metrics_sharpe_zero_on_flat_curve() {
        let portfolio = make_portfolio(vec![100_000.0; 30], vec![]);
        let metrics = Metrics::compute(&portfolio, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.sortino_ratio, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
    }

    #[test]
    fn metrics_sortino_ratio() {
        let curve = make_equity_curve(&[100.0, 101.0, 100.5, 101.5, 100.0, 102.0]);
        let (sharpe, sortino) = compute_risk_adjusted(&curve, 0.0);

        assert!(sharpe.is_finite());
        assert!(sortino.is_finite());
        assert!(sortino > 0.0);
    }

    #[test]
    fn metrics_no_trades() {
        let portfolio = make_portfolio(vec![100_000.0, 110_000.0], vec![]);
        let metrics = Metrics::compute(&portfolio, 0.05);

        assert_eq!(metrics.winning_trades, 0);
        assert_eq!(metrics.losing_trades, 0);
        assert_eq!(metrics.breakeven_trades, 0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.profit_factor, None);
        assert_eq!(metrics.avg_win, 0.0);
        assert_eq!(metrics.avg_loss, 0.0);
        assert_eq!(metrics.avg_trade_duration_days, 0.0);
    }
}
