//! Plain-text report adapter for terminals.
//!
//! Backtests get a metrics table, a monthly returns grid and the trade log;
//! recommendations and hybrid scores get a compact breakdown.

use std::collections::BTreeMap;
use std::io::Write;

use chrono::Datelike;

use crate::domain::analysis::Recommendation;
use crate::domain::backtest::BacktestResult;
use crate::domain::error::EngineError;
use crate::domain::hybrid::HybridScore;
use crate::domain::metrics::Metrics;
use crate::domain::portfolio::EquityPoint;
use crate::domain::position::Trade;
use crate::ports::report_port::ReportPort;

pub struct TextReport;

pub struct MonthlyReturn {
    pub year: i32,
    pub month: u32,
    pub return_pct: f64,
}

/// Month-over-month percent change of month-end equity.
///
/// The first month is measured from the first equity point.
pub fn compute_monthly_returns(equity_curve: &[EquityPoint]) -> Vec<MonthlyReturn> {
    let Some(first) = equity_curve.first() else {
        return Vec::new();
    };

    let mut month_end: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for point in equity_curve {
        month_end.insert((point.timestamp.year(), point.timestamp.month()), point.equity);
    }

    let mut prev = first.equity;
    month_end
        .into_iter()
        .map(|((year, month), end)| {
            let return_pct = if prev > 0.0 { (end - prev) / prev * 100.0 } else { 0.0 };
            prev = end;
            MonthlyReturn {
                year,
                month,
                return_pct,
            }
        })
        .collect()
}

pub fn format_returns_grid(returns: &[MonthlyReturn]) -> String {
    if returns.is_empty() {
        return "No returns data.\n".to_string();
    }

    let mut years: BTreeMap<i32, [Option<f64>; 12]> = BTreeMap::new();
    for r in returns {
        let row = years.entry(r.year).or_insert([None; 12]);
        row[(r.month - 1) as usize] = Some(r.return_pct);
    }

    let mut output = String::from("Year ");
    for name in [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ] {
        output.push_str(&format!("{:>7}", name));
    }
    output.push_str(&format!("{:>8}\n", "YTD"));

    for (year, months) in &years {
        output.push_str(&format!("{:<5}", year));
        let mut ytd = 1.0_f64;
        for cell in months {
            match cell {
                Some(ret) => {
                    ytd *= 1.0 + ret / 100.0;
                    output.push_str(&format!("{:>7.2}", ret));
                }
                None => output.push_str(&format!("{:>7}", "-")),
            }
        }
        output.push_str(&format!("{:>8.2}\n", (ytd - 1.0) * 100.0));
    }
    output
}

fn format_metrics(m: &Metrics) -> String {
    let profit_factor = m
        .profit_factor
        .map(|pf| format!("{:.2}", pf))
        .unwrap_or_else(|| "n/a".to_string());
    let rows = [
        ("Total Trades", m.total_trades.to_string()),
        (
            "Win / Loss / Even",
            format!("{} / {} / {}", m.winning_trades, m.losing_trades, m.breakeven_trades),
        ),
        ("Win Rate", format!("{:.2}%", m.win_rate * 100.0)),
        ("Total Return", format!("{:.2}%", m.total_return_pct)),
        ("Annualized Return", format!("{:.2}%", m.annualized_return_pct)),
        ("Sharpe Ratio", format!("{:.3}", m.sharpe_ratio)),
        ("Sortino Ratio", format!("{:.3}", m.sortino_ratio)),
        ("Max Drawdown", format!("{:.2}%", m.max_drawdown)),
        ("Max DD Duration", format!("{} bars", m.max_drawdown_duration)),
        ("Profit Factor", profit_factor),
        ("Avg Win", format!("{:.2}", m.avg_win)),
        ("Avg Loss", format!("{:.2}", m.avg_loss)),
        ("Largest Win", format!("{:.2}", m.largest_win)),
        ("Largest Loss", format!("{:.2}", m.largest_loss)),
        ("Avg Trade Duration", format!("{:.1} days", m.avg_trade_duration_days)),
        ("Final Equity", format!("{:.2}", m.final_equity)),
    ];

    rows.iter()
        .map(|(label, value)| format!("  {:<20} {:>16}\n", label, value))
        .collect()
}

fn format_trade_log(trades: &[Trade]) -> String {
    if trades.is_empty() {
        return "No trades.\n".to_string();
    }
    let mut output = format!(
        "{:>4} {:<5} {:>8} {:<10} {:>10} {:<10} {:>10} {:>11} {:>8}  {}\n",
        "#", "Side", "Size", "Entry", "Price", "Exit", "Price", "PnL", "PnL%", "Reason"
    );
    for t in trades {
        output.push_str(&format!(
            "{:>4} {:<5} {:>8.0} {:<10} {:>10.2} {:<10} {:>10.2} {:>11.2} {:>7.2}%  {}\n",
            t.id,
            t.side.to_string(),
            t.size,
            t.entry_time.date(),
            t.entry_price,
            t.exit_time.date(),
            t.exit_price,
            t.pnl,
            t.pnl_pct,
            t.exit_reason
        ));
    }
    output
}

impl ReportPort for TextReport {
    fn write_backtest(&self, result: &BacktestResult, out: &mut dyn Write) -> Result<(), EngineError> {
        writeln!(out, "=== Backtest: {} ({}) ===", result.symbol, result.mode)?;
        if let (Some(first), Some(last)) = (result.equity_curve.first(), result.equity_curve.last()) {
            writeln!(
                out,
                "Period: {} to {} ({} bars)",
                first.timestamp.date(),
                last.timestamp.date(),
                result.equity_curve.len()
            )?;
        }
        writeln!(out)?;
        writeln!(out, "Metrics")?;
        write!(out, "{}", format_metrics(&result.metrics))?;
        writeln!(out)?;
        writeln!(out, "Monthly Returns (%)")?;
        write!(
            out,
            "{}",
            format_returns_grid(&compute_monthly_returns(&result.equity_curve))
        )?;
        writeln!(out)?;
        writeln!(out, "Trades")?;
        write!(out, "{}", format_trade_log(&result.trades))?;
        Ok(())
    }

    fn write_recommendation(
        &self,
        rec: &Recommendation,
        out: &mut dyn Write,
    ) -> Result<(), EngineError> {
        writeln!(out, "=== Signals: {} @ {} ===", rec.symbol, rec.timestamp)?;
        writeln!(out, "Close: {:.2}", rec.close)?;

        let ind = &rec.indicators;
        let fmt = |v: Option<f64>| v.map(|x| format!("{:.2}", x)).unwrap_or_else(|| "-".into());
        writeln!(
            out,
            "RSI {}  MACD {} / {}  SMA {} / {}  BB {} / {} / {}",
            fmt(ind.rsi),
            fmt(ind.macd),
            fmt(ind.macd_signal),
            fmt(ind.sma_fast),
            fmt(ind.sma_slow),
            fmt(ind.bb_lower),
            fmt(ind.bb_middle),
            fmt(ind.bb_upper)
        )?;
        writeln!(out)?;
        for s in &rec.signals {
            writeln!(
                out,
                "  {:<14} {:<4} {:>5.2}  {}",
                s.source.to_string(),
                s.direction.to_string(),
                s.confidence,
                s.reason
            )?;
        }
        writeln!(out)?;
        writeln!(
            out,
            "Consensus: {} ({:.2}) {}",
            rec.consensus.direction, rec.consensus.confidence, rec.consensus.reason
        )?;
        Ok(())
    }

    fn write_score(&self, score: &HybridScore, out: &mut dyn Write) -> Result<(), EngineError> {
        writeln!(out, "=== Hybrid Score: {} ===", score.symbol)?;
        writeln!(
            out,
            "  {:<14} {:>6} {:>8} {:>8} {:>13}",
            "Component", "Score", "Base", "Weight", "Contribution"
        )?;
        for c in &score.components {
            let value = c
                .score
                .map(|s| format!("{:.2}", s))
                .unwrap_or_else(|| "n/a".to_string());
            writeln!(
                out,
                "  {:<14} {:>6} {:>8.4} {:>8.4} {:>13.3}",
                c.component.to_string(),
                value,
                c.base_weight,
                c.weight,
                c.contribution
            )?;
        }
        writeln!(out)?;
        writeln!(
            out,
            "Final: {:.1}/10  {}  signal {}",
            score.final_score, score.rating, score.signal
        )?;
        writeln!(
            out,
            "Confidence: {:.0}% {} (history {:.0}, completeness {:.0}, volatility {:.0}, volume {:.0})",
            score.confidence_pct,
            score.confidence_label,
            score.confidence.breakdown.history,
            score.confidence.breakdown.completeness,
            score.confidence.breakdown.volatility,
            score.confidence.breakdown.volume
        )?;
        for reason in &score.reasons {
            writeln!(out, "  - {}", reason)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn point(y: i32, m: u32, d: u32, equity: f64) -> EquityPoint {
        EquityPoint {
            timestamp: NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            equity,
        }
    }

    #[test]
    fn monthly_returns_use_month_end_equity() {
        let curve = vec![
            point(2024, 1, 2, 100.0),
            point(2024, 1, 31, 110.0),
            point(2024, 2, 15, 99.0),
            point(2024, 2, 29, 121.0),
        ];
        let returns = compute_monthly_returns(&curve);
        assert_eq!(returns.len(), 2);
        assert!((returns[0].return_pct - 10.0).abs() < 1e-9);
        assert!((returns[1].return_pct - 10.0).abs() < 1e-9);
    }

    #[test]
    fn monthly_returns_empty_curve() {
        assert!(compute_monthly_returns(&[]).is_empty());
        assert_eq!(format_returns_grid(&[]), "No returns data.\n");
    }

    #[test]
    fn grid_compounds_ytd() {
        let returns = vec![
            MonthlyReturn {
                year: 2024,
                month: 1,
                return_pct: 10.0,
            },
            MonthlyReturn {
                year: 2024,
                month: 2,
                return_pct: 10.0,
            },
        ];
        let grid = format_returns_grid(&returns);
        let row = grid.lines().nth(1).unwrap();
        assert!(row.starts_with("2024"));
        assert!(row.trim_end().ends_with("21.00"));
    }

    #[test]
    fn metrics_show_undefined_profit_factor() {
        let metrics = Metrics {
            profit_factor: None,
            ..sample_metrics()
        };
        assert!(format_metrics(&metrics).contains("n/a"));
    }

    fn sample_metrics() -> Metrics {
        Metrics {
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            breakeven_trades: 0,
            win_rate: 0.0,
            total_return_pct: 0.0,
            annualized_return_pct: 0.0,
            sharpe_ratio: 0.0,
            sortino_ratio: 0.0,
            max_drawdown: 0.0,
            max_drawdown_duration: 0,
            avg_win: 0.0,
            avg_loss: 0.0,
            largest_win: 0.0,
            largest_loss: 0.0,
            profit_factor: Some(1.5),
            gross_profit: 0.0,
            gross_loss: 0.0,
            avg_trade_duration_days: 0.0,
            final_equity: 10000.0,
        }
    }
}
