//! Backtest configuration and the single-symbol event loop.
//!
//! The simulator walks the series once, oldest bar first. A signal observed
//! at bar `i` becomes a pending entry that fills at the open of bar `i + 1`;
//! exits for open positions are checked on every bar in fixed priority
//! (stop-loss, take-profit, trailing stop, reversal).

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::ensemble;
use super::error::EngineError;
use super::execution::{
    EntryResult, ExecutionConfig, ExecutionParams, close_position, open_position,
};
use super::indicator_set::IndicatorSet;
use super::metrics::Metrics;
use super::ohlcv::{PriceBar, ensure_ascending};
use super::portfolio::{EquityPoint, Portfolio};
use super::position::{ExitReason, Side, Trade};
use super::signal::{Direction, Signal};
use super::strategy::{StrategyConfig, StrategyKind};
use super::strategy_eval;

const SECTION: &str = "backtest";

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    /// Inclusive date range applied when loading bars; `None` is unbounded.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub initial_capital: f64,
    pub commission_per_trade: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
    pub allow_shorting: bool,
    /// Annual rate as a fraction (0.05 = 5%).
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            start_date: None,
            end_date: None,
            initial_capital: 10_000.0,
            commission_per_trade: 0.0,
            commission_pct: 0.0,
            slippage_pct: 0.0,
            allow_shorting: true,
            risk_free_rate: 0.0,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.initial_capital > 0.0) || !self.initial_capital.is_finite() {
            return Err(EngineError::invalid(SECTION, "initial_capital", "must be positive"));
        }
        if !(self.commission_per_trade >= 0.0) {
            return Err(EngineError::invalid(
                SECTION,
                "commission_per_trade",
                "must not be negative",
            ));
        }
        if !(self.commission_pct >= 0.0 && self.commission_pct < 100.0) {
            return Err(EngineError::invalid(
                SECTION,
                "commission_pct",
                "must be in [0, 100)",
            ));
        }
        if !(self.slippage_pct >= 0.0 && self.slippage_pct < 100.0) {
            return Err(EngineError::invalid(SECTION, "slippage_pct", "must be in [0, 100)"));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(EngineError::invalid(SECTION, "risk_free_rate", "must be finite"));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date)
            && start > end
        {
            return Err(EngineError::invalid(
                SECTION,
                "start_date",
                format!("{} is after end_date {}", start, end),
            ));
        }
        Ok(())
    }

    pub fn execution_config(&self) -> ExecutionConfig {
        ExecutionConfig {
            commission_per_trade: self.commission_per_trade,
            commission_pct: self.commission_pct,
            slippage_pct: self.slippage_pct,
            allow_shorting: self.allow_shorting,
        }
    }
}

/// Which signals drive the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMode {
    Single(StrategyKind),
    Ensemble,
}

impl fmt::Display for SignalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalMode::Single(kind) => write!(f, "{}", kind),
            SignalMode::Ensemble => f.write_str("ensemble"),
        }
    }
}

impl FromStr for SignalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("ensemble") {
            return Ok(SignalMode::Ensemble);
        }
        s.parse::<StrategyKind>().map(SignalMode::Single)
    }
}

impl Serialize for SignalMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub mode: SignalMode,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: Metrics,
}

/// An entry signal waiting for the next bar's open.
#[derive(Debug, Clone, Copy)]
struct PendingEntry {
    side: Side,
    signal_bar: usize,
}

/// Replays a price series against validated strategy and backtest settings.
#[derive(Debug, Clone)]
pub struct Simulator {
    strategy: StrategyConfig,
    backtest: BacktestConfig,
    params: ExecutionParams,
    execution: ExecutionConfig,
}

impl Simulator {
    pub fn new(strategy: StrategyConfig, backtest: BacktestConfig) -> Result<Self, EngineError> {
        strategy.validate()?;
        backtest.validate()?;
        let params = ExecutionParams::from(&strategy);
        let execution = backtest.execution_config();
        Ok(Simulator {
            strategy,
            backtest,
            params,
            execution,
        })
    }

    pub fn strategy(&self) -> &StrategyConfig {
        &self.strategy
    }

    pub fn backtest(&self) -> &BacktestConfig {
        &self.backtest
    }

    pub fn run(
        &self,
        symbol: &str,
        bars: &[PriceBar],
        mode: SignalMode,
    ) -> Result<BacktestResult, EngineError> {
        let Some(last_bar) = bars.last() else {
            return Err(EngineError::NoData {
                symbol: symbol.to_string(),
            });
        };
        ensure_ascending(symbol, bars)?;

        let indicators = IndicatorSet::compute(bars, &self.strategy);
        info!(
            symbol,
            %mode,
            bars = bars.len(),
            warmup = self.strategy.warmup_bars(),
            "starting backtest"
        );

        let mut portfolio = Portfolio::new(self.backtest.initial_capital);
        let mut pending: Vec<PendingEntry> = Vec::new();
        for (index, bar) in bars.iter().enumerate() {
            let signal = self.signal_at(symbol, bars, &indicators, index, mode);
            self.step(&mut portfolio, &mut pending, symbol, bar, index, &signal);
        }
        if !pending.is_empty() {
            debug!(count = pending.len(), "discarding entries pending at end of data");
        }
        self.settle(&mut portfolio, last_bar, bars.len() - 1);

        let metrics = Metrics::compute(&portfolio, self.backtest.risk_free_rate);
        info!(
            symbol,
            trades = metrics.total_trades,
            total_return_pct = metrics.total_return_pct,
            max_drawdown = metrics.max_drawdown,
            "backtest complete"
        );

        Ok(BacktestResult {
            symbol: symbol.to_string(),
            mode,
            trades: portfolio.closed_trades,
            equity_curve: portfolio.equity_curve,
            metrics,
        })
    }

    /// Advance one bar: fill pending entries at the open, run protective
    /// exits, reverse on an opposing signal, ratchet trailing stops, queue
    /// the next entry and mark equity at the close.
    fn step(
        &self,
        portfolio: &mut Portfolio,
        pending: &mut Vec<PendingEntry>,
        symbol: &str,
        bar: &PriceBar,
        index: usize,
        signal: &Signal,
    ) {
        self.fill_pending(portfolio, pending, symbol, bar, index);
        self.check_protective_exits(portfolio, bar, index);

        if signal.direction.is_actionable() {
            self.close_reversals(portfolio, signal, bar, index);
        }

        if let Some(pct) = self.strategy.trailing_stop_pct {
            for position in portfolio.positions.values_mut() {
                position.ratchet_trailing_stop(bar.close, pct);
            }
        }

        if signal.direction.is_actionable() {
            self.queue_entry(portfolio, pending, signal, index);
        }

        let equity = portfolio.total_equity(bar.close);
        portfolio.record_equity(bar.timestamp, equity);
    }

    /// Close whatever is still open at the last close and book the final
    /// equity point as settled cash.
    fn settle(&self, portfolio: &mut Portfolio, last_bar: &PriceBar, last_index: usize) {
        for id in portfolio.position_ids() {
            close_position(
                portfolio,
                id,
                last_bar.close,
                last_bar.timestamp,
                last_index,
                ExitReason::EndOfData,
                &self.execution,
            );
        }
        let settled = portfolio.cash;
        if let Some(point) = portfolio.equity_curve.last_mut() {
            point.equity = settled;
        }
    }

    fn signal_at(
        &self,
        symbol: &str,
        bars: &[PriceBar],
        indicators: &IndicatorSet,
        index: usize,
        mode: SignalMode,
    ) -> Signal {
        match mode {
            SignalMode::Single(kind) => {
                strategy_eval::evaluate(kind, symbol, bars, indicators, index, &self.strategy)
            }
            SignalMode::Ensemble => {
                let signals =
                    strategy_eval::evaluate_all(symbol, bars, indicators, index, &self.strategy);
                ensemble::vote(symbol, bars[index].timestamp, &signals)
            }
        }
    }

    fn fill_pending(
        &self,
        portfolio: &mut Portfolio,
        pending: &mut Vec<PendingEntry>,
        symbol: &str,
        bar: &PriceBar,
        index: usize,
    ) {
        for entry in pending.drain(..) {
            let result = open_position(
                portfolio,
                symbol,
                entry.side,
                bar.open,
                bar.timestamp,
                index,
                &self.params,
                &self.execution,
            );
            match result {
                EntryResult::Entered {
                    id,
                    size,
                    execution_price,
                    ..
                } => debug!(
                    id,
                    side = %entry.side,
                    size,
                    price = execution_price,
                    signal_bar = entry.signal_bar,
                    "position opened"
                ),
                other => warn!(
                    side = %entry.side,
                    price = bar.open,
                    at = %bar.timestamp,
                    "entry skipped: {:?}",
                    other
                ),
            }
        }
    }

    fn check_protective_exits(&self, portfolio: &mut Portfolio, bar: &PriceBar, index: usize) {
        for id in portfolio.position_ids() {
            let Some(position) = portfolio.get_position(id) else {
                continue;
            };
            let exit = position
                .stop_loss_fill(bar)
                .map(|price| (price, ExitReason::StopLoss))
                .or_else(|| {
                    position
                        .take_profit_fill(bar)
                        .map(|price| (price, ExitReason::TakeProfit))
                })
                .or_else(|| {
                    position
                        .trailing_stop_fill(bar)
                        .map(|price| (price, ExitReason::TrailingStop))
                });

            if let Some((price, reason)) = exit {
                self.close(portfolio, id, price, bar, index, reason);
            }
        }
    }

    fn close_reversals(&self, portfolio: &mut Portfolio, signal: &Signal, bar: &PriceBar, index: usize) {
        let opposing = match signal.direction {
            Direction::Buy => Side::Short,
            Direction::Sell => Side::Long,
            Direction::Hold => return,
        };
        for id in portfolio.position_ids() {
            let is_opposing = portfolio
                .get_position(id)
                .is_some_and(|p| p.side == opposing);
            if is_opposing {
                self.close(portfolio, id, bar.close, bar, index, ExitReason::Reversal);
            }
        }
    }

    fn close(
        &self,
        portfolio: &mut Portfolio,
        id: u64,
        price: f64,
        bar: &PriceBar,
        index: usize,
        reason: ExitReason,
    ) {
        if let Some(trade) = close_position(
            portfolio,
            id,
            price,
            bar.timestamp,
            index,
            reason,
            &self.execution,
        ) {
            debug!(
                id,
                %reason,
                price = trade.exit_price,
                pnl = trade.pnl,
                "position closed"
            );
        }
    }

    fn queue_entry(
        &self,
        portfolio: &Portfolio,
        pending: &mut Vec<PendingEntry>,
        signal: &Signal,
        index: usize,
    ) {
        let side = match signal.direction {
            Direction::Buy => Side::Long,
            Direction::Sell if self.backtest.allow_shorting => Side::Short,
            _ => return,
        };
        let committed = portfolio.position_count() + pending.len();
        if committed >= self.strategy.max_open_trades {
            debug!(
                at = %signal.timestamp,
                committed,
                max = self.strategy.max_open_trades,
                "entry dropped: max open trades reached"
            );
            return;
        }
        pending.push(PendingEntry {
            side,
            signal_bar: index,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::bars_from_closes;
    use crate::domain::position::PositionId;
    use crate::domain::signal::SignalSource;
    use std::collections::BTreeMap;

    fn crossover_config() -> StrategyConfig {
        StrategyConfig {
            ma_fast_window: 5,
            ma_slow_window: 20,
            ..Default::default()
        }
    }

    fn no_short() -> BacktestConfig {
        BacktestConfig {
            allow_shorting: false,
            ..Default::default()
        }
    }

    fn flat_then(tail: &[f64]) -> Vec<PriceBar> {
        let mut closes = vec![100.0; 20];
        closes.extend_from_slice(tail);
        bars_from_closes(&closes)
    }

    fn run_crossover(strategy: StrategyConfig, backtest: BacktestConfig, bars: &[PriceBar]) -> BacktestResult {
        Simulator::new(strategy, backtest)
            .unwrap()
            .run("TEST", bars, SignalMode::Single(StrategyKind::MaCrossover))
            .unwrap()
    }

    fn scripted_signal(bar: &PriceBar, direction: Direction) -> Signal {
        Signal::new("TEST", bar.timestamp, SignalSource::Ensemble, direction, 1.0, "scripted")
    }

    /// Bar loop driven by a fixed direction per bar.
    fn replay_scripted(sim: &Simulator, bars: &[PriceBar], directions: &[Direction]) -> Portfolio {
        let mut portfolio = Portfolio::new(sim.backtest.initial_capital);
        let mut pending = Vec::new();
        for (index, (bar, &direction)) in bars.iter().zip(directions).enumerate() {
            let signal = scripted_signal(bar, direction);
            sim.step(&mut portfolio, &mut pending, "TEST", bar, index, &signal);
        }
        sim.settle(&mut portfolio, &bars[bars.len() - 1], bars.len() - 1);
        portfolio
    }

    /// Trailing stop level of every open position after each bar.
    fn trailing_levels(sim: &Simulator, bars: &[PriceBar], mode: SignalMode) -> BTreeMap<PositionId, Vec<f64>> {
        let indicators = IndicatorSet::compute(bars, &sim.strategy);
        let mut portfolio = Portfolio::new(sim.backtest.initial_capital);
        let mut pending = Vec::new();
        let mut levels: BTreeMap<PositionId, Vec<f64>> = BTreeMap::new();
        for (index, bar) in bars.iter().enumerate() {
            let signal = sim.signal_at("TEST", bars, &indicators, index, mode);
            sim.step(&mut portfolio, &mut pending, "TEST", bar, index, &signal);
            for (id, position) in &portfolio.positions {
                if let Some(level) = position.trailing_stop_price {
                    levels.entry(*id).or_default().push(level);
                }
            }
        }
        levels
    }

    fn max_concurrent(trades: &[Trade]) -> usize {
        trades
            .iter()
            .map(|t| {
                trades
                    .iter()
                    .filter(|o| o.entry_time <= t.entry_time && t.entry_time <= o.exit_time)
                    .count()
            })
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn config_defaults() {
        let c = BacktestConfig::default();
        assert!((c.initial_capital - 10_000.0).abs() < f64::EPSILON);
        assert!(c.allow_shorting);
        assert_eq!(c.risk_free_rate, 0.0);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn config_rejects_bad_values() {
        let c = BacktestConfig {
            initial_capital: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            c.validate(),
            Err(EngineError::ConfigInvalid { key, .. }) if key == "initial_capital"
        ));

        let c = BacktestConfig {
            slippage_pct: -1.0,
            ..Default::default()
        };
        assert!(c.validate().is_err());

        let c = BacktestConfig {
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..Default::default()
        };
        assert!(matches!(
            c.validate(),
            Err(EngineError::ConfigInvalid { key, .. }) if key == "start_date"
        ));
    }

    #[test]
    fn signal_mode_parsing() {
        assert_eq!("ensemble".parse::<SignalMode>(), Ok(SignalMode::Ensemble));
        assert_eq!(
            "ma-crossover".parse::<SignalMode>(),
            Ok(SignalMode::Single(StrategyKind::MaCrossover))
        );
        assert!("momentum".parse::<SignalMode>().is_err());
        assert_eq!(SignalMode::Single(StrategyKind::Rsi).to_string(), "rsi");
    }

    #[test]
    fn simulator_rejects_invalid_strategy() {
        let strategy = StrategyConfig {
            macd_fast: 26,
            macd_slow: 12,
            ..Default::default()
        };
        assert!(Simulator::new(strategy, BacktestConfig::default()).is_err());
    }

    #[test]
    fn empty_series_is_no_data() {
        let sim = Simulator::new(crossover_config(), BacktestConfig::default()).unwrap();
        let err = sim.run("TEST", &[], SignalMode::Ensemble).unwrap_err();
        assert!(matches!(err, EngineError::NoData { .. }));
    }

    #[test]
    fn unordered_series_rejected() {
        let mut bars = bars_from_closes(&[1.0, 2.0, 3.0]);
        bars.swap(0, 2);
        let sim = Simulator::new(crossover_config(), BacktestConfig::default()).unwrap();
        let err = sim.run("TEST", &bars, SignalMode::Ensemble).unwrap_err();
        assert!(matches!(err, EngineError::UnorderedSeries { .. }));
    }

    #[test]
    fn golden_cross_enters_next_open_and_takes_profit() {
        // cross at index 20, fill at bar 21 open (102), target 108.12
        let tail: Vec<f64> = (1..=15).map(|i| 100.0 + i as f64).collect();
        let bars = flat_then(&tail);
        let result = run_crossover(crossover_config(), no_short(), &bars);

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.side, Side::Long);
        assert_eq!(trade.entry_time, bars[21].timestamp);
        assert!((trade.entry_price - 102.0).abs() < 1e-9);
        assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
        // bars are flat within themselves, so the target gaps and fills at 109
        assert!((trade.exit_price - 109.0).abs() < 1e-9);
        assert_eq!(trade.bars_held, 7);
        assert_eq!(trade.size, 65.0);
        assert!((trade.pnl - 455.0).abs() < 1e-9);
        assert!((result.metrics.final_equity - 10_455.0).abs() < 1e-9);
        assert_eq!(result.equity_curve.len(), bars.len());
    }

    #[test]
    fn stop_loss_fills_at_gap_open() {
        let mut tail = vec![101.0, 102.0];
        tail.extend(std::iter::repeat_n(95.0, 8));
        let bars = flat_then(&tail);
        let result = run_crossover(crossover_config(), no_short(), &bars);

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert!((trade.exit_price - 95.0).abs() < 1e-9);
        assert!((trade.pnl - (-455.0)).abs() < 1e-9);
    }

    #[test]
    fn death_cross_opens_short_when_allowed() {
        let mut tail = vec![101.0, 102.0];
        tail.extend(std::iter::repeat_n(95.0, 8));
        let bars = flat_then(&tail);
        let result = run_crossover(crossover_config(), BacktestConfig::default(), &bars);

        assert_eq!(result.trades.len(), 2);
        let short = &result.trades[1];
        assert_eq!(short.side, Side::Short);
        assert_eq!(short.entry_time, bars[23].timestamp);
        assert_eq!(short.exit_reason, ExitReason::EndOfData);
        assert_eq!(short.size, 66.0);
        assert!(short.pnl.abs() < 1e-9);
    }

    #[test]
    fn opposing_signal_reverses_at_close() {
        let strategy = StrategyConfig {
            stop_loss_pct: 20.0,
            take_profit_pct: 50.0,
            ..crossover_config()
        };
        let bars = flat_then(&[101.0, 102.0, 103.0, 90.0, 90.0]);
        let result = run_crossover(strategy, no_short(), &bars);

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::Reversal);
        assert_eq!(trade.exit_time, bars[23].timestamp);
        assert!((trade.exit_price - 90.0).abs() < 1e-9);
        assert_eq!(trade.bars_held, 2);
    }

    #[test]
    fn trailing_stop_ratchets_then_exits() {
        let strategy = StrategyConfig {
            stop_loss_pct: 10.0,
            take_profit_pct: 50.0,
            trailing_stop_pct: Some(5.0),
            ..crossover_config()
        };
        let bars = flat_then(&[101.0, 102.0, 106.0, 110.0, 103.0, 103.0]);
        let result = run_crossover(strategy.clone(), no_short(), &bars);

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::TrailingStop);
        assert_eq!(trade.exit_time, bars[24].timestamp);
        assert!((trade.exit_price - 103.0).abs() < 1e-9);

        // entry at the open of bar 21 (102), then ratcheted on each close
        let sim = Simulator::new(strategy, no_short()).unwrap();
        let levels = trailing_levels(&sim, &bars, SignalMode::Single(StrategyKind::MaCrossover));
        let expected = [102.0 * 0.95, 102.0 * 0.95, 106.0 * 0.95, 110.0 * 0.95];
        let observed = &levels[&1];
        assert_eq!(observed.len(), expected.len());
        for (level, want) in observed.iter().zip(expected) {
            assert!((level - want).abs() < 1e-9, "level {} expected {}", level, want);
        }
    }

    #[test]
    fn trailing_stop_never_loosens_across_the_bar_loop() {
        let strategy = StrategyConfig {
            stop_loss_pct: 20.0,
            take_profit_pct: 50.0,
            trailing_stop_pct: Some(3.0),
            volume_filter: false,
            ..crossover_config()
        };
        let closes: Vec<f64> = (0..150)
            .map(|i| 100.0 + 8.0 * ((i as f64) * 0.2).sin() + (i as f64) * 0.1)
            .collect();
        let bars = bars_from_closes(&closes);
        let sim = Simulator::new(strategy, no_short()).unwrap();

        let levels = trailing_levels(&sim, &bars, SignalMode::Ensemble);
        assert!(!levels.is_empty());
        for (id, history) in &levels {
            for pair in history.windows(2) {
                assert!(pair[1] >= pair[0], "position {} loosened: {:?}", id, pair);
            }
        }
    }

    #[test]
    fn entries_beyond_max_open_trades_are_dropped() {
        let bars = bars_from_closes(&[100.0; 10]);
        let mut directions = vec![Direction::Buy; 6];
        directions.extend([Direction::Hold; 4]);

        for max_open in [1, 2] {
            let strategy = StrategyConfig {
                take_profit_pct: 50.0,
                max_open_trades: max_open,
                ..Default::default()
            };
            let sim = Simulator::new(strategy, no_short()).unwrap();
            let portfolio = replay_scripted(&sim, &bars, &directions);

            assert_eq!(portfolio.closed_trades.len(), max_open);
            assert_eq!(max_concurrent(&portfolio.closed_trades), max_open);
            assert!(
                portfolio
                    .closed_trades
                    .iter()
                    .all(|t| t.exit_reason == ExitReason::EndOfData)
            );
        }
    }

    #[test]
    fn slot_is_reused_after_an_exit() {
        use Direction::{Buy, Hold, Sell};
        let bars = bars_from_closes(&[100.0; 8]);
        let directions = [Buy, Buy, Hold, Sell, Buy, Buy, Hold, Hold];
        let strategy = StrategyConfig {
            take_profit_pct: 50.0,
            max_open_trades: 1,
            ..Default::default()
        };
        let sim = Simulator::new(strategy, no_short()).unwrap();
        let portfolio = replay_scripted(&sim, &bars, &directions);

        let trades = &portfolio.closed_trades;
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].entry_time, bars[1].timestamp);
        assert_eq!(trades[0].exit_reason, ExitReason::Reversal);
        assert_eq!(trades[0].exit_time, bars[3].timestamp);
        assert_eq!(trades[1].entry_time, bars[5].timestamp);
        assert_eq!(max_concurrent(trades), 1);
    }

    #[test]
    fn open_position_closed_at_end_of_data() {
        let strategy = StrategyConfig {
            take_profit_pct: 50.0,
            ..crossover_config()
        };
        let bars = flat_then(&[101.0, 102.0, 103.0]);
        let result = run_crossover(strategy, no_short(), &bars);

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].exit_reason, ExitReason::EndOfData);
        assert!((result.trades[0].exit_price - 103.0).abs() < 1e-9);
    }

    #[test]
    fn pnl_sum_matches_equity_change_with_costs() {
        let backtest = BacktestConfig {
            commission_per_trade: 5.0,
            commission_pct: 0.1,
            slippage_pct: 0.2,
            ..Default::default()
        };
        let mut tail = vec![101.0, 102.0];
        tail.extend(std::iter::repeat_n(95.0, 8));
        let bars = flat_then(&tail);
        let result = run_crossover(crossover_config(), backtest, &bars);

        let pnl: f64 = result.trades.iter().map(|t| t.pnl).sum();
        let change = result.metrics.final_equity - 10_000.0;
        assert!((pnl - change).abs() < 1e-6, "pnl {} vs change {}", pnl, change);
    }

    #[test]
    fn replay_is_deterministic() {
        let closes: Vec<f64> = (0..120)
            .map(|i| 100.0 + 10.0 * ((i as f64) * 0.3).sin() + (i as f64) * 0.05)
            .collect();
        let bars = bars_from_closes(&closes);
        let sim = Simulator::new(crossover_config(), BacktestConfig::default()).unwrap();
        let first = sim.run("TEST", &bars, SignalMode::Ensemble).unwrap();
        let second = sim.run("TEST", &bars, SignalMode::Ensemble).unwrap();
        assert_eq!(first, second);
    }
}
