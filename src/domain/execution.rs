//! Trade execution and fill simulation.
//!
//! Implements entry/exit bookkeeping with slippage, risk-based sizing,
//! commissions and the protective stop/target levels of a new position.

use chrono::NaiveDateTime;

use super::portfolio::Portfolio;
use super::position::{ExitReason, Position, PositionId, PositionStatus, Side, Trade};
use super::strategy::StrategyConfig;

/// Costs and permissions applied to every fill.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub commission_per_trade: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
    pub allow_shorting: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            commission_per_trade: 0.0,
            commission_pct: 0.0,
            slippage_pct: 0.0,
            allow_shorting: true,
        }
    }
}

/// Strategy parameters needed for execution, all in percent units.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionParams {
    pub risk_per_trade_pct: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub trailing_stop_pct: Option<f64>,
}

impl From<&StrategyConfig> for ExecutionParams {
    fn from(config: &StrategyConfig) -> Self {
        ExecutionParams {
            risk_per_trade_pct: config.risk_per_trade_pct,
            stop_loss_pct: config.stop_loss_pct,
            take_profit_pct: config.take_profit_pct,
            trailing_stop_pct: config.trailing_stop_pct,
        }
    }
}

/// Calculate commission: flat_fee + (trade_value * pct / 100).
pub fn calculate_commission(trade_value: f64, config: &ExecutionConfig) -> f64 {
    config.commission_per_trade + (trade_value * config.commission_pct / 100.0)
}

/// Long entry (buy): execution_price = market_price * (1 + slippage_pct / 100)
pub fn apply_slippage_long_entry(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 + slippage_pct / 100.0)
}

/// Short entry (sell short): execution_price = market_price * (1 - slippage_pct / 100)
pub fn apply_slippage_short_entry(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 - slippage_pct / 100.0)
}

/// Long exit (sell): execution_price = market_price * (1 - slippage_pct / 100)
pub fn apply_slippage_long_exit(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 - slippage_pct / 100.0)
}

/// Short exit (buy to cover): execution_price = market_price * (1 + slippage_pct / 100)
pub fn apply_slippage_short_exit(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 + slippage_pct / 100.0)
}

/// Stop-loss, take-profit and initial trailing-stop levels for an entry.
pub fn protective_levels(side: Side, entry_price: f64, params: &ExecutionParams) -> (f64, f64, Option<f64>) {
    let sign = side.sign();
    let stop = entry_price * (1.0 - sign * params.stop_loss_pct / 100.0);
    let target = entry_price * (1.0 + sign * params.take_profit_pct / 100.0);
    let trailing = params
        .trailing_stop_pct
        .map(|pct| entry_price * (1.0 - sign * pct / 100.0));
    (stop, target, trailing)
}

/// Whole units that risk `risk_pct` of `equity` between entry and stop.
///
/// Zero when the stop distance is zero or any input is non-finite.
pub fn risk_position_size(equity: f64, entry_price: f64, stop_price: f64, risk_pct: f64) -> f64 {
    let stop_distance = (entry_price - stop_price).abs();
    if !(stop_distance > 0.0) || !equity.is_finite() || equity <= 0.0 {
        return 0.0;
    }
    let size = (risk_pct / 100.0 * equity / stop_distance).floor();
    if size.is_finite() { size.max(0.0) } else { 0.0 }
}

/// Result of an entry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered {
        id: PositionId,
        size: f64,
        execution_price: f64,
        commission: f64,
    },
    InsufficientCapital,
    InvalidPrice,
    ShortingDisabled,
}

/// Open a position at `market_price`.
///
/// 1. Apply slippage to the execution price
/// 2. Derive stop/target levels from the execution price
/// 3. Size so a stop-out loses `risk_per_trade_pct` of current equity
/// 4. Cap the size at what the available cash can pay for
/// 5. Deduct cost + commission from cash (shorts escrow their notional)
/// 6. Add the position to the portfolio
#[allow(clippy::too_many_arguments)]
pub fn open_position(
    portfolio: &mut Portfolio,
    symbol: &str,
    side: Side,
    market_price: f64,
    time: NaiveDateTime,
    bar_index: usize,
    params: &ExecutionParams,
    config: &ExecutionConfig,
) -> EntryResult {
    if side == Side::Short && !config.allow_shorting {
        return EntryResult::ShortingDisabled;
    }
    if !(market_price > 0.0) || !market_price.is_finite() {
        return EntryResult::InvalidPrice;
    }

    let execution_price = match side {
        Side::Long => apply_slippage_long_entry(market_price, config.slippage_pct),
        Side::Short => apply_slippage_short_entry(market_price, config.slippage_pct),
    };
    let (stop_loss_price, take_profit_price, trailing_stop_price) =
        protective_levels(side, execution_price, params);

    let equity = portfolio.total_equity(market_price);
    let risk_size = risk_position_size(
        equity,
        execution_price,
        stop_loss_price,
        params.risk_per_trade_pct,
    );
    let unit_cost = execution_price * (1.0 + config.commission_pct / 100.0);
    let affordable = ((portfolio.cash - config.commission_per_trade) / unit_cost)
        .floor()
        .max(0.0);
    let size = risk_size.min(affordable);

    if size < 1.0 {
        return EntryResult::InsufficientCapital;
    }

    let cost = size * execution_price;
    let commission = calculate_commission(cost, config);
    if cost + commission > portfolio.cash {
        return EntryResult::InsufficientCapital;
    }
    portfolio.cash -= cost + commission;

    let id = portfolio.allocate_id();
    portfolio.add_position(Position {
        id,
        symbol: symbol.to_string(),
        side,
        status: PositionStatus::Open,
        entry_time: time,
        entry_bar: bar_index,
        entry_price: execution_price,
        size,
        stop_loss_price,
        take_profit_price,
        trailing_stop_price,
        entry_commission: commission,
    });

    EntryResult::Entered {
        id,
        size,
        execution_price,
        commission,
    }
}

/// Close a position at `market_price` and record the resulting trade.
///
/// PnL includes both the entry and the exit commission. A long returns its
/// sale proceeds to cash; a short returns its escrowed notional plus the
/// price difference.
pub fn close_position(
    portfolio: &mut Portfolio,
    id: PositionId,
    market_price: f64,
    exit_time: NaiveDateTime,
    exit_bar: usize,
    reason: ExitReason,
    config: &ExecutionConfig,
) -> Option<Trade> {
    let mut position = portfolio.remove_position(id)?;
    position.status = PositionStatus::Closed;

    let exit_price = match position.side {
        Side::Long => apply_slippage_long_exit(market_price, config.slippage_pct),
        Side::Short => apply_slippage_short_exit(market_price, config.slippage_pct),
    };

    let exit_value = position.size * exit_price;
    let exit_commission = calculate_commission(exit_value, config);
    let price_pnl = position.unrealized_pnl(exit_price);
    let pnl = price_pnl - position.entry_commission - exit_commission;

    portfolio.cash += position.market_value(exit_price) - exit_commission;

    let entry_notional = position.entry_notional();
    let pnl_pct = if entry_notional > 0.0 {
        pnl / entry_notional * 100.0
    } else {
        0.0
    };

    let trade = Trade {
        id: position.id,
        symbol: position.symbol,
        side: position.side,
        size: position.size,
        entry_time: position.entry_time,
        entry_price: position.entry_price,
        exit_time,
        exit_price,
        pnl,
        pnl_pct,
        exit_reason: reason,
        bars_held: exit_bar.saturating_sub(position.entry_bar),
    };

    portfolio.record_trade(trade.clone());
    Some(trade)
}
