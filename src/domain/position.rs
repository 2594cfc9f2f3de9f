//! Position tracking and the closed-trade record.
//!
//! A position is OPEN from the bar its entry fills until an exit fires, then
//! it is removed from the portfolio and frozen into a [`Trade`].

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

use super::ohlcv::PriceBar;

pub type PositionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("LONG"),
            Side::Short => f.write_str("SHORT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TrailingStop,
    Reversal,
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::TakeProfit => "TAKE_PROFIT",
            ExitReason::TrailingStop => "TRAILING_STOP",
            ExitReason::Reversal => "REVERSAL",
            ExitReason::EndOfData => "END_OF_DATA",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub id: PositionId,
    pub symbol: String,
    pub side: Side,
    pub status: PositionStatus,
    pub entry_time: NaiveDateTime,
    pub entry_bar: usize,
    pub entry_price: f64,
    pub size: f64,
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
    pub trailing_stop_price: Option<f64>,
    pub entry_commission: f64,
}

impl Position {
    pub fn entry_notional(&self) -> f64 {
        self.size * self.entry_price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.side.sign() * self.size
    }

    /// Value held in the portfolio for this position at `price`: sale
    /// proceeds for a long, escrowed notional plus open profit for a short.
    pub fn market_value(&self, price: f64) -> f64 {
        match self.side {
            Side::Long => self.size * price,
            Side::Short => self.entry_notional() + self.unrealized_pnl(price),
        }
    }

    /// Fill price if the bar touches the stop-loss; gaps fill at the open.
    pub fn stop_loss_fill(&self, bar: &PriceBar) -> Option<f64> {
        adverse_fill(self.side, self.stop_loss_price, bar)
    }

    /// Fill price if the bar touches the take-profit; gaps fill at the open.
    pub fn take_profit_fill(&self, bar: &PriceBar) -> Option<f64> {
        match self.side {
            Side::Long if bar.high >= self.take_profit_price => {
                Some(bar.open.max(self.take_profit_price))
            }
            Side::Short if bar.low <= self.take_profit_price => {
                Some(bar.open.min(self.take_profit_price))
            }
            _ => None,
        }
    }

    pub fn trailing_stop_fill(&self, bar: &PriceBar) -> Option<f64> {
        self.trailing_stop_price
            .and_then(|level| adverse_fill(self.side, level, bar))
    }

    /// Tighten the trailing stop toward `price`. The level never loosens.
    pub fn ratchet_trailing_stop(&mut self, price: f64, trailing_pct: f64) {
        let Some(current) = self.trailing_stop_price else {
            return;
        };
        let candidate = match self.side {
            Side::Long => price * (1.0 - trailing_pct / 100.0),
            Side::Short => price * (1.0 + trailing_pct / 100.0),
        };
        self.trailing_stop_price = Some(match self.side {
            Side::Long => current.max(candidate),
            Side::Short => current.min(candidate),
        });
    }
}

fn adverse_fill(side: Side, level: f64, bar: &PriceBar) -> Option<f64> {
    match side {
        Side::Long if bar.low <= level => Some(bar.open.min(level)),
        Side::Short if bar.high >= level => Some(bar.open.max(level)),
        _ => None,
    }
}

/// Immutable record of a closed position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub id: PositionId,
    pub symbol: String,
    pub side: Side,
    pub size: f64,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub exit_reason: ExitReason,
    pub bars_held: usize,
}
