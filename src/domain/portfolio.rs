//! Portfolio state and equity tracking for a single-symbol simulation.
//!
//! Open positions live in an ordered arena keyed by [`PositionId`] so that
//! iteration order, and therefore every replay, is deterministic.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

use super::position::{Position, PositionId, Trade};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: BTreeMap<PositionId, Position>,
    pub closed_trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    next_id: PositionId,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            positions: BTreeMap::new(),
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
            next_id: 1,
        }
    }

    /// Hand out the next position id; ids are never reused.
    pub fn allocate_id(&mut self) -> PositionId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn add_position(&mut self, position: Position) {
        self.positions.insert(position.id, position);
    }

    pub fn get_position(&self, id: PositionId) -> Option<&Position> {
        self.positions.get(&id)
    }

    pub fn remove_position(&mut self, id: PositionId) -> Option<Position> {
        self.positions.remove(&id)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn position_ids(&self) -> Vec<PositionId> {
        self.positions.keys().copied().collect()
    }

    pub fn record_trade(&mut self, trade: Trade) {
        self.closed_trades.push(trade);
    }

    pub fn record_equity(&mut self, timestamp: NaiveDateTime, equity: f64) {
        self.equity_curve.push(EquityPoint { timestamp, equity });
    }

    /// Cash plus the mark-to-market value of every open position at `price`.
    pub fn total_equity(&self, price: f64) -> f64 {
        let position_value: f64 = self.positions.values().map(|p| p.market_value(price)).sum();
        self.cash + position_value
    }
}
