//! Directional trading signals.

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use std::fmt;

use super::strategy::StrategyKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
            Direction::Hold => "HOLD",
        }
    }

    pub fn is_actionable(&self) -> bool {
        !matches!(self, Direction::Hold)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a signal came from: one strategy, or the consensus of all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalSource {
    Strategy(StrategyKind),
    Ensemble,
}

impl SignalSource {
    pub fn id(&self) -> &'static str {
        match self {
            SignalSource::Strategy(kind) => kind.id(),
            SignalSource::Ensemble => "ensemble",
        }
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl Serialize for SignalSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

/// An immutable recommendation produced at one bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub source: SignalSource,
    pub direction: Direction,
    pub confidence: f64,
    pub reason: String,
}

impl Signal {
    /// Build a signal; confidence is clamped to [0, 1] and NaN becomes 0.
    pub fn new(
        symbol: &str,
        timestamp: NaiveDateTime,
        source: SignalSource,
        direction: Direction,
        confidence: f64,
        reason: impl Into<String>,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Signal {
            symbol: symbol.to_string(),
            timestamp,
            source,
            direction,
            confidence,
            reason: reason.into(),
        }
    }

    pub fn hold(
        symbol: &str,
        timestamp: NaiveDateTime,
        source: SignalSource,
        reason: impl Into<String>,
    ) -> Self {
        Signal::new(symbol, timestamp, source, Direction::Hold, 0.0, reason)
    }
}
