//! Strategy identities and the shared strategy configuration.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::error::EngineError;
use super::indicator::{bollinger, macd};

/// The closed set of rule-based strategies, declared in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Rsi,
    Macd,
    MaCrossover,
    Bollinger,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Rsi,
        StrategyKind::Macd,
        StrategyKind::MaCrossover,
        StrategyKind::Bollinger,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            StrategyKind::Rsi => "rsi",
            StrategyKind::Macd => "macd",
            StrategyKind::MaCrossover => "ma_crossover",
            StrategyKind::Bollinger => "bollinger",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "rsi" => Ok(StrategyKind::Rsi),
            "macd" => Ok(StrategyKind::Macd),
            "ma_crossover" | "ma" | "sma" => Ok(StrategyKind::MaCrossover),
            "bollinger" | "bb" => Ok(StrategyKind::Bollinger),
            other => Err(format!("unknown strategy '{}'", other)),
        }
    }
}

/// Parameters shared by every strategy. Percentages are in percent units
/// (3.0 means 3%).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyConfig {
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub ma_fast_window: usize,
    pub ma_slow_window: usize,
    pub bollinger_window: usize,
    pub bollinger_k: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub trailing_stop_pct: Option<f64>,
    pub risk_per_trade_pct: f64,
    pub max_open_trades: usize,
    pub min_score: f64,
    pub volume_filter: bool,
    pub trend_filter: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            ma_fast_window: 20,
            ma_slow_window: 50,
            bollinger_window: bollinger::DEFAULT_PERIOD,
            bollinger_k: bollinger::DEFAULT_MULT,
            stop_loss_pct: 3.0,
            take_profit_pct: 6.0,
            trailing_stop_pct: None,
            risk_per_trade_pct: 2.0,
            max_open_trades: 3,
            min_score: 6.0,
            volume_filter: true,
            trend_filter: false,
        }
    }
}

const SECTION: &str = "strategy";

impl StrategyConfig {
    /// Reject inconsistent parameters before any bar is processed.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.rsi_period == 0 {
            return Err(EngineError::invalid(SECTION, "rsi_period", "must be at least 1"));
        }
        if !(self.rsi_oversold > 0.0 && self.rsi_oversold < self.rsi_overbought) {
            return Err(EngineError::invalid(
                SECTION,
                "rsi_oversold",
                "must be positive and below rsi_overbought",
            ));
        }
        if !(self.rsi_overbought < 100.0) {
            return Err(EngineError::invalid(SECTION, "rsi_overbought", "must be below 100"));
        }
        if self.macd_fast == 0 || self.macd_signal == 0 {
            return Err(EngineError::invalid(
                SECTION,
                "macd_fast",
                "macd periods must be at least 1",
            ));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(EngineError::invalid(
                SECTION,
                "macd_fast",
                format!(
                    "must be less than macd_slow ({} >= {})",
                    self.macd_fast, self.macd_slow
                ),
            ));
        }
        if self.ma_fast_window == 0 || self.ma_fast_window >= self.ma_slow_window {
            return Err(EngineError::invalid(
                SECTION,
                "ma_fast_window",
                "must be at least 1 and less than ma_slow_window",
            ));
        }
        if self.bollinger_window < 2 {
            return Err(EngineError::invalid(SECTION, "bollinger_window", "must be at least 2"));
        }
        if !(self.bollinger_k > 0.0) {
            return Err(EngineError::invalid(SECTION, "bollinger_k", "must be positive"));
        }
        check_pct(self.stop_loss_pct, "stop_loss_pct", 100.0)?;
        check_pct(self.take_profit_pct, "take_profit_pct", f64::MAX)?;
        if let Some(trailing) = self.trailing_stop_pct {
            check_pct(trailing, "trailing_stop_pct", 100.0)?;
        }
        check_pct(self.risk_per_trade_pct, "risk_per_trade_pct", 100.0 + f64::EPSILON)?;
        if self.max_open_trades == 0 {
            return Err(EngineError::invalid(SECTION, "max_open_trades", "must be at least 1"));
        }
        if !(0.0..=10.0).contains(&self.min_score) {
            return Err(EngineError::invalid(SECTION, "min_score", "must be between 0 and 10"));
        }
        Ok(())
    }

    /// Number of bars before every strategy has defined inputs.
    pub fn warmup_bars(&self) -> usize {
        (self.rsi_period + 1)
            .max(self.macd_slow + self.macd_signal - 1)
            .max(self.ma_slow_window)
            .max(self.bollinger_window)
    }
}

fn check_pct(value: f64, key: &str, upper_exclusive: f64) -> Result<(), EngineError> {
    if !(value > 0.0 && value < upper_exclusive) {
        return Err(EngineError::invalid(
            SECTION,
            key,
            format!("must be a positive percentage, got {}", value),
        ));
    }
    Ok(())
}
