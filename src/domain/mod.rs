//! Core domain types and logic.

pub mod analysis;
pub mod backtest;
pub mod confidence;
pub mod config_validation;
pub mod ensemble;
pub mod error;
pub mod execution;
pub mod external;
pub mod hybrid;
pub mod indicator;
pub mod indicator_set;
pub mod metrics;
pub mod ohlcv;
pub mod portfolio;
pub mod position;
pub mod signal;
pub mod strategy;
pub mod strategy_eval;
pub mod technical_score;
