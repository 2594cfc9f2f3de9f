//! Configuration loading and validation.
//!
//! Every key is optional and falls back to its default; a key that is present
//! but malformed or out of range is rejected before any bar is processed.

use crate::domain::backtest::BacktestConfig;
use crate::domain::confidence::ConfidencePolicy;
use crate::domain::error::EngineError;
use crate::domain::hybrid::ScoreWeights;
use crate::domain::strategy::StrategyConfig;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

/// Everything one run needs, validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub strategy: StrategyConfig,
    pub backtest: BacktestConfig,
    pub weights: ScoreWeights,
    pub confidence: ConfidencePolicy,
}

impl EngineConfig {
    pub fn load(config: &dyn ConfigPort) -> Result<Self, EngineError> {
        Ok(EngineConfig {
            strategy: build_strategy_config(config)?,
            backtest: build_backtest_config(config)?,
            weights: build_score_weights(config)?,
            confidence: build_confidence_policy(config)?,
        })
    }
}

pub fn build_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, EngineError> {
    const S: &str = "strategy";
    let mut c = StrategyConfig::default();
    read_usize(config, S, "rsi_period", &mut c.rsi_period)?;
    read_f64(config, S, "rsi_oversold", &mut c.rsi_oversold)?;
    read_f64(config, S, "rsi_overbought", &mut c.rsi_overbought)?;
    read_usize(config, S, "macd_fast", &mut c.macd_fast)?;
    read_usize(config, S, "macd_slow", &mut c.macd_slow)?;
    read_usize(config, S, "macd_signal", &mut c.macd_signal)?;
    read_usize(config, S, "ma_fast_window", &mut c.ma_fast_window)?;
    read_usize(config, S, "ma_slow_window", &mut c.ma_slow_window)?;
    read_usize(config, S, "bollinger_window", &mut c.bollinger_window)?;
    read_f64(config, S, "bollinger_k", &mut c.bollinger_k)?;
    read_f64(config, S, "stop_loss_pct", &mut c.stop_loss_pct)?;
    read_f64(config, S, "take_profit_pct", &mut c.take_profit_pct)?;
    c.trailing_stop_pct = read_trailing_stop(config)?;
    read_f64(config, S, "risk_per_trade_pct", &mut c.risk_per_trade_pct)?;
    read_usize(config, S, "max_open_trades", &mut c.max_open_trades)?;
    read_f64(config, S, "min_score", &mut c.min_score)?;
    read_bool(config, S, "volume_filter", &mut c.volume_filter)?;
    read_bool(config, S, "trend_filter", &mut c.trend_filter)?;
    c.validate()?;
    Ok(c)
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, EngineError> {
    const S: &str = "backtest";
    let mut c = BacktestConfig::default();
    c.start_date = parse_date(config.get_string(S, "start_date").as_deref(), "start_date")?;
    c.end_date = parse_date(config.get_string(S, "end_date").as_deref(), "end_date")?;
    read_f64(config, S, "initial_capital", &mut c.initial_capital)?;
    read_f64(config, S, "commission_per_trade", &mut c.commission_per_trade)?;
    read_f64(config, S, "commission_pct", &mut c.commission_pct)?;
    read_f64(config, S, "slippage_pct", &mut c.slippage_pct)?;
    read_bool(config, S, "allow_shorting", &mut c.allow_shorting)?;
    read_f64(config, S, "risk_free_rate", &mut c.risk_free_rate)?;
    c.validate()?;
    Ok(c)
}

/// Missing weight keys keep their defaults, so overriding one weight usually
/// means overriding all four to keep the sum at 1.
pub fn build_score_weights(config: &dyn ConfigPort) -> Result<ScoreWeights, EngineError> {
    const S: &str = "weights";
    let mut w = ScoreWeights::default();
    read_f64(config, S, "technical", &mut w.technical)?;
    read_f64(config, S, "ml_prediction", &mut w.ml_prediction)?;
    read_f64(config, S, "prophet", &mut w.prophet)?;
    read_f64(config, S, "sentiment", &mut w.sentiment)?;
    w.validate()?;
    Ok(w)
}

pub fn build_confidence_policy(config: &dyn ConfigPort) -> Result<ConfidencePolicy, EngineError> {
    const S: &str = "confidence";
    let mut p = ConfidencePolicy::default();
    read_f64(config, S, "history", &mut p.history_weight)?;
    read_f64(config, S, "completeness", &mut p.completeness_weight)?;
    read_f64(config, S, "volatility", &mut p.volatility_weight)?;
    read_f64(config, S, "volume", &mut p.volume_weight)?;
    read_f64(config, S, "high_threshold", &mut p.high_threshold)?;
    read_f64(config, S, "medium_threshold", &mut p.medium_threshold)?;
    read_usize(config, S, "full_history_bars", &mut p.full_history_bars)?;
    p.validate()?;
    Ok(p)
}

fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    slot: &mut f64,
) -> Result<(), EngineError> {
    if let Some(value) = config.get_double(section, key)? {
        if !value.is_finite() {
            return Err(EngineError::invalid(section, key, "must be a finite number"));
        }
        *slot = value;
    }
    Ok(())
}

fn read_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    slot: &mut usize,
) -> Result<(), EngineError> {
    if let Some(value) = config.get_int(section, key)? {
        *slot = usize::try_from(value).map_err(|_| {
            EngineError::invalid(section, key, format!("must not be negative, got {}", value))
        })?;
    }
    Ok(())
}

fn read_bool(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    slot: &mut bool,
) -> Result<(), EngineError> {
    if let Some(value) = config.get_bool(section, key)? {
        *slot = value;
    }
    Ok(())
}

fn read_trailing_stop(config: &dyn ConfigPort) -> Result<Option<f64>, EngineError> {
    let Some(raw) = config.get_string("strategy", "trailing_stop_pct") else {
        return Ok(None);
    };
    match raw.trim().to_lowercase().as_str() {
        "" | "none" | "off" => Ok(None),
        _ => {
            let mut value = 0.0;
            read_f64(config, "strategy", "trailing_stop_pct", &mut value)?;
            Ok(Some(value))
        }
    }
}

fn parse_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, EngineError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                EngineError::invalid(
                    "backtest",
                    field,
                    format!("invalid {} format, expected YYYY-MM-DD", field),
                )
            }),
    }
}
