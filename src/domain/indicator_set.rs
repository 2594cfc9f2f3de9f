//! The aligned bundle of indicators every strategy reads from.
//!
//! Each series value at index i depends only on bars 0..=i, so a set computed
//! once over the whole history can be replayed bar by bar without look-ahead.

use serde::Serialize;

use super::indicator::{
    IndicatorSeries, IndicatorValue, calculate_bollinger, calculate_macd, calculate_rsi,
    calculate_sma,
};
use super::ohlcv::PriceBar;
use super::strategy::StrategyConfig;

/// Number of scalar fields in an [`IndicatorSnapshot`].
pub const SNAPSHOT_FIELDS: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    pub rsi: IndicatorSeries,
    pub macd: IndicatorSeries,
    pub sma_fast: IndicatorSeries,
    pub sma_slow: IndicatorSeries,
    pub bollinger: IndicatorSeries,
}

/// Indicator values at one bar; `None` where the window has not filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub sma_fast: Option<f64>,
    pub sma_slow: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
}

impl IndicatorSet {
    pub fn compute(bars: &[PriceBar], config: &StrategyConfig) -> Self {
        IndicatorSet {
            rsi: calculate_rsi(bars, config.rsi_period),
            macd: calculate_macd(bars, config.macd_fast, config.macd_slow, config.macd_signal),
            sma_fast: calculate_sma(bars, config.ma_fast_window),
            sma_slow: calculate_sma(bars, config.ma_slow_window),
            bollinger: calculate_bollinger(bars, config.bollinger_window, config.bollinger_k),
        }
    }

    pub fn len(&self) -> usize {
        self.rsi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rsi.is_empty()
    }

    pub fn snapshot(&self, index: usize) -> IndicatorSnapshot {
        let (macd, macd_signal) = match self.macd.value_at(index) {
            Some(IndicatorValue::Macd { line, signal, .. }) => (Some(line), Some(signal)),
            _ => (None, None),
        };
        let (bb_upper, bb_middle, bb_lower) = match self.bollinger.value_at(index) {
            Some(IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            }) => (Some(upper), Some(middle), Some(lower)),
            _ => (None, None, None),
        };

        IndicatorSnapshot {
            rsi: self.rsi.simple_at(index),
            macd,
            macd_signal,
            sma_fast: self.sma_fast.simple_at(index),
            sma_slow: self.sma_slow.simple_at(index),
            bb_upper,
            bb_middle,
            bb_lower,
        }
    }

    pub fn latest(&self) -> Option<IndicatorSnapshot> {
        self.len().checked_sub(1).map(|i| self.snapshot(i))
    }
}

impl IndicatorSnapshot {
    pub fn defined_count(&self) -> usize {
        [
            self.rsi,
            self.macd,
            self.macd_signal,
            self.sma_fast,
            self.sma_slow,
            self.bb_upper,
            self.bb_middle,
            self.bb_lower,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count()
    }

    /// Fraction of fields that are defined, in [0, 1].
    pub fn completeness(&self) -> f64 {
        self.defined_count() as f64 / SNAPSHOT_FIELDS as f64
    }
}
