//! Technical indicator implementations.
//!
//! Every calculator returns a series aligned 1:1 with its input bars. Points
//! inside the warm-up window carry `value: None`; they are never zero-filled.
//!
//! - `IndicatorPoint`: a single point in an indicator time series
//! - `IndicatorValue`: enum for the different indicator output shapes
//! - `IndicatorType`: indicator identity + parameters (usable as a map key)
//! - `IndicatorSeries`: a time series of indicator values

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stddev;

pub use bollinger::calculate_bollinger;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stddev::calculate_stddev;

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub value: Option<IndicatorValue>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Stddev(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub(crate) fn undefined(indicator_type: IndicatorType, bars: &[super::ohlcv::PriceBar]) -> Self {
        IndicatorSeries {
            indicator_type,
            values: bars
                .iter()
                .map(|b| IndicatorPoint {
                    timestamp: b.timestamp,
                    value: None,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_defined(&self, index: usize) -> bool {
        self.values.get(index).is_some_and(|p| p.value.is_some())
    }

    pub fn value_at(&self, index: usize) -> Option<IndicatorValue> {
        self.values.get(index).and_then(|p| p.value)
    }

    /// Scalar value at `index`; `None` for undefined points and non-scalar indicators.
    pub fn simple_at(&self, index: usize) -> Option<f64> {
        match self.value_at(index) {
            Some(IndicatorValue::Simple(v)) => Some(v),
            _ => None,
        }
    }

    /// Index of the first defined point, if any.
    pub fn first_defined(&self) -> Option<usize> {
        self.values.iter().position(|p| p.value.is_some())
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::bars_from_closes;

    #[test]
    fn indicator_type_display_sma() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
    }

    #[test]
    fn indicator_type_display_macd() {
        let macd = IndicatorType::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        };
        assert_eq!(macd.to_string(), "MACD(12,26,9)");
    }

    #[test]
    fn indicator_type_display_bollinger() {
        let boll = IndicatorType::Bollinger {
            period: 20,
            stddev_mult_x100: 250,
        };
        assert_eq!(boll.to_string(), "BOLLINGER(20,2.5)");
    }

    #[test]
    fn indicator_type_hash_eq() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(IndicatorType::Rsi(14), "rsi");
        map.insert(IndicatorType::Sma(20), "sma20");
        map.insert(IndicatorType::Sma(50), "sma50");

        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&IndicatorType::Sma(20)), Some(&"sma20"));
    }

    #[test]
    fn undefined_series_is_aligned() {
        let bars = bars_from_closes(&[1.0, 2.0, 3.0]);
        let series = IndicatorSeries::undefined(IndicatorType::Sma(5), &bars);
        assert_eq!(series.len(), 3);
        assert!(series.values.iter().all(|p| p.value.is_none()));
        assert_eq!(series.first_defined(), None);
    }

    #[test]
    fn simple_at_ignores_compound_values() {
        let bars = bars_from_closes(&[1.0]);
        let series = IndicatorSeries {
            indicator_type: IndicatorType::Bollinger {
                period: 1,
                stddev_mult_x100: 200,
            },
            values: vec![IndicatorPoint {
                timestamp: bars[0].timestamp,
                value: Some(IndicatorValue::Bollinger {
                    upper: 1.0,
                    middle: 1.0,
                    lower: 1.0,
                }),
            }],
        };
        assert!(series.is_defined(0));
        assert_eq!(series.simple_at(0), None);
        assert_eq!(series.simple_at(5), None);
    }
}
