//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line, seeded with the SMA of the first
//! `signal` defined MACD values
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: slow - 1 + signal - 1 bars. A point is defined only once both
//! the line and the signal line are.

use crate::domain::indicator::ema::ema_values;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::{PriceBar, closes};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    bars: &[PriceBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    if fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries::undefined(indicator_type, bars);
    }

    let closes = closes(bars);
    let ema_fast = ema_values(&closes, fast);
    let ema_slow = ema_values(&closes, slow);

    let macd_line: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    // The signal EMA runs over the defined tail of the MACD line.
    let line_start = fast.max(slow) - 1;
    let mut signal_line = vec![None; bars.len()];
    if bars.len() > line_start {
        let tail: Vec<f64> = macd_line[line_start..].iter().map(|v| v.unwrap_or(0.0)).collect();
        for (offset, v) in ema_values(&tail, signal_period).into_iter().enumerate() {
            signal_line[line_start + offset] = v;
        }
    }

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let value = match (macd_line[i], signal_line[i]) {
                (Some(line), Some(signal)) => Some(IndicatorValue::Macd {
                    line,
                    signal,
                    histogram: line - signal,
                }),
                _ => None,
            };
            IndicatorPoint {
                timestamp: bar.timestamp,
                value,
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}
