//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the sample standard deviation (divides by N-1), matching the
//! rolling statistics the scoring pipeline has always used.
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are undefined; period must be at least 2.

use crate::domain::indicator::stddev::{mean, sample_stddev};
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::{PriceBar, closes};

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULT: f64 = 2.0;

/// Bands at `mult` sample standard deviations around the SMA.
///
/// The multiplier is used as given; only the series label carries the
/// rounded hundredths form.
pub fn calculate_bollinger(bars: &[PriceBar], period: usize, mult: f64) -> IndicatorSeries {
    let indicator_type = IndicatorType::Bollinger {
        period,
        stddev_mult_x100: mult_to_x100(mult),
    };
    if period < 2 {
        return IndicatorSeries::undefined(indicator_type, bars);
    }

    let closes = closes(bars);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let value = if i + 1 >= period {
                let window = &closes[i + 1 - period..=i];
                let middle = mean(window);
                sample_stddev(window).map(|sd| IndicatorValue::Bollinger {
                    upper: middle + mult * sd,
                    middle,
                    lower: middle - mult * sd,
                })
            } else {
                None
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

/// Encode a band multiplier such as 2.0 into the integer form stored in `IndicatorType`.
pub fn mult_to_x100(k: f64) -> u32 {
    (k * 100.0).round().max(0.0) as u32
}
