//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are undefined.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::{PriceBar, closes};

pub fn calculate_ema(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let closes = closes(bars);
    let raw = ema_values(&closes, period);

    let values = bars
        .iter()
        .zip(raw)
        .map(|(bar, v)| IndicatorPoint {
            timestamp: bar.timestamp,
            value: v.map(IndicatorValue::Simple),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

/// SMA-seeded EMA over a plain slice, aligned with the input.
pub(crate) fn ema_values(input: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; input.len()];
    if period == 0 || input.len() < period {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = input[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(ema);

    for i in period..input.len() {
        ema = input[i] * k + ema * (1.0 - k);
        out[i] = Some(ema);
    }
    out
}
