//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! - avg_loss == 0 and avg_gain > 0: RSI = 100
//! - avg_gain == 0 and avg_loss == 0 (flat prices): RSI = NEUTRAL_RSI
//!
//! Warmup: first n bars are undefined (n price changes are needed for the
//! initial average), so the first value lands on index n.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub const NEUTRAL_RSI: f64 = 50.0;

pub fn calculate_rsi(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.len() < 2 {
        return IndicatorSeries::undefined(IndicatorType::Rsi(period), bars);
    }

    let mut values = Vec::with_capacity(bars.len());
    values.push(IndicatorPoint {
        timestamp: bars[0].timestamp,
        value: None,
    });

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 1..bars.len() {
        let change = bars[i].close - bars[i - 1].close;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        let value = if i < period {
            avg_gain += gain;
            avg_loss += loss;
            None
        } else if i == period {
            avg_gain = (avg_gain + gain) / period as f64;
            avg_loss = (avg_loss + loss) / period as f64;
            Some(rsi_from_averages(avg_gain, avg_loss))
        } else {
            avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
            Some(rsi_from_averages(avg_gain, avg_loss))
        };

        values.push(IndicatorPoint {
            timestamp: bars[i].timestamp,
            value: value.map(IndicatorValue::Simple),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { NEUTRAL_RSI } else { 100.0 }
    } else {
        let rsi = 100.0 - (100.0 / (1.0 + avg_gain / avg_loss));
        rsi.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::bars_from_closes;

    #[test]
    fn rsi_empty_bars() {
        let series = calculate_rsi(&[], 14);
        assert_eq!(series.len(), 0);
    }

    #[test]
    fn rsi_single_bar() {
        let bars = bars_from_closes(&[100.0]);
        let series = calculate_rsi(&bars, 14);
        assert_eq!(series.len(), 1);
        assert!(!series.is_defined(0));
    }

    #[test]
    fn rsi_warmup_period() {
        let closes: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let bars = bars_from_closes(&closes);

        let series = calculate_rsi(&bars, 14);

        assert_eq!(series.len(), 15);
        for i in 0..14 {
            assert!(!series.is_defined(i), "Bar {} should be undefined", i);
        }
        assert!(series.is_defined(14), "Bar 14 should be defined");
    }

    #[test]
    fn rsi_flat_series_is_neutral() {
        let bars = bars_from_closes(&[100.0; 15]);
        let series = calculate_rsi(&bars, 14);

        assert_eq!(series.first_defined(), Some(14));
        assert_eq!(series.simple_at(14), Some(NEUTRAL_RSI));
    }

    #[test]
    fn rsi_all_gains_no_losses() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&bars_from_closes(&closes), 14);
        assert!((series.simple_at(14).unwrap() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_all_losses_no_gains() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&bars_from_closes(&closes), 14);
        assert!(series.simple_at(14).unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_in_range() {
        let closes: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        let series = calculate_rsi(&bars_from_closes(&closes), 14);

        for i in 0..series.len() {
            if let Some(rsi) = series.simple_at(i) {
                assert!((0.0..=100.0).contains(&rsi), "RSI {} out of range", rsi);
            }
        }
    }

    #[test]
    fn rsi_zero_period() {
        let bars = bars_from_closes(&[100.0, 101.0]);
        let series = calculate_rsi(&bars, 0);
        assert_eq!(series.len(), 2);
        assert_eq!(series.first_defined(), None);
    }

    #[test]
    fn rsi_known_calculation() {
        let bars = bars_from_closes(&[
            44.0, 44.25, 44.50, 43.75, 44.50, 44.25, 44.75, 45.25, 45.50, 45.25, 45.50, 46.0,
            46.25, 46.0, 46.50,
        ]);

        let series = calculate_rsi(&bars, 14);

        // gains sum to 4.0, losses to 1.5 over the first 14 changes
        let expected = 100.0 - 100.0 / (1.0 + 4.0 / 1.5);
        assert!((series.simple_at(14).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn rsi_wilder_smoothing_step() {
        let mut closes: Vec<f64> = (0..15).map(|i| 100.0 + (i % 2) as f64).collect();
        closes.push(closes[14] - 2.0);
        let series = calculate_rsi(&bars_from_closes(&closes), 14);

        // changes alternate +1/-1: 7 gains, 7 losses over the first 14
        let avg_gain = (7.0 / 14.0 * 13.0 + 0.0) / 14.0;
        let avg_loss = (7.0 / 14.0 * 13.0 + 2.0) / 14.0;
        let expected = 100.0 - 100.0 / (1.0 + avg_gain / avg_loss);
        assert!((series.simple_at(15).unwrap() - expected).abs() < 1e-9);
    }
}
