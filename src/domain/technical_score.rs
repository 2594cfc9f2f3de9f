//! Point-table technical score on a 0-10 scale.
//!
//! Three sub-scores are averaged from point tables and blended
//! technical 40%, momentum 30%, sentiment proxy 30%. Series shorter than
//! [`MIN_BARS`] score neutral across the board.

use serde::Serialize;

use super::indicator::stddev::sample_stddev;
use super::indicator_set::{IndicatorSet, IndicatorSnapshot};
use super::ohlcv::{PriceBar, pct_returns};

pub const MIN_BARS: usize = 50;
pub const NEUTRAL_SCORE: f64 = 5.0;

const TECHNICAL_WEIGHT: f64 = 0.40;
const MOMENTUM_WEIGHT: f64 = 0.30;
const SENTIMENT_WEIGHT: f64 = 0.30;

const YEAR_BARS: usize = 252;
const QUARTER_BARS: usize = 60;
const VOLUME_WINDOW: usize = 20;
const VOLATILITY_WINDOW: usize = 20;
const TREND_WINDOW: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalScore {
    pub total: f64,
    pub technical: f64,
    pub momentum: f64,
    pub sentiment: f64,
    pub highlights: Vec<String>,
}

impl TechnicalScore {
    pub fn neutral() -> Self {
        TechnicalScore {
            total: NEUTRAL_SCORE,
            technical: NEUTRAL_SCORE,
            momentum: NEUTRAL_SCORE,
            sentiment: NEUTRAL_SCORE,
            highlights: vec!["insufficient history for a full analysis".to_string()],
        }
    }

    /// Score the latest bar. `indicators` must be aligned with `bars`.
    pub fn compute(bars: &[PriceBar], indicators: &IndicatorSet) -> Self {
        let (Some(latest_bar), Some(latest)) = (bars.last(), indicators.latest()) else {
            return Self::neutral();
        };
        if bars.len() < MIN_BARS {
            return Self::neutral();
        }

        let technical = technical_sub_score(&latest, latest_bar.close);
        let momentum = momentum_sub_score(bars);
        let sentiment = sentiment_sub_score(bars);

        let total = technical * TECHNICAL_WEIGHT
            + momentum * MOMENTUM_WEIGHT
            + sentiment * SENTIMENT_WEIGHT;

        TechnicalScore {
            total: round1(total),
            technical: round1(technical),
            momentum: round1(momentum),
            sentiment: round1(sentiment),
            highlights: highlights(bars, &latest),
        }
    }
}

/// Round to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn average_points(points: &[f64], scale: f64) -> f64 {
    if points.is_empty() {
        return NEUTRAL_SCORE;
    }
    let avg = points.iter().sum::<f64>() / points.len() as f64;
    (avg * scale).clamp(0.0, 10.0)
}

fn technical_sub_score(latest: &IndicatorSnapshot, close: f64) -> f64 {
    let mut points = Vec::with_capacity(4);

    if let Some(rsi) = latest.rsi {
        points.push(rsi_points(rsi));
    }
    if let (Some(macd), Some(signal)) = (latest.macd, latest.macd_signal) {
        points.push(macd_points(macd, signal));
    }
    if let (Some(fast), Some(slow)) = (latest.sma_fast, latest.sma_slow) {
        points.push(ma_points(close, fast, slow));
    }
    if let (Some(upper), Some(_), Some(lower)) = (latest.bb_upper, latest.bb_middle, latest.bb_lower) {
        points.push(band_points(close, upper, lower));
    }

    average_points(&points, 10.0 / 3.0)
}

fn rsi_points(rsi: f64) -> f64 {
    if rsi < 30.0 {
        3.0
    } else if rsi < 40.0 {
        2.0
    } else if rsi <= 60.0 {
        1.0
    } else if rsi < 70.0 {
        0.5
    } else {
        0.0
    }
}

fn macd_points(macd: f64, signal: f64) -> f64 {
    if macd > signal && macd > 0.0 {
        2.5
    } else if macd > signal {
        1.5
    } else if macd < signal && macd < 0.0 {
        0.0
    } else {
        0.5
    }
}

fn ma_points(close: f64, fast: f64, slow: f64) -> f64 {
    if close > fast && fast > slow {
        2.5
    } else if close > fast || close > slow {
        1.5
    } else if close < fast && fast < slow {
        0.0
    } else {
        0.5
    }
}

fn band_points(close: f64, upper: f64, lower: f64) -> f64 {
    let range = upper - lower;
    let position = if range > 0.0 { (close - lower) / range } else { 0.5 };
    if position < 0.2 {
        2.0
    } else if position < 0.4 {
        1.5
    } else if position <= 0.6 {
        1.0
    } else if position > 0.8 {
        0.0
    } else {
        0.5
    }
}

fn momentum_sub_score(bars: &[PriceBar]) -> f64 {
    let mut points = Vec::with_capacity(4);
    let n = bars.len();
    let close = bars[n - 1].close;

    if n > VOLUME_WINDOW {
        points.push(return_points(lookback_return(close, bars[n - 6].close), [5.0, 2.0, 0.0, -2.0]));
        points.push(return_points(lookback_return(close, bars[n - 21].close), [10.0, 5.0, 0.0, -5.0]));

        if let Some(ratio) = volume_ratio(bars) {
            points.push(volume_points(ratio));
        }
    }

    if n >= TREND_WINDOW {
        let recent = &bars[n - TREND_WINDOW..];
        let higher_highs = recent.windows(2).filter(|w| w[1].high > w[0].high).count();
        let higher_lows = recent.windows(2).filter(|w| w[1].low > w[0].low).count();
        let max_steps = 2 * (TREND_WINDOW - 1);
        points.push((higher_highs + higher_lows) as f64 / max_steps as f64 * 3.0);
    }

    average_points(&points, 10.0 / 3.0)
}

fn lookback_return(close: f64, past_close: f64) -> f64 {
    if past_close == 0.0 {
        0.0
    } else {
        (close / past_close - 1.0) * 100.0
    }
}

/// Two points above the first threshold, stepping down by half a point per threshold.
fn return_points(ret: f64, thresholds: [f64; 4]) -> f64 {
    if ret > thresholds[0] {
        2.0
    } else if ret > thresholds[1] {
        1.5
    } else if ret > thresholds[2] {
        1.0
    } else if ret > thresholds[3] {
        0.5
    } else {
        0.0
    }
}

/// Latest volume over the mean of the preceding [`VOLUME_WINDOW`] bars.
fn volume_ratio(bars: &[PriceBar]) -> Option<f64> {
    let n = bars.len();
    if n <= VOLUME_WINDOW {
        return None;
    }
    let prior = &bars[n - 1 - VOLUME_WINDOW..n - 1];
    let avg = prior.iter().map(|b| b.volume as f64).sum::<f64>() / VOLUME_WINDOW as f64;
    (avg > 0.0).then(|| bars[n - 1].volume as f64 / avg)
}

fn volume_points(ratio: f64) -> f64 {
    if ratio > 2.0 {
        3.0
    } else if ratio > 1.5 {
        2.0
    } else if ratio > 1.0 {
        1.5
    } else if ratio > 0.7 {
        1.0
    } else {
        0.5
    }
}

fn sentiment_sub_score(bars: &[PriceBar]) -> f64 {
    let mut points = Vec::with_capacity(3);
    let n = bars.len();
    let close = bars[n - 1].close;

    if n >= YEAR_BARS {
        if let Some(position) = range_position(&bars[n - YEAR_BARS..], close) {
            points.push(year_range_points(position));
        }
    } else if n >= QUARTER_BARS
        && let Some(position) = range_position(&bars[n - QUARTER_BARS..], close)
    {
        points.push(position * 2.0 + 1.0);
    }

    if n > VOLATILITY_WINDOW {
        let returns = pct_returns(&bars[n - 1 - VOLATILITY_WINDOW..]);
        if let Some(volatility) = sample_stddev(&returns) {
            points.push(volatility_points(volatility));
        }
    }

    if n > TREND_WINDOW {
        let recent = &bars[n - 1 - TREND_WINDOW..];
        let positive_days = recent.windows(2).filter(|w| w[1].close > w[0].close).count();
        points.push(streak_points(positive_days));
    }

    average_points(&points, 10.0 / 4.0)
}

/// Where `close` sits between the window's lowest low and highest high.
fn range_position(window: &[PriceBar], close: f64) -> Option<f64> {
    let high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    (high > low).then(|| (close - low) / (high - low))
}

fn year_range_points(position: f64) -> f64 {
    if position < 0.2 {
        4.0
    } else if position < 0.4 {
        3.0
    } else if position <= 0.6 {
        2.0
    } else if position < 0.8 {
        1.0
    } else {
        0.0
    }
}

fn volatility_points(volatility_pct: f64) -> f64 {
    if volatility_pct < 1.0 {
        3.0
    } else if volatility_pct < 2.0 {
        2.0
    } else if volatility_pct < 3.0 {
        1.5
    } else if volatility_pct < 5.0 {
        1.0
    } else {
        0.5
    }
}

fn streak_points(positive_days: usize) -> f64 {
    match positive_days {
        7.. => 3.0,
        6 => 2.5,
        5 => 2.0,
        4 => 1.5,
        _ => 0.5,
    }
}

fn highlights(bars: &[PriceBar], latest: &IndicatorSnapshot) -> Vec<String> {
    let mut notes = Vec::new();
    let close = bars[bars.len() - 1].close;

    if let Some(rsi) = latest.rsi {
        if rsi < 30.0 {
            notes.push(format!("RSI oversold ({:.1})", rsi));
        } else if rsi > 70.0 {
            notes.push(format!("RSI overbought ({:.1})", rsi));
        }
    }
    if let (Some(fast), Some(slow)) = (latest.sma_fast, latest.sma_slow) {
        if close > fast && close > slow {
            notes.push("price above both moving averages".to_string());
        } else if close < fast && close < slow {
            notes.push("price below both moving averages".to_string());
        }
    }
    if let Some(ratio) = volume_ratio(bars)
        && ratio > 2.0
    {
        notes.push(format!("exceptional volume ({:.1}x average)", ratio));
    }
    notes
}
