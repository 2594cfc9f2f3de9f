//! Per-strategy signal evaluation.
//!
//! Every strategy compares the indicator state at bar `index` with the state
//! at `index - 1` and fires only on a cross. Undefined inputs yield HOLD with
//! an "insufficient data" reason; nothing here fails.

use super::indicator_set::{IndicatorSet, IndicatorSnapshot};
use super::ohlcv::PriceBar;
use super::signal::{Direction, Signal, SignalSource};
use super::strategy::{StrategyConfig, StrategyKind};

/// Bars of trailing volume the volume filter averages over.
pub const VOLUME_LOOKBACK: usize = 20;
/// Minimum ratio of the bar's volume to the trailing average.
pub const VOLUME_MIN_RATIO: f64 = 0.5;
/// Lowest confidence reported for an RSI signal that did fire.
const RSI_CONFIDENCE_FLOOR: f64 = 0.1;

/// Direction, confidence and reason before filters are applied.
struct Verdict {
    direction: Direction,
    confidence: f64,
    reason: String,
}

impl Verdict {
    fn hold(reason: impl Into<String>) -> Self {
        Verdict {
            direction: Direction::Hold,
            confidence: 0.0,
            reason: reason.into(),
        }
    }

    fn fire(direction: Direction, confidence: f64, reason: String) -> Self {
        Verdict {
            direction,
            confidence,
            reason,
        }
    }
}

fn crossed_above(prev_a: f64, prev_b: f64, a: f64, b: f64) -> bool {
    prev_a <= prev_b && a > b
}

fn crossed_below(prev_a: f64, prev_b: f64, a: f64, b: f64) -> bool {
    prev_a >= prev_b && a < b
}

/// Evaluate one strategy at `index`. `bars` and `indicators` must be aligned.
pub fn evaluate(
    kind: StrategyKind,
    symbol: &str,
    bars: &[PriceBar],
    indicators: &IndicatorSet,
    index: usize,
    config: &StrategyConfig,
) -> Signal {
    let source = SignalSource::Strategy(kind);
    let Some(bar) = bars.get(index) else {
        return Signal::hold(
            symbol,
            bars.last().map(|b| b.timestamp).unwrap_or_default(),
            source,
            format!("insufficient data: no bar at index {}", index),
        );
    };
    if index == 0 {
        return Signal::hold(
            symbol,
            bar.timestamp,
            source,
            "insufficient data: no previous bar",
        );
    }

    let cur = indicators.snapshot(index);
    let prev = indicators.snapshot(index - 1);
    let prev_close = bars[index - 1].close;

    let verdict = match kind {
        StrategyKind::Rsi => rsi_verdict(&prev, &cur, config),
        StrategyKind::Macd => macd_verdict(&prev, &cur),
        StrategyKind::MaCrossover => ma_verdict(&prev, &cur, config),
        StrategyKind::Bollinger => bollinger_verdict(&prev, &cur, prev_close, bar.close),
    };
    let verdict = apply_filters(verdict, bars, &cur, index, config);

    Signal::new(
        symbol,
        bar.timestamp,
        source,
        verdict.direction,
        verdict.confidence,
        verdict.reason,
    )
}

/// Evaluate every strategy at `index`, in priority order.
pub fn evaluate_all(
    symbol: &str,
    bars: &[PriceBar],
    indicators: &IndicatorSet,
    index: usize,
    config: &StrategyConfig,
) -> Vec<Signal> {
    StrategyKind::ALL
        .iter()
        .map(|&kind| evaluate(kind, symbol, bars, indicators, index, config))
        .collect()
}

fn rsi_verdict(prev: &IndicatorSnapshot, cur: &IndicatorSnapshot, config: &StrategyConfig) -> Verdict {
    let (Some(prev_rsi), Some(rsi)) = (prev.rsi, cur.rsi) else {
        return Verdict::hold(format!("insufficient data for RSI({})", config.rsi_period));
    };
    let oversold = config.rsi_oversold;
    let overbought = config.rsi_overbought;

    if prev_rsi >= oversold && rsi < oversold {
        let confidence = ((oversold - rsi) / oversold).max(RSI_CONFIDENCE_FLOOR);
        Verdict::fire(
            Direction::Buy,
            confidence,
            format!(
                "RSI crossed below oversold {:.1} ({:.2} -> {:.2})",
                oversold, prev_rsi, rsi
            ),
        )
    } else if prev_rsi <= overbought && rsi > overbought {
        let confidence = ((rsi - overbought) / (100.0 - overbought)).max(RSI_CONFIDENCE_FLOOR);
        Verdict::fire(
            Direction::Sell,
            confidence,
            format!(
                "RSI crossed above overbought {:.1} ({:.2} -> {:.2})",
                overbought, prev_rsi, rsi
            ),
        )
    } else {
        Verdict::hold(format!("RSI {:.2} without threshold cross", rsi))
    }
}

fn macd_verdict(prev: &IndicatorSnapshot, cur: &IndicatorSnapshot) -> Verdict {
    let (Some(prev_line), Some(prev_signal), Some(line), Some(signal)) =
        (prev.macd, prev.macd_signal, cur.macd, cur.macd_signal)
    else {
        return Verdict::hold("insufficient data for MACD");
    };

    let confidence = if line == 0.0 {
        1.0
    } else {
        ((line - signal).abs() / line.abs()).min(1.0)
    };

    if crossed_above(prev_line, prev_signal, line, signal) {
        Verdict::fire(
            Direction::Buy,
            confidence,
            format!("MACD crossed above signal ({:.4} > {:.4})", line, signal),
        )
    } else if crossed_below(prev_line, prev_signal, line, signal) {
        Verdict::fire(
            Direction::Sell,
            confidence,
            format!("MACD crossed below signal ({:.4} < {:.4})", line, signal),
        )
    } else {
        Verdict::hold(format!("MACD {:.4} without signal cross", line))
    }
}

fn ma_verdict(prev: &IndicatorSnapshot, cur: &IndicatorSnapshot, config: &StrategyConfig) -> Verdict {
    let (Some(prev_fast), Some(prev_slow), Some(fast), Some(slow)) =
        (prev.sma_fast, prev.sma_slow, cur.sma_fast, cur.sma_slow)
    else {
        return Verdict::hold(format!(
            "insufficient data for SMA({})/SMA({})",
            config.ma_fast_window, config.ma_slow_window
        ));
    };

    let confidence = if slow == 0.0 {
        0.0
    } else {
        ((fast - slow).abs() / slow * 10.0).min(1.0)
    };

    if crossed_above(prev_fast, prev_slow, fast, slow) {
        Verdict::fire(
            Direction::Buy,
            confidence,
            format!(
                "golden cross: SMA({}) {:.2} crossed above SMA({}) {:.2}",
                config.ma_fast_window, fast, config.ma_slow_window, slow
            ),
        )
    } else if crossed_below(prev_fast, prev_slow, fast, slow) {
        Verdict::fire(
            Direction::Sell,
            confidence,
            format!(
                "death cross: SMA({}) {:.2} crossed below SMA({}) {:.2}",
                config.ma_fast_window, fast, config.ma_slow_window, slow
            ),
        )
    } else {
        Verdict::hold("no moving average cross")
    }
}

fn bollinger_verdict(
    prev: &IndicatorSnapshot,
    cur: &IndicatorSnapshot,
    prev_close: f64,
    close: f64,
) -> Verdict {
    let (Some(prev_upper), Some(prev_lower), Some(upper), Some(lower)) =
        (prev.bb_upper, prev.bb_lower, cur.bb_upper, cur.bb_lower)
    else {
        return Verdict::hold("insufficient data for Bollinger bands");
    };

    if prev_close < prev_lower && close >= lower {
        let penetration = if prev_lower != 0.0 {
            (prev_lower - prev_close) / prev_lower.abs()
        } else {
            0.0
        };
        Verdict::fire(
            Direction::Buy,
            (penetration * 10.0).min(1.0),
            format!(
                "close {:.2} re-entered above lower band {:.2}",
                close, lower
            ),
        )
    } else if prev_close > prev_upper && close <= upper {
        let penetration = if prev_upper != 0.0 {
            (prev_close - prev_upper) / prev_upper.abs()
        } else {
            0.0
        };
        Verdict::fire(
            Direction::Sell,
            (penetration * 10.0).min(1.0),
            format!(
                "close {:.2} re-entered below upper band {:.2}",
                close, upper
            ),
        )
    } else {
        Verdict::hold("close did not re-enter the bands")
    }
}

fn apply_filters(
    verdict: Verdict,
    bars: &[PriceBar],
    cur: &IndicatorSnapshot,
    index: usize,
    config: &StrategyConfig,
) -> Verdict {
    if !verdict.direction.is_actionable() {
        return verdict;
    }

    if config.volume_filter && index >= VOLUME_LOOKBACK {
        let window = &bars[index - VOLUME_LOOKBACK..index];
        let avg = window.iter().map(|b| b.volume as f64).sum::<f64>() / VOLUME_LOOKBACK as f64;
        let volume = bars[index].volume as f64;
        if avg > 0.0 && volume < VOLUME_MIN_RATIO * avg {
            return Verdict::hold(format!(
                "{} suppressed by volume filter (volume {:.0} < {:.0})",
                verdict.direction,
                volume,
                VOLUME_MIN_RATIO * avg
            ));
        }
    }

    if config.trend_filter
        && let Some(slow) = cur.sma_slow
    {
        let close = bars[index].close;
        let against_trend = match verdict.direction {
            Direction::Buy => close < slow,
            Direction::Sell => close > slow,
            Direction::Hold => false,
        };
        if against_trend {
            return Verdict::hold(format!(
                "{} suppressed by trend filter (close {:.2} vs SMA({}) {:.2})",
                verdict.direction, close, config.ma_slow_window, slow
            ));
        }
    }

    verdict
}
