//! Data-quality confidence for a recommendation, 0-100.

use serde::Serialize;
use std::fmt;

use super::error::EngineError;
use super::indicator::stddev::{mean, population_stddev, sample_stddev};
use super::indicator_set::IndicatorSet;
use super::ohlcv::{PriceBar, pct_returns};

const SECTION: &str = "confidence";
const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Trailing bars used for the volatility and volume sub-scores.
pub const RECENT_WINDOW: usize = 20;
/// Return stddev (percent) at which the volatility sub-score reaches zero.
pub const VOLATILITY_CEILING_PCT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLabel {
    High,
    Medium,
    Low,
}

impl fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfidenceLabel::High => "HIGH",
            ConfidenceLabel::Medium => "MEDIUM",
            ConfidenceLabel::Low => "LOW",
        })
    }
}

/// Weights and thresholds of the confidence composite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidencePolicy {
    pub history_weight: f64,
    pub completeness_weight: f64,
    pub volatility_weight: f64,
    pub volume_weight: f64,
    pub high_threshold: f64,
    pub medium_threshold: f64,
    /// Bars of history that earn a full history sub-score.
    pub full_history_bars: usize,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        ConfidencePolicy {
            history_weight: 0.40,
            completeness_weight: 0.30,
            volatility_weight: 0.15,
            volume_weight: 0.15,
            high_threshold: 80.0,
            medium_threshold: 50.0,
            full_history_bars: 252,
        }
    }
}

/// Each sub-score in [0, 100].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ConfidenceBreakdown {
    pub history: f64,
    pub completeness: f64,
    pub volatility: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Confidence {
    pub pct: f64,
    pub label: ConfidenceLabel,
    pub breakdown: ConfidenceBreakdown,
}

impl ConfidencePolicy {
    pub fn validate(&self) -> Result<(), EngineError> {
        let weights = [
            ("history", self.history_weight),
            ("completeness", self.completeness_weight),
            ("volatility", self.volatility_weight),
            ("volume", self.volume_weight),
        ];
        for (key, w) in weights {
            if !(w >= 0.0) || !w.is_finite() {
                return Err(EngineError::invalid(SECTION, key, "weight must be non-negative"));
            }
        }
        let sum: f64 = weights.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(EngineError::invalid(
                SECTION,
                "history",
                format!("weights must sum to 1.0, got {}", sum),
            ));
        }
        if !(0.0..=100.0).contains(&self.high_threshold) {
            return Err(EngineError::invalid(SECTION, "high_threshold", "must be in [0, 100]"));
        }
        if !(0.0..=self.high_threshold).contains(&self.medium_threshold) {
            return Err(EngineError::invalid(
                SECTION,
                "medium_threshold",
                "must be in [0, high_threshold]",
            ));
        }
        if self.full_history_bars == 0 {
            return Err(EngineError::invalid(SECTION, "full_history_bars", "must be at least 1"));
        }
        Ok(())
    }

    pub fn label(&self, pct: f64) -> ConfidenceLabel {
        if pct >= self.high_threshold {
            ConfidenceLabel::High
        } else if pct >= self.medium_threshold {
            ConfidenceLabel::Medium
        } else {
            ConfidenceLabel::Low
        }
    }

    /// Score how much the data behind the latest bar can be trusted.
    pub fn assess(&self, bars: &[PriceBar], indicators: &IndicatorSet) -> Confidence {
        let breakdown = ConfidenceBreakdown {
            history: self.history_score(bars.len()),
            completeness: indicators
                .latest()
                .map(|s| s.completeness() * 100.0)
                .unwrap_or(0.0),
            volatility: volatility_score(bars),
            volume: volume_score(bars),
        };

        let pct = (breakdown.history * self.history_weight
            + breakdown.completeness * self.completeness_weight
            + breakdown.volatility * self.volatility_weight
            + breakdown.volume * self.volume_weight)
            .clamp(0.0, 100.0);

        Confidence {
            pct,
            label: self.label(pct),
            breakdown,
        }
    }

    fn history_score(&self, bars: usize) -> f64 {
        (bars as f64 / self.full_history_bars as f64).min(1.0) * 100.0
    }
}

fn volatility_score(bars: &[PriceBar]) -> f64 {
    if bars.len() <= RECENT_WINDOW {
        return 0.0;
    }
    let returns = pct_returns(&bars[bars.len() - 1 - RECENT_WINDOW..]);
    match sample_stddev(&returns) {
        Some(sigma) if sigma.is_finite() => {
            100.0 * (1.0 - (sigma / VOLATILITY_CEILING_PCT).min(1.0))
        }
        _ => 0.0,
    }
}

fn volume_score(bars: &[PriceBar]) -> f64 {
    if bars.len() < RECENT_WINDOW {
        return 0.0;
    }
    let volumes: Vec<f64> = bars[bars.len() - RECENT_WINDOW..]
        .iter()
        .map(|b| b.volume as f64)
        .collect();
    let avg = mean(&volumes);
    if avg <= 0.0 {
        return 0.0;
    }
    let cv = population_stddev(&volumes) / avg;
    100.0 * (1.0 - cv.min(1.0))
}
