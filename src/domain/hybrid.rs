//! Weighted blend of the technical score with external predictor scores.
//!
//! Missing predictors never fail a request: their base weight is spread
//! proportionally over the components that did report, so the effective
//! weights always sum to one.

use serde::Serialize;
use std::fmt;
use tracing::warn;

use super::confidence::{Confidence, ConfidenceLabel};
use super::error::EngineError;
use super::external::{
    Component, ExternalScore, ExternalScores, MlOutlook, ScoreMetadata, SentimentLabel,
};
use super::signal::Direction;
use super::technical_score::{NEUTRAL_SCORE, TechnicalScore, round1};

const SECTION: &str = "weights";
const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Base weight per component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreWeights {
    pub technical: f64,
    pub ml_prediction: f64,
    pub prophet: f64,
    pub sentiment: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            technical: 0.25,
            ml_prediction: 0.40,
            prophet: 0.20,
            sentiment: 0.15,
        }
    }
}

impl ScoreWeights {
    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::Technical => self.technical,
            Component::MlPrediction => self.ml_prediction,
            Component::Prophet => self.prophet,
            Component::Sentiment => self.sentiment,
        }
    }

    fn set(&mut self, component: Component, weight: f64) {
        match component {
            Component::Technical => self.technical = weight,
            Component::MlPrediction => self.ml_prediction = weight,
            Component::Prophet => self.prophet = weight,
            Component::Sentiment => self.sentiment = weight,
        }
    }

    pub fn sum(&self) -> f64 {
        Component::ALL.iter().map(|&c| self.get(c)).sum()
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        for component in Component::ALL {
            let w = self.get(component);
            if !(w >= 0.0) || !w.is_finite() {
                return Err(EngineError::invalid(
                    SECTION,
                    component.id(),
                    format!("must be a non-negative number, got {}", w),
                ));
            }
        }
        if !(self.technical > 0.0) {
            return Err(EngineError::invalid(SECTION, "technical", "must be positive"));
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(EngineError::invalid(
                SECTION,
                "technical",
                format!("weights must sum to 1.0, got {}", sum),
            ));
        }
        Ok(())
    }

    /// Weights renormalized over `available`; every other component gets 0.
    pub fn effective(&self, available: &[Component]) -> ScoreWeights {
        let total: f64 = available.iter().map(|&c| self.get(c)).sum();
        let mut out = ScoreWeights {
            technical: 0.0,
            ml_prediction: 0.0,
            prophet: 0.0,
            sentiment: 0.0,
        };
        if total > 0.0 {
            for &c in available {
                out.set(c, self.get(c) / total);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rating {
    #[serde(rename = "STRONG BUY")]
    StrongBuy,
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "HOLD")]
    Hold,
    #[serde(rename = "NEUTRAL")]
    Neutral,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "STRONG SELL")]
    StrongSell,
}

impl Rating {
    pub fn from_score(score: f64) -> Self {
        if score >= 9.0 {
            Rating::StrongBuy
        } else if score >= 7.5 {
            Rating::Buy
        } else if score >= 6.0 {
            Rating::Hold
        } else if score >= 4.5 {
            Rating::Neutral
        } else if score >= 3.0 {
            Rating::Sell
        } else {
            Rating::StrongSell
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::StrongBuy => "STRONG BUY",
            Rating::Buy => "BUY",
            Rating::Hold => "HOLD",
            Rating::Neutral => "NEUTRAL",
            Rating::Sell => "SELL",
            Rating::StrongSell => "STRONG SELL",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the breakdown. `score` is `None` for a missing predictor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentScore {
    pub component: Component,
    pub score: Option<f64>,
    pub base_weight: f64,
    pub weight: f64,
    pub contribution: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ScoreMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridScore {
    pub symbol: String,
    pub components: Vec<ComponentScore>,
    pub final_score: f64,
    pub rating: Rating,
    pub signal: Direction,
    pub confidence_pct: f64,
    pub confidence_label: ConfidenceLabel,
    pub confidence: Confidence,
    pub reasons: Vec<String>,
}

impl HybridScore {
    pub fn component(&self, component: Component) -> Option<&ComponentScore> {
        self.components.iter().find(|c| c.component == component)
    }

    pub fn effective_weight_sum(&self) -> f64 {
        self.components.iter().map(|c| c.weight).sum()
    }
}

/// Blends scores under validated base weights.
#[derive(Debug, Clone)]
pub struct HybridCombiner {
    weights: ScoreWeights,
}

impl HybridCombiner {
    pub fn new(weights: ScoreWeights) -> Result<Self, EngineError> {
        weights.validate()?;
        Ok(HybridCombiner { weights })
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn combine(
        &self,
        symbol: &str,
        technical: &TechnicalScore,
        externals: &ExternalScores,
        confidence: Confidence,
    ) -> HybridScore {
        let technical_value = sanitize(Component::Technical, Some(technical.total))
            .unwrap_or(NEUTRAL_SCORE);

        let scores: Vec<(Component, Option<f64>, Option<ScoreMetadata>)> = Component::ALL
            .iter()
            .map(|&c| match c {
                Component::Technical => (c, Some(technical_value), None),
                _ => {
                    let external = externals.get(c);
                    (
                        c,
                        sanitize(c, external.map(|e| e.score)),
                        external.map(|e| e.metadata),
                    )
                }
            })
            .collect();

        let available: Vec<Component> = scores
            .iter()
            .filter(|(_, score, _)| score.is_some())
            .map(|(c, _, _)| *c)
            .collect();
        let effective = self.weights.effective(&available);

        let components: Vec<ComponentScore> = scores
            .into_iter()
            .map(|(component, score, metadata)| {
                let weight = effective.get(component);
                ComponentScore {
                    component,
                    score,
                    base_weight: self.weights.get(component),
                    weight,
                    contribution: score.map(|s| s * weight).unwrap_or(0.0),
                    metadata,
                }
            })
            .collect();

        let raw: f64 = components.iter().map(|c| c.contribution).sum();
        let final_score = round1(raw.clamp(0.0, 10.0));
        let ml_outlook = externals.ml_probability().map(MlOutlook::from_probability);
        let signal = hybrid_signal(final_score, ml_outlook);

        HybridScore {
            symbol: symbol.to_string(),
            reasons: reasons(technical_value, externals, &components),
            components,
            final_score,
            rating: Rating::from_score(final_score),
            signal,
            confidence_pct: confidence.pct,
            confidence_label: confidence.label,
            confidence,
        }
    }
}

/// Non-finite scores count as missing; finite ones are clamped to 0-10.
fn sanitize(component: Component, score: Option<f64>) -> Option<f64> {
    let score = score?;
    if !score.is_finite() {
        warn!(%component, score, "ignoring non-finite score");
        return None;
    }
    Some(score.clamp(0.0, 10.0))
}

/// An ML view backed by the blended score wins; otherwise the score decides alone.
fn hybrid_signal(final_score: f64, ml: Option<MlOutlook>) -> Direction {
    match ml {
        Some(MlOutlook::Up) if final_score >= 6.0 => Direction::Buy,
        Some(MlOutlook::Down) if final_score <= 5.0 => Direction::Sell,
        _ if final_score >= 7.0 => Direction::Buy,
        _ if final_score <= 4.0 => Direction::Sell,
        _ => Direction::Hold,
    }
}

fn reasons(technical: f64, externals: &ExternalScores, components: &[ComponentScore]) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(probability) = externals.ml_probability().filter(|p| p.is_finite()) {
        match MlOutlook::from_probability(probability) {
            MlOutlook::Up => out.push(format!(
                "ML model predicts a rise with {:.0}% probability",
                probability * 100.0
            )),
            MlOutlook::Down => out.push(format!(
                "ML model predicts a fall with {:.0}% probability",
                (1.0 - probability) * 100.0
            )),
            MlOutlook::Flat => {}
        }
    }

    if let Some(ExternalScore {
        metadata: ScoreMetadata::Prophet { change_pct },
        ..
    }) = externals.prophet
        && change_pct != 0.0
        && change_pct.is_finite()
    {
        let direction = if change_pct > 0.0 { "rise" } else { "fall" };
        out.push(format!(
            "time-series model projects a {} of {:.1}%",
            direction,
            change_pct.abs()
        ));
    }

    if technical >= 7.0 {
        out.push(format!("strong technical indicators ({:.1}/10)", technical));
    } else if technical <= 4.0 {
        out.push(format!("weak technical indicators ({:.1}/10)", technical));
    }

    if let Some(ExternalScore {
        metadata: ScoreMetadata::Sentiment { label, .. },
        ..
    }) = externals.sentiment
    {
        match label {
            SentimentLabel::Positive => out.push("positive news sentiment".to_string()),
            SentimentLabel::Negative => out.push("negative news sentiment".to_string()),
            SentimentLabel::Neutral => {}
        }
    }

    for c in components.iter().filter(|c| c.score.is_none()) {
        out.push(format!("{} unavailable, weight redistributed", c.component));
    }

    out
}
