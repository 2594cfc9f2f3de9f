//! Externally computed prediction scores and their normalizers.
//!
//! Predictors report on their own scales; everything here maps them onto
//! the shared 0-10 scale the hybrid combiner blends.

use serde::Serialize;
use std::fmt;

/// Probability band around 0.5 inside which the ML model has no opinion.
pub const ML_NEUTRAL_BAND: f64 = 0.1;
/// Polarity beyond which news sentiment is labelled positive or negative.
pub const SENTIMENT_LABEL_THRESHOLD: f64 = 0.2;
/// Projected move (percent) that maps to the ends of the 0-10 scale.
pub const PROPHET_CHANGE_SPAN_PCT: f64 = 10.0;

/// Inputs to the hybrid score, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Technical,
    MlPrediction,
    Prophet,
    Sentiment,
}

impl Component {
    pub const ALL: [Component; 4] = [
        Component::Technical,
        Component::MlPrediction,
        Component::Prophet,
        Component::Sentiment,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Component::Technical => "technical",
            Component::MlPrediction => "ml_prediction",
            Component::Prophet => "prophet",
            Component::Sentiment => "sentiment",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn from_polarity(polarity: f64) -> Self {
        if polarity > SENTIMENT_LABEL_THRESHOLD {
            SentimentLabel::Positive
        } else if polarity < -SENTIMENT_LABEL_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

/// What the ML model thinks of the next move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MlOutlook {
    Up,
    Down,
    Flat,
}

impl MlOutlook {
    pub fn from_probability(probability: f64) -> Self {
        if probability > 0.5 + ML_NEUTRAL_BAND {
            MlOutlook::Up
        } else if probability < 0.5 - ML_NEUTRAL_BAND {
            MlOutlook::Down
        } else {
            MlOutlook::Flat
        }
    }
}

/// Raw predictor output kept next to the normalized score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreMetadata {
    MlPrediction { probability: f64 },
    Prophet { change_pct: f64 },
    Sentiment { polarity: f64, label: SentimentLabel },
}

/// One external predictor's verdict on the 0-10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExternalScore {
    pub score: f64,
    pub metadata: ScoreMetadata,
}

impl ExternalScore {
    pub fn component(&self) -> Component {
        match self.metadata {
            ScoreMetadata::MlPrediction { .. } => Component::MlPrediction,
            ScoreMetadata::Prophet { .. } => Component::Prophet,
            ScoreMetadata::Sentiment { .. } => Component::Sentiment,
        }
    }

    /// Probability of an up move, 0..=1, scaled by ten.
    pub fn from_ml_probability(probability: f64) -> Self {
        ExternalScore {
            score: probability * 10.0,
            metadata: ScoreMetadata::MlPrediction { probability },
        }
    }

    /// Projected percent change; -10% or worse scores 0, +10% or better 10.
    pub fn from_prophet_change(change_pct: f64) -> Self {
        let score = ((change_pct + PROPHET_CHANGE_SPAN_PCT) / 2.0).clamp(0.0, 10.0);
        ExternalScore {
            score,
            metadata: ScoreMetadata::Prophet { change_pct },
        }
    }

    /// News polarity in [-1, 1].
    pub fn from_sentiment_polarity(polarity: f64) -> Self {
        ExternalScore {
            score: (polarity + 1.0) * 5.0,
            metadata: ScoreMetadata::Sentiment {
                polarity,
                label: SentimentLabel::from_polarity(polarity),
            },
        }
    }
}

/// The three external inputs; `None` marks a predictor that gave no answer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExternalScores {
    pub ml_prediction: Option<ExternalScore>,
    pub prophet: Option<ExternalScore>,
    pub sentiment: Option<ExternalScore>,
}

impl ExternalScores {
    pub fn get(&self, component: Component) -> Option<&ExternalScore> {
        match component {
            Component::Technical => None,
            Component::MlPrediction => self.ml_prediction.as_ref(),
            Component::Prophet => self.prophet.as_ref(),
            Component::Sentiment => self.sentiment.as_ref(),
        }
    }

    /// Store `score` in the slot its metadata belongs to.
    pub fn insert(&mut self, score: ExternalScore) {
        match score.component() {
            Component::MlPrediction => self.ml_prediction = Some(score),
            Component::Prophet => self.prophet = Some(score),
            Component::Sentiment => self.sentiment = Some(score),
            Component::Technical => {}
        }
    }

    pub fn ml_probability(&self) -> Option<f64> {
        match self.ml_prediction?.metadata {
            ScoreMetadata::MlPrediction { probability } => Some(probability),
            _ => None,
        }
    }
}
