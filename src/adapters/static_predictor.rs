//! Predictor that returns a fixed answer.
//!
//! Used by the CLI for scores passed on the command line and by tests.

use crate::domain::external::{Component, ExternalScore};
use crate::domain::ohlcv::PriceBar;
use crate::ports::predictor_port::Predictor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticPredictor {
    component: Component,
    score: Option<ExternalScore>,
}

impl StaticPredictor {
    pub fn fixed(score: ExternalScore) -> Self {
        StaticPredictor {
            component: score.component(),
            score: Some(score),
        }
    }

    pub fn unavailable(component: Component) -> Self {
        StaticPredictor {
            component,
            score: None,
        }
    }

    /// `fixed` when a value was supplied, `unavailable` otherwise.
    pub fn from_option(component: Component, score: Option<ExternalScore>) -> Self {
        match score {
            Some(score) => Self::fixed(score),
            None => Self::unavailable(component),
        }
    }
}

impl Predictor for StaticPredictor {
    fn component(&self) -> Component {
        self.component
    }

    fn predict(&self, _symbol: &str, _bars: &[PriceBar]) -> Option<ExternalScore> {
        self.score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_takes_component_from_score() {
        let p = StaticPredictor::fixed(ExternalScore::from_prophet_change(2.0));
        assert_eq!(p.component(), Component::Prophet);
        assert_eq!(p.predict("X", &[]).map(|s| s.score), Some(6.0));
    }

    #[test]
    fn from_option_none_is_unavailable() {
        let p = StaticPredictor::from_option(Component::Sentiment, None);
        assert_eq!(p.component(), Component::Sentiment);
        assert_eq!(p.predict("X", &[]), None);
    }
}
