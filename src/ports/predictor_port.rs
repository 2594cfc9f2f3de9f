//! External predictor port trait.
//!
//! ML, time-series and sentiment models live outside the engine. Whatever
//! calls them hands their normalized answers in through this trait; a
//! predictor that has nothing to say returns `None` and its weight is
//! redistributed by the hybrid combiner.

use crate::domain::external::{Component, ExternalScore, ExternalScores};
use crate::domain::ohlcv::PriceBar;
use tracing::warn;

pub trait Predictor: Send + Sync {
    fn component(&self) -> Component;

    fn predict(&self, symbol: &str, bars: &[PriceBar]) -> Option<ExternalScore>;
}

/// Ask every predictor once and file the answers by component.
///
/// An answer whose metadata belongs to a different component is dropped.
pub fn collect_scores(
    predictors: &[&dyn Predictor],
    symbol: &str,
    bars: &[PriceBar],
) -> ExternalScores {
    let mut scores = ExternalScores::default();
    for predictor in predictors {
        let expected = predictor.component();
        match predictor.predict(symbol, bars) {
            Some(score) if score.component() == expected => scores.insert(score),
            Some(score) => warn!(
                symbol,
                expected = %expected,
                got = %score.component(),
                "predictor answered for the wrong component"
            ),
            None => {}
        }
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::static_predictor::StaticPredictor;

    #[test]
    fn collects_available_scores() {
        let ml = StaticPredictor::fixed(ExternalScore::from_ml_probability(0.7));
        let prophet = StaticPredictor::unavailable(Component::Prophet);
        let sentiment = StaticPredictor::fixed(ExternalScore::from_sentiment_polarity(0.0));

        let scores = collect_scores(&[&ml, &prophet, &sentiment], "TEST", &[]);
        assert_eq!(scores.ml_probability(), Some(0.7));
        assert!(scores.prophet.is_none());
        assert_eq!(scores.sentiment.map(|s| s.score), Some(5.0));
    }

    struct Confused;

    impl Predictor for Confused {
        fn component(&self) -> Component {
            Component::Sentiment
        }

        fn predict(&self, _symbol: &str, _bars: &[PriceBar]) -> Option<ExternalScore> {
            Some(ExternalScore::from_prophet_change(3.0))
        }
    }

    #[test]
    fn mismatched_component_is_dropped() {
        let scores = collect_scores(&[&Confused], "TEST", &[]);
        assert_eq!(scores, ExternalScores::default());
    }
}
