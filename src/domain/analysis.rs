//! Live recommendation flow over the latest bar of a series.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use super::confidence::ConfidencePolicy;
use super::ensemble;
use super::error::EngineError;
use super::external::ExternalScores;
use super::hybrid::{HybridCombiner, HybridScore, ScoreWeights};
use super::indicator_set::{IndicatorSet, IndicatorSnapshot};
use super::ohlcv::{PriceBar, ensure_ascending};
use super::signal::Signal;
use super::strategy::StrategyConfig;
use super::strategy_eval;
use super::technical_score::TechnicalScore;

/// Every strategy's view of the latest bar plus their consensus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub indicators: IndicatorSnapshot,
    pub signals: Vec<Signal>,
    pub consensus: Signal,
}

#[derive(Debug, Clone)]
pub struct Analyzer {
    strategy: StrategyConfig,
    combiner: HybridCombiner,
    policy: ConfidencePolicy,
}

impl Analyzer {
    pub fn new(
        strategy: StrategyConfig,
        weights: ScoreWeights,
        policy: ConfidencePolicy,
    ) -> Result<Self, EngineError> {
        strategy.validate()?;
        policy.validate()?;
        Ok(Analyzer {
            strategy,
            combiner: HybridCombiner::new(weights)?,
            policy,
        })
    }

    pub fn strategy(&self) -> &StrategyConfig {
        &self.strategy
    }

    /// Evaluate every strategy at the latest bar and vote.
    ///
    /// When `technical_score` is given and falls below `min_score`, every
    /// strategy signal is turned into HOLD before voting.
    pub fn signals(
        &self,
        symbol: &str,
        bars: &[PriceBar],
        technical_score: Option<f64>,
    ) -> Result<Recommendation, EngineError> {
        let (index, last) = latest(symbol, bars)?;
        let indicators = IndicatorSet::compute(bars, &self.strategy);

        let mut signals = strategy_eval::evaluate_all(symbol, bars, &indicators, index, &self.strategy);
        if let Some(score) = technical_score
            && score < self.strategy.min_score
        {
            debug!(symbol, score, min = self.strategy.min_score, "signals gated by minimum score");
            let reason = format!("score below minimum ({:.1} < {:.1})", score, self.strategy.min_score);
            signals = signals
                .into_iter()
                .map(|s| Signal::hold(&s.symbol, s.timestamp, s.source, reason.clone()))
                .collect();
        }

        let consensus = ensemble::vote(symbol, last.timestamp, &signals);
        Ok(Recommendation {
            symbol: symbol.to_string(),
            timestamp: last.timestamp,
            close: last.close,
            indicators: indicators.snapshot(index),
            signals,
            consensus,
        })
    }

    /// Technical score, confidence and the blend with external scores.
    pub fn score(
        &self,
        symbol: &str,
        bars: &[PriceBar],
        externals: &ExternalScores,
    ) -> Result<HybridScore, EngineError> {
        latest(symbol, bars)?;
        let indicators = IndicatorSet::compute(bars, &self.strategy);
        let technical = TechnicalScore::compute(bars, &indicators);
        let confidence = self.policy.assess(bars, &indicators);
        debug!(
            symbol,
            technical = technical.total,
            confidence = confidence.pct,
            "scoring"
        );
        Ok(self.combiner.combine(symbol, &technical, externals, confidence))
    }

    pub fn technical_score(&self, symbol: &str, bars: &[PriceBar]) -> Result<TechnicalScore, EngineError> {
        latest(symbol, bars)?;
        let indicators = IndicatorSet::compute(bars, &self.strategy);
        Ok(TechnicalScore::compute(bars, &indicators))
    }
}

fn latest<'a>(symbol: &str, bars: &'a [PriceBar]) -> Result<(usize, &'a PriceBar), EngineError> {
    let Some(last) = bars.last() else {
        return Err(EngineError::NoData {
            symbol: symbol.to_string(),
        });
    };
    ensure_ascending(symbol, bars)?;
    Ok((bars.len() - 1, last))
}
