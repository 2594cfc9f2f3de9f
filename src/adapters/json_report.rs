//! JSON report adapter for machine consumers.

use std::io::Write;

use serde::Serialize;

use crate::domain::analysis::Recommendation;
use crate::domain::backtest::BacktestResult;
use crate::domain::error::EngineError;
use crate::domain::hybrid::HybridScore;
use crate::ports::report_port::ReportPort;

pub struct JsonReport;

fn write_json<T: Serialize>(value: &T, out: &mut dyn Write) -> Result<(), EngineError> {
    serde_json::to_writer_pretty(&mut *out, value).map_err(std::io::Error::from)?;
    writeln!(out)?;
    Ok(())
}

impl ReportPort for JsonReport {
    fn write_backtest(&self, result: &BacktestResult, out: &mut dyn Write) -> Result<(), EngineError> {
        write_json(result, out)
    }

    fn write_recommendation(
        &self,
        recommendation: &Recommendation,
        out: &mut dyn Write,
    ) -> Result<(), EngineError> {
        write_json(recommendation, out)
    }

    fn write_score(&self, score: &HybridScore, out: &mut dyn Write) -> Result<(), EngineError> {
        write_json(score, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::confidence::ConfidencePolicy;
    use crate::domain::external::{ExternalScore, ExternalScores};
    use crate::domain::hybrid::ScoreWeights;
    use crate::domain::analysis::Analyzer;
    use crate::domain::ohlcv::bars_from_closes;
    use crate::domain::strategy::StrategyConfig;

    #[test]
    fn score_is_valid_json() {
        let analyzer = Analyzer::new(
            StrategyConfig::default(),
            ScoreWeights::default(),
            ConfidencePolicy::default(),
        )
        .unwrap();
        let mut externals = ExternalScores::default();
        externals.insert(ExternalScore::from_sentiment_polarity(0.4));
        let score = analyzer
            .score("TEST", &bars_from_closes(&[100.0; 30]), &externals)
            .unwrap();

        let mut buf = Vec::new();
        JsonReport.write_score(&score, &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["symbol"], "TEST");
        assert_eq!(value["components"].as_array().map(|c| c.len()), Some(4));
        assert_eq!(value["components"][3]["metadata"]["label"], "positive");
    }
}
