//! Report output port trait.

use std::io::Write;

use crate::domain::analysis::Recommendation;
use crate::domain::backtest::BacktestResult;
use crate::domain::error::EngineError;
use crate::domain::hybrid::HybridScore;

/// Renders engine outputs to a writer.
pub trait ReportPort {
    fn write_backtest(&self, result: &BacktestResult, out: &mut dyn Write) -> Result<(), EngineError>;

    fn write_recommendation(
        &self,
        recommendation: &Recommendation,
        out: &mut dyn Write,
    ) -> Result<(), EngineError>;

    fn write_score(&self, score: &HybridScore, out: &mut dyn Write) -> Result<(), EngineError>;
}
