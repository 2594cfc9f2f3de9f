//! Price bar representation.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl PriceBar {
    /// Percentage change of this bar's close relative to `prev_close`.
    pub fn change_pct(&self, prev_close: f64) -> f64 {
        if prev_close == 0.0 {
            0.0
        } else {
            (self.close - prev_close) / prev_close * 100.0
        }
    }
}

/// Reject series that are not strictly ascending by timestamp.
///
/// Duplicated timestamps count as unordered.
pub fn ensure_ascending(symbol: &str, bars: &[PriceBar]) -> Result<(), EngineError> {
    for pair in bars.windows(2) {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(EngineError::UnorderedSeries {
                symbol: symbol.to_string(),
                timestamp: pair[1].timestamp.to_string(),
            });
        }
    }
    Ok(())
}

pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Close-to-close percentage returns; one element shorter than the input.
pub fn pct_returns(bars: &[PriceBar]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| w[1].change_pct(w[0].close))
        .collect()
}

/// Daily bars at midnight starting 2024-01-01, one per close.
#[cfg(test)]
pub(crate) fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            timestamp: start + chrono::Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000,
        })
        .collect()
}
