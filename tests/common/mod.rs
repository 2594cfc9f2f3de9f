#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use equiscore::domain::error::EngineError;
use equiscore::domain::position::Trade;
pub use equiscore::domain::ohlcv::PriceBar;
use equiscore::ports::data_port::DataPort;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, EngineError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(EngineError::DataFormat {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|b| start_date.is_none_or(|s| b.timestamp.date() >= s))
            .filter(|b| end_date.is_none_or(|e| b.timestamp.date() <= e))
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day(offset: usize) -> NaiveDateTime {
    (date(2024, 1, 1) + chrono::Duration::days(offset as i64))
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// One bar per close, o=h=l=c, constant volume, daily from 2024-01-01.
pub fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PriceBar {
            timestamp: day(i),
            open: c,
            high: c,
            low: c,
            close: c,
            volume: 1000,
        })
        .collect()
}

/// Deterministic oscillating series with some drift and intrabar range.
pub fn generate_bars(n: usize) -> Vec<PriceBar> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            let close = 100.0 + 0.05 * t + 8.0 * (t / 9.0).sin() + 3.0 * (t / 2.3).cos();
            let open = close - 0.5 * (t / 3.0).sin();
            let high = open.max(close) + 1.0;
            let low = open.min(close) - 1.0;
            PriceBar {
                timestamp: day(i),
                open,
                high,
                low,
                close,
                volume: 1000 + ((i * 37) % 400) as i64,
            }
        })
        .collect()
}

/// 20 flat bars at 100, then `tail`.
pub fn flat_then(tail: &[f64]) -> Vec<PriceBar> {
    let mut closes = vec![100.0; 20];
    closes.extend_from_slice(tail);
    bars_from_closes(&closes)
}

/// Most trades held at once, treating each trade as the closed interval
/// from entry to exit.
pub fn max_concurrent_trades(trades: &[Trade]) -> usize {
    trades
        .iter()
        .map(|t| {
            trades
                .iter()
                .filter(|o| o.entry_time <= t.entry_time && t.entry_time <= o.exit_time)
                .count()
        })
        .max()
        .unwrap_or(0)
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn write_csv(dir: &Path, symbol: &str, bars: &[PriceBar]) -> PathBuf {
    let path = dir.join(format!("{}.csv", symbol));
    let mut content = String::from("timestamp,open,high,low,close,volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.timestamp.format("%Y-%m-%d"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    std::fs::write(&path, content).unwrap();
    path
}
