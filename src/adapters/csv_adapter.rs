//! CSV file data adapter.
//!
//! The path is either a single CSV file, served for any symbol, or a
//! directory holding one `{SYMBOL}.csv` per symbol.

use crate::domain::error::EngineError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        if self.base_path.is_dir() {
            self.base_path.join(format!("{}.csv", symbol))
        } else {
            self.base_path.clone()
        }
    }

    /// Symbol implied by the file name when the path is a single file.
    pub fn default_symbol(&self) -> Option<String> {
        if self.base_path.is_dir() {
            return None;
        }
        self.base_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
    }
}

fn data_error(path: &Path, reason: impl std::fmt::Display) -> EngineError {
    EngineError::DataFormat {
        reason: format!("{}: {}", path.display(), reason),
    }
}

/// Column positions by header name; `date` is accepted for `timestamp`.
fn column_indices(path: &Path, headers: &StringRecord) -> Result<[usize; 6], EngineError> {
    let mut indices = [0usize; 6];
    for (slot, name) in indices.iter_mut().zip(COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| {
                let h = h.trim().to_lowercase();
                h == name || (name == "timestamp" && h == "date")
            })
            .ok_or_else(|| data_error(path, format!("missing {} column", name)))?;
    }
    Ok(indices)
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_price(path: &Path, line: u64, name: &str, raw: &str) -> Result<f64, EngineError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|e| data_error(path, format!("line {}: invalid {} value: {}", line, name, e)))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(data_error(
            path,
            format!("line {}: {} must be a positive number, got {}", line, name, raw),
        ));
    }
    Ok(value)
}

fn parse_record(path: &Path, record: &StringRecord, idx: &[usize; 6]) -> Result<PriceBar, EngineError> {
    let line = record.position().map(|p| p.line()).unwrap_or(0);
    let field = |i: usize| record.get(idx[i]).unwrap_or("");

    let timestamp = parse_timestamp(field(0))
        .ok_or_else(|| data_error(path, format!("line {}: invalid timestamp '{}'", line, field(0))))?;
    let open = parse_price(path, line, "open", field(1))?;
    let high = parse_price(path, line, "high", field(2))?;
    let low = parse_price(path, line, "low", field(3))?;
    let close = parse_price(path, line, "close", field(4))?;
    let volume: i64 = field(5)
        .trim()
        .parse()
        .map_err(|e| data_error(path, format!("line {}: invalid volume value: {}", line, e)))?;

    if volume < 0 {
        return Err(data_error(path, format!("line {}: negative volume", line)));
    }
    if high < low || open > high || open < low || close > high || close < low {
        return Err(data_error(
            path,
            format!("line {}: prices outside the high/low range", line),
        ));
    }

    Ok(PriceBar {
        timestamp,
        open,
        high,
        low,
        close,
        volume,
    })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, EngineError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path)?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| data_error(&path, format!("CSV parse error: {}", e)))?
            .clone();
        let idx = column_indices(&path, &headers)?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| data_error(&path, format!("CSV parse error: {}", e)))?;
            let bar = parse_record(&path, &record, &idx)?;
            let date = bar.timestamp.date();
            if start_date.is_some_and(|s| date < s) || end_date.is_some_and(|e| date > e) {
                continue;
            }
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.timestamp);
        if let Some(pair) = bars.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
            return Err(data_error(
                &path,
                format!("duplicate timestamp {}", pair[1].timestamp),
            ));
        }

        debug!(symbol, path = %path.display(), bars = bars.len(), "loaded price series");
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        if !self.base_path.is_dir() {
            return Ok(self.default_symbol().into_iter().collect());
        }

        let mut symbols = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
                && let Some(stem) = path.file_stem()
            {
                symbols.push(stem.to_string_lossy().into_owned());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
