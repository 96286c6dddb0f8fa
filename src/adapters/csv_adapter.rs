//! CSV file data adapter.
//!
//! One file per symbol, `<base>/<symbol>.csv`, with a header row. Only
//! `timestamp` (or `date`/`time`) and `close` are required; `open`, `high`,
//! `low` and `volume` are attached when every row has them.

use crate::domain::error::AnalyticsError;
use crate::domain::raw_series::RawSeries;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(alias = "date", alias = "time")]
    timestamp: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: f64,
    volume: Option<f64>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// Read a single CSV file into a series.
    pub fn load_file(path: &Path, range: Option<(i64, i64)>) -> Result<RawSeries, AnalyticsError> {
        let content = fs::read_to_string(path).map_err(|e| AnalyticsError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let series = parse_series(&content, range)?;
        tracing::debug!(path = %path.display(), bars = series.len(), "loaded csv series");
        Ok(series)
    }
}

impl DataPort for CsvAdapter {
    fn load_series(
        &self,
        symbol: &str,
        range: Option<(i64, i64)>,
    ) -> Result<RawSeries, AnalyticsError> {
        Self::load_file(&self.csv_path(symbol), range)
    }

    fn list_symbols(&self) -> Result<Vec<String>, AnalyticsError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| AnalyticsError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AnalyticsError::Data {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            if let Some(symbol) = name.to_string_lossy().strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

/// Parse CSV text into a series, keeping rows inside the inclusive `range`.
pub fn parse_series(content: &str, range: Option<(i64, i64)>) -> Result<RawSeries, AnalyticsError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (line, result) in rdr.deserialize::<Row>().enumerate() {
        let row = result.map_err(|e| AnalyticsError::Data {
            reason: format!("CSV parse error: {}", e),
        })?;
        let ts = parse_timestamp(&row.timestamp).ok_or_else(|| AnalyticsError::Data {
            reason: format!(
                "row {}: invalid timestamp '{}', expected YYYY-MM-DD, RFC 3339 or epoch milliseconds",
                line + 1,
                row.timestamp
            ),
        })?;
        if range.is_some_and(|(start, end)| ts < start || ts > end) {
            continue;
        }
        rows.push((ts, row));
    }

    if rows.is_empty() {
        return Err(AnalyticsError::Data {
            reason: "no rows in range".into(),
        });
    }
    rows.sort_by_key(|(ts, _)| *ts);

    let timestamps = rows.iter().map(|(ts, _)| *ts).collect();
    let closes = rows.iter().map(|(_, r)| r.close).collect();
    let mut series = RawSeries::new(timestamps, closes)?;

    let column = |pick: fn(&Row) -> Option<f64>| -> Option<Vec<f64>> {
        rows.iter().map(|(_, r)| pick(r)).collect()
    };
    if let (Some(open), Some(high), Some(low)) =
        (column(|r| r.open), column(|r| r.high), column(|r| r.low))
    {
        series = series.with_ohlc(open, high, low)?;
    }
    if let Some(volume) = column(|r| r.volume) {
        series = series.with_volume(volume)?;
    }
    Ok(series)
}

/// Epoch milliseconds from `YYYY-MM-DD` (midnight UTC), RFC 3339, or a bare integer.
pub fn parse_timestamp(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(ms) = value.parse::<i64>() {
        return Some(ms);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.timestamp_millis())
}
