#![allow(dead_code)]

use chartlab::domain::error::AnalyticsError;
use chartlab::domain::raw_series::RawSeries;
use chartlab::ports::data_port::DataPort;
use std::collections::HashMap;
use std::io::Write;

pub const GOLDEN_CLOSES: [f64; 16] = [
    100.0, 102.0, 101.0, 105.0, 110.0, 108.0, 95.0, 90.0, 92.0, 100.0, 103.0, 107.0, 96.0, 91.0,
    93.0, 101.0,
];

pub const DAY_MS: i64 = 86_400_000;

/// Deterministic trending wave, long enough for SMA(200).
pub fn wave_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            100.0 + t * 0.05 + (t * 0.13).sin() * 8.0 + (t * 0.71).sin() * 1.5
        })
        .collect()
}

/// Close series with synthetic OHLC and volume around it.
pub fn ohlcv_series(n: usize) -> RawSeries {
    let closes = wave_closes(n);
    let opens: Vec<f64> = closes.iter().map(|c| c - 0.3).collect();
    let highs: Vec<f64> = closes.iter().map(|c| c + 1.2).collect();
    let lows: Vec<f64> = closes.iter().map(|c| c - 1.4).collect();
    let volumes: Vec<f64> = (0..n).map(|i| 1000.0 + ((i * 37) % 400) as f64).collect();
    RawSeries::from_closes(closes)
        .unwrap()
        .with_ohlc(opens, highs, lows)
        .unwrap()
        .with_volume(volumes)
        .unwrap()
}

/// CSV text with a `date` column starting 2024-01-01.
pub fn series_csv(series: &RawSeries) -> String {
    let mut out = String::from("date,open,high,low,close,volume\n");
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    for i in 0..series.len() {
        let date = start + chrono::Duration::days(i as i64);
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            date.format("%Y-%m-%d"),
            series.opens().unwrap()[i],
            series.highs()[i],
            series.lows()[i],
            series.closes()[i],
            series.volumes().unwrap()[i],
        ));
    }
    out
}

pub fn closes_csv(closes: &[f64]) -> String {
    let mut out = String::from("timestamp,close\n");
    for (i, c) in closes.iter().enumerate() {
        out.push_str(&format!("{},{}\n", i as i64 * DAY_MS, c));
    }
    out
}

pub fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn same_bits(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

pub struct MockDataPort {
    pub data: HashMap<String, RawSeries>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn with_series(mut self, symbol: &str, series: RawSeries) -> Self {
        self.data.insert(symbol.to_string(), series);
        self
    }
}

impl DataPort for MockDataPort {
    fn load_series(
        &self,
        symbol: &str,
        _range: Option<(i64, i64)>,
    ) -> Result<RawSeries, AnalyticsError> {
        self.data
            .get(symbol)
            .cloned()
            .ok_or_else(|| AnalyticsError::Data {
                reason: format!("no data for {}", symbol),
            })
    }

    fn list_symbols(&self) -> Result<Vec<String>, AnalyticsError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}
