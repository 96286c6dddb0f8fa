//! Raw market series supplied by the data collaborator.
//!
//! All columns are aligned by index. `close` is required; OHLV columns are
//! optional and, when present, must match its length.

use crate::domain::error::AnalyticsError;

#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    timestamp: Vec<i64>,
    close: Vec<f64>,
    open: Option<Vec<f64>>,
    high: Option<Vec<f64>>,
    low: Option<Vec<f64>>,
    volume: Option<Vec<f64>>,
}

impl RawSeries {
    /// Closes must be finite. Zero and negative closes are accepted since
    /// not every charted series is a price (sentiment scores, spreads);
    /// consumers that divide by price check for themselves.
    pub fn new(timestamp: Vec<i64>, close: Vec<f64>) -> Result<Self, AnalyticsError> {
        if close.is_empty() {
            return Err(AnalyticsError::InvalidSeries {
                reason: "close column is empty".into(),
            });
        }
        if timestamp.len() != close.len() {
            return Err(AnalyticsError::InvalidSeries {
                reason: format!(
                    "timestamp has {} entries but close has {}",
                    timestamp.len(),
                    close.len()
                ),
            });
        }
        if let Some(i) = close.iter().position(|c| !c.is_finite()) {
            return Err(AnalyticsError::InvalidSeries {
                reason: format!("close at index {} is not a finite number", i),
            });
        }
        if let Some(i) = timestamp.windows(2).position(|w| w[1] <= w[0]) {
            return Err(AnalyticsError::InvalidSeries {
                reason: format!("timestamps not strictly increasing at index {}", i + 1),
            });
        }
        Ok(Self {
            timestamp,
            close,
            open: None,
            high: None,
            low: None,
            volume: None,
        })
    }

    /// Build a series with synthetic, evenly spaced timestamps (one per day).
    pub fn from_closes(close: Vec<f64>) -> Result<Self, AnalyticsError> {
        const DAY_MS: i64 = 86_400_000;
        let timestamp = (0..close.len() as i64).map(|i| i * DAY_MS).collect();
        Self::new(timestamp, close)
    }

    pub fn with_ohlc(
        mut self,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
    ) -> Result<Self, AnalyticsError> {
        self.check_column("open", &open)?;
        self.check_column("high", &high)?;
        self.check_column("low", &low)?;
        self.open = Some(open);
        self.high = Some(high);
        self.low = Some(low);
        Ok(self)
    }

    pub fn with_volume(mut self, volume: Vec<f64>) -> Result<Self, AnalyticsError> {
        self.check_column("volume", &volume)?;
        self.volume = Some(volume);
        Ok(self)
    }

    fn check_column(&self, name: &str, column: &[f64]) -> Result<(), AnalyticsError> {
        if column.len() != self.close.len() {
            return Err(AnalyticsError::InvalidSeries {
                reason: format!(
                    "{} has {} entries but close has {}",
                    name,
                    column.len(),
                    self.close.len()
                ),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamp
    }

    pub fn closes(&self) -> &[f64] {
        &self.close
    }

    pub fn opens(&self) -> Option<&[f64]> {
        self.open.as_deref()
    }

    pub fn volumes(&self) -> Option<&[f64]> {
        self.volume.as_deref()
    }

    pub fn has_ohlc(&self) -> bool {
        self.high.is_some() && self.low.is_some()
    }

    /// High column, falling back to close for close-only series.
    pub fn highs(&self) -> &[f64] {
        self.high.as_deref().unwrap_or(&self.close)
    }

    /// Low column, falling back to close for close-only series.
    pub fn lows(&self) -> &[f64] {
        self.low.as_deref().unwrap_or(&self.close)
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|); plain range on the first bar.
    pub fn true_range(&self, index: usize) -> f64 {
        true_range(self.highs(), self.lows(), self.closes(), index)
    }
}

pub(crate) fn true_range(high: &[f64], low: &[f64], close: &[f64], index: usize) -> f64 {
    let hl = high[index] - low[index];
    if index == 0 {
        return hl;
    }
    let prev_close = close[index - 1];
    let hc = (high[index] - prev_close).abs();
    let lc = (low[index] - prev_close).abs();
    hl.max(hc).max(lc)
}
