//! Raw series source port trait.

use crate::domain::error::AnalyticsError;
use crate::domain::raw_series::RawSeries;

pub trait DataPort {
    /// Load the series for `symbol`, optionally restricted to
    /// `[start_ms, end_ms]` (inclusive, epoch milliseconds).
    fn load_series(
        &self,
        symbol: &str,
        range: Option<(i64, i64)>,
    ) -> Result<RawSeries, AnalyticsError>;

    fn list_symbols(&self) -> Result<Vec<String>, AnalyticsError>;
}
