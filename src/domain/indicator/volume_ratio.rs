//! Volume ratio: volume relative to its own n-bar SMA.
//!
//! VR(n)[i] = V[i] / SMA(V, n)[i]; NaN during warmup or when the average is 0.

use crate::domain::error::AnalyticsError;
use crate::domain::indicator::compute_sma;

pub fn compute_volume_ratio(volume: &[f64], window: usize) -> Result<Vec<f64>, AnalyticsError> {
    let average = compute_sma(volume, window)?;
    Ok(volume
        .iter()
        .zip(&average)
        .map(|(v, avg)| if *avg == 0.0 { f64::NAN } else { v / avg })
        .collect())
}
