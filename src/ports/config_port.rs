//! Configuration access port trait.
//!
//! Typed getters return `Ok(None)` for an absent key and
//! `AnalyticsError::ConfigInvalid` for a key whose value does not parse.

use crate::domain::error::AnalyticsError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_f64(&self, section: &str, key: &str) -> Result<Option<f64>, AnalyticsError>;
    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, AnalyticsError>;
    /// Keys present in `section`, sorted. Empty when the section is absent.
    fn keys(&self, section: &str) -> Vec<String>;
    /// All section names, sorted.
    fn sections(&self) -> Vec<String>;

    /// Non-negative whole number, e.g. a period or grid slot.
    fn get_usize(&self, section: &str, key: &str) -> Result<Option<usize>, AnalyticsError> {
        match self.get_f64(section, key)? {
            None => Ok(None),
            Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= usize::MAX as f64 => {
                Ok(Some(v as usize))
            }
            Some(v) => Err(AnalyticsError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("expected a non-negative integer, found {}", v),
            }),
        }
    }
}
