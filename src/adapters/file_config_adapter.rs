//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive; `configparser` lowercases
//! them on load.

use crate::domain::error::AnalyticsError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }

    fn invalid(section: &str, key: &str, reason: String) -> AnalyticsError {
        AnalyticsError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_f64(&self, section: &str, key: &str) -> Result<Option<f64>, AnalyticsError> {
        match self.config.get(section, key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| Self::invalid(section, key, format!("'{}' is not a number", raw))),
        }
    }

    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, AnalyticsError> {
        match self.config.get(section, key) {
            None => Ok(None),
            Some(raw) => Self::parse_bool(&raw)
                .map(Some)
                .ok_or_else(|| Self::invalid(section, key, format!("'{}' is not a boolean", raw))),
        }
    }

    fn keys(&self, section: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .config
            .get_map_ref()
            .get(&section.to_lowercase())
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn sections(&self) -> Vec<String> {
        let mut sections = self.config.sections();
        sections.sort();
        sections
    }
}
