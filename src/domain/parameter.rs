//! Tunable parameter catalog entries.

use crate::domain::layer::LayerSource;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDefinition {
    pub key: String,
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default_value: f64,
    pub unit: String,
    pub target_source: Option<LayerSource>,
}

impl ParameterDefinition {
    pub fn new(key: impl Into<String>, min: f64, max: f64, step: f64, default_value: f64) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            min,
            max,
            step,
            default_value,
            unit: String::new(),
            target_source: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_target(mut self, source: LayerSource) -> Self {
        self.target_source = Some(source);
        self
    }

    /// Snap `value` to the step grid anchored at `min`, then clamp into `[min, max]`.
    /// Non-finite input falls back to the default.
    pub fn clamp(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return self.default_value;
        }
        let snapped = if self.step > 0.0 {
            self.min + ((value - self.min) / self.step).round() * self.step
        } else {
            value
        };
        snapped.clamp(self.min, self.max)
    }
}
