//! Configuration validation.
//!
//! Checks parameter catalogs and presets before they reach a `Workbench`,
//! and turns the `[backtest]` / `[strategy]` sections into a `StrategyKind`.

use crate::domain::error::AnalyticsError;
use crate::domain::formula_parser;
use crate::domain::layer::LayerSource;
use crate::domain::parameter::ParameterDefinition;
use crate::domain::preset::Preset;
use crate::domain::strategy::StrategyKind;
use crate::ports::config_port::ConfigPort;
use std::collections::{BTreeMap, HashSet};

pub fn validate_parameter_definitions(defs: &[ParameterDefinition]) -> Result<(), AnalyticsError> {
    let mut seen = HashSet::new();
    for def in defs {
        if !seen.insert(def.key.as_str()) {
            return Err(invalid_parameter_def(def, "key", "duplicate parameter key"));
        }
        validate_parameter_definition(def)?;
    }
    Ok(())
}

fn validate_parameter_definition(def: &ParameterDefinition) -> Result<(), AnalyticsError> {
    for (field, value) in [
        ("min", def.min),
        ("max", def.max),
        ("step", def.step),
        ("default", def.default_value),
    ] {
        if !value.is_finite() {
            return Err(invalid_parameter_def(def, field, "must be a finite number"));
        }
    }
    if def.min > def.max {
        return Err(invalid_parameter_def(def, "min", "min must not exceed max"));
    }
    if def.step <= 0.0 {
        return Err(invalid_parameter_def(def, "step", "step must be positive"));
    }
    if def.default_value < def.min || def.default_value > def.max {
        return Err(invalid_parameter_def(
            def,
            "default",
            "default must lie within min..=max",
        ));
    }
    Ok(())
}

fn invalid_parameter_def(def: &ParameterDefinition, key: &str, reason: &str) -> AnalyticsError {
    AnalyticsError::ConfigInvalid {
        section: format!("parameter.{}", def.key),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Parameter catalog plus unique layer ids and parseable formulas.
pub fn validate_preset(preset: &Preset) -> Result<(), AnalyticsError> {
    validate_parameter_definitions(&preset.parameters)?;

    let mut ids = HashSet::new();
    for layer in &preset.layers {
        let section = format!("layer.{}", layer.id);
        if !ids.insert(layer.id.as_str()) {
            return Err(AnalyticsError::ConfigInvalid {
                section,
                key: "id".to_string(),
                reason: "duplicate layer id".to_string(),
            });
        }
        if layer.source == LayerSource::Formula {
            let expr = layer.formula.as_deref().unwrap_or("");
            if let Some(message) = formula_parser::validate_formula(expr) {
                return Err(AnalyticsError::ConfigInvalid {
                    section,
                    key: "formula".to_string(),
                    reason: message,
                });
            }
        }
    }
    Ok(())
}

/// Build the configured strategy. `name_override` (from the command line)
/// wins over `[backtest] strategy`; `[strategy]` supplies its parameters.
pub fn strategy_from_config(
    config: &dyn ConfigPort,
    name_override: Option<&str>,
) -> Result<StrategyKind, AnalyticsError> {
    let name = match name_override {
        Some(name) => name.to_string(),
        None => config
            .get_string("backtest", "strategy")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AnalyticsError::ConfigMissing {
                section: "backtest".to_string(),
                key: "strategy".to_string(),
            })?,
    };

    let defaults = StrategyKind::default_for(&name)?;
    let known: Vec<&str> = defaults.params().iter().map(|(key, _)| *key).collect();
    let mut params = BTreeMap::new();
    for key in config.keys("strategy") {
        if !known.contains(&key.as_str()) {
            return Err(AnalyticsError::ConfigInvalid {
                section: "strategy".to_string(),
                key,
                reason: format!("not a parameter of {}", defaults.name()),
            });
        }
        if let Some(value) = config.get_f64("strategy", &key)? {
            params.insert(key, value);
        }
    }

    StrategyKind::from_name(&name, &params).map_err(|e| match e {
        AnalyticsError::InvalidParameter { name, reason } => AnalyticsError::ConfigInvalid {
            section: "strategy".to_string(),
            key: name,
            reason,
        },
        other => other,
    })
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), AnalyticsError> {
    strategy_from_config(config, None).map(|_| ())
}
