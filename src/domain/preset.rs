//! Presets: named bundles of layers and the parameter knobs exposed for them.
//!
//! Three presets are built in. Others are read from INI through `ConfigPort`:
//!
//! ```ini
//! [preset]
//! name = Swing
//!
//! [parameter.rsi_period]
//! label = RSI period
//! min = 2
//! max = 50
//! step = 1
//! default = 14
//! unit = bars
//! target = rsi
//!
//! [layer.rsi-main]
//! source = rsi
//! params = period=14
//! ```
//!
//! Layers are ordered by id since INI sections carry no order.

use crate::domain::error::AnalyticsError;
use crate::domain::layer::{ChartType, Layer, LayerSource, YAxis};
use crate::domain::parameter::ParameterDefinition;
use crate::ports::config_port::ConfigPort;

pub const BUILTIN_PRESETS: [&str; 3] = ["overview", "momentum", "volatility"];

const PARAMETER_PREFIX: &str = "parameter.";
const LAYER_PREFIX: &str = "layer.";

#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub name: String,
    pub layers: Vec<Layer>,
    pub parameters: Vec<ParameterDefinition>,
}

impl Preset {
    pub fn builtin(name: &str) -> Result<Self, AnalyticsError> {
        let preset = match name.trim().to_ascii_lowercase().as_str() {
            "overview" => Preset {
                name: "overview".into(),
                layers: vec![
                    Layer::new("price", LayerSource::Price).with_label("Price"),
                    Layer::new("sma-fast", LayerSource::Sma)
                        .with_param("window", 20.0)
                        .with_label("SMA 20")
                        .with_color("#f5a623"),
                    Layer::new("sma-slow", LayerSource::Sma)
                        .with_param("window", 50.0)
                        .with_label("SMA 50")
                        .with_color("#4a90e2"),
                    Layer::new("ema", LayerSource::Ema)
                        .with_param("window", 20.0)
                        .with_label("EMA 20")
                        .with_color("#7ed321"),
                    Layer::new("drawdown", LayerSource::Drawdown).with_label("Drawdown"),
                ],
                parameters: vec![
                    ParameterDefinition::new("ma_window", 2.0, 200.0, 1.0, 20.0)
                        .with_label("Moving average window")
                        .with_unit("bars"),
                ],
            },
            "momentum" => Preset {
                name: "momentum".into(),
                layers: vec![
                    Layer::new("price", LayerSource::Price).with_label("Price"),
                    Layer::new("rsi", LayerSource::Rsi).with_label("RSI 14"),
                    Layer::new("macd", LayerSource::Macd).with_label("MACD"),
                    Layer::new("stochastic", LayerSource::Stochastic).with_label("Stochastic"),
                ],
                parameters: vec![
                    ParameterDefinition::new("rsi_period", 2.0, 50.0, 1.0, 14.0)
                        .with_label("RSI period")
                        .with_unit("bars"),
                    ParameterDefinition::new("macd_fast", 2.0, 50.0, 1.0, 12.0)
                        .with_label("MACD fast"),
                    ParameterDefinition::new("macd_slow", 5.0, 100.0, 1.0, 26.0)
                        .with_label("MACD slow"),
                    ParameterDefinition::new("macd_signal", 2.0, 50.0, 1.0, 9.0)
                        .with_label("MACD signal"),
                    ParameterDefinition::new("stoch_k", 3.0, 50.0, 1.0, 14.0)
                        .with_label("Stochastic %K"),
                ],
            },
            "volatility" => Preset {
                name: "volatility".into(),
                layers: vec![
                    Layer::new("price", LayerSource::Price).with_label("Price"),
                    Layer::new("bollinger", LayerSource::Bollinger).with_label("Bollinger 20/2"),
                    Layer::new("atr", LayerSource::Atr).with_label("ATR 14"),
                    Layer::new("volatility", LayerSource::Volatility).with_label("Volatility 20"),
                    Layer::new("drawdown", LayerSource::Drawdown).with_label("Drawdown"),
                ],
                parameters: vec![
                    ParameterDefinition::new("bb_period", 5.0, 100.0, 1.0, 20.0)
                        .with_label("Bollinger period"),
                    ParameterDefinition::new("bb_mult", 0.5, 4.0, 0.1, 2.0)
                        .with_label("Bollinger width")
                        .with_unit("σ"),
                    ParameterDefinition::new("atr_period", 2.0, 50.0, 1.0, 14.0)
                        .with_label("ATR period"),
                    ParameterDefinition::new("vol_window", 5.0, 100.0, 1.0, 20.0)
                        .with_label("Volatility window"),
                ],
            },
            _ => {
                return Err(AnalyticsError::UnknownPreset {
                    name: name.to_string(),
                })
            }
        };
        Ok(preset)
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AnalyticsError> {
        let name = config
            .get_string("preset", "name")
            .unwrap_or_else(|| "custom".to_string());

        let mut parameters = Vec::new();
        let mut layers = Vec::new();
        for section in config.sections() {
            if let Some(key) = section.strip_prefix(PARAMETER_PREFIX) {
                parameters.push(parameter_from_config(config, &section, key)?);
            } else if let Some(id) = section.strip_prefix(LAYER_PREFIX) {
                layers.push(layer_from_config(config, &section, id)?);
            }
        }
        layers.sort_by(|a, b| a.id.cmp(&b.id));
        parameters.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(Preset {
            name,
            layers,
            parameters,
        })
    }
}

fn parameter_from_config(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<ParameterDefinition, AnalyticsError> {
    let required = |field: &str| -> Result<f64, AnalyticsError> {
        config
            .get_f64(section, field)?
            .ok_or_else(|| AnalyticsError::ConfigMissing {
                section: section.to_string(),
                key: field.to_string(),
            })
    };

    let mut def = ParameterDefinition::new(
        key,
        required("min")?,
        required("max")?,
        config.get_f64(section, "step")?.unwrap_or(1.0),
        required("default")?,
    );
    if let Some(label) = config.get_string(section, "label") {
        def = def.with_label(label);
    }
    if let Some(unit) = config.get_string(section, "unit") {
        def = def.with_unit(unit);
    }
    if let Some(target) = config.get_string(section, "target") {
        let source = LayerSource::from_tag(&target).ok_or_else(|| AnalyticsError::ConfigInvalid {
            section: section.to_string(),
            key: "target".to_string(),
            reason: format!("unknown layer source '{}'", target),
        })?;
        def = def.with_target(source);
    }
    Ok(def)
}

fn layer_from_config(
    config: &dyn ConfigPort,
    section: &str,
    id: &str,
) -> Result<Layer, AnalyticsError> {
    let invalid = |key: &str, reason: String| AnalyticsError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    };

    let source_tag = config
        .get_string(section, "source")
        .ok_or_else(|| AnalyticsError::ConfigMissing {
            section: section.to_string(),
            key: "source".to_string(),
        })?;
    let source = LayerSource::from_tag(&source_tag)
        .ok_or_else(|| invalid("source", format!("unknown layer source '{}'", source_tag)))?;

    let mut layer = match source {
        LayerSource::Formula => {
            let expr = config
                .get_string(section, "formula")
                .ok_or_else(|| AnalyticsError::ConfigMissing {
                    section: section.to_string(),
                    key: "formula".to_string(),
                })?;
            Layer::formula(id, expr)
        }
        _ => Layer::new(id, source),
    };

    if let Some(label) = config.get_string(section, "label") {
        layer.label = label;
    }
    if let Some(tag) = config.get_string(section, "chart_type") {
        layer.chart_type = ChartType::from_tag(&tag)
            .ok_or_else(|| invalid("chart_type", format!("unknown chart type '{}'", tag)))?;
    }
    if let Some(tag) = config.get_string(section, "y_axis") {
        layer.y_axis =
            YAxis::from_tag(&tag).ok_or_else(|| invalid("y_axis", format!("unknown axis '{}'", tag)))?;
    }
    if let Some(color) = config.get_string(section, "color") {
        layer.color = color;
    }
    if let Some(visible) = config.get_bool(section, "visible")? {
        layer.visible = visible;
    }
    if let Some(grid_index) = config.get_usize(section, "grid_index")? {
        layer.grid_index = grid_index;
    }

    if let Some(params) = config.get_string(section, "params") {
        for (name, value) in parse_params(&params).map_err(|reason| invalid("params", reason))? {
            layer.params.insert(name, value);
        }
    }
    Ok(layer)
}

/// Parse `name=value, name=value`. Semicolons also separate pairs when the
/// params do not come from INI, where `;` starts a comment.
pub fn parse_params(input: &str) -> Result<Vec<(String, f64)>, String> {
    input
        .split([';', ','])
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected name=value, found '{}'", pair))?;
            let value = value
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", value.trim()))?;
            Ok((name.trim().to_ascii_lowercase(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    #[test]
    fn builtin_presets_resolve() {
        for name in BUILTIN_PRESETS {
            let preset = Preset::builtin(name).unwrap();
            assert_eq!(preset.name, name);
            assert!(!preset.layers.is_empty());
            assert!(!preset.parameters.is_empty());
        }
    }

    #[test]
    fn unknown_builtin_fails() {
        assert!(matches!(
            Preset::builtin("nope"),
            Err(AnalyticsError::UnknownPreset { .. })
        ));
    }

    #[test]
    fn parse_params_pairs() {
        let parsed = parse_params("period=20, mult = 2.5;").unwrap();
        assert_eq!(
            parsed,
            vec![("period".to_string(), 20.0), ("mult".to_string(), 2.5)]
        );
        assert!(parse_params("period").is_err());
        assert!(parse_params("period=abc").is_err());
    }

    #[test]
    fn preset_from_ini() {
        let ini = r#"
[preset]
name = Swing

[parameter.rsi_period]
label = RSI period
min = 2
max = 50
step = 1
default = 10
target = rsi

[layer.b-rsi]
source = rsi
params = period=10
grid_index = 3

[layer.a-ratio]
source = formula
formula = price / sma(50)
color = orange
visible = false
"#;
        let config = FileConfigAdapter::from_string(ini).unwrap();
        let preset = Preset::from_config(&config).unwrap();

        assert_eq!(preset.name, "Swing");
        assert_eq!(preset.parameters.len(), 1);
        let def = &preset.parameters[0];
        assert_eq!(def.key, "rsi_period");
        assert_eq!(def.default_value, 10.0);
        assert_eq!(def.target_source, Some(LayerSource::Rsi));

        assert_eq!(preset.layers.len(), 2);
        assert_eq!(preset.layers[0].id, "a-ratio");
        assert_eq!(preset.layers[0].formula.as_deref(), Some("price / sma(50)"));
        assert!(!preset.layers[0].visible);
        assert_eq!(preset.layers[1].param("period"), Some(10.0));
        assert_eq!(preset.layers[1].grid_index, 3);
    }

    #[test]
    fn preset_missing_parameter_bound_fails() {
        let ini = "[parameter.rsi_period]\nmin = 2\nmax = 50\n";
        let config = FileConfigAdapter::from_string(ini).unwrap();
        assert!(matches!(
            Preset::from_config(&config),
            Err(AnalyticsError::ConfigMissing { ref key, .. }) if key == "default"
        ));
    }

    #[test]
    fn preset_malformed_bound_fails() {
        let ini = "[parameter.rsi_period]\nmin = two\nmax = 50\ndefault = 14\n";
        let config = FileConfigAdapter::from_string(ini).unwrap();
        assert!(matches!(
            Preset::from_config(&config),
            Err(AnalyticsError::ConfigInvalid { ref key, .. }) if key == "min"
        ));
    }

    #[test]
    fn preset_bad_grid_index_fails() {
        let ini = "[layer.x]\nsource = rsi\ngrid_index = -2\n";
        let config = FileConfigAdapter::from_string(ini).unwrap();
        assert!(matches!(
            Preset::from_config(&config),
            Err(AnalyticsError::ConfigInvalid { ref key, .. }) if key == "grid_index"
        ));
    }

    #[test]
    fn preset_unknown_source_fails() {
        let ini = "[layer.x]\nsource = obv\n";
        let config = FileConfigAdapter::from_string(ini).unwrap();
        assert!(matches!(
            Preset::from_config(&config),
            Err(AnalyticsError::ConfigInvalid { .. })
        ));
    }
}
