//! Chart layers: one derived series instance each.
//!
//! - `LayerSource`: closed set of producers a layer can be bound to
//! - `ChartType`, `YAxis`: presentation hints passed through to the renderer
//! - `Layer`: a source plus its bound numeric params

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSource {
    Price,
    Volume,
    Sma,
    Ema,
    Rsi,
    Macd,
    Bollinger,
    Stochastic,
    Atr,
    Volatility,
    Drawdown,
    VolumeRatio,
    Formula,
}

impl LayerSource {
    pub const ALL: [LayerSource; 13] = [
        LayerSource::Price,
        LayerSource::Volume,
        LayerSource::Sma,
        LayerSource::Ema,
        LayerSource::Rsi,
        LayerSource::Macd,
        LayerSource::Bollinger,
        LayerSource::Stochastic,
        LayerSource::Atr,
        LayerSource::Volatility,
        LayerSource::Drawdown,
        LayerSource::VolumeRatio,
        LayerSource::Formula,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            LayerSource::Price => "price",
            LayerSource::Volume => "volume",
            LayerSource::Sma => "sma",
            LayerSource::Ema => "ema",
            LayerSource::Rsi => "rsi",
            LayerSource::Macd => "macd",
            LayerSource::Bollinger => "bollinger",
            LayerSource::Stochastic => "stochastic",
            LayerSource::Atr => "atr",
            LayerSource::Volatility => "volatility",
            LayerSource::Drawdown => "drawdown",
            LayerSource::VolumeRatio => "volume_ratio",
            LayerSource::Formula => "formula",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_ascii_lowercase();
        LayerSource::ALL.into_iter().find(|s| s.tag() == tag)
    }

    /// Bound params a fresh layer of this source starts with.
    pub fn default_params(self) -> &'static [(&'static str, f64)] {
        match self {
            LayerSource::Price
            | LayerSource::Volume
            | LayerSource::Drawdown
            | LayerSource::Formula => &[],
            LayerSource::Sma | LayerSource::Ema => &[("window", 20.0)],
            LayerSource::Rsi => &[("period", 14.0)],
            LayerSource::Macd => &[("fast", 12.0), ("slow", 26.0), ("signal", 9.0)],
            LayerSource::Bollinger => &[("period", 20.0), ("mult", 2.0)],
            LayerSource::Stochastic => &[("k_period", 14.0), ("d_period", 3.0), ("smooth", 3.0)],
            LayerSource::Atr => &[("period", 14.0)],
            LayerSource::Volatility | LayerSource::VolumeRatio => &[("window", 20.0)],
        }
    }

    /// Oscillators live in their own pane; overlays share the price pane.
    fn default_grid_index(self) -> usize {
        match self {
            LayerSource::Price
            | LayerSource::Sma
            | LayerSource::Ema
            | LayerSource::Bollinger
            | LayerSource::Formula => 0,
            LayerSource::Volume | LayerSource::VolumeRatio => 1,
            LayerSource::Rsi
            | LayerSource::Macd
            | LayerSource::Stochastic
            | LayerSource::Atr
            | LayerSource::Volatility
            | LayerSource::Drawdown => 2,
        }
    }
}

impl fmt::Display for LayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Line,
    Area,
    Bar,
    Histogram,
}

impl ChartType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "line" => Some(ChartType::Line),
            "area" => Some(ChartType::Area),
            "bar" => Some(ChartType::Bar),
            "histogram" => Some(ChartType::Histogram),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum YAxis {
    Left,
    Right,
}

impl YAxis {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "left" => Some(YAxis::Left),
            "right" => Some(YAxis::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    pub id: String,
    pub label: String,
    pub source: LayerSource,
    pub chart_type: ChartType,
    pub y_axis: YAxis,
    pub color: String,
    pub visible: bool,
    pub grid_index: usize,
    pub params: BTreeMap<String, f64>,
    pub formula: Option<String>,
}

impl Layer {
    pub fn new(id: impl Into<String>, source: LayerSource) -> Self {
        let params = source
            .default_params()
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        let chart_type = match source {
            LayerSource::Volume => ChartType::Bar,
            LayerSource::Drawdown => ChartType::Area,
            _ => ChartType::Line,
        };
        let y_axis = match source {
            LayerSource::Price
            | LayerSource::Sma
            | LayerSource::Ema
            | LayerSource::Bollinger => YAxis::Left,
            _ => YAxis::Right,
        };
        Self {
            id: id.into(),
            label: source.tag().to_ascii_uppercase(),
            source,
            chart_type,
            y_axis,
            color: "#888888".to_string(),
            visible: true,
            grid_index: source.default_grid_index(),
            params,
            formula: None,
        }
    }

    pub fn formula(id: impl Into<String>, expr: impl Into<String>) -> Self {
        let expr = expr.into();
        let mut layer = Layer::new(id, LayerSource::Formula);
        layer.label = expr.clone();
        layer.formula = Some(expr);
        layer
    }

    pub fn with_param(mut self, name: &str, value: f64) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn param(&self, name: &str) -> Option<f64> {
        self.params.get(name).copied()
    }
}
