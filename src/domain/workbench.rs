//! Layer recalculation orchestrator.
//!
//! `recalculate_layers` is the pure core: every layer is recomputed from the
//! raw series on every call, with no incremental diffing. `Workbench` is the
//! explicit state value around it. Each named action handler mutates that
//! state and decides whether to recompute now or through the parameter
//! debounce.
//!
//! Recompute triggers:
//! - immediate: preset load/reset, add/remove layer, formula submission,
//!   data reload, what-if application
//! - debounced: `set_parameter`, fired by `poll`

use crate::domain::binding::{infer_layer_param_key, infer_target_sources};
use crate::domain::debounce::{Clock, Debouncer, SystemClock};
use crate::domain::error::AnalyticsError;
use crate::domain::formula::FormulaCache;
use crate::domain::formula_eval::evaluate_cached;
use crate::domain::indicator::{compute_indicator, IndicatorKind, IndicatorOutput};
use crate::domain::layer::{Layer, LayerSource};
use crate::domain::parameter::ParameterDefinition;
use crate::domain::preset::Preset;
use crate::domain::raw_series::RawSeries;
use std::collections::BTreeMap;

/// Bound values closer than this count as equal when deciding whether a
/// layer still follows the global parameter.
const BINDING_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Default)]
pub struct LayerOutputs {
    pub series: BTreeMap<String, IndicatorOutput>,
    pub errors: BTreeMap<String, String>,
}

impl LayerOutputs {
    pub fn get(&self, layer_id: &str) -> Option<&IndicatorOutput> {
        self.series.get(layer_id)
    }

    pub fn error(&self, layer_id: &str) -> Option<&str> {
        self.errors.get(layer_id).map(String::as_str)
    }
}

/// Recompute every layer against `raw`. Per-layer failures are collected
/// under the layer id and never abort the pass.
pub fn recalculate_layers(
    layers: &[Layer],
    raw: &RawSeries,
    cache: &mut FormulaCache,
) -> LayerOutputs {
    let mut outputs = LayerOutputs::default();
    for layer in layers {
        match compute_layer(layer, raw, cache) {
            Ok(output) => {
                outputs.series.insert(layer.id.clone(), output);
            }
            Err(e) => {
                tracing::warn!(layer = %layer.id, source = %layer.source, error = %e, "layer failed");
                outputs.errors.insert(layer.id.clone(), e.to_string());
            }
        }
    }
    outputs
}

pub fn compute_layer(
    layer: &Layer,
    raw: &RawSeries,
    cache: &mut FormulaCache,
) -> Result<IndicatorOutput, AnalyticsError> {
    let bars = raw.len();
    let kind = match layer.source {
        LayerSource::Price => return Ok(IndicatorOutput::Line(raw.closes().to_vec())),
        LayerSource::Volume => {
            let volume = raw.volumes().ok_or_else(|| AnalyticsError::InvalidSeries {
                reason: "series has no volume column".into(),
            })?;
            return Ok(IndicatorOutput::Line(volume.to_vec()));
        }
        LayerSource::Formula => {
            let expr = layer.formula.as_deref().ok_or_else(|| {
                AnalyticsError::invalid_parameter("formula", "formula layer has no expression")
            })?;
            return Ok(IndicatorOutput::Line(evaluate_cached(cache, expr, raw)?));
        }
        LayerSource::Sma => IndicatorKind::Sma(period_param(layer, bars, "window")?),
        LayerSource::Ema => IndicatorKind::Ema(period_param(layer, bars, "window")?),
        LayerSource::Rsi => IndicatorKind::Rsi(period_param(layer, bars, "period")?),
        LayerSource::Macd => IndicatorKind::Macd {
            fast: period_param(layer, bars, "fast")?,
            slow: period_param(layer, bars, "slow")?,
            signal: period_param(layer, bars, "signal")?,
        },
        LayerSource::Bollinger => IndicatorKind::Bollinger {
            period: period_param(layer, bars, "period")?,
            stddev_mult_x100: mult_param(layer, "mult")?,
        },
        LayerSource::Stochastic => IndicatorKind::Stochastic {
            k_period: period_param(layer, bars, "k_period")?,
            d_period: period_param(layer, bars, "d_period")?,
            smooth: period_param(layer, bars, "smooth")?,
        },
        LayerSource::Atr => IndicatorKind::Atr(period_param(layer, bars, "period")?),
        LayerSource::Volatility => IndicatorKind::Volatility(period_param(layer, bars, "window")?),
        LayerSource::Drawdown => IndicatorKind::Drawdown,
        LayerSource::VolumeRatio => IndicatorKind::VolumeRatio(period_param(layer, bars, "window")?),
    };
    compute_indicator(kind, raw)
}

fn raw_param(layer: &Layer, name: &str) -> Result<f64, AnalyticsError> {
    layer
        .param(name)
        .or_else(|| {
            layer
                .source
                .default_params()
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| *v)
        })
        .ok_or_else(|| AnalyticsError::invalid_parameter(name, format!("missing on layer {}", layer.id)))
}

/// Periods beyond `bars + 1` are capped there: any window longer than the
/// series has no defined value, so the output is unchanged.
fn period_param(layer: &Layer, bars: usize, name: &str) -> Result<usize, AnalyticsError> {
    let value = raw_param(layer, name)?;
    if !value.is_finite() || value < 1.0 {
        return Err(AnalyticsError::invalid_parameter(
            name,
            format!("must be at least 1, got {}", value),
        ));
    }
    Ok((value.round() as usize).min(bars.saturating_add(1)))
}

fn mult_param(layer: &Layer, name: &str) -> Result<u32, AnalyticsError> {
    let value = raw_param(layer, name)?;
    if !value.is_finite() || value < 0.0 {
        return Err(AnalyticsError::invalid_parameter(
            name,
            format!("must be non-negative, got {}", value),
        ));
    }
    Ok((value * 100.0).round() as u32)
}

fn unknown_parameter(key: &str) -> AnalyticsError {
    AnalyticsError::invalid_parameter(key, "not in the parameter catalog")
}

/// Explicit orchestrator state with named action handlers.
pub struct Workbench<C: Clock = SystemClock> {
    clock: C,
    raw: Option<RawSeries>,
    preset: Option<Preset>,
    layers: Vec<Layer>,
    catalog: Vec<ParameterDefinition>,
    values: BTreeMap<String, f64>,
    cache: FormulaCache,
    outputs: LayerOutputs,
    debouncer: Debouncer,
    revision: u64,
    next_formula_id: usize,
}

impl Workbench<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for Workbench<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Workbench<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            raw: None,
            preset: None,
            layers: Vec::new(),
            catalog: Vec::new(),
            values: BTreeMap::new(),
            cache: FormulaCache::new(),
            outputs: LayerOutputs::default(),
            debouncer: Debouncer::default(),
            revision: 0,
            next_formula_id: 1,
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn outputs(&self) -> &LayerOutputs {
        &self.outputs
    }

    pub fn raw(&self) -> Option<&RawSeries> {
        self.raw.as_ref()
    }

    pub fn catalog(&self) -> &[ParameterDefinition] {
        &self.catalog
    }

    pub fn parameter_value(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn preset_name(&self) -> Option<&str> {
        self.preset.as_ref().map(|p| p.name.as_str())
    }

    /// Number of completed recompute passes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_recompute_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Replace layers and catalog with the preset's; parameters reset to defaults.
    pub fn load_preset(&mut self, preset: Preset) {
        tracing::debug!(preset = %preset.name, layers = preset.layers.len(), "loading preset");
        self.layers = preset.layers.clone();
        self.catalog = preset.parameters.clone();
        self.values = self
            .catalog
            .iter()
            .map(|def| (def.key.clone(), def.default_value))
            .collect();
        self.preset = Some(preset);
        self.debouncer.cancel();
        self.recalculate();
    }

    /// Reload the current preset, discarding layer edits. `false` if none is loaded.
    pub fn reset_preset(&mut self) -> bool {
        match self.preset.clone() {
            Some(preset) => {
                self.load_preset(preset);
                true
            }
            None => false,
        }
    }

    pub fn add_layer(&mut self, layer: Layer) -> Result<(), AnalyticsError> {
        if self.layer(&layer.id).is_some() {
            return Err(AnalyticsError::invalid_parameter(
                "id",
                format!("layer '{}' already exists", layer.id),
            ));
        }
        self.layers.push(layer);
        self.recalculate();
        Ok(())
    }

    pub fn remove_layer(&mut self, id: &str) -> Option<Layer> {
        let index = self.layers.iter().position(|l| l.id == id)?;
        let removed = self.layers.remove(index);
        self.recalculate();
        Some(removed)
    }

    /// Validate `expr` and add it as a formula layer. Returns the new layer id.
    pub fn submit_formula(&mut self, expr: &str) -> Result<String, AnalyticsError> {
        self.cache.get_or_compile(expr)?;
        let id = loop {
            let candidate = format!("formula-{}", self.next_formula_id);
            self.next_formula_id += 1;
            if self.layer(&candidate).is_none() {
                break candidate;
            }
        };
        self.add_layer(Layer::formula(id.clone(), expr))?;
        Ok(id)
    }

    /// Swap in a freshly loaded series (coin, range or currency change).
    pub fn reload_data(&mut self, raw: RawSeries) {
        tracing::debug!(bars = raw.len(), "reloading raw series");
        self.raw = Some(raw);
        self.recalculate();
    }

    /// Change one global parameter and schedule a debounced recompute.
    /// Returns the value actually applied after clamping.
    pub fn set_parameter(&mut self, key: &str, value: f64) -> Result<f64, AnalyticsError> {
        let applied = self.apply_parameter(key, value)?;
        self.debouncer.schedule(self.clock.now());
        Ok(applied)
    }

    /// Apply several parameter values at once and recompute immediately.
    /// The batch is rejected whole, before any value changes, if a key is
    /// not in the parameter catalog.
    pub fn apply_what_if(&mut self, values: &BTreeMap<String, f64>) -> Result<(), AnalyticsError> {
        if let Some(key) = values.keys().find(|k| self.definition(k).is_none()) {
            return Err(unknown_parameter(key));
        }
        for (key, value) in values {
            self.apply_parameter(key, *value)?;
        }
        self.debouncer.cancel();
        self.recalculate();
        Ok(())
    }

    /// Run the debounced recompute if its quiet period has elapsed.
    pub fn poll(&mut self) -> bool {
        if self.debouncer.poll(self.clock.now()) {
            self.recalculate();
            true
        } else {
            false
        }
    }

    /// Run a pending debounced recompute right away.
    pub fn flush(&mut self) -> bool {
        if self.debouncer.is_pending() {
            self.debouncer.cancel();
            self.recalculate();
            true
        } else {
            false
        }
    }

    fn definition(&self, key: &str) -> Option<&ParameterDefinition> {
        self.catalog.iter().find(|d| d.key == key)
    }

    fn apply_parameter(&mut self, key: &str, value: f64) -> Result<f64, AnalyticsError> {
        let definition = self
            .definition(key)
            .cloned()
            .ok_or_else(|| unknown_parameter(key))?;

        let applied = definition.clamp(value);
        let previous = self
            .values
            .insert(key.to_string(), applied)
            .unwrap_or(definition.default_value);

        let targets = infer_target_sources(&definition);
        let layer_key = infer_layer_param_key(key).unwrap_or(key);

        let mut bound = 0;
        for layer in self.layers.iter_mut().filter(|l| targets.contains(&l.source)) {
            let current = layer.param(layer_key).or_else(|| {
                layer
                    .source
                    .default_params()
                    .iter()
                    .find(|(k, _)| *k == layer_key)
                    .map(|(_, v)| *v)
            });
            // layers retuned away from the global value keep their own setting
            if current.is_some_and(|c| (c - previous).abs() < BINDING_EPSILON) {
                layer.params.insert(layer_key.to_string(), applied);
                bound += 1;
            }
        }

        tracing::debug!(key, previous, applied, layers = bound, "parameter changed");
        Ok(applied)
    }

    fn recalculate(&mut self) {
        self.outputs = match &self.raw {
            Some(raw) => recalculate_layers(&self.layers, raw, &mut self.cache),
            None => LayerOutputs::default(),
        };
        self.revision += 1;
        tracing::debug!(
            revision = self.revision,
            layers = self.layers.len(),
            failed = self.outputs.errors.len(),
            "recalculated layers"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::debounce::tests::FakeClock;
    use crate::domain::indicator::{compute_rsi, compute_sma};
    use std::time::Duration;

    fn closes(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + (i as f64 * 0.3).sin() * 10.0 + i as f64 * 0.1).collect()
    }

    fn raw(n: usize) -> RawSeries {
        RawSeries::from_closes(closes(n)).unwrap()
    }

    fn same_bits(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
    }

    fn bench(clock: &FakeClock) -> Workbench<FakeClock> {
        let mut wb = Workbench::with_clock(clock.clone());
        wb.reload_data(raw(120));
        wb.load_preset(Preset::builtin("overview").unwrap());
        wb
    }

    #[test]
    fn recalculate_dispatches_by_source() {
        let layers = vec![
            Layer::new("p", LayerSource::Price),
            Layer::new("s", LayerSource::Sma).with_param("window", 5.0),
            Layer::formula("f", "price / sma(5)"),
        ];
        let raw = raw(30);
        let out = recalculate_layers(&layers, &raw, &mut FormulaCache::new());

        assert!(out.errors.is_empty());
        assert_eq!(out.get("p").unwrap().primary(), raw.closes());
        let sma = compute_sma(raw.closes(), 5).unwrap();
        assert!(same_bits(out.get("s").unwrap().primary(), &sma));
        let ratio = out.get("f").unwrap().primary();
        assert!((ratio[10] - raw.closes()[10] / sma[10]).abs() < 1e-9);
    }

    #[test]
    fn layer_failures_are_isolated() {
        let layers = vec![
            Layer::new("vol", LayerSource::Volume),
            Layer::new("bad", LayerSource::Rsi).with_param("period", 0.0),
            Layer::formula("oops", "price +"),
            Layer::new("ok", LayerSource::Rsi),
        ];
        let out = recalculate_layers(&layers, &raw(40), &mut FormulaCache::new());
        assert!(out.error("vol").unwrap().contains("no volume"));
        assert!(out.error("bad").unwrap().contains("period"));
        assert!(out.error("oops").unwrap().contains("parse error"));
        assert!(out.get("ok").is_some());
    }

    #[test]
    fn recalculate_is_idempotent() {
        let preset = Preset::builtin("momentum").unwrap();
        let raw = raw(80);
        let mut cache = FormulaCache::new();
        let first = recalculate_layers(&preset.layers, &raw, &mut cache);
        let second = recalculate_layers(&preset.layers, &raw, &mut cache);
        assert_eq!(first.series.len(), second.series.len());
        // NaN warmups defeat PartialEq, Debug text compares them as equal
        for (id, output) in &first.series {
            assert_eq!(format!("{output:?}"), format!("{:?}", second.series[id]), "{id}");
        }
    }

    #[test]
    fn missing_params_fall_back_to_defaults() {
        let mut layer = Layer::new("rsi", LayerSource::Rsi);
        layer.params.clear();
        let raw = raw(40);
        let out = compute_layer(&layer, &raw, &mut FormulaCache::new()).unwrap();
        assert!(same_bits(out.primary(), &compute_rsi(raw.closes(), 14).unwrap()));
    }

    #[test]
    fn bollinger_mult_param_is_used() {
        let layer = Layer::new("bb", LayerSource::Bollinger).with_param("mult", 1.5);
        let out = compute_layer(&layer, &raw(40), &mut FormulaCache::new()).unwrap();
        let IndicatorOutput::Bollinger(bands) = out else {
            panic!("expected bollinger output");
        };
        let width = bands.upper[30] - bands.middle[30];
        let lower = bands.middle[30] - bands.lower[30];
        assert!((width - lower).abs() < 1e-9);
    }

    #[test]
    fn no_data_means_no_outputs() {
        let mut wb = Workbench::with_clock(FakeClock::new());
        wb.load_preset(Preset::builtin("overview").unwrap());
        assert!(wb.outputs().series.is_empty());
        assert_eq!(wb.revision(), 1);
    }

    #[test]
    fn preset_load_sets_defaults_and_computes() {
        let clock = FakeClock::new();
        let wb = bench(&clock);
        assert_eq!(wb.preset_name(), Some("overview"));
        assert_eq!(wb.parameter_value("ma_window"), Some(20.0));
        assert_eq!(wb.outputs().series.len(), wb.layers().len());
        assert_eq!(wb.revision(), 2);
    }

    #[test]
    fn parameter_change_is_debounced() {
        let clock = FakeClock::new();
        let mut wb = bench(&clock);
        let before = wb.revision();

        wb.set_parameter("ma_window", 21.0).unwrap();
        wb.set_parameter("ma_window", 22.0).unwrap();
        wb.set_parameter("ma_window", 23.0).unwrap();
        assert!(wb.is_recompute_pending());
        assert!(!wb.poll());
        assert_eq!(wb.revision(), before);

        clock.advance(Duration::from_millis(150));
        assert!(wb.poll());
        assert_eq!(wb.revision(), before + 1);
        assert!(!wb.poll());

        let sma = compute_sma(wb.raw().unwrap().closes(), 23).unwrap();
        assert!(same_bits(wb.outputs().get("sma-fast").unwrap().primary(), &sma));
    }

    #[test]
    fn parameter_change_follows_only_matching_layers() {
        let clock = FakeClock::new();
        let mut wb = bench(&clock);

        wb.set_parameter("ma_window", 30.0).unwrap();

        // sma-fast and ema were bound at 20 and follow; sma-slow sits at 50 and keeps it
        assert_eq!(wb.layer("sma-fast").unwrap().param("window"), Some(30.0));
        assert_eq!(wb.layer("ema").unwrap().param("window"), Some(30.0));
        assert_eq!(wb.layer("sma-slow").unwrap().param("window"), Some(50.0));
    }

    #[test]
    fn retuned_duplicate_is_not_clobbered() {
        let clock = FakeClock::new();
        let mut wb = bench(&clock);
        wb.add_layer(
            Layer::new("sma-custom", LayerSource::Sma).with_param("window", 20.0),
        )
        .unwrap();
        wb.set_parameter("ma_window", 25.0).unwrap();
        assert_eq!(wb.layer("sma-custom").unwrap().param("window"), Some(25.0));

        // user retunes the duplicate independently
        let mut custom = wb.remove_layer("sma-custom").unwrap();
        custom.params.insert("window".into(), 9.0);
        wb.add_layer(custom).unwrap();

        wb.set_parameter("ma_window", 40.0).unwrap();
        assert_eq!(wb.layer("sma-fast").unwrap().param("window"), Some(40.0));
        assert_eq!(wb.layer("sma-custom").unwrap().param("window"), Some(9.0));
    }

    #[test]
    fn parameter_values_are_clamped() {
        let clock = FakeClock::new();
        let mut wb = bench(&clock);
        assert_eq!(wb.set_parameter("ma_window", 1000.0).unwrap(), 200.0);
        assert_eq!(wb.parameter_value("ma_window"), Some(200.0));
    }

    #[test]
    fn unknown_parameter_fails() {
        let clock = FakeClock::new();
        let mut wb = bench(&clock);
        assert!(matches!(
            wb.set_parameter("nope", 1.0),
            Err(AnalyticsError::InvalidParameter { .. })
        ));
        assert!(!wb.is_recompute_pending());
    }

    #[test]
    fn what_if_recomputes_immediately() {
        let clock = FakeClock::new();
        let mut wb = Workbench::with_clock(clock.clone());
        wb.reload_data(raw(100));
        wb.load_preset(Preset::builtin("momentum").unwrap());
        wb.set_parameter("rsi_period", 10.0).unwrap();
        let before = wb.revision();

        let values = BTreeMap::from([
            ("rsi_period".to_string(), 7.0),
            ("macd_fast".to_string(), 8.0),
        ]);
        wb.apply_what_if(&values).unwrap();

        assert_eq!(wb.revision(), before + 1);
        assert!(!wb.is_recompute_pending());
        assert_eq!(wb.layer("rsi").unwrap().param("period"), Some(7.0));
        assert_eq!(wb.layer("macd").unwrap().param("fast"), Some(8.0));
    }

    #[test]
    fn flush_runs_pending_recompute() {
        let clock = FakeClock::new();
        let mut wb = bench(&clock);
        assert!(!wb.flush());
        wb.set_parameter("ma_window", 10.0).unwrap();
        let before = wb.revision();
        assert!(wb.flush());
        assert_eq!(wb.revision(), before + 1);
        assert!(!wb.is_recompute_pending());
    }

    #[test]
    fn submit_formula_adds_layer() {
        let clock = FakeClock::new();
        let mut wb = bench(&clock);
        let id = wb.submit_formula("price / sma(20)").unwrap();
        assert_eq!(id, "formula-1");
        assert_eq!(wb.layer(&id).unwrap().source, LayerSource::Formula);
        assert_eq!(wb.outputs().get(&id).unwrap().len(), 120);

        let second = wb.submit_formula("rsi(14) - 50").unwrap();
        assert_eq!(second, "formula-2");
    }

    #[test]
    fn submit_invalid_formula_is_rejected() {
        let clock = FakeClock::new();
        let mut wb = bench(&clock);
        let layers = wb.layers().len();
        assert!(matches!(
            wb.submit_formula("price * (2"),
            Err(AnalyticsError::FormulaParse(_))
        ));
        assert_eq!(wb.layers().len(), layers);
    }

    #[test]
    fn formula_output_follows_data_reload() {
        let clock = FakeClock::new();
        let mut wb = bench(&clock);
        let id = wb.submit_formula("price * 2").unwrap();
        wb.reload_data(RawSeries::from_closes(vec![1.0, 2.0, 3.0]).unwrap());
        assert_eq!(wb.outputs().get(&id).unwrap().primary(), &[2.0, 4.0, 6.0]);
    }

    #[test]
    fn add_duplicate_layer_fails() {
        let clock = FakeClock::new();
        let mut wb = bench(&clock);
        assert!(wb.add_layer(Layer::new("price", LayerSource::Price)).is_err());
    }

    #[test]
    fn remove_layer_drops_output() {
        let clock = FakeClock::new();
        let mut wb = bench(&clock);
        assert!(wb.remove_layer("ema").is_some());
        assert!(wb.outputs().get("ema").is_none());
        assert!(wb.remove_layer("ema").is_none());
    }

    #[test]
    fn reset_preset_restores_layers_and_values() {
        let clock = FakeClock::new();
        let mut wb = bench(&clock);
        wb.set_parameter("ma_window", 33.0).unwrap();
        wb.submit_formula("price").unwrap();
        assert!(wb.reset_preset());
        assert_eq!(wb.parameter_value("ma_window"), Some(20.0));
        assert_eq!(wb.layer("sma-fast").unwrap().param("window"), Some(20.0));
        assert!(wb.layer("formula-1").is_none());
        assert!(!wb.is_recompute_pending());
    }

    #[test]
    fn what_if_with_unknown_key_changes_nothing() {
        let clock = FakeClock::new();
        let mut wb = bench(&clock);
        let revision = wb.revision();
        let before = format!("{:?}", wb.outputs());

        let batch = BTreeMap::from([
            ("ma_window".to_string(), 30.0),
            ("zzz_unknown".to_string(), 1.0),
        ]);
        assert!(matches!(
            wb.apply_what_if(&batch),
            Err(AnalyticsError::InvalidParameter { ref name, .. }) if name == "zzz_unknown"
        ));

        assert_eq!(wb.parameter_value("ma_window"), Some(20.0));
        assert_eq!(wb.layer("sma-fast").unwrap().param("window"), Some(20.0));
        assert_eq!(wb.revision(), revision);
        assert!(!wb.is_recompute_pending());
        assert_eq!(format!("{:?}", wb.outputs()), before);
    }

    #[test]
    fn oversized_macd_signal_is_undefined_not_fatal() {
        let layers = vec![Layer::new("m", LayerSource::Macd).with_param("signal", 1e30)];
        let outputs = recalculate_layers(&layers, &raw(60), &mut FormulaCache::new());
        assert!(outputs.errors.is_empty(), "{:?}", outputs.errors);
        match outputs.get("m").unwrap() {
            IndicatorOutput::Macd(m) => {
                assert!(!m.macd[59].is_nan());
                assert!(m.signal.iter().all(|v| v.is_nan()));
            }
            other => panic!("expected MACD output, got {other:?}"),
        }
    }

    #[test]
    fn oversized_window_matches_short_history() {
        let layers = vec![Layer::new("s", LayerSource::Sma).with_param("window", 1e30)];
        let outputs = recalculate_layers(&layers, &raw(10), &mut FormulaCache::new());
        let values = outputs.get("s").unwrap().primary();
        assert_eq!(values.len(), 10);
        assert!(values.iter().all(|v| v.is_nan()));
    }
}
