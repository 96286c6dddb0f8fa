//! Parameter binding: which layers a catalog parameter drives, and under
//! which argument name.
//!
//! Catalog keys look like `<family>_<argument>` (`rsi_period`, `ma_window`,
//! `macd_fast`, `bb_mult`). The family prefix selects a row of
//! `FAMILY_TABLE`; the suffix is resolved against that row's argument
//! aliases. A bare family key (`rsi`) binds the family's primary argument.

use crate::domain::layer::LayerSource;
use crate::domain::parameter::ParameterDefinition;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorFamily {
    Rsi,
    MovingAverage,
    SimpleMovingAverage,
    ExponentialMovingAverage,
    Macd,
    Bollinger,
    Stochastic,
    Atr,
    Volatility,
    VolumeRatio,
}

struct FamilyEntry {
    family: IndicatorFamily,
    prefixes: &'static [&'static str],
    sources: &'static [LayerSource],
    /// (suffix aliases, layer argument); the first row is the primary argument.
    args: &'static [(&'static [&'static str], &'static str)],
}

const WINDOW_ALIASES: &[&str] = &["", "window", "period", "length", "n"];

const FAMILY_TABLE: &[FamilyEntry] = &[
    FamilyEntry {
        family: IndicatorFamily::Rsi,
        prefixes: &["rsi"],
        sources: &[LayerSource::Rsi],
        args: &[(WINDOW_ALIASES, "period")],
    },
    FamilyEntry {
        family: IndicatorFamily::MovingAverage,
        prefixes: &["ma", "moving_average"],
        sources: &[LayerSource::Sma, LayerSource::Ema],
        args: &[(WINDOW_ALIASES, "window")],
    },
    FamilyEntry {
        family: IndicatorFamily::SimpleMovingAverage,
        prefixes: &["sma"],
        sources: &[LayerSource::Sma],
        args: &[(WINDOW_ALIASES, "window")],
    },
    FamilyEntry {
        family: IndicatorFamily::ExponentialMovingAverage,
        prefixes: &["ema"],
        sources: &[LayerSource::Ema],
        args: &[(WINDOW_ALIASES, "window")],
    },
    FamilyEntry {
        family: IndicatorFamily::Macd,
        prefixes: &["macd"],
        sources: &[LayerSource::Macd],
        args: &[
            (&["", "fast", "fast_period"], "fast"),
            (&["slow", "slow_period"], "slow"),
            (&["signal", "signal_period"], "signal"),
        ],
    },
    FamilyEntry {
        family: IndicatorFamily::Bollinger,
        prefixes: &["bb", "boll", "bollinger"],
        sources: &[LayerSource::Bollinger],
        args: &[
            (WINDOW_ALIASES, "period"),
            (&["mult", "std", "stddev", "k"], "mult"),
        ],
    },
    FamilyEntry {
        family: IndicatorFamily::Stochastic,
        prefixes: &["stoch", "stochastic"],
        sources: &[LayerSource::Stochastic],
        args: &[
            (&["", "k", "k_period", "period"], "k_period"),
            (&["d", "d_period"], "d_period"),
            (&["smooth", "smoothing", "slowing"], "smooth"),
        ],
    },
    FamilyEntry {
        family: IndicatorFamily::Atr,
        prefixes: &["atr"],
        sources: &[LayerSource::Atr],
        args: &[(WINDOW_ALIASES, "period")],
    },
    FamilyEntry {
        family: IndicatorFamily::Volatility,
        prefixes: &["vol", "volatility"],
        sources: &[LayerSource::Volatility],
        args: &[(WINDOW_ALIASES, "window")],
    },
    FamilyEntry {
        family: IndicatorFamily::VolumeRatio,
        prefixes: &["vr", "volume_ratio"],
        sources: &[LayerSource::VolumeRatio],
        args: &[(WINDOW_ALIASES, "window")],
    },
];

/// A resolved catalog key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBinding {
    pub family: IndicatorFamily,
    pub layer_param: &'static str,
    pub sources: BTreeSet<LayerSource>,
}

/// Resolve a catalog key against the family table. The longest matching
/// prefix wins, so `volume_ratio_window` is not read as `vol` + `ume…`.
pub fn resolve(parameter_key: &str) -> Option<ParamBinding> {
    let key = parameter_key.trim().to_ascii_lowercase();

    let (entry, suffix) = FAMILY_TABLE
        .iter()
        .flat_map(|entry| entry.prefixes.iter().map(move |p| (entry, *p)))
        .filter_map(|(entry, prefix)| split_prefix(&key, prefix).map(|s| (entry, prefix, s)))
        .max_by_key(|(_, prefix, _)| prefix.len())
        .map(|(entry, _, suffix)| (entry, suffix))?;

    let layer_param = entry
        .args
        .iter()
        .find(|(aliases, _)| aliases.iter().any(|a| *a == suffix))
        .map(|(_, arg)| *arg)?;

    Some(ParamBinding {
        family: entry.family,
        layer_param,
        sources: entry.sources.iter().copied().collect(),
    })
}

fn split_prefix<'k>(key: &'k str, prefix: &str) -> Option<&'k str> {
    let rest = key.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix('_')
    }
}

/// The argument name a layer uses for the catalog parameter `parameter_key`.
pub fn infer_layer_param_key(parameter_key: &str) -> Option<&'static str> {
    resolve(parameter_key).map(|b| b.layer_param)
}

/// Layer sources a parameter definition can affect. An explicit
/// `target_source` wins over the family table.
pub fn infer_target_sources(definition: &ParameterDefinition) -> BTreeSet<LayerSource> {
    if let Some(source) = definition.target_source {
        return BTreeSet::from([source]);
    }
    resolve(&definition.key)
        .map(|b| b.sources)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_family_maps_to_period() {
        assert_eq!(infer_layer_param_key("rsi_period"), Some("period"));
        assert_eq!(infer_layer_param_key("rsi_length"), Some("period"));
        assert_eq!(infer_layer_param_key("rsi"), Some("period"));
    }

    #[test]
    fn moving_average_family_maps_to_window() {
        assert_eq!(infer_layer_param_key("ma_window"), Some("window"));
        assert_eq!(infer_layer_param_key("sma_period"), Some("window"));
        assert_eq!(infer_layer_param_key("ema_length"), Some("window"));
    }

    #[test]
    fn multi_argument_families() {
        assert_eq!(infer_layer_param_key("macd_fast"), Some("fast"));
        assert_eq!(infer_layer_param_key("macd_signal_period"), Some("signal"));
        assert_eq!(infer_layer_param_key("bb_std"), Some("mult"));
        assert_eq!(infer_layer_param_key("bollinger_period"), Some("period"));
        assert_eq!(infer_layer_param_key("stoch_d"), Some("d_period"));
        assert_eq!(infer_layer_param_key("stochastic_smooth"), Some("smooth"));
    }

    #[test]
    fn longest_prefix_wins() {
        let binding = resolve("volume_ratio_window").unwrap();
        assert_eq!(binding.family, IndicatorFamily::VolumeRatio);
        assert_eq!(binding.layer_param, "window");
        assert_eq!(resolve("vol_window").unwrap().family, IndicatorFamily::Volatility);
    }

    #[test]
    fn prefix_must_end_at_separator() {
        // "ma" must not swallow "macd"
        assert_eq!(resolve("macd_slow").unwrap().family, IndicatorFamily::Macd);
        assert_eq!(infer_layer_param_key("mass_index"), None);
    }

    #[test]
    fn unknown_keys_do_not_bind() {
        assert_eq!(infer_layer_param_key("sentiment_threshold"), None);
        assert_eq!(infer_layer_param_key("rsi_colour"), None);
    }

    #[test]
    fn keys_are_case_insensitive() {
        assert_eq!(infer_layer_param_key("RSI_Period"), Some("period"));
    }

    #[test]
    fn target_sources_from_family() {
        let def = ParameterDefinition::new("ma_window", 2.0, 200.0, 1.0, 20.0);
        assert_eq!(
            infer_target_sources(&def),
            BTreeSet::from([LayerSource::Sma, LayerSource::Ema])
        );
        let def = ParameterDefinition::new("ema_window", 2.0, 200.0, 1.0, 20.0);
        assert_eq!(infer_target_sources(&def), BTreeSet::from([LayerSource::Ema]));
    }

    #[test]
    fn explicit_target_wins() {
        let def = ParameterDefinition::new("ma_window", 2.0, 200.0, 1.0, 20.0)
            .with_target(LayerSource::Sma);
        assert_eq!(infer_target_sources(&def), BTreeSet::from([LayerSource::Sma]));
    }

    #[test]
    fn unknown_definition_targets_nothing() {
        let def = ParameterDefinition::new("threshold", 0.0, 1.0, 0.1, 0.5);
        assert!(infer_target_sources(&def).is_empty());
    }
}
