//! Core domain types and logic.

pub mod error;
pub mod raw_series;
pub mod indicator;
pub mod formula;
pub mod formula_parser;
pub mod formula_eval;
pub mod layer;
pub mod parameter;
pub mod binding;
pub mod debounce;
pub mod preset;
pub mod workbench;
pub mod strategy;
pub mod backtest;
pub mod metrics;
pub mod signal;
pub mod config_validation;
