//! chartlab: analytics engine for a charting workbench.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. Indicators, formulas, layer
//! recalculation, backtests and signal statistics are all pure domain code.

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
