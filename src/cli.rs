//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{parse_timestamp, CsvAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{check_backtest_input, run_backtest, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{strategy_from_config, validate_preset};
use crate::domain::error::AnalyticsError;
use crate::domain::formula_eval::evaluate_formula;
use crate::domain::formula_parser;
use crate::domain::indicator::IndicatorOutput;
use crate::domain::preset::{parse_params, Preset};
use crate::domain::raw_series::RawSeries;
use crate::domain::signal::{evaluate_signals, SignalResult, HORIZONS};
use crate::domain::strategy::{StrategyKind, STRATEGY_NAMES};
use crate::domain::workbench::{LayerOutputs, Workbench};

#[derive(Parser, Debug)]
#[command(name = "chartlab", about = "Chart analytics: indicators, formulas, backtests, signals")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a formula without evaluating it
    ValidateFormula { expr: String },
    /// Evaluate a formula over a CSV series
    Formula {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        expr: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
    /// Compute a preset's layers over a CSV series
    Layers {
        #[arg(short, long)]
        data: PathBuf,
        /// Built-in preset name or INI file
        #[arg(short, long, default_value = "overview")]
        preset: String,
        /// Parameter overrides, e.g. --set ma_window=30
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, f64)>,
        /// Extra formula layers
        #[arg(long = "formula")]
        formulas: Vec<String>,
    },
    /// Backtest a strategy over a CSV series
    Backtest {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the trade list as CSV
        #[arg(long)]
        trades: bool,
    },
    /// Score the signal catalog over a CSV series
    Signals {
        #[arg(short, long)]
        data: PathBuf,
    },
    /// List the strategy catalog
    Strategies,
}

pub fn run(cli: Cli) -> ExitCode {
    let formula_input = match &cli.command {
        Command::ValidateFormula { expr } | Command::Formula { expr, .. } => Some(expr.clone()),
        _ => None,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match execute(cli.command, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match (&e, formula_input) {
                (AnalyticsError::FormulaParse(p), Some(input)) => {
                    eprintln!("error: {}", p.display_with_context(&input))
                }
                _ => eprintln!("error: {e}"),
            }
            ExitCode::from(&e)
        }
    }
}

/// Run one command, writing its output to `out`.
pub fn execute<W: Write>(command: Command, out: &mut W) -> Result<(), AnalyticsError> {
    match command {
        Command::ValidateFormula { expr } => {
            let compiled = formula_parser::parse(&expr)?;
            writeln!(out, "ok: {}", compiled.source)?;
            Ok(())
        }
        Command::Formula {
            data,
            expr,
            from,
            to,
        } => run_formula(out, &data, &expr, from.as_deref(), to.as_deref()),
        Command::Layers {
            data,
            preset,
            set,
            formulas,
        } => run_layers(out, &data, &preset, &set, &formulas),
        Command::Backtest {
            data,
            strategy,
            config,
            trades,
        } => run_backtest_command(out, &data, strategy.as_deref(), config.as_deref(), trades),
        Command::Signals { data } => run_signals(out, &data),
        Command::Strategies => write_strategies(out),
    }
}

fn parse_assignment(input: &str) -> Result<(String, f64), String> {
    let mut pairs = parse_params(input)?;
    match (pairs.pop(), pairs.is_empty()) {
        (Some(pair), true) => Ok(pair),
        _ => Err(format!("expected a single key=value, found '{}'", input)),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, AnalyticsError> {
    FileConfigAdapter::from_file(path).map_err(|e| AnalyticsError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Resolve `--preset`: an existing file is read as INI, anything else is a
/// built-in preset name.
pub fn load_preset(name_or_path: &str) -> Result<Preset, AnalyticsError> {
    let path = Path::new(name_or_path);
    let preset = if path.is_file() {
        Preset::from_config(&load_config(path)?)?
    } else {
        Preset::builtin(name_or_path)?
    };
    validate_preset(&preset)?;
    Ok(preset)
}

/// `--strategy` alone uses catalog defaults; with `--config` the INI
/// supplies parameters and, if `--strategy` is absent, the name.
pub fn build_strategy(
    name: Option<&str>,
    config_path: Option<&Path>,
) -> Result<StrategyKind, AnalyticsError> {
    match (name, config_path) {
        (_, Some(path)) => strategy_from_config(&load_config(path)?, name),
        (Some(name), None) => StrategyKind::default_for(name),
        (None, None) => Err(AnalyticsError::invalid_parameter(
            "strategy",
            "pass --strategy or a --config with [backtest] strategy",
        )),
    }
}

fn load_data(path: &Path, from: Option<&str>, to: Option<&str>) -> Result<RawSeries, AnalyticsError> {
    let bound = |value: Option<&str>, default: i64| -> Result<i64, AnalyticsError> {
        match value {
            None => Ok(default),
            Some(v) => parse_timestamp(v).ok_or_else(|| {
                AnalyticsError::invalid_parameter("range", format!("invalid timestamp '{}'", v))
            }),
        }
    };
    let range = if from.is_some() || to.is_some() {
        Some((bound(from, i64::MIN)?, bound(to, i64::MAX)?))
    } else {
        None
    };
    let raw = CsvAdapter::load_file(path, range)?;
    tracing::info!(path = %path.display(), bars = raw.len(), "data loaded");
    Ok(raw)
}

fn run_formula<W: Write>(
    out: &mut W,
    data: &Path,
    expr: &str,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<(), AnalyticsError> {
    let raw = load_data(data, from, to)?;
    let values = evaluate_formula(expr, &raw)?;
    write_columns(out, raw.timestamps(), &[("value".to_string(), values.as_slice())])
}

fn run_layers<W: Write>(
    out: &mut W,
    data: &Path,
    preset: &str,
    overrides: &[(String, f64)],
    formulas: &[String],
) -> Result<(), AnalyticsError> {
    let raw = load_data(data, None, None)?;
    let preset = load_preset(preset)?;

    let mut workbench = Workbench::new();
    workbench.reload_data(raw);
    workbench.load_preset(preset);
    for expr in formulas {
        workbench.submit_formula(expr)?;
    }
    if !overrides.is_empty() {
        let values: BTreeMap<String, f64> = overrides.iter().cloned().collect();
        workbench.apply_what_if(&values)?;
    }

    let outputs = workbench.outputs();
    for (id, message) in &outputs.errors {
        eprintln!("warning: layer {}: {}", id, message);
    }
    let timestamps = workbench.raw().map(RawSeries::timestamps).unwrap_or(&[]);
    let order: Vec<&str> = workbench.layers().iter().map(|l| l.id.as_str()).collect();
    write_columns(out, timestamps, &layer_columns(outputs, &order))
}

/// Flatten layer outputs into named columns in layer order. Multi-series
/// outputs get one column per component, e.g. `macd.signal`.
pub fn layer_columns<'a>(outputs: &'a LayerOutputs, order: &[&str]) -> Vec<(String, &'a [f64])> {
    let mut columns = Vec::new();
    for id in order {
        let Some(output) = outputs.get(id) else {
            continue;
        };
        match output {
            IndicatorOutput::Line(values) => columns.push((id.to_string(), values.as_slice())),
            IndicatorOutput::Macd(m) => {
                columns.push((format!("{id}.macd"), m.macd.as_slice()));
                columns.push((format!("{id}.signal"), m.signal.as_slice()));
                columns.push((format!("{id}.histogram"), m.histogram.as_slice()));
            }
            IndicatorOutput::Bollinger(b) => {
                columns.push((format!("{id}.upper"), b.upper.as_slice()));
                columns.push((format!("{id}.middle"), b.middle.as_slice()));
                columns.push((format!("{id}.lower"), b.lower.as_slice()));
            }
            IndicatorOutput::Stochastic(s) => {
                columns.push((format!("{id}.k"), s.k.as_slice()));
                columns.push((format!("{id}.d"), s.d.as_slice()));
            }
        }
    }
    columns
}

/// `timestamp` plus one column per series. Undefined values are empty cells.
pub fn write_columns<W: Write>(
    out: &mut W,
    timestamps: &[i64],
    columns: &[(String, &[f64])],
) -> Result<(), AnalyticsError> {
    let mut wtr = csv::Writer::from_writer(out);
    let mut header = vec!["timestamp".to_string()];
    header.extend(columns.iter().map(|(name, _)| name.clone()));
    wtr.write_record(&header).map_err(csv_error)?;

    for (i, ts) in timestamps.iter().enumerate() {
        let mut record = vec![ts.to_string()];
        record.extend(columns.iter().map(|(_, values)| format_value(values.get(i).copied())));
        wtr.write_record(&record).map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => v.to_string(),
        _ => String::new(),
    }
}

fn csv_error(e: csv::Error) -> AnalyticsError {
    AnalyticsError::Io(e.into())
}

fn run_backtest_command<W: Write>(
    out: &mut W,
    data: &Path,
    strategy: Option<&str>,
    config: Option<&Path>,
    with_trades: bool,
) -> Result<(), AnalyticsError> {
    let kind = build_strategy(strategy, config)?;
    let raw = load_data(data, None, None)?;
    check_backtest_input(raw.closes())?;

    tracing::info!(strategy = %kind, bars = raw.len(), "running backtest");
    let result = run_backtest(raw.closes(), &BacktestConfig::new(kind))?;
    write_backtest_summary(out, &result)?;
    if with_trades {
        writeln!(out)?;
        write_trades(out, &result)?;
    }
    Ok(())
}

pub fn write_backtest_summary<W: Write>(out: &mut W, result: &BacktestResult) -> io::Result<()> {
    writeln!(out, "=== Backtest: {} ===", result.strategy)?;
    writeln!(out, "Bars:             {}", result.equity_curve.len())?;
    writeln!(out, "Trades:           {}", result.trades.len())?;
    writeln!(out, "Total Return:     {:.2}%", result.total_return)?;
    writeln!(out, "Max Drawdown:     -{:.2}%", result.max_drawdown)?;
    writeln!(out, "Sharpe (trade):   {:.2}", result.sharpe_ratio)?;
    writeln!(out, "Win Rate:         {:.1}%", result.win_rate)?;
    writeln!(out, "Avg Win:          {:.2}%", result.avg_win)?;
    writeln!(out, "Avg Loss:         {:.2}%", result.avg_loss)?;
    writeln!(out, "Exposure:         {:.1}%", result.exposure_pct)?;
    Ok(())
}

fn write_trades<W: Write>(out: &mut W, result: &BacktestResult) -> Result<(), AnalyticsError> {
    let mut wtr = csv::Writer::from_writer(out);
    for trade in &result.trades {
        wtr.serialize(trade).map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

fn run_signals<W: Write>(out: &mut W, data: &Path) -> Result<(), AnalyticsError> {
    let raw = load_data(data, None, None)?;
    let results = evaluate_signals(&raw)?;
    write_signals(out, &results)
}

/// One row per signal; hit rates are percentages, blank where no
/// occurrence could be evaluated.
pub fn write_signals<W: Write>(out: &mut W, results: &[SignalResult]) -> Result<(), AnalyticsError> {
    let mut wtr = csv::Writer::from_writer(out);
    let mut header = vec![
        "signal".to_string(),
        "direction".to_string(),
        "occurrences".to_string(),
    ];
    header.extend(HORIZONS.iter().map(|h| format!("hit_{h}")));
    wtr.write_record(&header).map_err(csv_error)?;

    for result in results {
        let mut record = vec![
            result.name.clone(),
            result.direction.to_string(),
            result.occurrences.to_string(),
        ];
        record.extend(HORIZONS.iter().map(|h| {
            result
                .hit_rates
                .get(h)
                .map(|rate| format!("{:.1}", rate * 100.0))
                .unwrap_or_default()
        }));
        wtr.write_record(&record).map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_strategies<W: Write>(out: &mut W) -> Result<(), AnalyticsError> {
    for name in STRATEGY_NAMES {
        let kind = StrategyKind::default_for(name)?;
        writeln!(out, "{:<22}{}", kind.to_string(), kind.description())?;
    }
    Ok(())
}
