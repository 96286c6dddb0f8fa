//! Formula evaluation.
//!
//! Evaluates a compiled formula element-wise against a raw series.
//!
//! # Evaluation Semantics
//!
//! - Output length always equals the raw series length
//! - `price` reads closes; `volume` reads volume, or NaN when the series has none
//! - Indicator calls run on closes; leading warmup values are NaN
//! - Periods longer than the series are clamped to the series length
//! - Division by zero yields NaN; NaN operands propagate

use crate::domain::error::AnalyticsError;
use crate::domain::formula::{BinaryOp, CompiledFormula, Expr, FormulaCache, SeriesRef};
use crate::domain::formula_parser;
use crate::domain::indicator::{compute_indicator, IndicatorKind};
use crate::domain::raw_series::RawSeries;
use std::collections::HashMap;

/// Parse and evaluate `input` against `raw`.
pub fn evaluate_formula(input: &str, raw: &RawSeries) -> Result<Vec<f64>, AnalyticsError> {
    let compiled = formula_parser::parse(input)?;
    evaluate(&compiled, raw)
}

/// Evaluate through `cache`, compiling `input` only the first time it is seen.
pub fn evaluate_cached(
    cache: &mut FormulaCache,
    input: &str,
    raw: &RawSeries,
) -> Result<Vec<f64>, AnalyticsError> {
    let compiled = cache.get_or_compile(input)?;
    evaluate(compiled, raw)
}

pub fn evaluate(formula: &CompiledFormula, raw: &RawSeries) -> Result<Vec<f64>, AnalyticsError> {
    let mut indicators: HashMap<IndicatorKind, Vec<f64>> = HashMap::new();
    let values = eval_expr(&formula.expr, raw, &mut indicators)?;
    tracing::debug!(
        formula = %formula.source,
        bars = raw.len(),
        indicators = indicators.len(),
        "evaluated formula"
    );
    Ok(values)
}

fn eval_expr(
    expr: &Expr,
    raw: &RawSeries,
    indicators: &mut HashMap<IndicatorKind, Vec<f64>>,
) -> Result<Vec<f64>, AnalyticsError> {
    let n = raw.len();
    match expr {
        Expr::Number(v) => Ok(vec![*v; n]),
        Expr::Series(SeriesRef::Price) => Ok(raw.closes().to_vec()),
        Expr::Series(SeriesRef::Volume) => Ok(raw
            .volumes()
            .map(|v| v.to_vec())
            .unwrap_or_else(|| vec![f64::NAN; n])),
        Expr::Call { function, period } => {
            let kind = function.indicator((*period).min(n).max(1));
            if let Some(values) = indicators.get(&kind) {
                return Ok(values.clone());
            }
            let values = compute_indicator(kind, raw)?.primary().to_vec();
            indicators.insert(kind, values.clone());
            Ok(values)
        }
        Expr::Neg(inner) => Ok(eval_expr(inner, raw, indicators)?
            .into_iter()
            .map(|v| -v)
            .collect()),
        Expr::Binary { op, left, right } => {
            let lhs = eval_expr(left, raw, indicators)?;
            let rhs = eval_expr(right, raw, indicators)?;
            Ok(lhs
                .iter()
                .zip(&rhs)
                .map(|(&l, &r)| apply(*op, l, r))
                .collect())
        }
    }
}

fn apply(op: BinaryOp, l: f64, r: f64) -> f64 {
    match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div => {
            if r == 0.0 {
                f64::NAN
            } else {
                l / r
            }
        }
    }
}
