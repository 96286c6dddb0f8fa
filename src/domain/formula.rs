//! Formula AST and compiled-formula cache.
//!
//! A formula is plain arithmetic over the raw series and a few indicator
//! calls, e.g. `price / sma(200)` or `(ema(12) - ema(26)) / price * 100`:
//! - `Expr`: the expression tree
//! - `SeriesRef`: raw columns a formula may read (`price`, `volume`)
//! - `FormulaFunction`: whitelisted single-argument indicator calls
//! - `CompiledFormula`: a parsed formula together with its source text
//! - `FormulaCache`: source text → compiled formula memo

use crate::domain::error::ParseError;
use crate::domain::formula_parser;
use crate::domain::indicator::IndicatorKind;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesRef {
    Price,
    Volume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormulaFunction {
    Sma,
    Ema,
    Rsi,
}

impl FormulaFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sma" => Some(FormulaFunction::Sma),
            "ema" => Some(FormulaFunction::Ema),
            "rsi" => Some(FormulaFunction::Rsi),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FormulaFunction::Sma => "sma",
            FormulaFunction::Ema => "ema",
            FormulaFunction::Rsi => "rsi",
        }
    }

    pub fn indicator(self, period: usize) -> IndicatorKind {
        match self {
            FormulaFunction::Sma => IndicatorKind::Sma(period),
            FormulaFunction::Ema => IndicatorKind::Ema(period),
            FormulaFunction::Rsi => IndicatorKind::Rsi(period),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Series(SeriesRef),
    Call {
        function: FormulaFunction,
        period: usize,
    },
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(v) => write!(f, "{}", v),
            Expr::Series(SeriesRef::Price) => write!(f, "price"),
            Expr::Series(SeriesRef::Volume) => write!(f, "volume"),
            Expr::Call { function, period } => write!(f, "{}({})", function.name(), period),
            Expr::Neg(inner) => write!(f, "-{}", inner),
            Expr::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFormula {
    pub source: String,
    pub expr: Expr,
}

impl CompiledFormula {
    /// Indicator instances the formula reads, deduplicated in first-use order.
    pub fn referenced_indicators(&self) -> Vec<IndicatorKind> {
        let mut out = Vec::new();
        collect_indicators(&self.expr, &mut out);
        out
    }

    pub fn uses_volume(&self) -> bool {
        uses_series(&self.expr, SeriesRef::Volume)
    }
}

fn collect_indicators(expr: &Expr, out: &mut Vec<IndicatorKind>) {
    match expr {
        Expr::Number(_) | Expr::Series(_) => {}
        Expr::Call { function, period } => {
            let kind = function.indicator(*period);
            if !out.contains(&kind) {
                out.push(kind);
            }
        }
        Expr::Neg(inner) => collect_indicators(inner, out),
        Expr::Binary { left, right, .. } => {
            collect_indicators(left, out);
            collect_indicators(right, out);
        }
    }
}

fn uses_series(expr: &Expr, series: SeriesRef) -> bool {
    match expr {
        Expr::Series(s) => *s == series,
        Expr::Number(_) | Expr::Call { .. } => false,
        Expr::Neg(inner) => uses_series(inner, series),
        Expr::Binary { left, right, .. } => uses_series(left, series) || uses_series(right, series),
    }
}

/// Compiled formulas keyed by their exact source text.
///
/// Only the parse is memoized; evaluation always runs against the current
/// raw series.
#[derive(Debug, Default)]
pub struct FormulaCache {
    compiled: HashMap<String, CompiledFormula>,
}

impl FormulaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(&mut self, source: &str) -> Result<&CompiledFormula, ParseError> {
        if !self.compiled.contains_key(source) {
            let compiled = formula_parser::parse(source)?;
            tracing::debug!(formula = source, "compiled formula");
            self.compiled.insert(source.to_string(), compiled);
        }
        self.compiled
            .get(source)
            .ok_or_else(|| ParseError::new("formula cache miss", 0))
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    pub fn clear(&mut self) {
        self.compiled.clear();
    }
}
