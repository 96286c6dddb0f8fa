//! Formula parser.
//!
//! Recursive descent over the grammar
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := number | '-' factor | identifier | call | '(' expr ')'
//! call   := ('sma' | 'ema' | 'rsi') '(' number ')'
//! ```
//!
//! Identifiers are `price` and `volume`. Names are case-insensitive. Errors
//! carry the 0-based character offset of the offending token.
//!
//! Input is capped at `MAX_FORMULA_CHARS` and parentheses/unary minus at
//! `MAX_NESTING` levels, so a hostile formula fails with an error instead of
//! exhausting the stack.

use crate::domain::error::ParseError;
use crate::domain::formula::{BinaryOp, CompiledFormula, Expr, FormulaFunction, SeriesRef};

pub const MAX_NESTING: usize = 256;
pub const MAX_FORMULA_CHARS: usize = 4096;

struct Parser<'a> {
    input: &'a str,
    /// Byte offset; converted to characters when reported.
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn char_offset(&self, byte: usize) -> usize {
        self.input
            .get(..byte)
            .map_or(byte, |prefix| prefix.chars().count())
    }

    fn enter(&mut self, start: usize) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new(
                format!("formula nested too deeply (more than {} levels)", MAX_NESTING),
                start,
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn describe_next(&self) -> String {
        self.peek()
            .map(|c| format!("'{}'", c))
            .unwrap_or_else(|| "end of input".to_string())
    }

    fn read_word(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError::new("expected number", start));
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<f64>()
            .map_err(|_| ParseError::new(format!("invalid number: {}", num_str), start))
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                Some('+') => BinaryOp::Add,
                Some('-') => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_factor()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                Some('*') => BinaryOp::Mul,
                Some('/') => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_factor()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        match self.peek() {
            None => Err(ParseError::new(
                "expected number, identifier or '(', found end of input",
                start,
            )),
            Some('(') => {
                self.enter(start)?;
                self.advance();
                let inner = self.parse_expr()?;
                self.depth -= 1;
                self.skip_whitespace();
                if self.peek() == Some(')') {
                    self.advance();
                    Ok(inner)
                } else {
                    Err(ParseError::new(
                        format!(
                            "unbalanced parentheses: expected ')' to close '(' at position {}, found {}",
                            self.char_offset(start),
                            self.describe_next()
                        ),
                        self.pos,
                    ))
                }
            }
            Some(')') => Err(ParseError::new("unbalanced parentheses: unexpected ')'", start)),
            Some('-') => {
                self.enter(start)?;
                self.advance();
                let inner = self.parse_factor()?;
                self.depth -= 1;
                Ok(Expr::Neg(Box::new(inner)))
            }
            Some(ch) if ch.is_ascii_digit() || ch == '.' => Ok(Expr::Number(self.parse_number()?)),
            Some(ch) if ch.is_alphabetic() || ch == '_' => self.parse_name(),
            Some(ch) => Err(ParseError::new(
                format!("unexpected character '{}'", ch),
                start,
            )),
        }
    }

    fn parse_name(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        let word = self.read_word();
        let name = word.to_ascii_lowercase();

        if let Some(function) = FormulaFunction::from_name(&name) {
            return self.parse_call(function, start);
        }

        let series = match name.as_str() {
            "price" => Some(SeriesRef::Price),
            "volume" => Some(SeriesRef::Volume),
            _ => None,
        };

        self.skip_whitespace();
        let followed_by_paren = self.peek() == Some('(');
        match (series, followed_by_paren) {
            (Some(_), true) => Err(ParseError::new(
                format!("malformed call: '{}' is not a function", word),
                start,
            )),
            (Some(series), false) => Ok(Expr::Series(series)),
            (None, true) => Err(ParseError::new(
                format!("unknown function '{}' (expected sma, ema or rsi)", word),
                start,
            )),
            (None, false) => Err(ParseError::new(
                format!("unknown identifier '{}' (expected price or volume)", word),
                start,
            )),
        }
    }

    fn parse_call(&mut self, function: FormulaFunction, start: usize) -> Result<Expr, ParseError> {
        let name = function.name();
        self.skip_whitespace();
        if self.peek() != Some('(') {
            return Err(ParseError::new(
                format!("malformed call: expected '(' after '{}'", name),
                self.pos,
            ));
        }
        self.advance();

        self.skip_whitespace();
        let arg_pos = self.pos;
        if !matches!(self.peek(), Some(ch) if ch.is_ascii_digit() || ch == '.') {
            return Err(ParseError::new(
                format!(
                    "malformed call: {}() takes a single positive integer period, found {}",
                    name,
                    self.describe_next()
                ),
                arg_pos,
            ));
        }
        let value = self.parse_number()?;
        if value < 1.0 || value.fract() != 0.0 {
            return Err(ParseError::new(
                format!(
                    "malformed call: {}() period must be a positive integer, got {}",
                    name, value
                ),
                arg_pos,
            ));
        }

        self.skip_whitespace();
        match self.peek() {
            Some(')') => {
                self.advance();
            }
            Some(',') => {
                return Err(ParseError::new(
                    format!("malformed call: {}() takes exactly one argument", name),
                    self.pos,
                ));
            }
            _ => {
                return Err(ParseError::new(
                    format!(
                        "malformed call: expected ')' to close {}( at position {}, found {}",
                        name,
                        self.char_offset(start),
                        self.describe_next()
                    ),
                    self.pos,
                ));
            }
        }

        Ok(Expr::Call {
            function,
            period: value as usize,
        })
    }

    fn parse(&mut self) -> Result<Expr, ParseError> {
        self.parse_formula().map_err(|e| ParseError {
            position: self.char_offset(e.position),
            ..e
        })
    }

    fn parse_formula(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(ParseError::new("empty formula", 0));
        }

        let expr = self.parse_expr()?;
        self.skip_whitespace();
        match self.peek() {
            None => Ok(expr),
            Some(')') => Err(ParseError::new(
                "unbalanced parentheses: unexpected ')'",
                self.pos,
            )),
            Some(ch) => Err(ParseError::new(
                format!("unexpected '{}' after expression", ch),
                self.pos,
            )),
        }
    }
}

/// Parse a formula into its AST.
pub fn parse(input: &str) -> Result<CompiledFormula, ParseError> {
    if input.chars().count() > MAX_FORMULA_CHARS {
        return Err(ParseError::new(
            format!("formula longer than {} characters", MAX_FORMULA_CHARS),
            MAX_FORMULA_CHARS,
        ));
    }
    let expr = Parser::new(input).parse()?;
    Ok(CompiledFormula {
        source: input.to_string(),
        expr,
    })
}

/// `None` when `input` is a well-formed formula, otherwise a readable message
/// that includes the error position.
pub fn validate_formula(input: &str) -> Option<String> {
    parse(input).err().map(|e| e.to_string())
}
