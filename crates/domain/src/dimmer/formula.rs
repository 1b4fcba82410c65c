//! A small arithmetic language for computed dimmer levels.
//!
//! The grammar lives in `formula.pest`: the four arithmetic operators plus
//! `%`, unary minus, parentheses, `min(..)` and `max(..)`. Variables are
//! `hour`, `minute` and `weekday` (0 = Sunday). `level("id")` reads the
//! current level of a registry device; the caller collects those with
//! [`Formula::device_refs`] and hands them over in the context.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use pest::Parser;
use pest::error::InputLocation;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::id::DeviceId;

/// Deepest parenthesis nesting accepted in a formula.
pub const MAX_NESTING: usize = 32;

#[derive(Parser)]
#[grammar = "src/dimmer/formula.pest"]
struct FormulaParser;

/// Formula parse or evaluation failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("syntax error at {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("parentheses nested deeper than {0}")]
    TooDeep(usize),
    #[error("unknown variable {0}")]
    UnknownVariable(String),
    #[error("unknown function {0}")]
    UnknownFunction(String),
    #[error("no level available for device {0}")]
    MissingDevice(DeviceId),
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NonFinite,
}

/// Values a formula may read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormulaContext {
    pub hour: u32,
    pub minute: u32,
    pub weekday: u32,
    pub levels: HashMap<DeviceId, f64>,
}

impl FormulaContext {
    #[must_use]
    pub fn new(hour: u32, minute: u32, weekday: u32) -> Self {
        Self {
            hour,
            minute,
            weekday,
            levels: HashMap::new(),
        }
    }

    /// Context for the given wall-clock time.
    #[must_use]
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        Self::new(
            now.hour(),
            now.minute(),
            now.weekday().num_days_from_sunday(),
        )
    }

    #[must_use]
    pub fn with_level(mut self, device: impl Into<DeviceId>, level: f64) -> Self {
        self.levels.insert(device.into(), level);
        self
    }
}

/// A dimmer formula, kept in source form and parsed on use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    source: String,
}

impl Formula {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Devices read through `level(...)`.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError`] if the formula does not parse.
    pub fn device_refs(&self) -> Result<Vec<DeviceId>, FormulaError> {
        let expr = self.parse()?;
        let mut refs = Vec::new();
        expr.collect_devices(&mut refs);
        Ok(refs)
    }

    /// Parse and evaluate against `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError`] on syntax errors, unknown names, missing
    /// device levels, division by zero or a non-finite result.
    pub fn evaluate(&self, ctx: &FormulaContext) -> Result<f64, FormulaError> {
        let value = self.parse()?.eval(ctx)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FormulaError::NonFinite)
        }
    }

    fn parse(&self) -> Result<Expr, FormulaError> {
        check_nesting(&self.source)?;
        let expr = FormulaParser::parse(Rule::formula, &self.source)?
            .next()
            .and_then(|formula| formula.into_inner().next())
            .ok_or_else(|| syntax(0, "empty formula"))?;
        build(expr)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl From<pest::error::Error<Rule>> for FormulaError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let position = match err.location {
            InputLocation::Pos(position) | InputLocation::Span((position, _)) => position,
        };
        syntax(position, err.variant.message())
    }
}

fn syntax(position: usize, message: impl Into<String>) -> FormulaError {
    FormulaError::Syntax {
        position,
        message: message.into(),
    }
}

/// Reject formulas whose parentheses nest deeper than [`MAX_NESTING`],
/// before the parser recurses into them.
fn check_nesting(source: &str) -> Result<(), FormulaError> {
    let mut depth = 0_usize;
    let mut quote = None;
    for c in source.chars() {
        match (quote, c) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(FormulaError::TooDeep(MAX_NESTING));
                }
            }
            (None, ')') => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

// ── Syntax tree ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variable {
    Hour,
    Minute,
    Weekday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Min,
    Max,
}

impl Function {
    fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Min => lhs.min(rhs),
            Self::Max => lhs.max(rhs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Self::Add),
            "-" => Some(Self::Sub),
            "*" => Some(Self::Mul),
            "/" => Some(Self::Div),
            "%" => Some(Self::Rem),
            _ => None,
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> Result<f64, FormulaError> {
        match self {
            Self::Add => Ok(lhs + rhs),
            Self::Sub => Ok(lhs - rhs),
            Self::Mul => Ok(lhs * rhs),
            Self::Div | Self::Rem if rhs == 0.0 => Err(FormulaError::DivisionByZero),
            Self::Div => Ok(lhs / rhs),
            Self::Rem => Ok(lhs % rhs),
        }
    }
}

/// Operator chains are kept flat, so a long sum does not nest.
#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Variable(Variable),
    DeviceLevel(DeviceId),
    Neg(Box<Expr>),
    Chain(Box<Expr>, Vec<(BinaryOp, Expr)>),
    Call {
        function: Function,
        first: Box<Expr>,
        rest: Vec<Expr>,
    },
}

impl Expr {
    fn eval(&self, ctx: &FormulaContext) -> Result<f64, FormulaError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Variable(Variable::Hour) => Ok(f64::from(ctx.hour)),
            Self::Variable(Variable::Minute) => Ok(f64::from(ctx.minute)),
            Self::Variable(Variable::Weekday) => Ok(f64::from(ctx.weekday)),
            Self::DeviceLevel(device) => ctx
                .levels
                .get(device)
                .copied()
                .ok_or_else(|| FormulaError::MissingDevice(device.clone())),
            Self::Neg(inner) => inner.eval(ctx).map(|v| -v),
            Self::Chain(first, rest) => rest.iter().try_fold(first.eval(ctx)?, |acc, (op, rhs)| {
                op.apply(acc, rhs.eval(ctx)?)
            }),
            Self::Call {
                function,
                first,
                rest,
            } => rest.iter().try_fold(first.eval(ctx)?, |acc, arg| {
                Ok(function.apply(acc, arg.eval(ctx)?))
            }),
        }
    }

    fn collect_devices(&self, out: &mut Vec<DeviceId>) {
        match self {
            Self::DeviceLevel(device) => {
                if !out.contains(device) {
                    out.push(device.clone());
                }
            }
            Self::Neg(inner) => inner.collect_devices(out),
            Self::Chain(first, rest) => {
                first.collect_devices(out);
                rest.iter().for_each(|(_, rhs)| rhs.collect_devices(out));
            }
            Self::Call { first, rest, .. } => {
                first.collect_devices(out);
                rest.iter().for_each(|arg| arg.collect_devices(out));
            }
            Self::Number(_) | Self::Variable(_) => {}
        }
    }
}

// ── Tree building ──────────────────────────────────────────────────

fn build(pair: Pair<'_, Rule>) -> Result<Expr, FormulaError> {
    let position = pair.as_span().start();
    match pair.as_rule() {
        Rule::expr | Rule::term => build_chain(pair),
        Rule::unary => build_unary(pair),
        Rule::number => pair
            .as_str()
            .parse()
            .map(Expr::Number)
            .map_err(|_| syntax(position, format!("invalid number {}", pair.as_str()))),
        Rule::variable => variable(pair.as_str()).map(Expr::Variable),
        Rule::level_call => {
            let device = pair
                .into_inner()
                .next()
                .and_then(|string| string.into_inner().next())
                .map_or("", |inner| inner.as_str());
            Ok(Expr::DeviceLevel(DeviceId::new(device)))
        }
        Rule::call => build_call(pair),
        rule => Err(syntax(position, format!("unexpected {rule:?}"))),
    }
}

fn build_chain(pair: Pair<'_, Rule>) -> Result<Expr, FormulaError> {
    let position = pair.as_span().start();
    let mut operands = pair.into_inner();
    let first = build(
        operands
            .next()
            .ok_or_else(|| syntax(position, "missing operand"))?,
    )?;

    let mut rest = Vec::new();
    while let (Some(op), Some(operand)) = (operands.next(), operands.next()) {
        let op = BinaryOp::from_symbol(op.as_str())
            .ok_or_else(|| syntax(op.as_span().start(), format!("unknown operator {}", op.as_str())))?;
        rest.push((op, build(operand)?));
    }

    if rest.is_empty() {
        Ok(first)
    } else {
        Ok(Expr::Chain(Box::new(first), rest))
    }
}

fn build_unary(pair: Pair<'_, Rule>) -> Result<Expr, FormulaError> {
    let position = pair.as_span().start();
    let mut negations = 0_usize;
    let mut operand = None;
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::neg {
            negations += 1;
        } else {
            operand = Some(build(inner)?);
        }
    }
    let operand = operand.ok_or_else(|| syntax(position, "missing operand"))?;
    if negations % 2 == 1 {
        Ok(Expr::Neg(Box::new(operand)))
    } else {
        Ok(operand)
    }
}

fn build_call(pair: Pair<'_, Rule>) -> Result<Expr, FormulaError> {
    let position = pair.as_span().start();
    let mut inner = pair.into_inner();
    let name = inner
        .next()
        .ok_or_else(|| syntax(position, "missing function name"))?
        .as_str();
    let function = match name {
        "min" => Function::Min,
        "max" => Function::Max,
        "level" => return Err(syntax(position, "level expects a quoted device id")),
        _ => return Err(FormulaError::UnknownFunction(name.to_string())),
    };
    let first = build(
        inner
            .next()
            .ok_or_else(|| syntax(position, "missing argument"))?,
    )?;
    let rest = inner.map(build).collect::<Result<Vec<_>, _>>()?;
    Ok(Expr::Call {
        function,
        first: Box::new(first),
        rest,
    })
}

fn variable(name: &str) -> Result<Variable, FormulaError> {
    match name {
        "hour" => Ok(Variable::Hour),
        "minute" => Ok(Variable::Minute),
        "weekday" => Ok(Variable::Weekday),
        _ => Err(FormulaError::UnknownVariable(name.to_string())),
    }
}
