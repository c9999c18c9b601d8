//! Parsed formulas and their tree-walking evaluator.
//!
//! Parsing never fails: a malformed formula is kept along with its syntax
//! error, and every evaluation of it reports that error. Use [`try_parse`]
//! to surface the error up front instead.

use crate::parser::ast::{BinaryOp, Expr, Function, UnaryOp, Variable};
use crate::parser::grammar::{is_callable, parse_expr};
use crate::parser::lexer::identifier;
use crate::preprocessor::normalize_formula;
use crate::special::{factorial, gamma};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("formula is empty")]
    Empty,

    #[error("unexpected input at position {position}: '{found}'")]
    Syntax { position: usize, found: String },

    #[error("unknown name '{name}' at position {position}")]
    UnknownName { name: String, position: usize },

    #[error("wrong number of arguments for '{name}' at position {position}")]
    Arity { name: String, position: usize },

    #[error("formula is {length} characters long, the limit is {limit}")]
    TooLong { length: usize, limit: usize },

    #[error("formula nests {depth} levels deep, the limit is {limit}")]
    TooDeep { depth: usize, limit: usize },
}

/// Longest normalized formula text accepted
pub const MAX_FORMULA_LEN: usize = 4096;

/// Deepest expression tree accepted. A chain of n binary operators counts n
/// levels, as do n nested parentheses or prefix signs.
pub const MAX_EXPR_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("malformed formula: {0}")]
    Malformed(#[from] FormulaError),

    #[error("recursion limit of {0} reached")]
    RecursionLimit(usize),

    #[error("formula refers to itself but no recursion handler is available")]
    RecursionUnavailable,
}

/// A formula bound to the free variables x1 and x3
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Result<Expr, FormulaError>,
}

/// Parse formula text. Always succeeds; see the module docs.
pub fn parse(text: &str) -> Formula {
    let source = normalize_formula(text);
    let expr = parse_normalized(&source);
    Formula {
        source: text.to_string(),
        expr,
    }
}

/// Parse formula text, failing on malformed input
pub fn try_parse(text: &str) -> Result<Formula, FormulaError> {
    let formula = parse(text);
    match &formula.expr {
        Ok(_) => Ok(formula),
        Err(e) => Err(e.clone()),
    }
}

fn parse_normalized(source: &str) -> Result<Expr, FormulaError> {
    if source.is_empty() {
        return Err(FormulaError::Empty);
    }
    if source.len() > MAX_FORMULA_LEN {
        return Err(FormulaError::TooLong {
            length: source.len(),
            limit: MAX_FORMULA_LEN,
        });
    }
    let nesting = nesting_bound(source);
    if nesting > MAX_EXPR_DEPTH {
        return Err(FormulaError::TooDeep {
            depth: nesting,
            limit: MAX_EXPR_DEPTH,
        });
    }

    match parse_expr(source) {
        Ok(("", expr)) => match expr.depth() {
            depth if depth > MAX_EXPR_DEPTH => Err(FormulaError::TooDeep {
                depth,
                limit: MAX_EXPR_DEPTH,
            }),
            _ => Ok(expr),
        },
        Ok((rest, _)) => Err(syntax_error(source, rest)),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            if e.code == nom::error::ErrorKind::Verify {
                Err(name_error(source, e.input))
            } else {
                Err(syntax_error(source, e.input))
            }
        }
        Err(nom::Err::Incomplete(_)) => Err(syntax_error(source, "")),
    }
}

/// Upper bound on how far the grammar recurses into `source`: the deepest
/// parenthesis plus every prefix sign and power operator, since those are
/// the only rules that call back into themselves.
fn nesting_bound(source: &str) -> usize {
    let mut open = 0usize;
    let mut deepest = 0;
    let mut chained = 0;
    let mut prev = None;
    for c in source.chars() {
        match c {
            '(' => {
                open += 1;
                deepest = deepest.max(open);
            }
            ')' => open = open.saturating_sub(1),
            '^' => chained += 1,
            '*' if prev == Some('*') => chained += 1,
            '+' | '-'
                if matches!(
                    prev,
                    None | Some('(' | ',' | '+' | '-' | '*' | '/' | '%' | '^')
                ) =>
            {
                chained += 1
            }
            _ => {}
        }
        prev = Some(c);
    }
    deepest + chained
}

fn syntax_error(source: &str, rest: &str) -> FormulaError {
    FormulaError::Syntax {
        position: source.len() - rest.len(),
        found: rest.chars().take(16).collect(),
    }
}

fn name_error(source: &str, rest: &str) -> FormulaError {
    let position = source.len() - rest.len();
    let name = identifier(rest)
        .map(|(_, name)| name.to_string())
        .unwrap_or_default();
    if is_callable(&name) {
        FormulaError::Arity { name, position }
    } else {
        FormulaError::UnknownName { name, position }
    }
}

impl Formula {
    /// The text as submitted
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> Result<&Expr, &FormulaError> {
        self.expr.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.expr.is_ok()
    }

    /// True if the formula contains `f(..)`
    pub fn is_recursive(&self) -> bool {
        self.expr.as_ref().map(Expr::is_recursive).unwrap_or(false)
    }

    /// Evaluate at (x1, x3). `f(a, b)` inside the formula calls `recurse`.
    pub fn eval_with<F>(&self, x1: f64, x3: f64, recurse: &mut F) -> Result<f64, EvalError>
    where
        F: FnMut(f64, f64) -> Result<f64, EvalError>,
    {
        match &self.expr {
            Ok(expr) => eval_expr(expr, x1, x3, recurse),
            Err(e) => Err(EvalError::Malformed(e.clone())),
        }
    }

    /// Evaluate a formula that does not refer to itself
    pub fn eval(&self, x1: f64, x3: f64) -> Result<f64, EvalError> {
        self.eval_with(x1, x3, &mut |_, _| Err(EvalError::RecursionUnavailable))
    }
}

fn eval_expr<F>(expr: &Expr, x1: f64, x3: f64, recurse: &mut F) -> Result<f64, EvalError>
where
    F: FnMut(f64, f64) -> Result<f64, EvalError>,
{
    let value = match expr {
        Expr::Number(n) => *n,
        Expr::Variable(Variable::X1) => x1,
        Expr::Variable(Variable::X3) => x3,
        Expr::Unary(op, operand) => {
            let v = eval_expr(operand, x1, x3, recurse)?;
            match op {
                UnaryOp::Neg => -v,
                UnaryOp::Factorial => factorial(v),
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let a = eval_expr(lhs, x1, x3, recurse)?;
            let b = eval_expr(rhs, x1, x3, recurse)?;
            match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Rem => a % b,
                BinaryOp::Pow => a.powf(b),
            }
        }
        Expr::Call(function, args) => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(arg, x1, x3, recurse)?);
            }
            apply_function(*function, &values)
        }
        Expr::Recurse(a, b) => {
            let a = eval_expr(a, x1, x3, recurse)?;
            let b = eval_expr(b, x1, x3, recurse)?;
            recurse(a, b)?
        }
    };
    Ok(value)
}

/// Apply a function to already-evaluated arguments. Arity was checked when
/// parsing.
fn apply_function(function: Function, args: &[f64]) -> f64 {
    let x = args.first().copied().unwrap_or(f64::NAN);
    let y = args.get(1).copied().unwrap_or(f64::NAN);
    match function {
        Function::Sin => x.sin(),
        Function::Cos => x.cos(),
        Function::Tan => x.tan(),
        Function::Asin => x.asin(),
        Function::Acos => x.acos(),
        Function::Atan => x.atan(),
        Function::Atan2 => x.atan2(y),
        Function::Sinh => x.sinh(),
        Function::Cosh => x.cosh(),
        Function::Tanh => x.tanh(),
        Function::Sqrt => x.sqrt(),
        Function::Cbrt => x.cbrt(),
        Function::Ln => x.ln(),
        Function::Log10 => x.log10(),
        Function::Log2 => x.log2(),
        Function::Exp => x.exp(),
        Function::Abs => x.abs(),
        Function::Floor => x.floor(),
        Function::Ceil => x.ceil(),
        // halves round up, -2.5 -> -2
        Function::Round => (x + 0.5).floor(),
        Function::Sign => {
            if x.is_nan() || x == 0.0 {
                x
            } else {
                x.signum()
            }
        }
        Function::Min => fold_nan_aware(args, f64::min),
        Function::Max => fold_nan_aware(args, f64::max),
        Function::Pow => x.powf(y),
        Function::Gamma => gamma(x),
        Function::Factorial => factorial(x),
    }
}

/// min/max that propagate NaN instead of skipping it
fn fold_nan_aware(args: &[f64], pick: fn(f64, f64) -> f64) -> f64 {
    if args.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    args.iter().copied().reduce(pick).unwrap_or(f64::NAN)
}
