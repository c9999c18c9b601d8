//! Memoizing evaluator for formulas that may call themselves.

use crate::formula::{self, EvalError, Formula};
use crate::grid::truncate_to_cell;
use crate::Dimensions;
use log::{debug, warn};
use std::rc::Rc;

/// Nesting depth of `f(..)` calls before evaluation gives up
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Tree levels that may be on the stack at once across all `f(..)` frames.
/// Formulas with deep trees get proportionally fewer recursion levels.
pub const EVAL_LEVEL_BUDGET: usize = 4096;

/// Evaluation state for one submitted formula: the parsed formula, a memo
/// grid over the axis domain and a sticky stop flag that degrades further
/// evaluation to 0 once something went wrong.
#[derive(Debug)]
pub struct FormulaSession {
    formula: Rc<Formula>,
    dimensions: Dimensions,
    memo: Vec<Option<f64>>,
    x_cells: usize,
    z_cells: usize,
    stopped: bool,
    max_depth: usize,
}

impl FormulaSession {
    pub fn new(text: &str, dimensions: Dimensions) -> Self {
        Self::from_formula(formula::parse(text), dimensions)
    }

    pub fn from_formula(formula: Formula, dimensions: Dimensions) -> Self {
        let x_cells = dimensions.x_cells();
        let z_cells = dimensions.z_cells();
        debug!(
            "formula session for '{}' with a {}x{} memo grid",
            formula.source(),
            x_cells,
            z_cells
        );
        Self {
            formula: Rc::new(formula),
            dimensions,
            memo: vec![None; x_cells * z_cells],
            x_cells,
            z_cells,
            stopped: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }

    /// True once an evaluation failed and the session returns 0 for misses
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Forget every memoized value and clear the stop flag
    pub fn reset(&mut self) {
        self.memo.iter_mut().for_each(|v| *v = None);
        self.stopped = false;
    }

    /// Replace the formula; starts over with an empty memo grid
    pub fn set_formula(&mut self, text: &str) {
        self.formula = Rc::new(formula::parse(text));
        self.reset();
    }

    /// Evaluate at (x1, x3). Points outside the axis domain are 0.
    pub fn evaluate(&mut self, x1: f64, x3: f64) -> f64 {
        self.evaluate_at_depth(x1, x3, 0)
    }

    fn evaluate_at_depth(&mut self, x1: f64, x3: f64, depth: usize) -> f64 {
        let Some(index) = self.memo_index(x1, x3) else {
            return 0.0;
        };

        if let Some(value) = self.memo[index] {
            return value;
        }
        if self.stopped {
            return 0.0;
        }

        let formula = Rc::clone(&self.formula);
        let limit = self.recursion_limit();
        let result = if depth >= limit {
            Err(EvalError::RecursionLimit(limit))
        } else {
            formula.eval_with(x1, x3, &mut |a, b| {
                Ok(self.evaluate_at_depth(a, b, depth + 1))
            })
        };

        match result {
            Ok(value) => {
                self.memo[index] = Some(value);
                value
            }
            Err(e) => {
                if !self.stopped {
                    warn!(
                        "evaluating '{}' at ({}, {}) failed: {}; remaining points default to 0",
                        formula.source(),
                        x1,
                        x3,
                        e
                    );
                    self.stopped = true;
                }
                0.0
            }
        }
    }

    /// `max_depth`, lowered so deep trees stay within the level budget
    pub fn recursion_limit(&self) -> usize {
        let levels = self.formula.expr().map_or(1, |e| e.depth());
        self.max_depth.min(EVAL_LEVEL_BUDGET / levels)
    }

    fn memo_index(&self, x1: f64, x3: f64) -> Option<usize> {
        let dims = &self.dimensions;
        if !(x1 >= 0.0 && x3 >= 0.0 && x1 <= dims.x_len && x3 <= dims.z_len) {
            return None;
        }
        let i = truncate_to_cell(x1, dims.x_res, self.x_cells);
        let k = truncate_to_cell(x3, dims.z_res, self.z_cells);
        Some(i * self.z_cells + k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn dims(res: usize) -> Dimensions {
        Dimensions {
            x_res: res,
            z_res: res,
            ..Dimensions::default()
        }
    }

    #[test]
    fn test_plain_formula() {
        let mut session = FormulaSession::new("x1*x3", dims(10));
        assert_abs_diff_eq!(session.evaluate(0.5, 0.5), 0.25);
        assert!(!session.is_stopped());
    }

    #[test]
    fn test_out_of_domain_is_zero() {
        let mut session = FormulaSession::new("x1+x3+1", dims(10));
        assert_eq!(session.evaluate(-0.1, 0.5), 0.0);
        assert_eq!(session.evaluate(0.5, 1.5), 0.0);
        assert_eq!(session.evaluate(f64::NAN, 0.5), 0.0);
        assert_eq!(session.evaluate(1.0, 1.0), 3.0);
    }

    #[test]
    fn test_recursive_sum() {
        // f(x1) = f(x1 - 0.1) + 1 counts the steps down to the domain edge
        let mut session = FormulaSession::new("f(x1-0.1,x3)+1", dims(10));
        let v = session.evaluate(0.5, 0.0);
        assert_abs_diff_eq!(v, 6.0);
        assert!(!session.is_stopped());
    }

    #[test]
    fn test_memoized_value_is_not_recomputed() {
        let mut session = FormulaSession::new("x1", dims(10));
        let first = session.evaluate(0.55, 0.0);
        // same memo cell, different exact coordinate
        let second = session.evaluate(0.58, 0.0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unbounded_recursion_degrades() {
        let mut session = FormulaSession::new("f(x1,x3)+1", dims(10)).with_max_depth(32);
        // the innermost call is cut off at 0, the frames above it still finish
        assert_abs_diff_eq!(session.evaluate(0.5, 0.5), 32.0);
        assert!(session.is_stopped());
        // further misses are 0
        assert_eq!(session.evaluate(0.2, 0.2), 0.0);
    }

    #[test]
    fn test_malformed_formula_degrades() {
        let mut session = FormulaSession::new("x1+", dims(10));
        assert_eq!(session.evaluate(0.5, 0.5), 0.0);
        assert!(session.is_stopped());
    }

    #[test]
    fn test_reset_and_set_formula() {
        let mut session = FormulaSession::new("f(x1,x3)", dims(10)).with_max_depth(8);
        session.evaluate(0.5, 0.5);
        assert!(session.is_stopped());

        session.set_formula("x1+1");
        assert!(!session.is_stopped());
        assert_abs_diff_eq!(session.evaluate(0.5, 0.5), 1.5);
    }

    #[test]
    fn test_oversized_formula_degrades() {
        let mut session = FormulaSession::new(&vec!["x1"; 20_000].join("+"), dims(10));
        assert!(!session.formula().is_valid());
        assert_eq!(session.evaluate(0.5, 0.5), 0.0);
        assert!(session.is_stopped());
    }

    #[test]
    fn test_deep_tree_gets_fewer_recursion_levels() {
        let text = format!("f(x1,x3){}", "+1".repeat(199));
        let mut session = FormulaSession::new(&text, dims(10));
        assert_eq!(session.recursion_limit(), EVAL_LEVEL_BUDGET / 201);
        assert_abs_diff_eq!(session.evaluate(0.5, 0.5), 20.0 * 199.0);
        assert!(session.is_stopped());

        let session = FormulaSession::new("f(x1,x3)+1", dims(10));
        assert_eq!(session.recursion_limit(), DEFAULT_MAX_DEPTH);
    }
}
