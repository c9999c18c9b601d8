// Formula language parser

pub mod ast;
pub mod grammar;
pub mod lexer;

// Public API re-exports
pub use ast::{BinaryOp, Expr, Function, UnaryOp, Variable};
pub use grammar::parse_expr;
