// Recursive-descent grammar for formulas
//
//   expr    := term (('+' | '-') term)*
//   term    := unary (('*' | '/' | '%') unary | power)*
//   unary   := ('-' | '+') unary | power
//   power   := postfix (('^' | '**') unary)?
//   postfix := primary '!'*
//   primary := number | '(' expr ')' | name | name '(' args ')'
//
// A `power` directly following a term is implicit multiplication (`2x1`).

use super::ast::{BinaryOp, Expr, Function, UnaryOp, Variable};
use super::lexer::{identifier, number_literal, power_operator};
use nom::{
    branch::alt,
    character::complete::{char, one_of},
    combinator::{cut, map, opt},
    error::{Error, ErrorKind},
    multi::{fold_many0, separated_list0},
    sequence::{delimited, pair, preceded},
    IResult,
};
use std::f64::consts::{E, PI};

/// Parse a full expression (additive level)
pub fn parse_expr(input: &str) -> IResult<&str, Expr> {
    let (input, init) = parse_term(input)?;
    fold_many0(
        pair(one_of("+-"), parse_term),
        move || init.clone(),
        |acc, (op, rhs)| {
            let op = if op == '+' { BinaryOp::Add } else { BinaryOp::Sub };
            Expr::binary(op, acc, rhs)
        },
    )(input)
}

fn parse_term(input: &str) -> IResult<&str, Expr> {
    let (input, init) = parse_unary(input)?;
    fold_many0(
        alt((
            pair(one_of("*/%"), parse_unary),
            map(parse_power, |rhs| ('*', rhs)),
        )),
        move || init.clone(),
        |acc, (op, rhs)| {
            let op = match op {
                '*' => BinaryOp::Mul,
                '/' => BinaryOp::Div,
                _ => BinaryOp::Rem,
            };
            Expr::binary(op, acc, rhs)
        },
    )(input)
}

fn parse_unary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(char('-'), parse_unary), |e| {
            Expr::unary(UnaryOp::Neg, e)
        }),
        preceded(char('+'), parse_unary),
        parse_power,
    ))(input)
}

fn parse_power(input: &str) -> IResult<&str, Expr> {
    let (input, base) = parse_postfix(input)?;
    let (input, exponent) = opt(preceded(power_operator, parse_unary))(input)?;
    match exponent {
        Some(exponent) => Ok((input, Expr::binary(BinaryOp::Pow, base, exponent))),
        None => Ok((input, base)),
    }
}

fn parse_postfix(input: &str) -> IResult<&str, Expr> {
    let (input, operand) = parse_primary(input)?;
    fold_many0(
        char('!'),
        move || operand.clone(),
        |acc, _| Expr::unary(UnaryOp::Factorial, acc),
    )(input)
}

fn parse_primary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(number_literal, Expr::Number),
        delimited(char('('), parse_expr, cut(char(')'))),
        parse_name,
    ))(input)
}

/// A bare name (variable or constant) or a call. Unknown names and wrong
/// argument counts fail hard at the name's position.
fn parse_name(input: &str) -> IResult<&str, Expr> {
    let (rest, name) = identifier(input)?;
    let (rest, args) = opt(delimited(
        char('('),
        separated_list0(char(','), parse_expr),
        cut(char(')')),
    ))(rest)?;

    match resolve_name(name, args) {
        Some(expr) => Ok((rest, expr)),
        None => Err(nom::Err::Failure(Error::new(input, ErrorKind::Verify))),
    }
}

fn resolve_name(name: &str, args: Option<Vec<Expr>>) -> Option<Expr> {
    match (name, args) {
        ("x1", None) => Some(Expr::Variable(Variable::X1)),
        ("x3", None) => Some(Expr::Variable(Variable::X3)),
        ("pi", None) => Some(Expr::Number(PI)),
        ("e", None) => Some(Expr::Number(E)),
        ("f", Some(mut args)) if args.len() == 2 => {
            let b = args.pop()?;
            let a = args.pop()?;
            Some(Expr::Recurse(Box::new(a), Box::new(b)))
        }
        (name, Some(args)) => {
            let function = Function::from_name(name)?;
            if function.arity().accepts(args.len()) {
                Some(Expr::Call(function, args))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// True if `name` can be called, used to tell arity errors from unknown names
pub fn is_callable(name: &str) -> bool {
    name == "f" || Function::from_name(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(input: &str) -> Expr {
        let (rest, expr) = parse_expr(input).unwrap();
        assert!(rest.is_empty(), "unparsed input: '{}'", rest);
        expr
    }

    #[test]
    fn test_precedence() {
        let expr = parse_all("1+2*3");
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Add,
                Expr::Number(1.0),
                Expr::binary(BinaryOp::Mul, Expr::Number(2.0), Expr::Number(3.0)),
            )
        );
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = parse_all("2^3^2");
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Pow,
                Expr::Number(2.0),
                Expr::binary(BinaryOp::Pow, Expr::Number(3.0), Expr::Number(2.0)),
            )
        );
    }

    #[test]
    fn test_negation_binds_looser_than_power() {
        let expr = parse_all("-x1^2");
        assert_eq!(
            expr,
            Expr::unary(
                UnaryOp::Neg,
                Expr::binary(BinaryOp::Pow, Expr::Variable(Variable::X1), Expr::Number(2.0)),
            )
        );
    }

    #[test]
    fn test_tree_depth() {
        assert_eq!(parse_all("x1").depth(), 1);
        assert_eq!(parse_all("1+2*3").depth(), 3);
        assert_eq!(parse_all("((((x1))))").depth(), 1);
        assert_eq!(parse_all("1+1+1+1").depth(), 4);
        assert_eq!(parse_all("max(1,-x1)").depth(), 3);
    }

    #[test]
    fn test_factorial_postfix() {
        let expr = parse_all("(x1+1)!");
        assert!(matches!(expr, Expr::Unary(UnaryOp::Factorial, _)));
        let expr = parse_all("3!!");
        assert!(matches!(expr, Expr::Unary(UnaryOp::Factorial, ref inner)
            if matches!(**inner, Expr::Unary(UnaryOp::Factorial, _))));
    }

    #[test]
    fn test_implicit_multiplication() {
        let expr = parse_all("2x1");
        assert_eq!(
            expr,
            Expr::binary(BinaryOp::Mul, Expr::Number(2.0), Expr::Variable(Variable::X1))
        );
        assert!(matches!(parse_all("2pi"), Expr::Binary(BinaryOp::Mul, _, _)));
        assert!(matches!(parse_all("3(x1+1)"), Expr::Binary(BinaryOp::Mul, _, _)));
    }

    #[test]
    fn test_implicit_multiplication_keeps_subtraction() {
        // `2-3` must stay a subtraction, not `2 * -3`
        assert!(matches!(parse_all("2-3"), Expr::Binary(BinaryOp::Sub, _, _)));
    }

    #[test]
    fn test_constants_inside_names() {
        // `exp` and `sec`-like names must not be split into `e` and friends
        let expr = parse_all("exp(x1)+e");
        assert!(matches!(expr, Expr::Binary(BinaryOp::Add, ref l, _)
            if matches!(**l, Expr::Call(Function::Exp, _))));
    }

    #[test]
    fn test_recursion_call() {
        let expr = parse_all("f(x1-0.1,x3)*0.5");
        assert!(expr.is_recursive());
    }

    #[test]
    fn test_function_calls() {
        assert!(matches!(parse_all("sin(x1)"), Expr::Call(Function::Sin, _)));
        assert!(matches!(
            parse_all("max(x1,x3,1)"),
            Expr::Call(Function::Max, ref a) if a.len() == 3
        ));
        assert!(matches!(parse_all("atan2(x1,x3)"), Expr::Call(Function::Atan2, _)));
    }

    #[test]
    fn test_double_star_power() {
        assert!(matches!(parse_all("x1**2"), Expr::Binary(BinaryOp::Pow, _, _)));
    }

    #[test]
    fn test_unknown_name_fails_hard() {
        assert!(matches!(parse_expr("foo+1"), Err(nom::Err::Failure(_))));
        assert!(matches!(parse_expr("x2"), Err(nom::Err::Failure(_))));
    }

    #[test]
    fn test_wrong_arity_fails_hard() {
        assert!(matches!(parse_expr("sin(x1,x3)"), Err(nom::Err::Failure(_))));
        assert!(matches!(parse_expr("f(x1)"), Err(nom::Err::Failure(_))));
    }

    #[test]
    fn test_unclosed_paren() {
        assert!(parse_expr("(x1+1").is_err());
        assert!(parse_expr("sin(x1").is_err());
    }
}
