// Token-level parsers shared by the formula grammar

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric0, char, digit0, digit1, one_of},
    combinator::{map_res, opt, recognize},
    sequence::{pair, tuple},
    IResult,
};

/// Parse an unsigned number literal: `12`, `1.5`, `.5`, `2e-3`.
/// An `e` not followed by digits is left alone so `2e` reads as `2 * e`.
pub fn number_literal(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((
            alt((
                recognize(pair(digit1, opt(pair(char('.'), digit0)))),
                recognize(pair(char('.'), digit1)),
            )),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| s.parse::<f64>(),
    )(input)
}

/// Parse an identifier: a letter followed by letters or digits
pub fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(alpha1, alphanumeric0))(input)
}

/// Parse a power operator, `^` or `**`
pub fn power_operator(input: &str) -> IResult<&str, &str> {
    alt((tag("^"), tag("**")))(input)
}
