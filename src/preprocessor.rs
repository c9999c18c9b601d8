use std::iter::Peekable;
use std::str::Chars;

/// Normalize raw formula text before parsing: whitespace is dropped, letters
/// are case-folded and a few typographic operators are mapped to ASCII.
pub fn normalize_formula(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            'π' | 'Π' => output.push_str("pi"),
            '×' | '·' | '⋅' => output.push('*'),
            '÷' => output.push('/'),
            '−' | '–' => output.push('-'),
            '²' => output.push_str("^2"),
            '³' => output.push_str("^3"),
            '√' => push_sqrt(&mut output, &mut chars),
            c => output.extend(c.to_lowercase()),
        }
    }

    output
}

/// `√x1` becomes `sqrt(x1)`, `√(..)` becomes `sqrt(..)`
fn push_sqrt(output: &mut String, chars: &mut Peekable<Chars>) {
    output.push_str("sqrt");
    if chars.peek() == Some(&'(') {
        return;
    }

    output.push('(');
    while let Some(&c) = chars.peek() {
        if c.is_alphanumeric() || c == '.' {
            output.extend(c.to_lowercase());
            chars.next();
        } else {
            break;
        }
    }
    output.push(')');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_and_fold() {
        assert_eq!(normalize_formula(" Sin( X1 ) ^ 2 "), "sin(x1)^2");
    }

    #[test]
    fn test_typographic_operators() {
        assert_eq!(normalize_formula("2π × x1"), "2pi*x1");
        assert_eq!(normalize_formula("x1² − x3³"), "x1^2-x3^3");
        assert_eq!(normalize_formula("x1 ÷ 2"), "x1/2");
    }

    #[test]
    fn test_sqrt_sign() {
        assert_eq!(normalize_formula("√x1+1"), "sqrt(x1)+1");
        assert_eq!(normalize_formula("√(x1+1)"), "sqrt(x1+1)");
    }

    #[test]
    fn test_empty() {
        assert_eq!(normalize_formula("   "), "");
    }
}
