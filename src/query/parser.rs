//! Filter expression parser
//!
//! Recursive descent over the filter language with `nom`.
//!
//! # Grammar
//!
//! ```text
//! expr       := and_expr ( "or" and_expr )*
//! and_expr   := primary ( "and" primary )*
//! primary    := "(" expr ")" | comparison
//! comparison := operand op operand      (one field, one literal)
//! op         := "==" | "!=" | "<=" | ">=" | "<" | ">"
//! field      := identifier | `back-quoted name`
//! literal    := number | 'text' | "text" | true | false
//! ```
//!
//! Keywords are case-insensitive. `and` binds tighter than `or`.
//!
//! # Examples
//!
//! ```text
//! voltage == 0.5
//! 0.5 < voltage                      (same as voltage > 0.5)
//! sample == 'D0' or sample == "D1"
//! (delay < 10 or delay > 100) and pulsed == TRUE
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, multispace0, satisfy},
    combinator::{consumed, map, map_opt, map_res, not, peek, recognize, value, verify},
    multi::many0,
    number::complete::recognize_float,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::query::ast::{Comparison, Expr, Literal, Operator};
use crate::query::error::{QueryError, QueryResult};

const KEYWORDS: [&str; 4] = ["and", "or", "true", "false"];

/// Deepest parenthesis nesting accepted
pub const MAX_NESTING: usize = 64;

/// Operand before the field/literal sides are sorted out
#[derive(Debug, Clone)]
enum Operand {
    Field(String),
    Literal(Literal),
}

/// Parse tree before comparisons are normalised
#[derive(Debug, Clone)]
enum Node<'a> {
    Compare {
        lhs: Operand,
        op: Operator,
        rhs: Operand,
        fragment: &'a str,
    },
    And(Vec<Node<'a>>),
    Or(Vec<Node<'a>>),
}

/// Parse a filter expression
pub fn parse_expression(input: &str) -> QueryResult<Expr> {
    let input = input.trim();
    if input.is_empty() {
        return Err(QueryError::invalid("", "empty expression"));
    }
    check_nesting(input)?;

    match parse_or(input) {
        Ok((remaining, node)) => {
            let remaining = remaining.trim();
            if remaining.is_empty() {
                lower(node)
            } else {
                Err(QueryError::invalid(remaining, "unexpected input"))
            }
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(QueryError::invalid(
            snippet(e.input),
            "expected a comparison `field op literal`",
        )),
        Err(nom::Err::Incomplete(_)) => Err(QueryError::invalid(input, "incomplete expression")),
    }
}

/// Reject nesting deeper than [`MAX_NESTING`] before the recursive parser sees it
fn check_nesting(input: &str) -> QueryResult<()> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for (pos, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => {
                depth += 1;
                if depth > MAX_NESTING {
                    let fragment: String = input[pos..].chars().take(32).collect();
                    return Err(QueryError::invalid(fragment, "expression nested too deeply"));
                }
            }
            (None, ')') => depth = depth.saturating_sub(1),
            (None, _) => {}
        }
    }
    Ok(())
}

fn snippet(rest: &str) -> &str {
    let rest = rest.trim();
    if rest.is_empty() {
        "end of expression"
    } else {
        rest
    }
}

/// Turn the parse tree into an [`Expr`], putting every field on the left
fn lower(node: Node<'_>) -> QueryResult<Expr> {
    match node {
        Node::Compare {
            lhs,
            op,
            rhs,
            fragment,
        } => {
            let (field, op, literal) = match (lhs, rhs) {
                (Operand::Field(field), Operand::Literal(lit)) => (field, op, lit),
                (Operand::Literal(lit), Operand::Field(field)) => (field, op.mirror(), lit),
                (Operand::Field(_), Operand::Field(_)) => {
                    return Err(QueryError::invalid(
                        fragment,
                        "comparison between two fields",
                    ))
                }
                (Operand::Literal(_), Operand::Literal(_)) => {
                    return Err(QueryError::invalid(
                        fragment,
                        "comparison between two literals",
                    ))
                }
            };
            Ok(Expr::Compare(Comparison {
                field,
                op,
                literal,
                fragment: fragment.trim().to_string(),
            }))
        }
        Node::And(terms) => Ok(Expr::And(
            terms.into_iter().map(lower).collect::<QueryResult<_>>()?,
        )),
        Node::Or(terms) => Ok(Expr::Or(
            terms.into_iter().map(lower).collect::<QueryResult<_>>()?,
        )),
    }
}

/// `and_expr ( "or" and_expr )*`
fn parse_or(input: &str) -> IResult<&str, Node<'_>> {
    let (input, first) = parse_and(input)?;
    let (input, rest) = many0(preceded(keyword("or"), parse_and))(input)?;
    Ok((input, fold(first, rest, Node::Or)))
}

/// `primary ( "and" primary )*`
fn parse_and(input: &str) -> IResult<&str, Node<'_>> {
    let (input, first) = parse_primary(input)?;
    let (input, rest) = many0(preceded(keyword("and"), parse_primary))(input)?;
    Ok((input, fold(first, rest, Node::And)))
}

fn fold<'a>(first: Node<'a>, rest: Vec<Node<'a>>, join: fn(Vec<Node<'a>>) -> Node<'a>) -> Node<'a> {
    if rest.is_empty() {
        first
    } else {
        let mut terms = Vec::with_capacity(rest.len() + 1);
        terms.push(first);
        terms.extend(rest);
        join(terms)
    }
}

/// `"(" expr ")" | comparison`
fn parse_primary(input: &str) -> IResult<&str, Node<'_>> {
    preceded(
        multispace0,
        alt((
            delimited(
                char('('),
                parse_or,
                preceded(multispace0, char(')')),
            ),
            parse_comparison,
        )),
    )(input)
}

/// `operand op operand`
fn parse_comparison(input: &str) -> IResult<&str, Node<'_>> {
    map(
        consumed(tuple((
            parse_operand,
            delimited(multispace0, parse_operator, multispace0),
            parse_operand,
        ))),
        |(fragment, (lhs, op, rhs))| Node::Compare {
            lhs,
            op,
            rhs,
            fragment,
        },
    )(input)
}

fn parse_operand(input: &str) -> IResult<&str, Operand> {
    alt((
        map(parse_literal, Operand::Literal),
        map(parse_field, Operand::Field),
    ))(input)
}

/// Parse comparison operator
fn parse_operator(input: &str) -> IResult<&str, Operator> {
    map_opt(
        alt((tag(">="), tag("<="), tag("!="), tag("=="), tag(">"), tag("<"))),
        Operator::from_symbol,
    )(input)
}

fn parse_literal(input: &str) -> IResult<&str, Literal> {
    alt((
        map(parse_number, Literal::Number),
        map(parse_quoted_string, Literal::Text),
        value(Literal::Bool(true), word("true")),
        value(Literal::Bool(false), word("false")),
    ))(input)
}

/// Parse a field name, plain or back-quoted
fn parse_field(input: &str) -> IResult<&str, String> {
    alt((
        map(
            delimited(char('`'), take_while1(|c: char| c != '`'), char('`')),
            str::to_string,
        ),
        map(
            verify(parse_identifier, |s: &str| {
                !KEYWORDS.iter().any(|k| s.eq_ignore_ascii_case(k))
            }),
            str::to_string,
        ),
    ))(input)
}

/// Parse identifier (letters, digits, `_` and `.`, not starting with a digit)
fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(is_identifier_char),
    ))(input)
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

/// Parse quoted string, single or double quotes
fn parse_quoted_string(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        )),
        str::to_string,
    )(input)
}

/// Parse floating point number (sign, fraction and exponent optional)
fn parse_number(input: &str) -> IResult<&str, f64> {
    map_res(
        terminated(recognize_float, not(peek(satisfy(is_identifier_char)))),
        |s: &str| s.parse::<f64>(),
    )(input)
}

/// A whole keyword, not the prefix of an identifier
fn word<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(kw), not(peek(satisfy(is_identifier_char))))
}

/// A keyword with surrounding whitespace
fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    delimited(multispace0, word(kw), multispace0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparison(expr: &Expr) -> &Comparison {
        match expr {
            Expr::Compare(c) => c,
            other => panic!("expected a comparison, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_simple_comparison() {
        let expr = parse_expression("voltage == 0.5").unwrap();
        let c = comparison(&expr);
        assert_eq!(c.field, "voltage");
        assert_eq!(c.op, Operator::Eq);
        assert_eq!(c.literal, Literal::Number(0.5));
        assert_eq!(c.fragment, "voltage == 0.5");
    }

    #[test]
    fn test_parse_literals() {
        let expr = parse_expression("sample == 'D0'").unwrap();
        assert_eq!(comparison(&expr).literal, Literal::Text("D0".into()));

        let expr = parse_expression("sample == \"it's\"").unwrap();
        assert_eq!(comparison(&expr).literal, Literal::Text("it's".into()));

        let expr = parse_expression("pulsed != TRUE").unwrap();
        assert_eq!(comparison(&expr).literal, Literal::Bool(true));

        let expr = parse_expression("width < -1.5e-6").unwrap();
        assert_eq!(comparison(&expr).literal, Literal::Number(-1.5e-6));
    }

    #[test]
    fn test_every_operator_symbol() {
        let cases = [
            ("==", Operator::Eq),
            ("!=", Operator::Ne),
            ("<", Operator::Lt),
            ("<=", Operator::Lte),
            (">", Operator::Gt),
            (">=", Operator::Gte),
        ];
        for (symbol, op) in cases {
            let expr = parse_expression(&format!("voltage {symbol} 1")).unwrap();
            assert_eq!(comparison(&expr).op, op, "{symbol}");
        }
        assert!(parse_expression("voltage = 1").is_err());
    }

    #[test]
    fn test_literal_on_left_is_mirrored() {
        let expr = parse_expression("0.5 < voltage").unwrap();
        let c = comparison(&expr);
        assert_eq!(c.field, "voltage");
        assert_eq!(c.op, Operator::Gt);
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse_expression("a == 1 or b == 2 and c == 3").unwrap();
        match expr {
            Expr::Or(terms) => {
                assert_eq!(terms.len(), 2);
                assert!(matches!(&terms[1], Expr::And(inner) if inner.len() == 2));
            }
            other => panic!("expected or, got {other:?}"),
        }
    }

    #[test]
    fn test_parentheses_override() {
        let expr = parse_expression("(a == 1 OR b == 2) AND c == 3").unwrap();
        match expr {
            Expr::And(terms) => {
                assert_eq!(terms.len(), 2);
                assert!(matches!(&terms[0], Expr::Or(_)));
            }
            other => panic!("expected and, got {other:?}"),
        }
    }

    #[test]
    fn test_back_quoted_field() {
        let expr = parse_expression("`pulse width (s)` >= 1e-6").unwrap();
        assert_eq!(comparison(&expr).field, "pulse width (s)");

        let expr = parse_expression("`and` == 1").unwrap();
        assert_eq!(comparison(&expr).field, "and");
    }

    #[test]
    fn test_keyword_prefixed_identifiers() {
        let expr = parse_expression("order == 1 and android == 'x'").unwrap();
        let fields: Vec<&str> = expr.comparisons().iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["order", "android"]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_expression("").is_err());
        assert!(parse_expression("voltage =").is_err());
        assert!(parse_expression("voltage = 0.5").is_err());
        assert!(parse_expression("(voltage == 0.5").is_err());
        assert!(parse_expression("voltage == 0.5 and").is_err());

        let err = parse_expression("voltage == delay").unwrap_err();
        assert_eq!(err.fragment(), "voltage == delay");

        let err = parse_expression("1 == 2").unwrap_err();
        assert!(err.to_string().contains("two literals"));

        let err = parse_expression("voltage == 0.5 garbage").unwrap_err();
        assert_eq!(err.fragment(), "garbage");
    }

    fn nested(depth: usize) -> String {
        format!("{}voltage == 0.5{}", "(".repeat(depth), ")".repeat(depth))
    }

    #[test]
    fn test_nesting_limit() {
        assert!(parse_expression(&nested(MAX_NESTING)).is_ok());

        let err = parse_expression(&nested(MAX_NESTING + 1)).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"));

        let err = parse_expression(&nested(10_000)).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"));
    }

    #[test]
    fn test_parentheses_inside_quotes_not_counted() {
        let text = format!("sample == '{}'", "(".repeat(MAX_NESTING * 2));
        assert!(parse_expression(&text).is_ok());
    }
}
