//! Filter expression syntax tree
//!
//! Untyped result of parsing. Field names are not resolved here; see
//! [`Predicate`](crate::query::Predicate) for the form checked against an
//! index's field kinds.
//!
//! # Example Expressions
//!
//! ```text
//! voltage == 0.5
//! voltage >= 0.5 and sample != 'D0'
//! (delay < 10 or delay > 100) and `pulse width` == 2e-6
//! ```

use crate::index::{FieldKind, FieldValue};
use std::cmp::Ordering;
use std::fmt;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equal to
    Eq,
    /// Not equal to
    Ne,
    /// Greater than
    Gt,
    /// Greater than or equal to
    Gte,
    /// Less than
    Lt,
    /// Less than or equal to
    Lte,
}

impl Operator {
    /// Parse from its symbol
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Gte),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Lte),
            _ => None,
        }
    }

    /// Operator with its operands swapped: `a < b` ⇔ `b > a`
    pub fn mirror(self) -> Self {
        match self {
            Self::Gt => Self::Lt,
            Self::Gte => Self::Lte,
            Self::Lt => Self::Gt,
            Self::Lte => Self::Gte,
            op => op,
        }
    }

    /// Whether a comparison outcome satisfies this operator
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
        }
    }

    /// `==` and `!=`
    pub fn is_equality(self) -> bool {
        matches!(self, Self::Eq | Self::Ne)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "=="),
            Self::Ne => write!(f, "!="),
            Self::Gt => write!(f, ">"),
            Self::Gte => write!(f, ">="),
            Self::Lt => write!(f, "<"),
            Self::Lte => write!(f, "<="),
        }
    }
}

/// Literal operand
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Literal {
    pub fn kind(&self) -> FieldKind {
        match self {
            Literal::Number(_) => FieldKind::Number,
            Literal::Text(_) => FieldKind::Text,
            Literal::Bool(_) => FieldKind::Bool,
        }
    }

    /// Value the literal is compared as
    pub fn to_value(&self) -> FieldValue {
        match self {
            Literal::Number(v) => FieldValue::number(*v),
            Literal::Text(s) => FieldValue::Text(s.clone()),
            Literal::Bool(b) => FieldValue::Bool(*b),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(v) => write!(f, "{v}"),
            Literal::Text(s) if s.contains('\'') => write!(f, "\"{s}\""),
            Literal::Text(s) => write!(f, "'{s}'"),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// `field op literal`, normalised so the field is on the left
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub field: String,
    pub op: Operator,
    pub literal: Literal,
    /// Source text, for error messages
    pub fragment: String,
}

impl Comparison {
    pub fn new(field: impl Into<String>, op: Operator, literal: Literal) -> Self {
        let field = field.into();
        let fragment = format!("{} {} {}", render_field(&field), op, literal);
        Self {
            field,
            op,
            literal,
            fragment,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", render_field(&self.field), self.op, self.literal)
    }
}

/// Boolean filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare(Comparison),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    /// Conjunction of two expressions, flattening nested `and`s
    pub fn and(self, other: Expr) -> Expr {
        let mut terms = match self {
            Expr::And(terms) => terms,
            e => vec![e],
        };
        match other {
            Expr::And(more) => terms.extend(more),
            e => terms.push(e),
        }
        Expr::And(terms)
    }

    /// Disjunction of two expressions, flattening nested `or`s
    pub fn or(self, other: Expr) -> Expr {
        let mut terms = match self {
            Expr::Or(terms) => terms,
            e => vec![e],
        };
        match other {
            Expr::Or(more) => terms.extend(more),
            e => terms.push(e),
        }
        Expr::Or(terms)
    }

    /// Every comparison in the expression, left to right
    pub fn comparisons(&self) -> Vec<&Comparison> {
        let mut out = Vec::new();
        self.collect_comparisons(&mut out);
        out
    }

    fn collect_comparisons<'a>(&'a self, out: &mut Vec<&'a Comparison>) {
        match self {
            Expr::Compare(c) => out.push(c),
            Expr::And(terms) | Expr::Or(terms) => {
                for term in terms {
                    term.collect_comparisons(out);
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare(c) => write!(f, "{c}"),
            Expr::And(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " and ")?;
                    }
                    match term {
                        Expr::Or(_) => write!(f, "({term})")?,
                        _ => write!(f, "{term}")?,
                    }
                }
                Ok(())
            }
            Expr::Or(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " or ")?;
                    }
                    write!(f, "{term}")?;
                }
                Ok(())
            }
        }
    }
}

fn render_field(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .map(|c| c.is_alphabetic() || c == '_')
        .unwrap_or(false)
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    if plain {
        name.to_string()
    } else {
        format!("`{name}`")
    }
}
