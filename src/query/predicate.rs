//! Typed predicates
//!
//! An [`Expr`] checked against an index's field kinds. Compiling resolves
//! every field name and rejects comparisons the field's kind does not allow,
//! so evaluation itself cannot fail.

use crate::index::{FieldKind, FieldValue, MetadataRecord};
use crate::query::ast::{Comparison, Expr, Operator};
use crate::query::error::{QueryError, QueryResult};
use std::collections::BTreeMap;

/// Type-checked filter predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        field: String,
        op: Operator,
        value: FieldValue,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Check an expression against a field schema
    pub fn compile(expr: &Expr, schema: &BTreeMap<String, FieldKind>) -> QueryResult<Predicate> {
        match expr {
            Expr::Compare(c) => compile_comparison(c, schema),
            Expr::And(terms) => Ok(Predicate::And(
                terms
                    .iter()
                    .map(|t| Predicate::compile(t, schema))
                    .collect::<QueryResult<_>>()?,
            )),
            Expr::Or(terms) => Ok(Predicate::Or(
                terms
                    .iter()
                    .map(|t| Predicate::compile(t, schema))
                    .collect::<QueryResult<_>>()?,
            )),
        }
    }

    /// Evaluate against one record, left to right with short-circuiting.
    ///
    /// An absent value (or a NaN) is unequal to every literal and satisfies
    /// nothing else.
    pub fn matches(&self, record: &MetadataRecord) -> bool {
        match self {
            Predicate::Compare { field, op, value } => {
                match record.get(field).compare(value) {
                    Some(ordering) => op.holds(ordering),
                    None => *op == Operator::Ne,
                }
            }
            Predicate::And(terms) => terms.iter().all(|t| t.matches(record)),
            Predicate::Or(terms) => terms.iter().any(|t| t.matches(record)),
        }
    }
}

fn compile_comparison(
    c: &Comparison,
    schema: &BTreeMap<String, FieldKind>,
) -> QueryResult<Predicate> {
    let kind = schema.get(&c.field).copied().ok_or_else(|| {
        QueryError::invalid(&c.fragment, format!("unknown field '{}'", c.field))
    })?;

    let literal = c.literal.kind();
    match kind {
        FieldKind::Empty => {}
        FieldKind::Bool if literal == FieldKind::Bool && !c.op.is_equality() => {
            return Err(QueryError::invalid(
                &c.fragment,
                format!("bool field '{}' only supports == and !=", c.field),
            ));
        }
        kind if kind != literal => {
            return Err(QueryError::invalid(
                &c.fragment,
                format!(
                    "cannot compare {} field '{}' with a {} literal",
                    kind, c.field, literal
                ),
            ));
        }
        _ => {}
    }

    Ok(Predicate::Compare {
        field: c.field.clone(),
        op: c.op,
        value: c.literal.to_value(),
    })
}
