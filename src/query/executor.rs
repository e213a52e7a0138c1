//! Query Executor
//!
//! Filters rows of a [`MetadataIndex`]:
//!
//! ```text
//! text → parse → Expr → compile (field kinds) → Predicate → scan rows → positions
//! ```
//!
//! The result is a list of record positions in input order. Nothing is
//! copied out of the index.

use crate::index::MetadataIndex;
use crate::query::ast::Expr;
use crate::query::error::QueryResult;
use crate::query::parser::parse_expression;
use crate::query::predicate::Predicate;
use std::time::Instant;

/// Evaluates filter expressions against one index
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    index: &'a MetadataIndex,
}

impl<'a> QueryEngine<'a> {
    pub fn new(index: &'a MetadataIndex) -> Self {
        Self { index }
    }

    /// Parse and type-check an expression without scanning anything
    pub fn compile(&self, expression: &str) -> QueryResult<Predicate> {
        let expr = parse_expression(expression)?;
        self.compile_expr(&expr)
    }

    pub fn compile_expr(&self, expr: &Expr) -> QueryResult<Predicate> {
        Predicate::compile(expr, self.index.schema())
    }

    /// Filter the whole index
    pub fn evaluate(&self, expression: &str) -> QueryResult<Vec<usize>> {
        let rows: Vec<usize> = (0..self.index.size()).collect();
        self.evaluate_rows(&rows, expression)
    }

    /// Filter a subset of the index, keeping its order
    pub fn evaluate_rows(&self, rows: &[usize], expression: &str) -> QueryResult<Vec<usize>> {
        let predicate = self.compile(expression)?;
        Ok(self.filter(rows, &predicate))
    }

    /// Apply an already compiled predicate
    pub fn filter(&self, rows: &[usize], predicate: &Predicate) -> Vec<usize> {
        let start = Instant::now();

        let matched: Vec<usize> = rows
            .iter()
            .copied()
            .filter(|&i| {
                self.index
                    .record(i)
                    .map(|record| predicate.matches(record))
                    .unwrap_or(false)
            })
            .collect();

        tracing::debug!(
            scanned = rows.len(),
            matched = matched.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Evaluated filter"
        );

        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{MetadataRecord, PayloadRef};
    use crate::query::error::QueryError;

    fn index() -> MetadataIndex {
        let records = [(0.5, "D0"), (0.5, "D1"), (1.0, "D0"), (1.0, "D1")]
            .iter()
            .enumerate()
            .map(|(i, (voltage, sample))| {
                MetadataRecord::new(PayloadRef::from_path(format!("p_{i}.csv")))
                    .field("voltage", *voltage)
                    .field("sample", *sample)
            })
            .collect();
        MetadataIndex::from_records("mem", records).unwrap()
    }

    #[test]
    fn test_evaluate_preserves_order() {
        let index = index();
        let engine = QueryEngine::new(&index);

        assert_eq!(engine.evaluate("voltage == 0.5").unwrap(), vec![0, 1]);
        assert_eq!(engine.evaluate("sample == 'D1'").unwrap(), vec![1, 3]);
        assert!(engine.evaluate("voltage > 5").unwrap().is_empty());
    }

    #[test]
    fn test_evaluate_rows_narrows() {
        let index = index();
        let engine = QueryEngine::new(&index);

        let first = engine.evaluate("sample == 'D0'").unwrap();
        let second = engine.evaluate_rows(&first, "voltage == 1.0").unwrap();
        assert_eq!(second, vec![2]);
        assert_eq!(
            engine.evaluate("sample == 'D0' and voltage == 1.0").unwrap(),
            second
        );
    }

    #[test]
    fn test_invalid_expression_before_scan() {
        let index = index();
        let engine = QueryEngine::new(&index);

        let err = engine.evaluate_rows(&[], "missing == 1").unwrap_err();
        assert!(matches!(err, QueryError::InvalidExpression { .. }));
    }
}
