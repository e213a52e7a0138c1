//! Measureset Query Engine
//!
//! Boolean filter expressions over metadata fields:
//!
//! - **AST**: Untyped expression tree
//! - **Parser**: Parse expression strings into the AST
//! - **Predicate**: Expression checked against an index's field kinds
//! - **Executor**: Filter index rows with a predicate
//!
//! # Query Language
//!
//! ```text
//! field op literal [and|or field op literal ...]
//! op: == != < <= > >=     literal: 0.5 | 'text' | "text" | true | false
//! ```
//!
//! `and` binds tighter than `or`; parentheses override. Unknown fields and
//! comparisons a field's kind does not allow fail before any record is read.
//!
//! # Examples
//!
//! ```rust,ignore
//! use measureset::query::QueryEngine;
//!
//! let engine = QueryEngine::new(&index);
//! let rows = engine.evaluate("voltage >= 0.5 and sample == 'D0'")?;
//! let narrower = engine.evaluate_rows(&rows, "delay < 10")?;
//! ```

mod ast;
mod error;
mod executor;
mod parser;
mod predicate;

pub use ast::{Comparison, Expr, Literal, Operator};
pub use error::{QueryError, QueryResult};
pub use executor::QueryEngine;
pub use parser::{parse_expression, MAX_NESTING};
pub use predicate::Predicate;
