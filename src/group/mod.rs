//! Measureset Grouping Engine
//!
//! Partitions index rows by the distinct values of one or more fields:
//!
//! - **key**: canonical [`GroupKey`] (fields sorted by name)
//! - **grouping**: [`GroupedIndex`] with dense, first-seen group indices
//! - **error**: Error types
//!
//! Group indices are stable within one grouping. Grouping a different
//! subset numbers its groups afresh.

mod error;
mod grouping;
mod key;

pub use error::{GroupError, GroupResult};
pub use grouping::{Group, GroupedIndex};
pub use key::GroupKey;
