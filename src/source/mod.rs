//! Row source contracts
//!
//! The row source is an external collaborator: a forward-only cursor over
//! tabular data. The compiled row-mapper reads it through [`RowReader`] and
//! drives it through [`RowSource`] or [`AsyncRowSource`].
//!
//! [`MemoryRowSource`] is a vector-backed implementation for tests and for
//! hosts that already hold their rows in memory.

mod errors;
mod memory;

pub use errors::RowSourceError;
pub use memory::MemoryRowSource;

use std::future::Future;

use crate::value::SqlValue;

/// Read access to the current row
pub trait RowReader {
    /// Number of columns in the current shape
    fn field_count(&self) -> usize;

    /// Column name at the given ordinal
    fn field_name(&self, ordinal: usize) -> Option<&str>;

    /// Whether the value at the given ordinal is SQL NULL
    fn is_null(&self, ordinal: usize) -> Result<bool, RowSourceError>;

    /// Value at the given ordinal
    fn value(&self, ordinal: usize) -> Result<SqlValue, RowSourceError>;
}

/// Forward-only synchronous cursor
pub trait RowSource: RowReader {
    /// Move to the next row; returns false once exhausted
    fn advance(&mut self) -> Result<bool, RowSourceError>;
}

/// Forward-only cursor whose advance may suspend on I/O
pub trait AsyncRowSource: RowSource + Send {
    /// Move to the next row; returns false once exhausted
    fn advance_async(&mut self) -> impl Future<Output = Result<bool, RowSourceError>> + Send;
}
