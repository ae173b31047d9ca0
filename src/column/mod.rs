//! Column index resolution
//!
//! Resolves column names to ordinals within a row shape.
//!
//! # Invariants
//!
//! - Lookups are case-insensitive
//! - A miss is `None`, never an error
//! - Once a name resolves within one [`ColumnIndex`], its ordinal never changes
//! - Exported snapshots are immutable and shareable across threads

mod resolver;

pub(crate) use resolver::normalize;
pub use resolver::{ColumnIndex, ColumnSnapshot};
