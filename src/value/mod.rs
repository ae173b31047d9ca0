//! Column values and their conversion into Rust types
//!
//! A row source hands out [`SqlValue`]s. Mapped fields receive them through
//! [`FromSqlValue`], which also decides what SQL NULL means for the
//! destination: an empty value for reference and nullable types, a cast error
//! for plain value types.

mod convert;
mod sql_value;

pub use convert::FromSqlValue;
pub use sql_value::SqlValue;
