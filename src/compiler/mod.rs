//! Row-mapper compilation
//!
//! A mapping specification is compiled once into a plan of per-field
//! binders closed over the property list. The [`CompilationCache`] keeps
//! one compiled mapper per fingerprint and hands out shared references.

pub(crate) mod binding;
mod cache;
mod mapper;
mod resolver;

pub use cache::CompilationCache;
pub use mapper::{CompiledRowMapper, MappedRows, RowMaterializer};
pub use resolver::ShapeResolver;
