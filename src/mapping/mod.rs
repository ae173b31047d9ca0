//! Mapping specifications and target shapes
//!
//! A [`MappingSpec`] is the ordered list of property mappings for one target
//! type. It is validated when built, so a malformed mapping fails before any
//! row is read. The target type chooses how rows become values through
//! [`Target::shape`].
//!
//! # Example
//!
//! ```ignore
//! #[derive(Default)]
//! struct Person { id: i32, name: String }
//!
//! impl Target for Person {
//!     fn shape() -> Shape<Self> { Shape::structured() }
//! }
//!
//! let spec = MappingSpec::<Person>::builder()
//!     .field("Id", |p: &mut Person, v: i32| p.id = v)
//!     .field("Name", |p: &mut Person, v: String| p.name = v)
//!     .alias("full_name")
//!     .build()?;
//! ```

pub(crate) mod property;
mod row;
mod shape;
mod spec;

pub use property::{PropertyExport, PropertyMapping};
pub use row::Row;
pub use shape::{PairReader, ScalarReader, Shape, Target};
pub use spec::{MappingSpec, MappingSpecBuilder, DEFAULT_KEY_ALIAS, DEFAULT_VALUE_ALIAS};
