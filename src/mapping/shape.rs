//! Target shapes

use chrono::{DateTime, Utc};

use super::Row;
use crate::compiler::binding::{read_pair, read_scalar};
use crate::errors::MapResult;
use crate::source::RowReader;
use crate::value::{FromSqlValue, SqlValue};

/// Reads a scalar from the column at `ordinal`, named `alias`
pub type ScalarReader<T> = fn(&dyn RowReader, usize, &str) -> MapResult<T>;

/// Reads a pair from the key and value columns `(ordinal, alias)`
pub type PairReader<T> = fn(&dyn RowReader, (usize, &str), (usize, &str)) -> MapResult<T>;

/// How rows become values of a target type.
///
/// Variants are tried in declaration order: untyped, scalar, pair, then any
/// registered shape resolvers, then structured. `Custom` types must be
/// claimed by a registered resolver.
pub enum Shape<T> {
    /// Every column kept by name and ordinal
    Untyped(fn(Row) -> T),
    /// First column only
    Scalar(ScalarReader<T>),
    /// Two named columns, "Key" and "Value" unless overridden
    Pair(PairReader<T>),
    /// Field-by-field assignment into a default-constructed instance
    Structured(fn() -> T),
    /// Only registered resolvers can build this target
    Custom,
}

impl<T> Shape<T> {
    /// Short name used in logs and mapper metadata
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Untyped(_) => "untyped",
            Shape::Scalar(_) => "scalar",
            Shape::Pair(_) => "pair",
            Shape::Structured(_) => "structured",
            Shape::Custom => "custom",
        }
    }
}

impl<T: Default> Shape<T> {
    /// Structured shape built from `T::default()`
    pub fn structured() -> Self {
        Shape::Structured(T::default)
    }
}

impl<T: FromSqlValue> Shape<T> {
    /// Scalar shape converting the first column with [`FromSqlValue`]
    pub fn scalar() -> Self {
        Shape::Scalar(read_scalar::<T>)
    }
}

/// A type the row mapper can produce
pub trait Target: Sized + Send + Sync + 'static {
    /// The shape used to materialize this type
    fn shape() -> Shape<Self>;
}

impl Target for Row {
    fn shape() -> Shape<Self> {
        Shape::Untyped(|row| row)
    }
}

macro_rules! scalar_targets {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Target for $ty {
                fn shape() -> Shape<Self> {
                    Shape::scalar()
                }
            }
        )*
    };
}

scalar_targets!(bool, i16, i32, i64, u32, u64, f32, f64, String, Vec<u8>, DateTime<Utc>, SqlValue);

impl<T: FromSqlValue + Sync> Target for Option<T> {
    fn shape() -> Shape<Self> {
        Shape::scalar()
    }
}

impl<K, V> Target for (K, V)
where
    K: FromSqlValue + Sync,
    V: FromSqlValue + Sync,
{
    fn shape() -> Shape<Self> {
        Shape::Pair(read_pair::<K, V>)
    }
}
