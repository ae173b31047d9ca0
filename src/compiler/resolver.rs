//! Shape resolution
//!
//! Turns a mapping specification into a row materializer. Built-in shapes
//! are tried first (untyped, scalar, pair), then registered resolvers in
//! registration order, then the structured shape.

use std::sync::Arc;

use super::binding::{bind_property, read_untyped};
use super::mapper::RowMaterializer;
use crate::column::ColumnIndex;
use crate::errors::{MapError, MapResult};
use crate::mapping::{MappingSpec, PairReader, PropertyMapping, Row, ScalarReader, Shape, Target};
use crate::source::RowReader;

/// Extension point for target types the built-in shapes do not cover.
///
/// Returning `None` declines the specification and lets the next resolver
/// (or the structured shape) handle it.
pub trait ShapeResolver<T: Target>: Send + Sync {
    /// Name recorded as the mapper's shape
    fn name(&self) -> &str;

    /// Build a materializer for the specification, or decline
    fn resolve(&self, spec: &MappingSpec<T>) -> Option<MapResult<RowMaterializer<T>>>;
}

/// Resolve the materializer for `spec`, returning it with its shape name
pub(crate) fn resolve_shape<T: Target>(
    spec: &MappingSpec<T>,
    resolvers: &[Arc<dyn ShapeResolver<T>>],
) -> MapResult<(RowMaterializer<T>, String)> {
    let shape = T::shape();
    let builtin = match &shape {
        Shape::Untyped(wrap) => Some(untyped(*wrap)),
        Shape::Scalar(read) => Some(scalar(*read)),
        Shape::Pair(read) => Some(pair(*read, spec)),
        Shape::Structured(_) | Shape::Custom => None,
    };
    if let Some(materializer) = builtin {
        return Ok((materializer, shape.name().to_string()));
    }

    for resolver in resolvers {
        if let Some(result) = resolver.resolve(spec) {
            return result.map(|m| (m, resolver.name().to_string()));
        }
    }

    match &shape {
        Shape::Structured(ctor) => Ok((structured(*ctor, spec), shape.name().to_string())),
        _ => Err(MapError::configuration(format!(
            "no shape resolver accepts target {}",
            spec.target_name()
        ))),
    }
}

fn untyped<T: Target>(wrap: fn(Row) -> T) -> RowMaterializer<T> {
    Box::new(move |reader: &dyn RowReader, _index: &mut ColumnIndex| -> MapResult<T> {
        read_untyped(reader).map(wrap)
    })
}

fn scalar<T: Target>(read: ScalarReader<T>) -> RowMaterializer<T> {
    Box::new(move |reader: &dyn RowReader, _index: &mut ColumnIndex| -> MapResult<T> {
        if reader.field_count() == 0 {
            return Err(MapError::NotFound {
                field: "value".to_string(),
                alias: "#0".to_string(),
            });
        }
        let alias = reader.field_name(0).unwrap_or("#0");
        read(reader, 0, alias)
    })
}

fn pair<T: Target>(read: PairReader<T>, spec: &MappingSpec<T>) -> RowMaterializer<T> {
    let key_alias = spec.key_alias().to_string();
    let value_alias = spec.value_alias().to_string();
    Box::new(move |reader: &dyn RowReader, index: &mut ColumnIndex| -> MapResult<T> {
        let key = index.resolve(reader, &key_alias).ok_or_else(|| MapError::NotFound {
            field: "Key".to_string(),
            alias: key_alias.clone(),
        })?;
        let value = index.resolve(reader, &value_alias).ok_or_else(|| MapError::NotFound {
            field: "Value".to_string(),
            alias: value_alias.clone(),
        })?;
        read(reader, (key, key_alias.as_str()), (value, value_alias.as_str()))
    })
}

fn structured<T: Target>(ctor: fn() -> T, spec: &MappingSpec<T>) -> RowMaterializer<T> {
    let properties: Vec<PropertyMapping<T>> = spec.properties().to_vec();
    Box::new(move |reader: &dyn RowReader, index: &mut ColumnIndex| -> MapResult<T> {
        let mut target = ctor();
        for property in &properties {
            match index.resolve(reader, property.alias()) {
                Some(ordinal) => bind_property(&mut target, property, reader, ordinal)?,
                None if property.is_required() => {
                    return Err(MapError::NotFound {
                        field: property.field().to_string(),
                        alias: property.alias().to_string(),
                    })
                }
                None => {}
            }
        }
        Ok(target)
    })
}
