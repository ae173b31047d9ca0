//! Per-column binding shared by every shape
//!
//! Every failure between reading a column and storing it in the target ends
//! up as a `MapError` carrying the field, the alias and the destination type.
//! Panics raised by user transforms and setters are intercepted the same way.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::errors::{BoxError, ConversionError, MapError, MapResult};
use crate::mapping::property::AssignError;
use crate::mapping::PropertyMapping;
use crate::source::RowReader;
use crate::value::{FromSqlValue, SqlValue};

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn binding_error(field: &str, alias: &str, dest_type: &'static str, source: impl Into<BoxError>) -> MapError {
    MapError::ColumnBinding {
        field: field.to_string(),
        alias: alias.to_string(),
        dest_type,
        source: source.into(),
    }
}

fn cast_error(field: &str, alias: &str, dest_type: &'static str) -> MapError {
    MapError::Cast {
        field: field.to_string(),
        alias: alias.to_string(),
        dest_type,
    }
}

/// Read a column into `V`, applying the NULL rule of `V`
pub(crate) fn read_value<V: FromSqlValue>(
    reader: &dyn RowReader,
    ordinal: usize,
    field: &str,
    alias: &str,
) -> MapResult<V> {
    let dest_type = V::type_name();
    let is_null = reader
        .is_null(ordinal)
        .map_err(|e| binding_error(field, alias, dest_type, e))?;
    if is_null {
        return V::null_value().ok_or_else(|| cast_error(field, alias, dest_type));
    }
    let value = reader
        .value(ordinal)
        .map_err(|e| binding_error(field, alias, dest_type, e))?;
    V::from_sql(&value).map_err(|e| binding_error(field, alias, dest_type, e))
}

/// Scalar shape reader: the first column only
pub(crate) fn read_scalar<T: FromSqlValue>(reader: &dyn RowReader, ordinal: usize, alias: &str) -> MapResult<T> {
    read_value::<T>(reader, ordinal, "value", alias)
}

/// Pair shape reader
pub(crate) fn read_pair<K: FromSqlValue, V: FromSqlValue>(
    reader: &dyn RowReader,
    key: (usize, &str),
    value: (usize, &str),
) -> MapResult<(K, V)> {
    let k = read_value::<K>(reader, key.0, "Key", key.1)?;
    let v = read_value::<V>(reader, value.0, "Value", value.1)?;
    Ok((k, v))
}

/// Bind one property of a structured target.
///
/// NULL skips the transform and applies the field's null rule.
pub(crate) fn bind_property<T>(
    target: &mut T,
    property: &PropertyMapping<T>,
    reader: &dyn RowReader,
    ordinal: usize,
) -> MapResult<()> {
    let field = property.field.as_str();
    let alias = property.alias.as_str();
    let dest_type = property.dest_type;

    let is_null = reader
        .is_null(ordinal)
        .map_err(|e| binding_error(field, alias, dest_type, e))?;

    let outcome = catch_unwind(AssertUnwindSafe(|| -> Result<Result<(), AssignError>, BoxError> {
        if is_null {
            return Ok((property.assign)(target, None));
        }
        let mut value = reader.value(ordinal)?;
        if let Some((_, transform)) = &property.transform {
            value = transform(value)?;
        }
        if value.is_null() {
            return Ok((property.assign)(target, None));
        }
        Ok((property.assign)(target, Some(&value)))
    }));

    match outcome {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(AssignError::NullIntoValueType))) => Err(cast_error(field, alias, dest_type)),
        Ok(Ok(Err(AssignError::Conversion(e)))) => Err(binding_error(field, alias, dest_type, e)),
        Ok(Err(cause)) => Err(binding_error(field, alias, dest_type, cause)),
        Err(payload) => Err(binding_error(
            field,
            alias,
            dest_type,
            ConversionError::custom(format!("panicked: {}", panic_message(payload))),
        )),
    }
}

/// Read a full row into an ordered untyped row
pub(crate) fn read_untyped(reader: &dyn RowReader) -> MapResult<crate::mapping::Row> {
    let count = reader.field_count();
    let mut row = crate::mapping::Row::with_capacity(count);
    for ordinal in 0..count {
        let name = reader
            .field_name(ordinal)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", ordinal));
        let value = if reader
            .is_null(ordinal)
            .map_err(|e| binding_error(&name, &name, "any", e))?
        {
            SqlValue::Null
        } else {
            reader
                .value(ordinal)
                .map_err(|e| binding_error(&name, &name, "any", e))?
        };
        row.insert(name, value);
    }
    Ok(row)
}
